pub mod ambient;
pub mod chord;
pub mod effects;
pub mod envelope;
pub mod noise;
pub mod oscillator;
pub mod rhythm;
pub mod tone;
pub mod waveform;

pub use ambient::{AmbientNoiseController, NoiseSession, RendererPath, SessionState};
pub use chord::{ChordSequencer, ChordSpec};
pub use effects::{EffectKind, EffectSpec, ParseEffectError, SoundEffectRegistry};
pub use noise::{Amplitude, FallbackRenderer, NoiseRenderer, WhiteNoise, WorkletRenderer};
pub use rhythm::RhythmScheduler;
pub use tone::{ScheduledTone, ToneSpec, ToneSynthesizer};
pub use waveform::{ParseWaveformError, Waveform};
