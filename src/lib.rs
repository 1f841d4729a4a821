//! Procedural UI feedback sounds: enveloped tones, staggered chords, a
//! heartbeat pattern and a short white-noise "breeze", all synthesised on the
//! fly into a shared output graph.

pub mod audio;
pub mod config;
pub mod error;
pub mod graph;
pub mod input;
pub mod runtime;
pub mod synth;

pub use config::{EngineConfig, OverlapPolicy};
pub use error::{AudioError, ConfigError};
pub use input::UiEvent;
pub use runtime::{play_breeze, play_heartbeat, play_sound, AudioContextManager, SoundEngine};
pub use synth::{ChordSpec, EffectKind, ToneSpec, Waveform};
