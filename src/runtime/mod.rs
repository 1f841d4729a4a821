pub mod context;
pub mod engine;
pub mod manager;
pub mod scheduler;
pub mod worklet;

#[cfg(feature = "native")]
pub mod native;

pub use context::AudioContext;
pub use engine::{play_breeze, play_heartbeat, play_sound, SoundEngine};
pub use manager::{AudioContextManager, ContextState};
pub use scheduler::{Scheduler, TimerId};
pub use worklet::{WorkletHost, WorkletNode, NOISE_PROCESSOR_MODULE, NOISE_PROCESSOR_NAME};
