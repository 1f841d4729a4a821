#[cfg(feature = "native")]
mod keyboard;
#[cfg(feature = "native")]
pub use self::keyboard::KeyboardHandler;

use crate::synth::EffectKind;

/// Something the user did that may deserve a sound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiEvent {
    Effect(EffectKind),
    Heartbeat { bpm: f64, duration_ms: u64 },
    Breeze { duration_ms: u64 },
    Quit,
}
