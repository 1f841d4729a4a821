use super::SoundEngine;
use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::input::{KeyboardHandler, UiEvent};
use crossbeam_channel::Receiver;
use std::time::Duration;
use tracing::info;

/// Keyboard-driven demo host: polls the keyboard, plays whatever the keys map
/// to and returns when Escape is pressed.
pub fn start(config: EngineConfig) -> Result<(), ConfigError> {
    let engine = SoundEngine::new(config)?;
    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let mut keyboard_handler = KeyboardHandler::new(event_tx);

    info!("Keys: 1-5 effects, H heartbeat, B breeze, Esc quit");
    loop {
        keyboard_handler.update();
        if !dispatch(&engine, &event_rx) {
            info!("Quit requested");
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn dispatch(engine: &SoundEngine, events: &Receiver<UiEvent>) -> bool {
    events.try_iter().all(|event| engine.handle(event))
}
