use super::UiEvent;
use crate::synth::ambient::DEFAULT_AMBIENT_MS;
use crate::synth::rhythm::{DEFAULT_BPM, DEFAULT_HEARTBEAT_MS};
use crate::synth::EffectKind;
use crossbeam_channel::Sender;
use device_query::{DeviceQuery, DeviceState, Keycode};
use std::collections::HashMap;
use tracing::{debug, error};

/// Turns key presses into [`UiEvent`]s. Only the press edge fires; holding a
/// key does not repeat.
pub struct KeyboardHandler {
    device_state: DeviceState,
    key_states: HashMap<Keycode, bool>,
    key_to_event: HashMap<Keycode, UiEvent>,
    event_sender: Sender<UiEvent>,
}

impl KeyboardHandler {
    pub fn new(event_sender: Sender<UiEvent>) -> Self {
        let key_to_event: HashMap<Keycode, UiEvent> = [
            (Keycode::Key1, UiEvent::Effect(EffectKind::MessageSent)),
            (Keycode::Key2, UiEvent::Effect(EffectKind::MessageReceived)),
            (Keycode::Key3, UiEvent::Effect(EffectKind::ConversationCreated)),
            (Keycode::Key4, UiEvent::Effect(EffectKind::ButtonClick)),
            (Keycode::Key5, UiEvent::Effect(EffectKind::Notification)),
            (
                Keycode::H,
                UiEvent::Heartbeat {
                    bpm: DEFAULT_BPM,
                    duration_ms: DEFAULT_HEARTBEAT_MS,
                },
            ),
            (
                Keycode::B,
                UiEvent::Breeze {
                    duration_ms: DEFAULT_AMBIENT_MS,
                },
            ),
            (Keycode::Escape, UiEvent::Quit),
        ]
        .into_iter()
        .collect();

        let key_states = key_to_event.keys().map(|key| (*key, false)).collect();

        Self {
            device_state: DeviceState::new(),
            key_states,
            key_to_event,
            event_sender,
        }
    }

    pub fn update(&mut self) {
        let keys: Vec<Keycode> = self.device_state.get_keys();

        for (key, event) in &self.key_to_event {
            let is_pressed = keys.contains(key);
            let was_pressed = self.key_states.get(key).copied().unwrap_or(false);

            if is_pressed && !was_pressed {
                debug!("Key '{:?}' pressed, sending {:?}", key, event);
                if let Err(e) = self.event_sender.send(*event) {
                    error!("Error sending UI event: {}", e);
                }
            }
            self.key_states.insert(*key, is_pressed);
        }
    }
}
