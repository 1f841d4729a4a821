use super::chord::{ChordSequencer, ChordSpec};
use super::tone::{ScheduledTone, ToneSpec, ToneSynthesizer};
use crate::runtime::AudioContextManager;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// UI feedback sounds known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectKind {
    MessageSent,
    MessageReceived,
    ConversationCreated,
    ButtonClick,
    Notification,
}

impl EffectKind {
    pub const ALL: [EffectKind; 5] = [
        EffectKind::MessageSent,
        EffectKind::MessageReceived,
        EffectKind::ConversationCreated,
        EffectKind::ButtonClick,
        EffectKind::Notification,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::MessageSent => "message-sent",
            EffectKind::MessageReceived => "message-received",
            EffectKind::ConversationCreated => "conversation-created",
            EffectKind::ButtonClick => "button-click",
            EffectKind::Notification => "notification",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sound effect: {0}")]
pub struct ParseEffectError(pub String);

impl FromStr for EffectKind {
    type Err = ParseEffectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EffectKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ParseEffectError(s.to_string()))
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What an effect plays: one tone or a staggered chord.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectSpec {
    Tone(ToneSpec),
    Chord(ChordSpec),
}

impl From<ToneSpec> for EffectSpec {
    fn from(spec: ToneSpec) -> Self {
        EffectSpec::Tone(spec)
    }
}

impl From<ChordSpec> for EffectSpec {
    fn from(spec: ChordSpec) -> Self {
        EffectSpec::Chord(spec)
    }
}

/// The stock effect table.
pub fn default_effects() -> HashMap<EffectKind, EffectSpec> {
    HashMap::from([
        (EffectKind::MessageSent, ToneSpec::sine(1046.5, 100, 0.2).into()),
        (EffectKind::MessageReceived, ToneSpec::sine(783.99, 150, 0.2).into()),
        (
            EffectKind::ConversationCreated,
            ChordSpec::new(vec![523.25, 659.25, 783.99], ToneSpec::sine(523.25, 200, 0.3)).into(),
        ),
        (EffectKind::ButtonClick, ToneSpec::sine(440.0, 80, 0.1).into()),
        (
            EffectKind::Notification,
            ChordSpec::new(vec![783.99, 987.77], ToneSpec::sine(783.99, 200, 0.3)).into(),
        ),
    ])
}

/// Maps effect kinds to sounds and dispatches them to the tone or chord
/// player. Unmapped kinds play nothing.
pub struct SoundEffectRegistry {
    contexts: Arc<AudioContextManager>,
    tones: ToneSynthesizer,
    chords: ChordSequencer,
    effects: HashMap<EffectKind, EffectSpec>,
}

impl SoundEffectRegistry {
    pub fn new(contexts: Arc<AudioContextManager>) -> Self {
        let mut registry = Self::empty(contexts);
        registry.effects = default_effects();
        registry
    }

    pub fn empty(contexts: Arc<AudioContextManager>) -> Self {
        let tones = ToneSynthesizer::new(contexts.clone());
        Self {
            contexts,
            chords: ChordSequencer::new(tones.clone()),
            tones,
            effects: HashMap::new(),
        }
    }

    pub fn insert(&mut self, kind: EffectKind, spec: impl Into<EffectSpec>) -> Option<EffectSpec> {
        self.effects.insert(kind, spec.into())
    }

    pub fn remove(&mut self, kind: EffectKind) -> Option<EffectSpec> {
        self.effects.remove(&kind)
    }

    pub fn lookup(&self, kind: EffectKind) -> Option<&EffectSpec> {
        self.effects.get(&kind)
    }

    /// Plays `kind` and returns the tones that were scheduled, empty when the
    /// kind is unmapped or audio is unavailable.
    pub fn play(&self, kind: EffectKind) -> Vec<ScheduledTone> {
        let Some(spec) = self.effects.get(&kind) else {
            debug!("No sound mapped for {}", kind);
            return Vec::new();
        };
        if let Err(err) = self.contexts.get() {
            error!("Cannot play {}: {}", kind, err);
            return Vec::new();
        }

        debug!("Playing effect {}", kind);
        match spec {
            EffectSpec::Tone(tone) => self.tones.play(tone, 0.0).into_iter().collect(),
            EffectSpec::Chord(chord) => self.chords.play_chord(chord),
        }
    }

    /// Like [`play`](Self::play), by wire name. Unknown names are ignored.
    pub fn play_named(&self, name: &str) -> Vec<ScheduledTone> {
        match name.parse::<EffectKind>() {
            Ok(kind) => self.play(kind),
            Err(err) => {
                warn!("{}", err);
                Vec::new()
            }
        }
    }
}
