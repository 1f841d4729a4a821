//! One object that owns every sound component, plus a process-wide instance
//! for callers that just want to make a noise.

use super::{AudioContextManager, Scheduler};
use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::input::UiEvent;
use crate::synth::ambient::DEFAULT_AMBIENT_MS;
use crate::synth::rhythm::{DEFAULT_BPM, DEFAULT_HEARTBEAT_MS};
use crate::synth::{
    AmbientNoiseController, EffectKind, NoiseSession, RhythmScheduler, ScheduledTone,
    SoundEffectRegistry, ToneSynthesizer,
};
use std::sync::{Arc, OnceLock};
use tracing::info;

static GLOBAL: OnceLock<SoundEngine> = OnceLock::new();

pub struct SoundEngine {
    contexts: Arc<AudioContextManager>,
    scheduler: Arc<Scheduler>,
    tones: ToneSynthesizer,
    effects: SoundEffectRegistry,
    rhythm: RhythmScheduler,
    ambient: AmbientNoiseController,
}

impl SoundEngine {
    /// Engine on the system output device. Nothing is opened until the first
    /// sound is requested.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let contexts = Arc::new(AudioContextManager::for_config(config.clone()));
        Ok(Self::with_contexts(contexts, &config))
    }

    pub fn with_contexts(contexts: Arc<AudioContextManager>, config: &EngineConfig) -> Self {
        let scheduler = Arc::new(Scheduler::new());
        let tones = ToneSynthesizer::new(contexts.clone());
        Self {
            effects: SoundEffectRegistry::new(contexts.clone()),
            rhythm: RhythmScheduler::new(tones.clone(), scheduler.clone()),
            ambient: AmbientNoiseController::new(contexts.clone(), scheduler.clone(), config),
            tones,
            contexts,
            scheduler,
        }
    }

    /// The process-wide engine, built with the default configuration unless
    /// [`install_global`](Self::install_global) ran first.
    pub fn global() -> &'static SoundEngine {
        GLOBAL.get_or_init(|| {
            let config = EngineConfig::default();
            Self::with_contexts(Arc::new(AudioContextManager::for_config(config.clone())), &config)
        })
    }

    /// Makes `engine` the process-wide engine. Hands it back if one is
    /// already in place.
    pub fn install_global(engine: SoundEngine) -> Result<&'static SoundEngine, SoundEngine> {
        GLOBAL.set(engine)?;
        info!("Global sound engine installed");
        Ok(Self::global())
    }

    pub fn contexts(&self) -> &Arc<AudioContextManager> {
        &self.contexts
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn tones(&self) -> &ToneSynthesizer {
        &self.tones
    }

    pub fn effects(&self) -> &SoundEffectRegistry {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut SoundEffectRegistry {
        &mut self.effects
    }

    pub fn rhythm(&self) -> &RhythmScheduler {
        &self.rhythm
    }

    pub fn ambient(&self) -> &AmbientNoiseController {
        &self.ambient
    }

    pub fn play_sound(&self, kind: EffectKind) -> Vec<ScheduledTone> {
        self.effects.play(kind)
    }

    pub fn play_named(&self, name: &str) -> Vec<ScheduledTone> {
        self.effects.play_named(name)
    }

    pub fn play_heartbeat(&self, bpm: f64, duration_ms: u64) -> usize {
        self.rhythm.play(bpm, duration_ms)
    }

    pub fn play_breeze(&self, duration_ms: u64) -> Arc<NoiseSession> {
        self.ambient.start(duration_ms)
    }

    /// Reacts to a UI event. Returns false once the host should stop.
    pub fn handle(&self, event: UiEvent) -> bool {
        match event {
            UiEvent::Effect(kind) => {
                self.play_sound(kind);
            }
            UiEvent::Heartbeat { bpm, duration_ms } => {
                self.play_heartbeat(bpm, duration_ms);
            }
            UiEvent::Breeze { duration_ms } => {
                self.play_breeze(duration_ms);
            }
            UiEvent::Quit => return false,
        }
        true
    }
}

/// Plays `kind` on the global engine.
pub fn play_sound(kind: EffectKind) {
    SoundEngine::global().play_sound(kind);
}

/// Default heartbeat (70 bpm for one second) on the global engine.
pub fn play_heartbeat() {
    SoundEngine::global().play_heartbeat(DEFAULT_BPM, DEFAULT_HEARTBEAT_MS);
}

/// Default two-second breeze on the global engine.
pub fn play_breeze() {
    SoundEngine::global().play_breeze(DEFAULT_AMBIENT_MS);
}
