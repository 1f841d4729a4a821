use super::context::AudioContext;
use crate::audio::OfflineBackend;
use crate::config::EngineConfig;
use crate::error::AudioError;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use tracing::{error, info};

type ContextFactory = Box<dyn Fn() -> Result<AudioContext, AudioError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Uninitialized,
    Ready,
}

/// Owns the one audio context of the process.
///
/// The context is opened lazily on the first `get` (after a user gesture) and
/// never closed. A failed open is not cached, so the next request retries.
pub struct AudioContextManager {
    context: OnceLock<Arc<AudioContext>>,
    init: Mutex<()>,
    factory: ContextFactory,
}

impl AudioContextManager {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<AudioContext, AudioError> + Send + Sync + 'static,
    {
        Self {
            context: OnceLock::new(),
            init: Mutex::new(()),
            factory: Box::new(factory),
        }
    }

    /// Manager that opens the system output device described by `config`.
    pub fn for_config(config: EngineConfig) -> Self {
        Self::new(move || Self::open_system(&config))
    }

    #[cfg(feature = "native")]
    fn open_system(config: &EngineConfig) -> Result<AudioContext, AudioError> {
        AudioContext::system(config)
    }

    #[cfg(not(feature = "native"))]
    fn open_system(_config: &EngineConfig) -> Result<AudioContext, AudioError> {
        Err(AudioError::AudioUnavailable(
            "built without an audio output backend".into(),
        ))
    }

    /// Manager backed by a headless context. The returned backend renders it.
    pub fn offline(config: EngineConfig, sample_rate: u32) -> (Self, OfflineBackend) {
        let backend = OfflineBackend::new(sample_rate);
        let factory_backend = backend.clone();
        let manager = Self::new(move || AudioContext::open(&config, &mut factory_backend.clone()));
        (manager, backend)
    }

    /// Returns the shared context, opening it on first use.
    pub fn get(&self) -> Result<Arc<AudioContext>, AudioError> {
        if let Some(context) = self.context.get() {
            return Ok(context.clone());
        }

        let _guard = self.init.lock();
        if let Some(context) = self.context.get() {
            return Ok(context.clone());
        }

        match (self.factory)() {
            Ok(context) => {
                let context = Arc::new(context);
                info!("Audio context initialised");
                Ok(self.context.get_or_init(|| context).clone())
            }
            Err(err) => {
                error!("Audio context unavailable: {}", err);
                Err(err)
            }
        }
    }

    /// The context if it has already been opened. Never opens one.
    pub fn try_get(&self) -> Option<Arc<AudioContext>> {
        self.context.get().cloned()
    }

    pub fn state(&self) -> ContextState {
        if self.context.get().is_some() {
            ContextState::Ready
        } else {
            ContextState::Uninitialized
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn context_is_created_once_and_shared() {
        let (manager, _backend) = AudioContextManager::offline(EngineConfig::default(), 48_000);
        assert_eq!(manager.state(), ContextState::Uninitialized);
        assert!(manager.try_get().is_none());

        let first = manager.get().unwrap();
        let second = manager.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.state(), ContextState::Ready);
    }

    #[test]
    fn failed_open_is_retried_on_next_request() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let manager = AudioContextManager::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AudioError::AudioUnavailable("no device".into()))
        });

        assert!(matches!(manager.get(), Err(AudioError::AudioUnavailable(_))));
        assert!(manager.get().is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(manager.state(), ContextState::Uninitialized);
    }

    #[test]
    fn concurrent_first_use_opens_a_single_context() {
        let (manager, _backend) = AudioContextManager::offline(EngineConfig::default(), 48_000);
        let manager = Arc::new(manager);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                std::thread::spawn(move || manager.get().unwrap())
            })
            .collect();
        let contexts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(contexts.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
