#![allow(dead_code)]

use sonicue::audio::OfflineBackend;
use sonicue::runtime::{AudioContextManager, Scheduler};
use sonicue::EngineConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const SAMPLE_RATE: u32 = 48_000;

pub fn offline(config: EngineConfig) -> (Arc<AudioContextManager>, OfflineBackend, Arc<Scheduler>) {
    let (manager, backend) = AudioContextManager::offline(config, SAMPLE_RATE);
    (Arc::new(manager), backend, Arc::new(Scheduler::new()))
}

/// Polls `condition` every few milliseconds until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}
