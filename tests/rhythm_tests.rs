mod common;

use common::{offline, wait_for};
use sonicue::synth::{RhythmScheduler, ToneSynthesizer};
use sonicue::EngineConfig;
use std::time::Duration;

#[test]
fn default_heartbeat_schedules_one_double_beat() {
    let (contexts, _backend, scheduler) = offline(EngineConfig::default());
    let rhythm = RhythmScheduler::new(ToneSynthesizer::new(contexts.clone()), scheduler);

    assert_eq!(rhythm.play(70.0, 1000), 1);
    let both_lobes = wait_for(Duration::from_secs(3), || {
        contexts.try_get().map(|c| c.stats().connected) == Some(2)
    });
    assert!(both_lobes);
}

#[test]
fn play_returns_before_the_pattern_finishes() {
    let (contexts, _backend, scheduler) = offline(EngineConfig::default());
    let rhythm = RhythmScheduler::new(ToneSynthesizer::new(contexts.clone()), scheduler);

    assert_eq!(rhythm.play(120.0, 2000), 4);
    // The last lobe is due 1.62 s in; nowhere near that many tones exist yet.
    let connected = contexts.try_get().map(|c| c.stats().connected).unwrap_or(0);
    assert!(connected < 8);

    let all_lobes = wait_for(Duration::from_secs(4), || {
        contexts.try_get().map(|c| c.stats().connected) == Some(8)
    });
    assert!(all_lobes);
}

#[test]
fn invalid_tempo_plays_nothing() {
    let (contexts, _backend, scheduler) = offline(EngineConfig::default());
    let rhythm = RhythmScheduler::new(ToneSynthesizer::new(contexts.clone()), scheduler);

    assert_eq!(rhythm.play(0.0, 1000), 0);
    assert_eq!(rhythm.play(f64::INFINITY, 1000), 0);
    std::thread::sleep(Duration::from_millis(50));
    assert!(contexts.try_get().is_none());
}
