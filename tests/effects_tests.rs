mod common;

use approx::assert_abs_diff_eq;
use common::{offline, peak, SAMPLE_RATE};
use sonicue::error::AudioError;
use sonicue::runtime::{AudioContextManager, ContextState};
use sonicue::synth::{EffectKind, EffectSpec, SoundEffectRegistry};
use sonicue::{EngineConfig, ToneSpec};
use std::sync::Arc;

#[test]
fn conversation_created_plays_staggered_triad() {
    let (contexts, _backend, _scheduler) = offline(EngineConfig::default());
    let registry = SoundEffectRegistry::new(contexts.clone());

    let notes = registry.play(EffectKind::ConversationCreated);
    let frequencies: Vec<f64> = notes.iter().map(|n| n.frequency).collect();
    assert_eq!(frequencies, vec![523.25, 659.25, 783.99]);
    for (i, note) in notes.iter().enumerate() {
        assert_abs_diff_eq!(note.start, i as f64 * 0.08, epsilon = 1e-9);
        assert_abs_diff_eq!(note.stop - note.start, 0.2, epsilon = 1e-9);
    }

    match registry.lookup(EffectKind::ConversationCreated) {
        Some(EffectSpec::Chord(chord)) => {
            assert_eq!(chord.template.duration_ms, 200);
            assert_eq!(chord.template.peak_volume, 0.3);
        }
        other => panic!("unexpected spec {other:?}"),
    }
    assert_eq!(contexts.get().unwrap().stats().connected, 3);
}

#[test]
fn single_tone_effect_renders_and_is_released() {
    let (contexts, backend, _scheduler) = offline(EngineConfig::default());
    let registry = SoundEffectRegistry::new(contexts.clone());

    let notes = registry.play(EffectKind::ButtonClick);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].frequency, 440.0);

    let audio = backend.render(SAMPLE_RATE as usize / 10);
    let loudest = peak(&audio);
    assert!(loudest > 0.05 && loudest <= 0.1 + 1e-6, "peak {loudest}");
    assert_eq!(contexts.get().unwrap().stats().active(), 0);
}

#[test]
fn unmapped_kind_is_a_no_op() {
    let (contexts, _backend, _scheduler) = offline(EngineConfig::default());
    let mut registry = SoundEffectRegistry::new(contexts.clone());
    registry.remove(EffectKind::Notification);

    assert!(registry.play(EffectKind::Notification).is_empty());
    assert_eq!(contexts.state(), ContextState::Uninitialized);
}

#[test]
fn unknown_name_is_a_no_op() {
    let (contexts, _backend, _scheduler) = offline(EngineConfig::default());
    let registry = SoundEffectRegistry::new(contexts.clone());

    assert!(registry.play_named("airhorn").is_empty());
    assert_eq!(registry.play_named("message-sent").len(), 1);
}

#[test]
fn custom_effects_can_replace_defaults() {
    let (contexts, _backend, _scheduler) = offline(EngineConfig::default());
    let mut registry = SoundEffectRegistry::empty(contexts);
    assert!(registry.play(EffectKind::MessageSent).is_empty());

    registry.insert(EffectKind::MessageSent, ToneSpec::sine(880.0, 50, 0.1));
    let notes = registry.play(EffectKind::MessageSent);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].frequency, 880.0);
}

#[test]
fn unavailable_audio_is_silent() {
    let contexts = Arc::new(AudioContextManager::new(|| {
        Err(AudioError::AudioUnavailable("permission denied".into()))
    }));
    let registry = SoundEffectRegistry::new(contexts.clone());

    for kind in EffectKind::ALL {
        assert!(registry.play(kind).is_empty());
    }
    assert_eq!(contexts.state(), ContextState::Uninitialized);
}
