mod common;

use approx::assert_abs_diff_eq;
use common::{offline, peak, wait_for, SAMPLE_RATE};
use sonicue::error::AudioError;
use sonicue::runtime::{AudioContextManager, Scheduler};
use sonicue::synth::ambient::{AMBIENT_PEAK_GAIN, RESTART_FADE_SECONDS};
use sonicue::synth::noise::DEFAULT_AMPLITUDE;
use sonicue::synth::{AmbientNoiseController, NoiseSession, RendererPath, SessionState};
use sonicue::{EngineConfig, OverlapPolicy};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(3);

fn wait_active(session: &NoiseSession) -> bool {
    wait_for(WAIT, || session.state() == SessionState::Active)
}

fn assert_envelope(session: &NoiseSession, duration_secs: f64) {
    let envelope = session.gain_envelope().expect("active session has an envelope");
    let start = session.start_time().expect("active session has a start time");
    let fade_in = 0.5f64.min(duration_secs / 2.0);
    assert_eq!(envelope.value_at(start), 0.0);
    assert_abs_diff_eq!(envelope.value_at(start + fade_in), AMBIENT_PEAK_GAIN, epsilon = 1e-6);
    assert_eq!(envelope.value_at(start + duration_secs), 0.0);
}

#[test]
fn worklet_session_plays_and_tears_down() {
    let (contexts, backend, scheduler) = offline(EngineConfig::default());
    let ambient = AmbientNoiseController::new(contexts.clone(), scheduler, &EngineConfig::default());

    let session = ambient.start(300);
    assert!(wait_active(&session));
    assert_eq!(session.renderer_path(), Some(RendererPath::Worklet));
    assert_envelope(&session, 0.3);

    let audio = backend.render(SAMPLE_RATE as usize / 5);
    let loudest = peak(&audio);
    assert!(loudest > 0.0);
    assert!(loudest <= AMBIENT_PEAK_GAIN * DEFAULT_AMPLITUDE + 1e-6, "peak {loudest}");

    assert!(session.wait_torn_down(WAIT));
    backend.render(256);
    let context = contexts.get().unwrap();
    assert_eq!(context.stats().active(), 0);
}

#[test]
fn disabled_worklet_falls_back_with_same_ramp() {
    let config = EngineConfig {
        audio_worklet: false,
        ..EngineConfig::default()
    };
    let (contexts, backend, scheduler) = offline(config.clone());
    let ambient = AmbientNoiseController::new(contexts.clone(), scheduler, &config);

    let session = ambient.start(2000);
    assert!(wait_active(&session));
    assert_eq!(session.renderer_path(), Some(RendererPath::Fallback));
    assert_envelope(&session, 2.0);

    // The fallback thread fills its buffer asynchronously.
    let heard = wait_for(WAIT, || peak(&backend.render(1024)) > 0.0);
    assert!(heard);
    assert!(peak(&backend.render(4096)) <= AMBIENT_PEAK_GAIN * DEFAULT_AMPLITUDE + 1e-6);
}

#[test]
fn unknown_module_falls_back() {
    let config = EngineConfig {
        noise_module: "processors/not-there".into(),
        ..EngineConfig::default()
    };
    let (contexts, backend, scheduler) = offline(config.clone());
    let ambient = AmbientNoiseController::new(contexts.clone(), scheduler, &config);

    let session = ambient.start(200);
    assert!(wait_active(&session));
    assert_eq!(session.renderer_path(), Some(RendererPath::Fallback));

    assert!(session.wait_torn_down(WAIT));
    backend.render(256);
    assert_eq!(contexts.get().unwrap().stats().active(), 0);
}

#[test]
fn fallback_thread_exits_after_teardown() {
    let config = EngineConfig {
        audio_worklet: false,
        ..EngineConfig::default()
    };
    let (contexts, _backend, scheduler) = offline(config.clone());
    let ambient = AmbientNoiseController::new(contexts, scheduler, &config);

    let session = ambient.start(150);
    assert!(wait_active(&session));
    assert_eq!(session.fallback_finished(), Some(false));

    assert!(session.wait_torn_down(WAIT));
    assert!(wait_for(WAIT, || session.fallback_finished() == Some(true)));
}

#[test]
fn worklet_session_has_no_fallback_thread() {
    let (contexts, _backend, scheduler) = offline(EngineConfig::default());
    let ambient = AmbientNoiseController::new(contexts, scheduler, &EngineConfig::default());

    let session = ambient.start(100);
    assert!(wait_active(&session));
    assert_eq!(session.fallback_finished(), None);
}

#[test]
fn restart_fades_previous_session_out() {
    let (contexts, backend, scheduler) = offline(EngineConfig::default());
    let ambient = AmbientNoiseController::new(contexts.clone(), scheduler, &EngineConfig::default());

    let first = ambient.start(10_000);
    assert!(wait_active(&first));
    // Past the 0.5 s fade-in, into the long fade-out.
    backend.render(SAMPLE_RATE as usize * 6 / 10);
    let context = contexts.get().unwrap();
    let now = context.current_time();
    let held = first.gain_envelope().unwrap().value_at(now);
    assert!(held > 0.09, "held gain {held}");

    let second = ambient.start(10_000);
    let envelope = first.gain_envelope().unwrap();
    assert_abs_diff_eq!(envelope.value_at(now), held, epsilon = 1e-6);
    assert_abs_diff_eq!(envelope.value_at(now + RESTART_FADE_SECONDS / 2.0), held / 2.0, epsilon = 1e-4);
    assert_eq!(envelope.value_at(now + RESTART_FADE_SECONDS), 0.0);
    assert_eq!(envelope.value_at(now + 1.0), 0.0);

    // Rendering past the fade lets the graph release the old node once it
    // has been torn down; only the new session stays connected.
    backend.render(SAMPLE_RATE as usize / 10);
    assert!(first.wait_torn_down(WAIT));
    assert!(wait_active(&second));
    backend.render(256);
    assert_eq!(context.stats().active(), 1);
}

#[test]
fn restart_replaces_running_session() {
    let (contexts, _backend, scheduler) = offline(EngineConfig::default());
    let ambient = AmbientNoiseController::new(contexts, scheduler, &EngineConfig::default());

    let first = ambient.start(10_000);
    assert!(wait_active(&first));
    let second = ambient.start(10_000);

    assert!(first.wait_torn_down(WAIT));
    assert!(wait_active(&second));
    assert!(Arc::ptr_eq(&ambient.current().unwrap(), &second));
}

#[test]
fn overlap_policy_keeps_both_sessions() {
    let config = EngineConfig {
        ambient_overlap: OverlapPolicy::Overlap,
        ..EngineConfig::default()
    };
    let (contexts, _backend, scheduler) = offline(config.clone());
    let ambient = AmbientNoiseController::new(contexts.clone(), scheduler, &config);

    let first = ambient.start(1500);
    let second = ambient.start(1500);
    assert!(wait_active(&first));
    assert!(wait_active(&second));
    assert_eq!(first.state(), SessionState::Active);
    assert_eq!(contexts.get().unwrap().stats().connected, 2);

    assert!(first.wait_torn_down(WAIT));
    assert!(second.wait_torn_down(WAIT));
}

#[test]
fn zero_duration_is_ignored() {
    let (contexts, _backend, scheduler) = offline(EngineConfig::default());
    let ambient = AmbientNoiseController::new(contexts.clone(), scheduler, &EngineConfig::default());

    let session = ambient.start(0);
    assert!(session.is_torn_down());
    assert_eq!(session.renderer_path(), None);
    assert!(contexts.try_get().is_none());
}

#[test]
fn missing_audio_abandons_quietly() {
    let contexts = Arc::new(AudioContextManager::new(|| {
        Err(AudioError::AudioUnavailable("no device".into()))
    }));
    let ambient = AmbientNoiseController::new(contexts, Arc::new(Scheduler::new()), &EngineConfig::default());

    let session = ambient.start(500);
    assert!(session.wait_torn_down(WAIT));
    assert_eq!(session.renderer_path(), None);
}
