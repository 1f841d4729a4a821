use super::tone::{ToneSpec, ToneSynthesizer};
use crate::error::AudioError;
use crate::runtime::Scheduler;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BPM: f64 = 70.0;
pub const DEFAULT_HEARTBEAT_MS: u64 = 1000;
/// Delay of the second lobe after the first within one beat.
pub const SECONDARY_DELAY_MS: f64 = 120.0;

pub const PRIMARY_BEAT: ToneSpec = ToneSpec::sine(150.0, 100, 0.3);
pub const SECONDARY_BEAT: ToneSpec = ToneSpec::sine(150.0, 80, 0.2);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    pub offset_ms: f64,
    pub tone: ToneSpec,
}

/// Longest pattern a single call may schedule.
pub const MAX_HEARTBEAT_MS: u64 = 60_000;
/// Upper bound on beats per call, whatever the tempo.
pub const MAX_BEATS: usize = 600;

/// Double-beat events for `bpm` over `total_ms`, in schedule order.
/// At very high tempos a secondary lobe may land after the next primary; that
/// overlap is kept.
pub fn heartbeat_plan(bpm: f64, total_ms: u64) -> Result<Vec<BeatEvent>, AudioError> {
    if !(bpm.is_finite() && bpm > 0.0) {
        return Err(AudioError::RenderFailure(format!("invalid heartbeat tempo {bpm} bpm")));
    }
    if total_ms > MAX_HEARTBEAT_MS {
        return Err(AudioError::RenderFailure(format!(
            "heartbeat of {total_ms} ms exceeds {MAX_HEARTBEAT_MS} ms"
        )));
    }
    let interval = 60_000.0 / bpm;
    let beats = (total_ms as f64 / interval).floor();
    if beats > MAX_BEATS as f64 {
        return Err(AudioError::RenderFailure(format!(
            "heartbeat of {beats} beats exceeds {MAX_BEATS}"
        )));
    }
    let beats = beats as usize;

    let mut plan = Vec::with_capacity(beats * 2);
    for i in 0..beats {
        let offset = i as f64 * interval;
        plan.push(BeatEvent {
            offset_ms: offset,
            tone: PRIMARY_BEAT,
        });
        plan.push(BeatEvent {
            offset_ms: offset + SECONDARY_DELAY_MS,
            tone: SECONDARY_BEAT,
        });
    }
    Ok(plan)
}

/// Heartbeat driven by coarse deferred timers.
#[derive(Clone)]
pub struct RhythmScheduler {
    tones: ToneSynthesizer,
    scheduler: Arc<Scheduler>,
}

impl RhythmScheduler {
    pub fn new(tones: ToneSynthesizer, scheduler: Arc<Scheduler>) -> Self {
        Self { tones, scheduler }
    }

    /// Schedules the whole pattern and returns at once with the beat count.
    /// Rejected patterns are logged and play nothing.
    pub fn play(&self, bpm: f64, total_ms: u64) -> usize {
        let plan = match heartbeat_plan(bpm, total_ms) {
            Ok(plan) => plan,
            Err(err) => {
                warn!("Ignoring heartbeat: {}", err);
                return 0;
            }
        };

        for event in &plan {
            let tones = self.tones.clone();
            let tone = event.tone;
            self.scheduler
                .schedule(Duration::from_secs_f64(event.offset_ms / 1000.0), move || {
                    tones.play(&tone, 0.0);
                });
        }
        let beats = plan.len() / 2;
        debug!("Heartbeat: {} beat(s) at {} bpm", beats, bpm);
        beats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(plan: &[BeatEvent]) -> Vec<f64> {
        plan.iter().map(|e| e.offset_ms).collect()
    }

    #[test]
    fn default_heartbeat_is_a_single_beat() {
        let plan = heartbeat_plan(DEFAULT_BPM, DEFAULT_HEARTBEAT_MS).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(offsets(&plan), vec![0.0, 120.0]);
        assert_eq!(plan[0].tone, PRIMARY_BEAT);
        assert_eq!(plan[1].tone, SECONDARY_BEAT);
    }

    #[test]
    fn one_twenty_bpm_over_two_seconds_gives_four_beats() {
        let plan = heartbeat_plan(120.0, 2000).unwrap();
        assert_eq!(
            offsets(&plan),
            vec![0.0, 120.0, 500.0, 620.0, 1000.0, 1120.0, 1500.0, 1620.0]
        );
    }

    #[test]
    fn fast_tempo_overlaps_lobes() {
        // 400 bpm: 150 ms interval, second lobe of beat 0 lands after beat 1 starts.
        let plan = heartbeat_plan(400.0, 300).unwrap();
        assert_eq!(offsets(&plan), vec![0.0, 120.0, 150.0, 270.0]);
    }

    #[test]
    fn invalid_tempo_schedules_nothing() {
        assert!(heartbeat_plan(0.0, 1000).is_err());
        assert!(heartbeat_plan(-60.0, 1000).is_err());
        assert!(heartbeat_plan(f64::NAN, 1000).is_err());
        assert!(heartbeat_plan(f64::INFINITY, 1000).is_err());
    }

    #[test]
    fn pattern_shorter_than_one_beat_is_empty() {
        assert_eq!(heartbeat_plan(60.0, 500).unwrap(), Vec::new());
    }

    #[test]
    fn oversized_patterns_are_rejected_without_allocating() {
        assert!(matches!(
            heartbeat_plan(70.0, u64::MAX),
            Err(AudioError::RenderFailure(_))
        ));
        assert!(heartbeat_plan(1_000_000.0, 60_000).is_err());
        assert!(heartbeat_plan(1e300, 1).is_err());
    }

    #[test]
    fn largest_allowed_pattern_is_planned() {
        // 600 bpm for a minute is exactly the beat cap.
        let plan = heartbeat_plan(600.0, MAX_HEARTBEAT_MS).unwrap();
        assert_eq!(plan.len(), MAX_BEATS * 2);
    }

    #[test]
    fn oversized_heartbeat_is_a_silent_no_op() {
        use crate::config::EngineConfig;
        use crate::runtime::AudioContextManager;

        let (manager, _backend) = AudioContextManager::offline(EngineConfig::default(), 48_000);
        let manager = Arc::new(manager);
        let rhythm = RhythmScheduler::new(ToneSynthesizer::new(manager.clone()), Arc::new(Scheduler::new()));
        assert_eq!(rhythm.play(70.0, u64::MAX), 0);
        assert_eq!(rhythm.play(1_000_000.0, 60_000), 0);
        assert!(manager.try_get().is_none());
    }
}
