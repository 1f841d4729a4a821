use crate::graph::ParamTimeline;

/// Anti-click attack applied to every tone.
pub const ATTACK_SECONDS: f64 = 0.01;

/// Gain envelope of a single tone: silent until `start`, linear rise to
/// `peak` over the attack, then a linear fall reaching zero exactly at `stop`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneEnvelope {
    pub peak: f32,
    pub start: f64,
    pub stop: f64,
}

impl ToneEnvelope {
    pub fn new(peak: f32, start: f64, duration_secs: f64) -> Self {
        Self {
            peak,
            start,
            stop: start + duration_secs,
        }
    }

    /// Time at which the attack reaches the peak. Tones shorter than two
    /// attacks split their length evenly between rise and fall.
    pub fn attack_end(&self) -> f64 {
        let duration = self.stop - self.start;
        self.start + ATTACK_SECONDS.min(duration / 2.0)
    }

    pub fn timeline(&self) -> ParamTimeline {
        let mut timeline = ParamTimeline::new(0.0);
        timeline
            .set_value_at_time(0.0, self.start)
            .linear_ramp_to_value_at_time(self.peak, self.attack_end())
            .linear_ramp_to_value_at_time(0.0, self.stop);
        timeline
    }
}
