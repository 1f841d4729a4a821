use super::envelope::ToneEnvelope;
use super::oscillator::Oscillator;
use super::waveform::Waveform;
use crate::error::AudioError;
use crate::graph::{AudioParam, GainNode};
use crate::runtime::AudioContextManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

/// One enveloped tone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneSpec {
    /// Hz
    pub frequency: f64,
    pub duration_ms: u32,
    pub waveform: Waveform,
    /// Peak gain, 0.0 to 1.0
    pub peak_volume: f32,
}

impl ToneSpec {
    pub const fn new(frequency: f64, duration_ms: u32, waveform: Waveform, peak_volume: f32) -> Self {
        Self {
            frequency,
            duration_ms,
            waveform,
            peak_volume,
        }
    }

    pub const fn sine(frequency: f64, duration_ms: u32, peak_volume: f32) -> Self {
        Self::new(frequency, duration_ms, Waveform::Sine, peak_volume)
    }

    pub fn with_frequency(self, frequency: f64) -> Self {
        Self { frequency, ..self }
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    pub fn validate(&self) -> Result<(), AudioError> {
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(AudioError::RenderFailure(format!(
                "tone frequency must be positive, got {}",
                self.frequency
            )));
        }
        if self.duration_ms == 0 {
            return Err(AudioError::RenderFailure("tone duration must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.peak_volume) {
            return Err(AudioError::RenderFailure(format!(
                "tone volume must be within 0.0..=1.0, got {}",
                self.peak_volume
            )));
        }
        Ok(())
    }
}

/// Where a tone landed on the context clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledTone {
    pub frequency: f64,
    /// Context seconds
    pub start: f64,
    pub stop: f64,
}

/// Plays single tones on the shared context. Each call allocates its own
/// oscillator and gain node, released by the graph once the tone has stopped.
#[derive(Clone)]
pub struct ToneSynthesizer {
    contexts: Arc<AudioContextManager>,
}

impl ToneSynthesizer {
    pub fn new(contexts: Arc<AudioContextManager>) -> Self {
        Self { contexts }
    }

    /// Schedules `spec` to start `start_offset_ms` from now. Failures are
    /// logged and leave the tone silent.
    pub fn play(&self, spec: &ToneSpec, start_offset_ms: f64) -> Option<ScheduledTone> {
        match self.try_play(spec, start_offset_ms) {
            Ok(scheduled) => Some(scheduled),
            Err(err) => {
                error!("Failed to play tone: {}", err);
                None
            }
        }
    }

    pub fn try_play(&self, spec: &ToneSpec, start_offset_ms: f64) -> Result<ScheduledTone, AudioError> {
        spec.validate()?;
        if !(start_offset_ms.is_finite() && start_offset_ms >= 0.0) {
            return Err(AudioError::RenderFailure(format!(
                "start offset must be a non-negative number of milliseconds, got {}",
                start_offset_ms
            )));
        }

        let context = self.contexts.get()?;
        let start = context.current_time() + start_offset_ms / 1000.0;
        let envelope = ToneEnvelope::new(spec.peak_volume, start, spec.duration_secs());

        let oscillator = Oscillator::new(spec.waveform, spec.frequency, start, envelope.stop);
        let gain = AudioParam::from_timeline(envelope.timeline());
        context.connect(Box::new(GainNode::new(Box::new(oscillator), gain)));

        debug!(
            "Tone {:.2} Hz {} scheduled at {:.3}s for {} ms",
            spec.frequency, spec.waveform, start, spec.duration_ms
        );
        Ok(ScheduledTone {
            frequency: spec.frequency,
            start,
            stop: envelope.stop,
        })
    }
}
