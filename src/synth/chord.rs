use super::tone::{ScheduledTone, ToneSpec, ToneSynthesizer};
use serde::{Deserialize, Serialize};

/// Offset between successive chord notes.
pub const CHORD_STAGGER_MS: f64 = 80.0;

/// Frequencies sharing one tone template, played as a quick arpeggio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSpec {
    pub frequencies: Vec<f64>,
    /// Duration, waveform and volume for every note; its frequency is ignored.
    pub template: ToneSpec,
}

impl ChordSpec {
    pub fn new(frequencies: impl Into<Vec<f64>>, template: ToneSpec) -> Self {
        Self {
            frequencies: frequencies.into(),
            template,
        }
    }

    /// Each note with its start offset in milliseconds, in play order.
    pub fn notes(&self) -> impl Iterator<Item = (ToneSpec, f64)> + '_ {
        self.frequencies
            .iter()
            .enumerate()
            .map(|(i, &frequency)| (self.template.with_frequency(frequency), i as f64 * CHORD_STAGGER_MS))
    }

    /// From the first note's start to the last note's end.
    pub fn span_ms(&self) -> f64 {
        match self.frequencies.len() {
            0 => 0.0,
            n => CHORD_STAGGER_MS * (n - 1) as f64 + self.template.duration_ms as f64,
        }
    }
}

/// Fans a chord out into staggered tones. Holds no state of its own.
#[derive(Clone)]
pub struct ChordSequencer {
    tones: ToneSynthesizer,
}

impl ChordSequencer {
    pub fn new(tones: ToneSynthesizer) -> Self {
        Self { tones }
    }

    pub fn play(&self, frequencies: &[f64], template: &ToneSpec) -> Vec<ScheduledTone> {
        self.play_chord(&ChordSpec::new(frequencies, *template))
    }

    /// Returns the notes that were actually scheduled.
    pub fn play_chord(&self, chord: &ChordSpec) -> Vec<ScheduledTone> {
        chord
            .notes()
            .filter_map(|(spec, offset_ms)| self.tones.play(&spec, offset_ms))
            .collect()
    }
}
