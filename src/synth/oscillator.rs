use super::waveform::{Waveform, WaveformGenerator};
use crate::graph::{Continuation, RenderClock, Source};
use std::f64::consts::TAU;

/// Periodic source that sounds between `start` and `stop` (context seconds).
pub struct Oscillator {
    generator: WaveformGenerator,
    frequency: f64,
    start: f64,
    stop: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f64, start: f64, stop: f64) -> Self {
        Self {
            generator: WaveformGenerator::new(waveform),
            frequency,
            start,
            stop,
        }
    }
}

impl Source for Oscillator {
    fn render(&mut self, output: &mut [f32], clock: &RenderClock) -> Continuation {
        for (i, sample) in output.iter_mut().enumerate() {
            let time = clock.time_at(i);
            if time < self.start || time >= self.stop {
                continue;
            }
            // Phase is derived from elapsed time so it never drifts.
            let cycles = (self.frequency * (time - self.start)).fract();
            *sample += self.generator.evaluate((cycles * TAU) as f32);
        }

        if clock.time_at(output.len()) >= self.stop {
            Continuation::Finished
        } else {
            Continuation::Continue
        }
    }
}
