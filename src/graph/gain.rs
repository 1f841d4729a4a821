use super::{AudioParam, Continuation, RenderClock, Source, RENDER_QUANTUM};

/// Multiplies its input by a time-varying gain.
pub struct GainNode {
    input: Box<dyn Source>,
    gain: AudioParam,
    scratch: [f32; RENDER_QUANTUM],
    gains: [f32; RENDER_QUANTUM],
}

impl GainNode {
    pub fn new(input: Box<dyn Source>, gain: AudioParam) -> Self {
        Self {
            input,
            gain,
            scratch: [0.0; RENDER_QUANTUM],
            gains: [0.0; RENDER_QUANTUM],
        }
    }

    pub fn gain(&self) -> &AudioParam {
        &self.gain
    }
}

impl Source for GainNode {
    fn render(&mut self, output: &mut [f32], clock: &RenderClock) -> Continuation {
        self.gain.sync();
        let mut state = Continuation::Continue;
        let mut offset = 0;
        for block in output.chunks_mut(RENDER_QUANTUM) {
            let n = block.len();
            let block_clock = clock.advanced(offset);
            let scratch = &mut self.scratch[..n];
            scratch.fill(0.0);
            state = self.input.render(scratch, &block_clock);

            let gains = &mut self.gains[..n];
            self.gain.fill(gains, &block_clock);
            for ((out, sample), gain) in block.iter_mut().zip(scratch.iter()).zip(gains.iter()) {
                *out += sample * gain;
            }

            offset += n;
            if state == Continuation::Finished {
                break;
            }
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ParamTimeline;

    struct Ones;

    impl Source for Ones {
        fn render(&mut self, output: &mut [f32], _clock: &RenderClock) -> Continuation {
            for sample in output.iter_mut() {
                *sample += 1.0;
            }
            Continuation::Continue
        }
    }

    #[test]
    fn gain_follows_the_automation_curve() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline
            .set_value_at_time(0.0, 0.0)
            .linear_ramp_to_value_at_time(1.0, 1.0);
        let mut node = GainNode::new(Box::new(Ones), AudioParam::from_timeline(timeline));

        // 4 Hz "sample rate" keeps the numbers readable.
        let mut out = vec![0.0; 5];
        node.render(&mut out, &RenderClock::new(0, 4.0));
        assert_eq!(out, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn output_is_added_not_overwritten() {
        let mut node = GainNode::new(Box::new(Ones), AudioParam::new(0.5));
        let mut out = vec![1.0; 300];
        node.render(&mut out, &RenderClock::new(0, 48_000.0));
        assert!(out.iter().all(|&s| s == 1.5));
    }
}
