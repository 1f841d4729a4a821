use super::RenderClock;
use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

/// A single automation event on a parameter timeline. Times are in seconds on
/// the context clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamEvent {
    SetValue { value: f32, time: f64 },
    LinearRamp { value: f32, time: f64 },
    CancelAndHold { time: f64 },
}

impl ParamEvent {
    fn time(&self) -> f64 {
        match *self {
            ParamEvent::SetValue { time, .. }
            | ParamEvent::LinearRamp { time, .. }
            | ParamEvent::CancelAndHold { time } => time,
        }
    }
}

/// Sorted list of value/ramp events. A ramp interpolates linearly from the
/// previous event's (value, time) to its own; before the first event the
/// default value applies.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTimeline {
    default_value: f32,
    events: Vec<ParamEvent>,
}

impl ParamTimeline {
    pub fn new(default_value: f32) -> Self {
        Self {
            default_value,
            events: Vec::with_capacity(8),
        }
    }

    pub fn default_value(&self) -> f32 {
        self.default_value
    }

    pub fn events(&self) -> &[ParamEvent] {
        &self.events
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) -> &mut Self {
        self.insert(ParamEvent::SetValue { value, time });
        self
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64) -> &mut Self {
        self.insert(ParamEvent::LinearRamp { value, time });
        self
    }

    /// Freezes the parameter at whatever value it has at `time` and drops every
    /// later event.
    pub fn cancel_and_hold_at_time(&mut self, time: f64) -> &mut Self {
        let held = self.value_at(time);
        self.events.retain(|event| event.time() < time);
        self.events.push(ParamEvent::SetValue { value: held, time });
        self
    }

    pub fn apply(&mut self, event: ParamEvent) {
        match event {
            ParamEvent::CancelAndHold { time } => {
                self.cancel_and_hold_at_time(time);
            }
            other => self.insert(other),
        }
    }

    fn insert(&mut self, event: ParamEvent) {
        let time = event.time();
        // Equal times keep insertion order.
        let index = self.events.partition_point(|e| e.time() <= time);
        self.events.insert(index, event);
    }

    pub fn value_at(&self, time: f64) -> f32 {
        // Index of the first event strictly after `time`.
        let next = self.events.partition_point(|e| e.time() <= time);

        let (prev_value, prev_time) = if next == 0 {
            (self.default_value, 0.0)
        } else {
            match self.events[next - 1] {
                ParamEvent::SetValue { value, time } | ParamEvent::LinearRamp { value, time } => {
                    (value, time)
                }
                // Hold events are resolved in `apply` and never stored.
                ParamEvent::CancelAndHold { time } => (self.default_value, time),
            }
        };

        match self.events.get(next) {
            Some(&ParamEvent::LinearRamp { value, time: end }) if end > prev_time => {
                let progress = ((time - prev_time) / (end - prev_time)).clamp(0.0, 1.0) as f32;
                prev_value + (value - prev_value) * progress
            }
            _ => prev_value,
        }
    }

    /// True when no event lies at or after `time`, i.e. the value is constant from there on.
    pub fn is_settled_at(&self, time: f64) -> bool {
        self.events.last().map_or(true, |e| e.time() < time)
    }

    /// Writes the per-sample parameter values for one block.
    pub fn fill(&self, values: &mut [f32], clock: &RenderClock) {
        for (i, value) in values.iter_mut().enumerate() {
            *value = self.value_at(clock.time_at(i));
        }
    }
}

/// Audio-thread side of a parameter: the timeline plus an inbox of events
/// posted from control threads.
pub struct AudioParam {
    timeline: ParamTimeline,
    inbox: Receiver<ParamEvent>,
    sender: Sender<ParamEvent>,
}

impl AudioParam {
    pub fn new(default_value: f32) -> Self {
        Self::from_timeline(ParamTimeline::new(default_value))
    }

    pub fn from_timeline(timeline: ParamTimeline) -> Self {
        let (sender, inbox) = crossbeam_channel::unbounded();
        Self {
            timeline,
            inbox,
            sender,
        }
    }

    /// Control-side handle for automating this parameter after it has been
    /// handed to the audio thread.
    pub fn handle(&self) -> ParamHandle {
        ParamHandle {
            sender: self.sender.clone(),
        }
    }

    pub fn timeline(&self) -> &ParamTimeline {
        &self.timeline
    }

    /// Applies pending control events. Called once per render quantum.
    pub fn sync(&mut self) {
        while let Ok(event) = self.inbox.try_recv() {
            debug!("Param event applied: {:?}", event);
            self.timeline.apply(event);
        }
    }

    pub fn value_at(&self, time: f64) -> f32 {
        self.timeline.value_at(time)
    }

    pub fn fill(&self, values: &mut [f32], clock: &RenderClock) {
        self.timeline.fill(values, clock);
    }
}

#[derive(Clone, Debug)]
pub struct ParamHandle {
    sender: Sender<ParamEvent>,
}

impl ParamHandle {
    pub fn set_value_at_time(&self, value: f32, time: f64) {
        self.post(ParamEvent::SetValue { value, time });
    }

    pub fn linear_ramp_to_value_at_time(&self, value: f32, time: f64) {
        self.post(ParamEvent::LinearRamp { value, time });
    }

    pub fn cancel_and_hold_at_time(&self, time: f64) {
        self.post(ParamEvent::CancelAndHold { time });
    }

    fn post(&self, event: ParamEvent) {
        // The parameter owns the receiver too, so this only fails once the node is gone.
        let _ = self.sender.send(event);
    }
}
