//! Automatable parameter with a timeline of value events.
//!
//! Models the subset of WebAudio `AudioParam` automation used by gain
//! envelopes: hold a value from a time, ramp linearly to a value by a time,
//! and cancel everything scheduled from a time on.

/// A scheduled change on a [`Param`] timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ParamEvent {
    /// Jump to `value` at `time` and hold it.
    SetValue { time: f64, value: f64 },
    /// Arrive at `value` at `time`, interpolating linearly from the previous event.
    LinearRamp { time: f64, value: f64 },
}

impl ParamEvent {
    fn time(&self) -> f64 {
        match *self {
            ParamEvent::SetValue { time, .. } | ParamEvent::LinearRamp { time, .. } => time,
        }
    }

    fn value(&self) -> f64 {
        match *self {
            ParamEvent::SetValue { value, .. } | ParamEvent::LinearRamp { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    /// Value used before the first event.
    value: f64,
    /// Events sorted by time; equal times keep insertion order.
    events: Vec<ParamEvent>,
}

impl Param {
    pub fn new(value: f64) -> Self {
        Param {
            value,
            events: Vec::new(),
        }
    }

    /// Set the intrinsic value. Scheduled events still take precedence once reached.
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn set_value_at_time(&mut self, value: f64, time: f64) {
        self.insert(ParamEvent::SetValue { time, value });
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f64, time: f64) {
        self.insert(ParamEvent::LinearRamp { time, value });
    }

    /// Drop every event scheduled at or after `time`.
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|e| e.time() < time);
    }

    /// Number of pending timeline events.
    pub fn scheduled_len(&self) -> usize {
        self.events.len()
    }

    /// Evaluate the parameter at time `t` (seconds).
    pub fn value_at(&self, t: f64) -> f64 {
        let next = self.events.iter().position(|e| e.time() > t);
        let prev = match next {
            Some(0) => None,
            Some(i) => Some(self.events[i - 1]),
            None => self.events.last().copied(),
        };

        if let Some(ParamEvent::LinearRamp { time: end, value: target }) =
            next.map(|i| self.events[i])
        {
            let (start, from) = match prev {
                Some(e) => (e.time(), e.value()),
                None => (0.0, self.value),
            };
            let span = end - start;
            if span <= 0.0 {
                return target;
            }
            let frac = ((t - start) / span).clamp(0.0, 1.0);
            return from + (target - from) * frac;
        }

        prev.map_or(self.value, |e| e.value())
    }

    fn insert(&mut self, event: ParamEvent) {
        let at = self
            .events
            .iter()
            .position(|e| e.time() > event.time())
            .unwrap_or(self.events.len());
        self.events.insert(at, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_intrinsic_value_without_events() {
        let mut p = Param::new(1.0);
        p.set_value(0.5);
        assert_eq!(p.value_at(0.0), 0.5);
        assert_eq!(p.value_at(100.0), 0.5);
    }

    #[test]
    fn linear_ramp_interpolates_from_anchor() {
        let mut p = Param::new(0.6);
        p.set_value_at_time(0.6, 1.0);
        p.linear_ramp_to_value_at_time(0.0, 2.0);

        assert!((p.value_at(0.5) - 0.6).abs() < 1e-12);
        assert!((p.value_at(1.0) - 0.6).abs() < 1e-12);
        assert!((p.value_at(1.5) - 0.3).abs() < 1e-12, "midpoint should be 0.3");
        assert_eq!(p.value_at(2.0), 0.0);
        assert_eq!(p.value_at(5.0), 0.0);
    }

    #[test]
    fn ramp_without_anchor_starts_from_intrinsic_value_at_zero() {
        let mut p = Param::new(1.0);
        p.linear_ramp_to_value_at_time(0.0, 2.0);
        assert!((p.value_at(1.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn cancel_removes_pending_events() {
        let mut p = Param::new(0.8);
        p.set_value_at_time(0.8, 1.0);
        p.linear_ramp_to_value_at_time(0.0, 3.0);
        p.cancel_scheduled_values(1.5);
        assert_eq!(p.scheduled_len(), 1);
        assert_eq!(p.value_at(2.5), 0.8, "ramp should be gone after cancel");
    }

    #[test]
    fn zero_length_ramp_jumps_to_target() {
        let mut p = Param::new(0.5);
        p.set_value_at_time(0.5, 1.0);
        p.linear_ramp_to_value_at_time(0.0, 1.0);
        assert_eq!(p.value_at(1.0), 0.0);
    }
}
