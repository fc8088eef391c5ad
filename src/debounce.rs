//! Per-video suppression of redundant gear checks.
//!
//! The detector fires on every sampled frame a person is visible in. Checking
//! gear on each of those frames would report the same person many times per
//! second, so a gear check only runs when a person is present AND at least
//! `interval` seconds of video time have passed since the previous check.
//!
//! The window restarts on every check that runs, whether it found a violation
//! or not. A clean check therefore suppresses a violation that appears within
//! the following interval.
//!
//! The debouncer never touches a model: the caller supplies the person flag
//! and a closure that performs the gear check. One instance per video, fed
//! frames in non-decreasing presentation time.

use anyhow::Result;

/// Default minimum video-time gap between gear checks, in seconds.
pub const DEFAULT_DEBOUNCE_INTERVAL_S: f64 = 10.0;

/// Outcome of one evaluated frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// No person in the frame; state unchanged.
    NoPerson,
    /// Person present but still inside the window; state unchanged.
    Suppressed,
    /// Gear check ran and found nothing to report.
    Clean,
    /// Gear check ran and found a violation with this description.
    Violation(String),
}

impl Decision {
    /// True when the gear check ran for this frame.
    pub fn checked(&self) -> bool {
        matches!(self, Decision::Clean | Decision::Violation(_))
    }
}

#[derive(Clone, Debug)]
pub struct ViolationDebouncer {
    interval: f64,
    last_check_time: f64,
    violations_saved: u64,
}

impl ViolationDebouncer {
    /// The first person detection always triggers a check: the last check
    /// time starts one full interval before zero.
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            last_check_time: -interval,
            violations_saved: 0,
        }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn last_check_time(&self) -> f64 {
        self.last_check_time
    }

    pub fn violations_saved(&self) -> u64 {
        self.violations_saved
    }

    /// True if a check at `current_time` would pass the interval gate.
    pub fn is_due(&self, current_time: f64) -> bool {
        current_time - self.last_check_time >= self.interval
    }

    /// Evaluate one sampled frame.
    ///
    /// `gear_check` runs only when the gate opens. It returns the violation
    /// description, or `None` when the gear is in order. If it fails, the
    /// error is returned and the window is left where it was.
    pub fn evaluate<F>(
        &mut self,
        current_time: f64,
        person_present: bool,
        gear_check: F,
    ) -> Result<Decision>
    where
        F: FnOnce() -> Result<Option<String>>,
    {
        if !person_present {
            return Ok(Decision::NoPerson);
        }
        if !self.is_due(current_time) {
            return Ok(Decision::Suppressed);
        }

        let outcome = gear_check()?;
        self.last_check_time = current_time;

        Ok(match outcome {
            Some(description) => Decision::Violation(description),
            None => Decision::Clean,
        })
    }

    /// Count a violation that reached the sink.
    pub fn record_saved(&mut self) {
        self.violations_saved += 1;
    }
}

impl Default for ViolationDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_INTERVAL_S)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn violation() -> Result<Option<String>> {
        Ok(Some("helmet missing".to_string()))
    }

    fn clean() -> Result<Option<String>> {
        Ok(None)
    }

    #[test]
    fn first_detection_always_checks() {
        let mut d = ViolationDebouncer::default();
        assert_eq!(d.last_check_time(), -10.0);
        assert!(d.evaluate(0.0, true, clean).unwrap().checked());
    }

    #[test]
    fn checks_at_ten_second_spacing() {
        let mut d = ViolationDebouncer::default();
        let checks = Cell::new(0);
        for t in [0.0, 10.0, 20.0] {
            let decision = d
                .evaluate(t, true, || {
                    checks.set(checks.get() + 1);
                    violation()
                })
                .unwrap();
            assert_eq!(decision, Decision::Violation("helmet missing".into()));
        }
        assert_eq!(checks.get(), 3);
    }

    #[test]
    fn check_inside_window_is_suppressed() {
        let mut d = ViolationDebouncer::default();
        let checks = Cell::new(0);
        let mut run = |t: f64| {
            d.evaluate(t, true, || {
                checks.set(checks.get() + 1);
                violation()
            })
            .unwrap()
        };
        assert!(run(0.0).checked());
        assert_eq!(run(6.0), Decision::Suppressed);
        assert_eq!(checks.get(), 1);
    }

    #[test]
    fn no_person_never_checks_or_moves_window() {
        let mut d = ViolationDebouncer::default();
        let decision = d
            .evaluate(3.0, false, || panic!("gear check must not run"))
            .unwrap();
        assert_eq!(decision, Decision::NoPerson);
        assert_eq!(d.last_check_time(), -10.0);
    }

    #[test]
    fn clean_check_consumes_the_window() {
        let mut d = ViolationDebouncer::default();
        assert_eq!(d.evaluate(0.0, true, clean).unwrap(), Decision::Clean);
        assert_eq!(d.last_check_time(), 0.0);
        // A violation 5s later is suppressed because the clean check restarted the window.
        assert_eq!(
            d.evaluate(5.0, true, violation).unwrap(),
            Decision::Suppressed
        );
        assert!(d.evaluate(10.0, true, violation).unwrap().checked());
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let mut d = ViolationDebouncer::new(10.0);
        d.evaluate(2.0, true, clean).unwrap();
        assert!(!d.is_due(11.999));
        assert!(d.is_due(12.0));
    }

    #[test]
    fn failed_check_leaves_window_untouched() {
        let mut d = ViolationDebouncer::default();
        d.evaluate(0.0, true, clean).unwrap();
        let err = d.evaluate(10.0, true, || Err(anyhow::anyhow!("model crashed")));
        assert!(err.is_err());
        assert_eq!(d.last_check_time(), 0.0);
    }

    #[test]
    fn custom_interval_is_respected() {
        let mut d = ViolationDebouncer::new(2.5);
        assert!(d.evaluate(0.0, true, violation).unwrap().checked());
        assert_eq!(d.evaluate(2.0, true, violation).unwrap(), Decision::Suppressed);
        assert!(d.evaluate(2.5, true, violation).unwrap().checked());
    }

    #[test]
    fn saved_counter_increments() {
        let mut d = ViolationDebouncer::default();
        d.record_saved();
        d.record_saved();
        assert_eq!(d.violations_saved(), 2);
    }
}
