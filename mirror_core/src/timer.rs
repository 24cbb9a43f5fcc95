// Single-slot restartable countdown. Time is supplied by the host, so expiry is
// deterministic and testable without a browser event loop.

use crate::types::Timestamp;

#[derive(Debug, Clone)]
struct Pending<T> {
    deadline: Timestamp,
    payload: T,
}

/// At most one pending expiry. Re-arming replaces the pending one, so two
/// expiries of the same timer can never both fire.
#[derive(Debug, Clone)]
pub struct SessionTimer<T = ()> {
    pending: Option<Pending<T>>,
}

impl<T> SessionTimer<T> {
    pub fn new() -> Self {
        SessionTimer { pending: None }
    }

    /// Schedule `payload` to fire `duration_ms` after `now`.
    /// Returns true if a pending expiry was cancelled.
    pub fn arm(&mut self, now: Timestamp, duration_ms: u64, payload: T) -> bool {
        self.pending
            .replace(Pending {
                deadline: now.after_millis(duration_ms),
                payload,
            })
            .is_some()
    }

    /// Cancel the pending expiry. Returns true if there was one.
    pub fn disarm(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Timestamp> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Take the payload if the deadline has been reached. Fires at most once per arm.
    pub fn poll(&mut self, now: Timestamp) -> Option<T> {
        let due = self.pending.as_ref().is_some_and(|p| p.deadline <= now);
        if due {
            self.pending.take().map(|p| p.payload)
        } else {
            None
        }
    }
}

impl<T> Default for SessionTimer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(v: u64) -> Timestamp {
        Timestamp::from_millis(v)
    }

    #[test]
    fn fires_once_at_deadline() {
        let mut timer = SessionTimer::new();
        timer.arm(ms(0), 20_000, ());
        assert_eq!(timer.poll(ms(19_999)), None);
        assert_eq!(timer.poll(ms(20_000)), Some(()));
        assert_eq!(timer.poll(ms(40_000)), None);
        assert!(!timer.is_armed());
    }

    #[test]
    fn rearm_cancels_prior() {
        let mut timer = SessionTimer::new();
        assert!(!timer.arm(ms(0), 30_000, "first"));
        assert!(timer.arm(ms(1_000), 20_000, "second"));

        let fired: Vec<_> = (0..=60)
            .filter_map(|s| timer.poll(ms(s * 1_000)))
            .collect();
        assert_eq!(fired, vec!["second"]);
    }

    #[test]
    fn rearm_pushes_deadline_back() {
        let mut timer = SessionTimer::new();
        timer.arm(ms(0), 20_000, ());
        timer.arm(ms(15_000), 20_000, ());
        assert_eq!(timer.poll(ms(20_000)), None);
        assert_eq!(timer.deadline(), Some(ms(35_000)));
    }

    #[test]
    fn disarm_prevents_expiry() {
        let mut timer = SessionTimer::new();
        timer.arm(ms(0), 4_000, ());
        assert!(timer.disarm());
        assert!(!timer.disarm());
        assert_eq!(timer.poll(ms(10_000)), None);
    }

    proptest! {
        /// Re-arming before expiry: only the last payload fires, once, at the last deadline.
        #[test]
        fn only_last_arm_fires(arms in prop::collection::vec((0u64..10_000, 10_001u64..30_000), 1..8)) {
            let mut timer = SessionTimer::new();
            let mut now = 0u64;
            let mut expected = 0;
            for (i, (gap, duration)) in arms.iter().enumerate() {
                now += gap;
                prop_assert_eq!(timer.poll(ms(now)), None);
                timer.arm(ms(now), *duration, i);
                expected = i;
            }
            let deadline = timer.deadline().unwrap();
            let mut fired = Vec::new();
            for t in (0..=now + 40_000).step_by(500) {
                if let Some(p) = timer.poll(ms(t)) {
                    prop_assert!(ms(t) >= deadline);
                    fired.push(p);
                }
            }
            prop_assert_eq!(fired, vec![expected]);
        }
    }
}
