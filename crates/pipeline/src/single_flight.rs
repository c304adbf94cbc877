//! Single-flight admission flag

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// At most one holder at a time; contenders are turned away, not queued.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the flag if it is free.
    ///
    /// The returned guard clears the flag when dropped, on every exit path.
    pub fn try_acquire(&self) -> Option<FlightGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Proof of holding the flight; releases on drop
#[derive(Debug)]
#[must_use = "dropping the guard releases the flight immediately"]
pub struct FlightGuard {
    busy: Arc<AtomicBool>,
}

impl FlightGuard {
    /// Release explicitly
    pub fn release(self) {}
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let flight = SingleFlight::new();
        let guard = flight.try_acquire().unwrap();
        assert!(flight.is_busy());
        assert!(flight.try_acquire().is_none());
        guard.release();
        assert!(!flight.is_busy());
        assert!(flight.try_acquire().is_some());
    }

    #[test]
    fn test_guard_released_on_panic() {
        let flight = SingleFlight::new();
        let guard = flight.try_acquire().unwrap();
        let result = std::thread::spawn(move || {
            let _guard = guard;
            panic!("detector fault");
        })
        .join();
        assert!(result.is_err());
        assert!(!flight.is_busy());
    }

    #[test]
    fn test_contended_acquire_admits_one() {
        let flight = SingleFlight::new();
        let barrier = Arc::new(std::sync::Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let flight = flight.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    flight.try_acquire()
                })
            })
            .collect();

        let winners: Vec<FlightGuard> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        // Guards stay alive until here, so no second winner is possible.
        assert_eq!(winners.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_at_most_one_holder(ops in prop::collection::vec(any::<bool>(), 1..64)) {
            // true = try_acquire, false = release whatever is held
            let flight = SingleFlight::new();
            let mut held: Option<FlightGuard> = None;
            for op in ops {
                if op {
                    let got = flight.try_acquire();
                    prop_assert!(!(held.is_some() && got.is_some()));
                    if held.is_none() {
                        prop_assert!(got.is_some());
                        held = got;
                    }
                } else {
                    held = None;
                }
                prop_assert_eq!(flight.is_busy(), held.is_some());
            }
        }
    }
}
