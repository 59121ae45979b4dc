//! Single-flight build gate.
//!
//! # Design Decisions
//! - One in-flight build per key; later callers for the same key block until
//!   it finishes and receive a clone of its outcome
//! - A build that panics is abandoned; its waiters retry with their own
//!   build closure instead of hanging
//! - Builds are never cancelled once started

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

enum FlightState<T> {
    Running,
    Done(T),
    Abandoned,
}

struct Flight<T> {
    state: Mutex<FlightState<T>>,
    finished: Condvar,
}

/// Serializes builds per key.
pub struct BuildGate<T> {
    in_flight: Mutex<HashMap<String, Arc<Flight<T>>>>,
}

impl<T> std::fmt::Debug for BuildGate<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildGate")
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}

impl<T> Default for BuildGate<T> {
    fn default() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> BuildGate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `build` unless a build for `key` is in flight, in which case wait
    /// for that build and return its outcome.
    pub fn run<F>(&self, key: &str, build: F) -> T
    where
        F: FnOnce() -> T,
    {
        let mut build = Some(build);
        loop {
            let (flight, leader) = {
                let mut in_flight = self.in_flight.lock();
                match in_flight.get(key) {
                    Some(flight) => (flight.clone(), false),
                    None => {
                        let flight = Arc::new(Flight {
                            state: Mutex::new(FlightState::Running),
                            finished: Condvar::new(),
                        });
                        in_flight.insert(key.to_string(), flight.clone());
                        (flight, true)
                    }
                }
            };

            if leader {
                if let Some(build) = build.take() {
                    return self.lead(key, &flight, build);
                }
            }

            let mut state = flight.state.lock();
            loop {
                match &*state {
                    FlightState::Running => flight.finished.wait(&mut state),
                    FlightState::Done(outcome) => return outcome.clone(),
                    FlightState::Abandoned => break,
                }
            }
            tracing::debug!(key = %key, "In-flight build abandoned, retrying");
        }
    }

    fn lead<F>(&self, key: &str, flight: &Arc<Flight<T>>, build: F) -> T
    where
        F: FnOnce() -> T,
    {
        let mut guard = LeaderGuard {
            gate: self,
            key,
            flight,
            completed: false,
        };
        let outcome = build();
        *flight.state.lock() = FlightState::Done(outcome.clone());
        guard.completed = true;
        outcome
    }

    /// Number of keys with a build in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }
}

/// Releases the key and wakes waiters, also when the build unwinds.
struct LeaderGuard<'a, T> {
    gate: &'a BuildGate<T>,
    key: &'a str,
    flight: &'a Arc<Flight<T>>,
    completed: bool,
}

impl<T> Drop for LeaderGuard<'_, T> {
    fn drop(&mut self) {
        if !self.completed {
            *self.flight.state.lock() = FlightState::Abandoned;
        }
        let mut in_flight = self.gate.in_flight.lock();
        if in_flight.get(self.key).is_some_and(|f| Arc::ptr_eq(f, self.flight)) {
            in_flight.remove(self.key);
        }
        drop(in_flight);
        self.flight.finished.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_concurrent_callers_share_one_build() {
        let gate = Arc::new(BuildGate::<Arc<String>>::new());
        let builds = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                let builds = builds.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    gate.run("model", || {
                        builds.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        Arc::new("built".to_string())
                    })
                })
            })
            .collect();

        let results: Vec<Arc<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(builds.load(Ordering::SeqCst) < 8);
        assert_eq!(gate.in_flight(), 0);
        assert!(results.iter().all(|r| r.as_str() == "built"));
    }

    #[test]
    fn test_sequential_calls_rebuild() {
        let gate = BuildGate::<usize>::new();
        assert_eq!(gate.run("k", || 1), 1);
        assert_eq!(gate.run("k", || 2), 2);
    }

    #[test]
    fn test_panicking_build_releases_key() {
        let gate = Arc::new(BuildGate::<usize>::new());
        let g = gate.clone();
        let result = thread::spawn(move || g.run("k", || panic!("boom"))).join();
        assert!(result.is_err());
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.run("k", || 7), 7);
    }
}
