//! Collective barrier with bounded waits
//!
//! Unlike [`std::sync::Barrier`], waiting on this barrier can time out, and
//! any participant can abort the barrier so that its peers stop waiting for
//! it. Both are needed so that a failed worker results in an error on its
//! peers instead of an indefinite hang.

use std::{
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use thiserror::Error;

/// Barrier shared by a fixed number of participants
#[derive(Debug)]
pub struct Barrier {
    /// Number of participants
    num_participants: usize,

    /// Synchronization state
    state: Mutex<State>,

    /// Signaled whenever the barrier is released or aborted
    condvar: Condvar,
}
//
impl Barrier {
    /// Set up a barrier for a certain number of participants
    pub fn new(num_participants: usize) -> Self {
        Self {
            num_participants,
            state: Mutex::new(State::default()),
            condvar: Condvar::new(),
        }
    }

    /// Wait for all participants to reach the barrier
    ///
    /// If this takes longer than `timeout`, the barrier is aborted, so that
    /// the other participants do not need to wait for their own timeout.
    pub fn wait(&self, timeout: Duration) -> Result<(), BarrierError> {
        let mut state = self.lock();
        if state.aborted {
            return Err(BarrierError::Aborted);
        }

        // Last participant to arrive releases everyone
        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.num_participants {
            state.arrived = 0;
            state.generation += 1;
            self.condvar.notify_all();
            return Ok(());
        }

        // Others wait for that to happen
        let (mut state, _) = self
            .condvar
            .wait_timeout_while(state, timeout, |state| {
                state.generation == generation && !state.aborted
            })
            .unwrap_or_else(PoisonError::into_inner);
        if state.generation != generation {
            Ok(())
        } else if state.aborted {
            Err(BarrierError::Aborted)
        } else {
            state.aborted = true;
            self.condvar.notify_all();
            Err(BarrierError::TimedOut)
        }
    }

    /// Make current and future waits fail
    pub fn abort(&self) {
        self.lock().aborted = true;
        self.condvar.notify_all();
    }

    /// Access the synchronization state
    fn lock(&self) -> MutexGuard<'_, State> {
        // State is kept consistent at all times, so poisoning is harmless
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Barrier synchronization state
#[derive(Debug, Default)]
struct State {
    /// Number of participants waiting for the current generation
    arrived: usize,

    /// Number of times the barrier was released
    generation: u64,

    /// Truth that a participant gave up on the barrier
    aborted: bool,
}

/// Ways in which waiting on the barrier can fail
#[derive(Copy, Clone, Debug, Error, Eq, PartialEq)]
pub enum BarrierError {
    /// Some participants did not reach the barrier in time
    #[error("timed out waiting for other participants")]
    TimedOut,

    /// A participant gave up on the barrier
    #[error("barrier was aborted by another participant")]
    Aborted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread, time::Instant};

    const LONG: Duration = Duration::from_secs(10);

    #[test]
    fn releases_everyone_repeatedly() {
        let barrier = Arc::new(Barrier::new(4));
        thread::scope(|s| {
            let handles = (0..4)
                .map(|_| {
                    let barrier = barrier.clone();
                    s.spawn(move || (0..100).try_for_each(|_| barrier.wait(LONG)))
                })
                .collect::<Vec<_>>();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), Ok(()));
            }
        });
    }

    #[test]
    fn single_participant_never_waits() {
        let barrier = Barrier::new(1);
        assert_eq!(barrier.wait(Duration::ZERO), Ok(()));
        assert_eq!(barrier.wait(Duration::ZERO), Ok(()));
    }

    #[test]
    fn times_out_and_aborts() {
        let barrier = Barrier::new(2);
        assert_eq!(
            barrier.wait(Duration::from_millis(10)),
            Err(BarrierError::TimedOut)
        );
        assert_eq!(barrier.wait(LONG), Err(BarrierError::Aborted));
    }

    #[test]
    fn abort_wakes_up_waiters() {
        let barrier = Arc::new(Barrier::new(3));
        let start = Instant::now();
        thread::scope(|s| {
            let waiter = {
                let barrier = barrier.clone();
                s.spawn(move || barrier.wait(LONG))
            };
            thread::sleep(Duration::from_millis(10));
            barrier.abort();
            assert_eq!(waiter.join().unwrap(), Err(BarrierError::Aborted));
        });
        assert!(start.elapsed() < LONG);
    }
}
