//! One-shot composition slot shared by adopting types and role closures.
//!
//! The first caller runs the initializer; concurrent callers block on a
//! condvar until the outcome is published, then all observe the same value.
//! Once published, reads go through the `OnceLock` and take no lock. Every
//! outcome is terminal, including the failure recorded for a panicking
//! initializer.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

use crate::domain::{CompositionError, CompositionResult, CompositionState};

pub(crate) struct OneShot<T> {
    /// Thread currently running the initializer, if any.
    running: Mutex<Option<ThreadId>>,
    settled: Condvar,
    outcome: OnceLock<CompositionResult<Arc<T>>>,
}

impl<T> OneShot<T> {
    pub(crate) fn new() -> Self {
        Self {
            running: Mutex::new(None),
            settled: Condvar::new(),
            outcome: OnceLock::new(),
        }
    }

    pub(crate) fn outcome(&self) -> Option<&CompositionResult<Arc<T>>> {
        self.outcome.get()
    }

    pub(crate) fn state(&self) -> CompositionState {
        if let Some(outcome) = self.outcome.get() {
            return settled_state(outcome);
        }
        let running = self.running.lock();
        // Publication happens under the lock, so re-check before reporting.
        match (self.outcome.get(), *running) {
            (Some(outcome), _) => settled_state(outcome),
            (None, Some(_)) => CompositionState::Composing,
            (None, None) => CompositionState::Uncomposed,
        }
    }

    /// Run `init` unless an outcome is already published.
    ///
    /// A thread that re-enters its own in-flight slot gets `on_reentry()`
    /// instead of deadlocking; the slot stays with the outer call.
    ///
    /// If `init` panics, `on_panic(message)` is published as the failure
    /// before the panic resumes, so waiters wake up to it and the
    /// initializer never runs a second time.
    pub(crate) fn run_once<F, R, P>(
        &self,
        init: F,
        on_reentry: R,
        on_panic: P,
    ) -> CompositionResult<Arc<T>>
    where
        F: FnOnce() -> CompositionResult<T>,
        R: FnOnce() -> CompositionError,
        P: FnOnce(String) -> CompositionError,
    {
        if let Some(outcome) = self.outcome.get() {
            return outcome.clone();
        }

        let me = thread::current().id();
        {
            let mut running = self.running.lock();
            loop {
                if let Some(outcome) = self.outcome.get() {
                    return outcome.clone();
                }
                match *running {
                    None => {
                        *running = Some(me);
                        break;
                    }
                    Some(owner) if owner == me => return Err(on_reentry()),
                    Some(_) => self.settled.wait(&mut running),
                }
            }
        }

        match panic::catch_unwind(AssertUnwindSafe(init)) {
            Ok(outcome) => self.publish(outcome.map(Arc::new)),
            Err(payload) => {
                self.publish(Err(on_panic(panic_message(payload.as_ref()))));
                panic::resume_unwind(payload)
            }
        }
    }

    fn publish(&self, outcome: CompositionResult<Arc<T>>) -> CompositionResult<Arc<T>> {
        let mut running = self.running.lock();
        let published = self.outcome.get_or_init(|| outcome).clone();
        *running = None;
        self.settled.notify_all();
        published
    }
}

fn settled_state<T>(outcome: &CompositionResult<T>) -> CompositionState {
    if outcome.is_ok() {
        CompositionState::Composed
    } else {
        CompositionState::Failed
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    fn reentry() -> CompositionError {
        CompositionError::ReentrantComposition {
            type_name: "T".to_string(),
        }
    }

    fn panicked(message: String) -> CompositionError {
        CompositionError::CompositionPanicked {
            owner: "type T".to_string(),
            message,
        }
    }

    #[test]
    fn test_runs_once_and_caches_success() {
        let slot: OneShot<u32> = OneShot::new();
        assert_eq!(slot.state(), CompositionState::Uncomposed);

        let calls = AtomicUsize::new(0);
        let first = slot
            .run_once(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                },
                reentry,
                panicked,
            )
            .unwrap();
        let second = slot.run_once(|| Ok(99), reentry, panicked).unwrap();

        assert_eq!(*first, 7);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(slot.state(), CompositionState::Composed);
    }

    #[test]
    fn test_failure_is_permanent() {
        let slot: OneShot<u32> = OneShot::new();
        let err = slot
            .run_once(
                || {
                    Err(CompositionError::UnknownType {
                        type_name: "X".to_string(),
                    })
                },
                reentry,
                panicked,
            )
            .unwrap_err();
        assert!(matches!(err, CompositionError::UnknownType { .. }));

        let again = slot.run_once(|| Ok(1), reentry, panicked).unwrap_err();
        assert_eq!(again, err);
        assert_eq!(slot.state(), CompositionState::Failed);
    }

    #[test]
    fn test_reentry_on_same_thread_reports_error() {
        let slot: OneShot<u32> = OneShot::new();
        let outer = slot.run_once(
            || {
                assert_eq!(slot.state(), CompositionState::Composing);
                let inner = slot.run_once(|| Ok(2), reentry, panicked);
                assert!(matches!(
                    inner,
                    Err(CompositionError::ReentrantComposition { .. })
                ));
                Ok(1)
            },
            reentry,
            panicked,
        );
        assert_eq!(*outer.unwrap(), 1);
    }

    #[test]
    fn test_concurrent_callers_block_and_share_outcome() {
        let slot: Arc<OneShot<u32>> = Arc::new(OneShot::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let slot = Arc::clone(&slot);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    slot.run_once(
                        || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok(42)
                        },
                        reentry,
                        panicked,
                    )
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    }

    #[test]
    fn test_panicking_initializer_publishes_terminal_failure() {
        let slot: Arc<OneShot<u32>> = Arc::new(OneShot::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let panicking = Arc::clone(&slot);
        let counted = Arc::clone(&calls);
        let joined = thread::spawn(move || {
            let _ = panicking.run_once(
                || {
                    counted.fetch_add(1, Ordering::SeqCst);
                    panic!("boom")
                },
                reentry,
                panicked,
            );
        })
        .join();
        assert!(joined.is_err());
        assert_eq!(slot.state(), CompositionState::Failed);

        let err = slot
            .run_once(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(5)
                },
                reentry,
                panicked,
            )
            .unwrap_err();
        assert_eq!(
            err,
            CompositionError::CompositionPanicked {
                owner: "type T".to_string(),
                message: "boom".to_string(),
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
