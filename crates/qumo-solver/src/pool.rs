//! The timed worker pool.
//!
//! [`run_for`] fans a function out over N OS threads and bounds the whole
//! invocation by a wall-clock budget. Every worker owns a private
//! [`CancelToken`]; a watchdog flips the token when the budget elapses and
//! then *waits* for the worker to return, so partial results are kept and
//! nothing is torn down mid-batch. The function is expected to poll its
//! token cooperatively (the exploration driver does so at batch
//! boundaries).

use qumo_core::cancel::CancelToken;
use qumo_core::error::{QumoError, Result};
use std::panic::AssertUnwindSafe;
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::Duration;

type TaskOutcome<T> = std::thread::Result<Result<T>>;

/// Run `f` on `threads` workers until each finishes or `timeout` elapses.
///
/// Budgets under one second are rejected with `InvalidTimeout`. Results
/// are returned in worker order; the first captured error is surfaced, and
/// a worker panic is re-raised after all workers have been collected.
/// Cancellation is not an error: a timed-out worker's return value is kept.
pub fn run_for<T, F>(f: F, timeout: Duration, threads: usize) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize, CancelToken) -> Result<T> + Sync,
{
    if timeout < Duration::from_secs(1) {
        return Err(QumoError::InvalidTimeout {
            seconds: timeout.as_secs_f64(),
        });
    }
    if threads == 0 {
        return Err(QumoError::InvalidRange(
            "worker pool needs at least one thread".to_string(),
        ));
    }

    let slots: Vec<Mutex<Option<TaskOutcome<T>>>> =
        (0..threads).map(|_| Mutex::new(None)).collect();

    std::thread::scope(|scope| {
        for (worker, slot) in slots.iter().enumerate() {
            let f = &f;
            scope.spawn(move || {
                let token = CancelToken::new();
                let task_token = token.clone();
                let (done_tx, done_rx) = mpsc::channel::<()>();

                let task = scope.spawn(move || {
                    let outcome =
                        std::panic::catch_unwind(AssertUnwindSafe(|| f(worker, task_token)));
                    let _ = done_tx.send(());
                    outcome
                });

                // watchdog: flip the token at the deadline, then wait
                if done_rx.recv_timeout(timeout).is_err() {
                    token.cancel();
                }
                let outcome = task.join().expect("task panics are caught inside");
                *slot.lock().expect("result slot poisoned") = Some(outcome);
            });
        }
    });

    let mut results = Vec::with_capacity(threads);
    let mut first_error = None;
    let mut panic_payload = None;
    for slot in slots {
        let outcome = slot
            .into_inner()
            .expect("result slot poisoned")
            .expect("every watchdog stores an outcome");
        match outcome {
            Ok(Ok(value)) => results.push(value),
            Ok(Err(e)) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            Err(payload) => {
                if panic_payload.is_none() {
                    panic_payload = Some(payload);
                }
            }
        }
    }

    if let Some(payload) = panic_payload {
        std::panic::resume_unwind(payload);
    }
    if let Some(e) = first_error {
        return Err(e);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[test]
    fn test_sub_second_budget_rejected() {
        let err = run_for(|_, _| Ok(0u8), Duration::from_millis(900), 1);
        assert!(matches!(err, Err(QumoError::InvalidTimeout { .. })));
    }

    #[test]
    fn test_fast_workers_return_before_deadline() {
        let started = Instant::now();
        let results = run_for(
            |worker, _token| Ok(worker * 10),
            Duration::from_secs(30),
            3,
        )
        .expect("workers succeed");

        assert_eq!(results, vec![0, 10, 20]);
        assert!(started.elapsed() < Duration::from_secs(5), "pool must not wait out the budget");
    }

    #[test]
    fn test_watchdog_cancels_and_keeps_partial_results() {
        let started = Instant::now();
        let results = run_for(
            |_, token| {
                let mut polls = 0u32;
                while !token.is_cancelled() {
                    polls += 1;
                    std::thread::sleep(Duration::from_millis(10));
                }
                Ok(polls)
            },
            Duration::from_secs(1),
            2,
        )
        .expect("cancellation is not an error");

        assert_eq!(results.len(), 2, "each worker returned");
        assert!(results.iter().all(|&p| p > 0));
        assert!(
            started.elapsed() <= Duration::from_millis(1500),
            "cancellation must be prompt, took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn test_first_error_is_surfaced() {
        let calls = AtomicUsize::new(0);
        let err = run_for(
            |worker, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                if worker == 1 {
                    Err(QumoError::EmptyConfig)
                } else {
                    Ok(worker)
                }
            },
            Duration::from_secs(5),
            3,
        );

        assert!(matches!(err, Err(QumoError::EmptyConfig)));
        assert_eq!(calls.load(Ordering::SeqCst), 3, "all workers still ran");
    }

    #[test]
    #[should_panic(expected = "worker exploded")]
    fn test_worker_panic_is_reraised() {
        let _ = run_for(
            |worker, _| {
                if worker == 0 {
                    panic!("worker exploded");
                }
                Ok(worker)
            },
            Duration::from_secs(5),
            2,
        );
    }
}
