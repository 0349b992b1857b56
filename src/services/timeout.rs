//! Deadline-bounded service calls.
//!
//! Each call runs on its own thread and hands its result back through a
//! one-slot channel. The caller waits until the deadline and no longer; a
//! call that overruns keeps its thread until it finishes, but its result is
//! dropped.

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};

use super::ServiceError;

/// A service call in flight.
#[derive(Debug)]
pub struct PendingCall<T> {
    label: String,
    rx: Receiver<Result<T, ServiceError>>,
    deadline: Instant,
    timeout: Duration,
}

/// Start `f` on a helper thread with a deadline of `timeout` from now.
pub fn spawn_call<T, F>(label: impl Into<String>, timeout: Duration, f: F) -> PendingCall<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
{
    let label = label.into();
    let (tx, rx) = bounded(1);

    let spawned = thread::Builder::new()
        .name(format!("service-{}", label))
        .spawn(move || {
            // The receiver is gone once the caller gave up
            let _ = tx.send(f());
        });
    if let Err(e) = spawned {
        log::warn!("could not start {} call: {}", label, e);
    }

    PendingCall {
        label,
        rx,
        deadline: Instant::now() + timeout,
        timeout,
    }
}

impl<T> PendingCall<T> {
    /// Label given at spawn time.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Block until the result arrives or the deadline passes.
    pub fn wait(self) -> Result<T, ServiceError> {
        match self.rx.recv_deadline(self.deadline) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("{} call timed out after {:?}", self.label, self.timeout);
                Err(ServiceError::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(ServiceError::Failed(format!(
                "{} call ended without a result",
                self.label
            ))),
        }
    }
}

/// Run `f` with a deadline and wait for it.
pub fn call_with_timeout<T, F>(
    label: impl Into<String>,
    timeout: Duration,
    f: F,
) -> Result<T, ServiceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
{
    spawn_call(label, timeout, f).wait()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_call_returns_value() {
        let result = call_with_timeout("fast", Duration::from_secs(5), || Ok(42));
        assert_eq!(result, Ok(42));
    }

    #[test]
    fn test_slow_call_times_out() {
        let started = Instant::now();
        let result: Result<(), _> = call_with_timeout("slow", Duration::from_millis(50), || {
            thread::sleep(Duration::from_millis(500));
            Ok(())
        });
        assert_eq!(result, Err(ServiceError::Timeout(Duration::from_millis(50))));
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_service_error_passes_through() {
        let result: Result<u8, _> = call_with_timeout("failing", Duration::from_secs(1), || {
            Err(ServiceError::Unavailable("no model".into()))
        });
        assert_eq!(result, Err(ServiceError::Unavailable("no model".into())));
    }

    #[test]
    fn test_panicking_call_is_a_failure() {
        let result: Result<u8, _> =
            call_with_timeout("panicky", Duration::from_secs(1), || panic!("model crashed"));
        assert!(matches!(result, Err(ServiceError::Failed(_))));
    }

    #[test]
    fn test_concurrent_calls_share_wall_clock() {
        let started = Instant::now();
        let a = spawn_call("a", Duration::from_secs(5), || {
            thread::sleep(Duration::from_millis(200));
            Ok("a")
        });
        let b = spawn_call("b", Duration::from_secs(5), || {
            thread::sleep(Duration::from_millis(200));
            Ok("b")
        });
        assert_eq!(a.label(), "a");
        assert_eq!(a.wait(), Ok("a"));
        assert_eq!(b.wait(), Ok("b"));
        assert!(started.elapsed() < Duration::from_millis(390));
    }
}
