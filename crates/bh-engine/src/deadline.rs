//! Wall-clock deadline for one search.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::{const_mutex, Mutex, MutexGuard};
use tracing::debug;

// Only one deadline may be armed in the process at a time.
static ARMED_SLOT: Mutex<()> = const_mutex(());

/// An armed deadline. Disarmed when dropped.
///
/// Arming blocks until any other armed deadline is dropped. Arming twice on
/// the same thread without dropping the first deadline deadlocks.
pub struct SearchDeadline {
    _slot: MutexGuard<'static, ()>,
    armed_at: Instant,
    expires_at: Option<Instant>,
    timeout: Duration,
}

impl SearchDeadline {
    pub fn arm(timeout: Duration) -> Self {
        let slot = ARMED_SLOT.lock();
        let armed_at = Instant::now();
        // a timeout too large for the clock never expires
        let expires_at = armed_at.checked_add(timeout);
        debug!("Armed search deadline of {:.3}s", timeout.as_secs_f64());
        Self {
            _slot: slot,
            armed_at,
            expires_at,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time since arming.
    pub fn elapsed(&self) -> Duration {
        self.armed_at.elapsed()
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.remaining(), Some(left) if left.is_zero())
    }

    /// Wait on `rx` until a message arrives or the deadline passes.
    pub fn wait<T>(&self, rx: &Receiver<T>) -> Result<T, RecvTimeoutError> {
        match self.expires_at {
            Some(at) => rx.recv_deadline(at),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        }
    }
}

impl Drop for SearchDeadline {
    fn drop(&mut self) {
        debug!("Disarmed search deadline after {:.3}s", self.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::thread;

    #[test]
    fn test_wait_returns_message_before_deadline() {
        let (tx, rx) = bounded(1);
        let deadline = SearchDeadline::arm(Duration::from_secs(5));
        tx.send(7).unwrap();
        assert_eq!(deadline.wait(&rx), Ok(7));
        assert!(!deadline.is_expired());
    }

    #[test]
    fn test_wait_times_out() {
        let (_tx, rx) = bounded::<()>(1);
        let deadline = SearchDeadline::arm(Duration::from_millis(50));
        assert_eq!(deadline.wait(&rx), Err(RecvTimeoutError::Timeout));
        assert!(deadline.elapsed() >= Duration::from_millis(50));
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_disconnected_sender_is_reported() {
        let (tx, rx) = bounded::<()>(1);
        drop(tx);
        let deadline = SearchDeadline::arm(Duration::MAX);
        assert_eq!(deadline.remaining(), None);
        assert_eq!(deadline.wait(&rx), Err(RecvTimeoutError::Disconnected));
    }

    #[test]
    fn test_second_deadline_waits_for_first() {
        let first = SearchDeadline::arm(Duration::from_secs(5));
        let (tx, rx) = bounded(1);
        let waiter = thread::spawn(move || {
            let second = SearchDeadline::arm(Duration::from_secs(5));
            tx.send(Instant::now()).unwrap();
            drop(second);
        });
        thread::sleep(Duration::from_millis(50));
        assert!(rx.try_recv().is_err());
        let released_at = Instant::now();
        drop(first);
        let armed_at = rx.recv().unwrap();
        waiter.join().unwrap();
        assert!(armed_at >= released_at);
    }
}
