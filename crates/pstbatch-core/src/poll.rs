use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    Matched(T),
    TimedOut,
}

impl<T> Poll<T> {
    pub fn matched(self) -> Option<T> {
        match self {
            Poll::Matched(value) => Some(value),
            Poll::TimedOut => None,
        }
    }
}

/// Fixed-interval busy poll shared by every waiting site in the crate:
/// window appearance, repair-control readiness, the completion dialog and
/// the log-file release check.
///
/// The probe runs before the deadline check, so a zero budget still gets
/// exactly one attempt. Sleeps are trimmed to the remaining budget and
/// never overrun the deadline by more than one interval.
pub fn poll_until<T, F>(interval: Duration, deadline: Instant, mut probe: F) -> Poll<T>
where
    F: FnMut() -> Option<T>,
{
    loop {
        if let Some(value) = probe() {
            return Poll::Matched(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return Poll::TimedOut;
        }
        thread::sleep(interval.min(deadline - now));
    }
}
