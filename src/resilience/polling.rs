//! Bounded fixed-interval polling.
//!
//! Used while the driver moves through a transition it started on its own and
//! there is no attempt to join.

use std::time::Duration;
use tokio::time;

/// Check `probe` every `interval` until it yields a value or `max_wait` has
/// elapsed. The first check happens after one interval.
pub async fn poll_until<T, F>(interval: Duration, max_wait: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Option<T>,
{
    let max_attempts = max_wait.as_millis().div_ceil(interval.as_millis().max(1)).max(1);
    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);

    for _ in 0..max_attempts {
        ticker.tick().await;
        if let Some(value) = probe() {
            return Some(value);
        }
    }

    None
}
