//! Fixed reconnect delay with jitter.

use rand::Rng;
use std::time::Duration;

/// Add 0 to 10% random jitter to a fixed delay.
///
/// Keeps every process that lost the same broker from reconnecting in lockstep.
pub fn with_jitter(delay: Duration) -> Duration {
    let base_ms = delay.as_millis() as u64;
    let jitter_range = base_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(base_ms + jitter)
}
