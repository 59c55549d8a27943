// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Bounded polling for values that appear asynchronously on the page.
//!
//! Merge-request pages render branch details after the content script
//! starts, so lookups are retried at a fixed interval until a wall-clock
//! deadline passes.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

/// Configuration for fixed-interval polling with a hard deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct PollConfig
{
    /// Delay between consecutive probes (default: 100ms).
    pub interval: Duration,
    /// Maximum wall-clock time spent polling (default: 3000ms).
    pub timeout:  Duration,
}

impl Default for PollConfig
{
    fn default() -> Self
    {
        Self {
            interval: Duration::from_millis(100,), timeout: Duration::from_millis(3000,),
        }
    }
}

/// Runs `probe` until it yields a value or the deadline passes.
///
/// The probe runs once immediately and once more at the deadline, so a
/// zero timeout still performs a single lookup.
///
/// # Arguments
///
/// * `config` - Interval and deadline
/// * `operation_name` - Name of the lookup for logging
/// * `probe` - Synchronous lookup returning `Some` once the value is available
///
/// # Example
///
/// ```
/// use eons_open::{PollConfig, poll_until};
///
/// # async fn example() {
/// let found = poll_until(&PollConfig::default(), "answer", || Some(42,),).await;
/// assert_eq!(found, Some(42));
/// # }
/// ```
pub async fn poll_until<F, T,>(config: &PollConfig, operation_name: &str, mut probe: F,) -> Option<T,>
where
    F: FnMut() -> Option<T,>,
{
    let deadline = Instant::now() + config.timeout;
    let mut attempt = 1;

    loop {
        if let Some(value,) = probe() {
            if attempt > 1 {
                debug!("{} resolved on attempt {}", operation_name, attempt);
            }
            return Some(value,);
        }

        let now = Instant::now();
        if now >= deadline {
            debug!(
                "{} unresolved after {} attempts ({}ms)",
                operation_name,
                attempt,
                config.timeout.as_millis()
            );
            return None;
        }

        sleep(config.interval.min(deadline - now,),).await;
        attempt += 1;
    }
}
