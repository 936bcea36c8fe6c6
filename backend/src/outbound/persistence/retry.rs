//! Bounded retry for transactions that lose a serialization race.

use std::future::Future;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use tracing::warn;

/// Attempts made before the last error is returned.
pub(crate) const MAX_ATTEMPTS: u32 = 3;
/// Delay before the second attempt; doubles afterwards.
pub(crate) const INITIAL_BACKOFF: Duration = Duration::from_millis(50);

fn transaction_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(INITIAL_BACKOFF)
        .with_max_times((MAX_ATTEMPTS - 1) as usize)
}

/// Run `attempt` until it succeeds, fails with a non-transient error, or
/// [`MAX_ATTEMPTS`] is reached.
pub(crate) async fn retry_transient<T, E, F, Fut>(
    operation: &'static str,
    is_transient: impl Fn(&E) -> bool,
    mut attempt: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut delays = transaction_backoff().build();
    let mut tries = 1_u32;
    loop {
        match attempt().await {
            Err(err) if is_transient(&err) => {
                let Some(delay) = delays.next() else {
                    return Err(err);
                };
                warn!(
                    operation,
                    attempt = tries,
                    backoff_ms = delay.as_millis(),
                    "transient database failure, retrying"
                );
                tokio::time::sleep(delay).await;
                tries += 1;
            }
            outcome => return outcome,
        }
    }
}
