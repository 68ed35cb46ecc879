use common::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Retries `operation` while `should_retry` accepts the error, doubling the
/// delay after each attempt.
pub async fn retry_with_backoff<T, F, Fut, P>(
    mut retries: u32,
    base_delay_ms: u64,
    should_retry: P,
    operation: F,
) -> common::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = common::Result<T>>,
    P: Fn(&Error) -> bool,
{
    let mut delay = base_delay_ms;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if retries == 0 || !should_retry(&e) {
                    return Err(e);
                }

                retries -= 1;
                sleep_with_jitter(delay, delay / 2).await;
                delay = delay.saturating_mul(2);
            }
        }
    }
}

pub async fn sleep_with_jitter(base_ms: u64, jitter_ms: u64) {
    let jitter = if jitter_ms == 0 {
        0
    } else {
        rand::rng().random_range(0..=jitter_ms)
    };
    tokio::time::sleep(Duration::from_millis(base_ms + jitter)).await;
}
