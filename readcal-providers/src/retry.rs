use std::future::Future;
use std::time::Duration;

use readcal_core::ProviderError;

const EXTRA_ATTEMPTS: u32 = 2;
const BASE_BACKOFF: Duration = Duration::from_millis(250);

/// Run `op`, retrying transient (`Unavailable`) failures with exponential
/// backoff. Every other error is returned immediately.
pub async fn with_retries<T, F, Fut>(label: &str, mut op: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_retryable() && attempt < EXTRA_ATTEMPTS => {
                let delay = BASE_BACKOFF * 2u32.pow(attempt);
                attempt += 1;
                log::warn!(
                    "{label} failed ({e}), retry {attempt}/{EXTRA_ATTEMPTS} in {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
