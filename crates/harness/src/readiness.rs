//! Readiness polling for the store API and front end

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{HarnessError, HarnessResult};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Poll `url` until any HTTP response arrives or `timeout` elapses.
///
/// Status codes are not inspected: a 404 from the API root still proves the
/// server is accepting requests.
pub async fn wait_until_reachable(url: &str, timeout: Duration) -> HarnessResult<()> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match client.get(url).send().await {
            Ok(resp) => {
                info!("{} is reachable ({})", url, resp.status());
                return Ok(());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} to come up...", url);
                }
                // Connection refused is expected while the server is starting
                if !e.is_connect() {
                    warn!("Readiness check error: {}", e);
                }
            }
        }

        if start.elapsed() >= timeout {
            return Err(HarnessError::ApiUnreachable {
                url: url.to_string(),
                attempts,
            });
        }
        sleep(POLL_INTERVAL).await;
    }
}
