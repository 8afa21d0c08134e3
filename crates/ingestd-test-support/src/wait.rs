//! Polling assertions for asynchronous filesystem effects.

use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Poll `condition` every 50ms until it holds or `timeout` elapses.
pub async fn until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(50)).await;
    }
}
