//! Activity mirroring to the notification platform.
//!
//! `NotificationSink` is the bare transport. `Notifier` adds the retry policy
//! and, once every attempt has failed, writes one line to the error log
//! before handing the error back to the caller.

use async_trait::async_trait;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Where activity lines and forwarded images go.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<(), String>;
    async fn send_image(&self, path: &Path) -> Result<(), String>;
}

/// Fixed-delay retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Run `op` until it succeeds or the policy's attempts are used up.
/// Returns the last error.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= policy.attempts => return Err(e),
            Err(e) => {
                warn!("{what} failed (attempt {attempt}/{}): {e}", policy.attempts);
                attempt += 1;
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }
}

/// Append-only log of deliveries that never made it.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, what: &str, err: &str) {
        let line = format!("{} {what}: {err}\n", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f"));
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(line.as_bytes()));
        if let Err(e) = result {
            error!("Failed to write error log {}: {e}", self.path.display());
        }
    }
}

/// A sink with retries and failure logging.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    policy: RetryPolicy,
    errors: ErrorLog,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>, policy: RetryPolicy, errors: ErrorLog) -> Self {
        Self { sink, policy, errors }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn send_text(&self, text: &str) -> Result<(), String> {
        let result = retry(&self.policy, "Notification", || self.sink.send_text(text)).await;
        self.finish(result, "Failed to send notification")
    }

    pub async fn send_image(&self, path: &Path) -> Result<(), String> {
        let result = retry(&self.policy, "Image notification", || self.sink.send_image(path)).await;
        self.finish(result, "Failed to send image notification")
    }

    fn finish(&self, result: Result<(), String>, what: &str) -> Result<(), String> {
        if let Err(ref e) = result {
            error!("{what}: {e}");
            self.errors.append(what, e);
        }
        result
    }
}
