use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use super::Backend;
use crate::transfer::TransferConfig;

/// Longest pause between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Retries each failed call of the wrapped backend with exponential backoff.
pub struct RetryBackend {
    inner: Arc<dyn Backend>,
    max_retries: u32,
    base_delay: Duration,
}

impl RetryBackend {
    pub fn new(inner: Arc<dyn Backend>, max_retries: u32) -> Self {
        Self {
            inner,
            max_retries,
            base_delay: Duration::from_secs(1),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    async fn run<T, F, Fut>(&self, op: &str, key: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if retries < self.max_retries => {
                    retries += 1;
                    let delay = backoff(self.base_delay, retries);
                    warn!(op, key = %key, retries, error = %err, "storage call failed, backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Delay before the `retry`-th attempt: doubles each time, capped.
fn backoff(base: Duration, retry: u32) -> Duration {
    let factor = 2u32.saturating_pow(retry.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

#[async_trait]
impl Backend for RetryBackend {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.run("list", prefix, || self.inner.list_keys(prefix)).await
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        self.run("put", key, || self.inner.put(key, data)).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.run("delete", key, || self.inner.delete(key)).await
    }

    async fn upload_file(&self, key: &str, path: &Path, config: &TransferConfig) -> Result<()> {
        self.run("upload", key, || self.inner.upload_file(key, path, config))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::backend::memory::MemoryBackend;

    /// Fails the first `failures` deletes, then delegates.
    struct Flaky {
        inner: MemoryBackend,
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Backend for Flaky {
        async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
            self.inner.list_keys(prefix).await
        }

        async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
            self.inner.put(key, data).await
        }

        async fn delete(&self, key: &str) -> Result<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                anyhow::bail!("connection reset");
            }
            self.inner.delete(key).await
        }
    }

    fn flaky(failures: u32) -> Arc<Flaky> {
        Arc::new(Flaky {
            inner: MemoryBackend::with_keys(["a/1"]),
            failures,
            calls: AtomicU32::new(0),
        })
    }

    #[tokio::test]
    async fn recovers_from_transient_failures() {
        let inner = flaky(2);
        let backend =
            RetryBackend::new(inner.clone(), 3).with_base_delay(Duration::from_millis(1));
        backend.delete("a/1").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
        assert!(inner.inner.keys().is_empty());
    }

    #[test]
    fn backoff_doubles_and_stays_capped() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff(base, 1), Duration::from_secs(1));
        assert_eq!(backoff(base, 3), Duration::from_secs(4));
        assert_eq!(backoff(base, 7), MAX_BACKOFF);
        assert_eq!(backoff(base, 40), MAX_BACKOFF);
        assert_eq!(backoff(base, u32::MAX), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let inner = flaky(10);
        let backend =
            RetryBackend::new(inner.clone(), 2).with_base_delay(Duration::from_millis(1));
        let err = backend.delete("a/1").await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }
}
