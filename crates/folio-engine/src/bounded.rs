//! Deadline-bounded access to the synchronous store capabilities.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::error::{EngineError, EngineResult};

/// Shared handle to a store capability whose every call runs on the
/// blocking pool and is abandoned after `timeout`.
///
/// An abandoned call keeps running on its blocking thread; only the
/// caller stops waiting for it.
pub struct Bounded<S: ?Sized> {
    inner: Arc<S>,
    timeout: Duration,
}

impl<S: ?Sized> Clone for Bounded<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            timeout: self.timeout,
        }
    }
}

impl<S: ?Sized + Send + Sync + 'static> Bounded<S> {
    pub fn new(inner: Arc<S>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `call` against the store. Failure, panic, and timeout all
    /// surface as [`EngineError::Storage`] naming `op`.
    pub async fn run<T, E, F>(&self, op: &'static str, call: F) -> EngineResult<T>
    where
        F: FnOnce(&S) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let task = tokio::task::spawn_blocking(move || call(&*inner));
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(e))) => Err(EngineError::Storage(format!("{op}: {e}"))),
            Ok(Err(join)) => Err(EngineError::Storage(format!("{op}: task failed: {join}"))),
            Err(_) => {
                warn!(op, timeout = ?self.timeout, "storage call timed out");
                Err(EngineError::Storage(format!(
                    "{op}: timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }
}
