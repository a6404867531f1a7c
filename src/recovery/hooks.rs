//! Host-supplied recovery callbacks.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use thiserror::Error;

/// Error reported by a recovery hook.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A single asynchronous recovery callback.
pub type Hook = Arc<dyn Fn() -> BoxFuture<'static, Result<(), HookError>> + Send + Sync>;

/// The set of optional callbacks the host process provides.
///
/// ```
/// use self_heal::recovery::RecoveryHooks;
///
/// let hooks = RecoveryHooks::new()
///     .on_clear_caches(|| async { Ok(()) });
/// assert!(hooks.graceful_restart.is_none());
/// ```
#[derive(Clone, Default)]
pub struct RecoveryHooks {
    pub graceful_restart: Option<Hook>,
    pub hard_restart: Option<Hook>,
    pub clear_caches: Option<Hook>,
}

impl RecoveryHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_graceful_restart<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.graceful_restart = Some(boxed(f));
        self
    }

    pub fn on_hard_restart<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.hard_restart = Some(boxed(f));
        self
    }

    pub fn on_clear_caches<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.clear_caches = Some(boxed(f));
        self
    }
}

impl fmt::Debug for RecoveryHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryHooks")
            .field("graceful_restart", &self.graceful_restart.is_some())
            .field("hard_restart", &self.hard_restart.is_some())
            .field("clear_caches", &self.clear_caches.is_some())
            .finish()
    }
}

fn boxed<F, Fut>(f: F) -> Hook
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HookError>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Run a hook if one is registered. A panicking hook is reported as an error.
pub(crate) async fn invoke(hook: Option<&Hook>) -> Result<(), HookError> {
    let Some(hook) = hook else {
        return Ok(());
    };
    match AssertUnwindSafe(hook()).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(HookError::new("hook panicked")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_missing_hook_is_noop() {
        assert!(invoke(None).await.is_ok());
    }

    #[tokio::test]
    async fn test_hook_is_invoked() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let hooks = RecoveryHooks::new().on_hard_restart(move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        invoke(hooks.hard_restart.as_ref()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_hook_becomes_error() {
        let hooks = RecoveryHooks::new().on_clear_caches(|| async {
            let cache: Option<()> = None;
            cache.expect("cache server gone");
            Ok(())
        });

        let err = invoke(hooks.clear_caches.as_ref()).await.unwrap_err();
        assert_eq!(err.to_string(), "hook panicked");
    }
}
