//! Request-scoped cancellation and deadlines
//!
//! Every RPC hands resources a `Context`. The server keeps one root context
//! per provider process; `StopProvider` cancels it, and every context
//! derived from it observes the cancellation.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tokio::time;

/// Context carries cancellation, an optional deadline and request values
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    values: RwLock<HashMap<String, Box<dyn Any + Send + Sync>>>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                values: RwLock::new(HashMap::new()),
                done: done_rx,
                done_tx,
            }),
        }
    }

    /// Derives a context that is cancelled when `timeout` elapses or when
    /// this context is cancelled, whichever comes first.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = match self.inner.deadline {
            Some(parent) => parent.min(Instant::now() + timeout),
            None => Instant::now() + timeout,
        };

        let (done_tx, done_rx) = watch::channel(*self.inner.done.borrow());

        let parent = self.clone();
        let child_tx = done_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline.into()) => {}
                _ = parent.cancelled() => {}
                _ = child_tx.closed() => return,
            }
            let _ = child_tx.send(true);
        });

        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                values: RwLock::new(HashMap::new()),
                done: done_rx,
                done_tx,
            }),
        }
    }

    pub async fn with_value<T: Send + Sync + 'static>(self, key: &str, value: T) -> Self {
        let mut values = self.inner.values.write().await;
        values.insert(key.to_string(), Box::new(value));
        drop(values);
        self
    }

    pub async fn get_value<T>(&self, key: &str) -> Option<T>
    where
        T: Send + Sync + Clone + 'static,
    {
        let values = self.inner.values.read().await;
        values.get(key).and_then(|v| v.downcast_ref::<T>()).cloned()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Receiver that flips to `true` once this context is cancelled
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done.clone()
    }

    /// Resolves once this context is cancelled.
    pub async fn cancelled(&self) {
        let mut done = self.done();
        loop {
            if *done.borrow_and_update() {
                return;
            }
            if done.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Sleeps for `duration`. Returns false if the context was cancelled first.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = time::sleep(duration) => true,
            _ = self.cancelled() => false,
        }
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_stores_and_retrieves_values() {
        let ctx = Context::new();
        let ctx = ctx.with_value("terraform_version", "1.9.0".to_string()).await;

        let value: Option<String> = ctx.get_value("terraform_version").await;
        assert_eq!(value, Some("1.9.0".to_string()));
    }

    #[tokio::test]
    async fn context_timeout_cancels() {
        let ctx = Context::new().with_timeout(Duration::from_millis(100));

        assert!(!ctx.is_cancelled());

        sleep(Duration::from_millis(150)).await;

        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn context_manual_cancel() {
        let ctx = Context::new();

        assert!(!ctx.is_cancelled());

        ctx.cancel();

        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn parent_cancellation_reaches_derived_context() {
        let root = Context::new();
        let child = root.with_timeout(Duration::from_secs(60));

        root.cancel();
        tokio::time::timeout(Duration::from_secs(1), child.cancelled())
            .await
            .expect("derived context should observe cancellation");

        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn sleep_is_interrupted_by_cancel() {
        let ctx = Context::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        assert!(!ctx.sleep(Duration::from_secs(30)).await);
    }

    #[tokio::test]
    async fn context_deadline() {
        let ctx = Context::new();
        assert!(ctx.deadline().is_none());

        let ctx_with_timeout = ctx.with_timeout(Duration::from_secs(1));
        assert!(ctx_with_timeout.deadline().is_some());
    }

    #[test]
    fn cancelled_wakes_on_cancel() {
        let ctx = Context::new();
        let mut waiter = tokio_test::task::spawn(ctx.cancelled());
        tokio_test::assert_pending!(waiter.poll());

        ctx.cancel();
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }
}
