//! Realtime bridge.
//!
//! Turns the backend's push channels into handler calls. Each registered
//! handler runs on its own task and sees its events in order; handlers for
//! different channels run concurrently with each other and with user
//! actions.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::remote::{AuthEvent, TableChange};

/// Owns the listener tasks. Dropping the bridge stops them.
#[derive(Debug, Default)]
pub struct RealtimeBridge {
    tasks: Vec<JoinHandle<()>>,
}

impl RealtimeBridge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every auth state change received on `events`.
    pub fn on_auth_event<F, Fut>(&mut self, events: broadcast::Receiver<AuthEvent>, handler: F)
    where
        F: Fn(AuthEvent) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.listen("auth", events, handler);
    }

    /// Call `handler` for every order-table change received on `changes`.
    pub fn on_order_change<F, Fut>(&mut self, changes: broadcast::Receiver<TableChange>, handler: F)
    where
        F: Fn(TableChange) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.listen("orders", changes, handler);
    }

    fn listen<T, F, Fut>(&mut self, channel: &'static str, mut rx: broadcast::Receiver<T>, handler: F)
    where
        T: Clone + Send + 'static,
        F: Fn(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => handler(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(channel, skipped, "Realtime listener lagged, events dropped");
                    }
                    Err(RecvError::Closed) => {
                        debug!(channel, "Realtime channel closed");
                        break;
                    }
                }
            }
        });
        self.tasks.push(task);
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listeners(&self) -> usize {
        self.tasks.len()
    }

    /// Stop every listener.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for RealtimeBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}
