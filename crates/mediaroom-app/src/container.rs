//! UI-facing state container.
//!
//! [`StateContainer`] is the mount point between a session and the UI tree.
//! While attached it forwards every snapshot from its [`SnapshotSource`] into
//! a watch slot; child consumers read that slot through a [`StateContext`],
//! which is the read-only ambient view of the session. Snapshots pass through
//! untouched.

use std::sync::Arc;

use mediaroom_core::{SessionState, SnapshotSource};
use tokio::{sync::watch, task::JoinHandle};

/// Holds the latest session snapshot for UI consumers.
pub struct StateContainer {
    state: Arc<watch::Sender<Arc<SessionState>>>,
    forwarder: Option<JoinHandle<()>>,
}

impl Default for StateContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl StateContainer {
    /// Create a detached container holding the default snapshot.
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(SessionState::default()));
        Self { state: Arc::new(state), forwarder: None }
    }

    /// Subscribe to `source` and mirror its snapshots.
    ///
    /// Any previous subscription is cancelled first.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn attach<S: SnapshotSource + ?Sized>(&mut self, source: &S) {
        self.detach();

        let mut subscription = source.subscribe();
        let state = Arc::clone(&self.state);
        let forwarder = tokio::spawn(async move {
            while let Some(snapshot) = subscription.next().await {
                state.send_replace(snapshot);
            }
            tracing::debug!("snapshot source closed");
        });

        tracing::debug!("state container attached");
        self.forwarder = Some(forwarder);
    }

    /// Cancel the current subscription. The last snapshot stays visible.
    pub fn detach(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
            tracing::debug!("state container detached");
        }
    }

    /// Whether a subscription is active.
    pub fn is_attached(&self) -> bool {
        self.forwarder.as_ref().is_some_and(|f| !f.is_finished())
    }

    /// Latest snapshot.
    pub fn snapshot(&self) -> Arc<SessionState> {
        Arc::clone(&self.state.borrow())
    }

    /// Read-only view for child consumers.
    pub fn context(&self) -> StateContext {
        StateContext { rx: self.state.subscribe() }
    }
}

impl Drop for StateContainer {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Read-only view of a [`StateContainer`]'s snapshot.
#[derive(Clone)]
pub struct StateContext {
    rx: watch::Receiver<Arc<SessionState>>,
}

impl StateContext {
    /// Latest snapshot.
    pub fn get(&self) -> Arc<SessionState> {
        Arc::clone(&self.rx.borrow())
    }

    /// Wait until the snapshot changes and return it.
    ///
    /// Returns `None` once the container is gone.
    pub async fn changed(&mut self) -> Option<Arc<SessionState>> {
        self.rx.changed().await.ok()?;
        Some(Arc::clone(&self.rx.borrow_and_update()))
    }

    /// Wait until the snapshot satisfies `predicate` and return it.
    ///
    /// Returns `None` if the container is dropped first.
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Option<Arc<SessionState>>
    where
        F: FnMut(&SessionState) -> bool,
    {
        let snapshot = self.rx.wait_for(|s| predicate(s)).await.ok()?;
        Some(Arc::clone(&snapshot))
    }
}
