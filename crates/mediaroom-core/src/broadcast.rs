//! Snapshot broadcasting.
//!
//! [`StateBroadcaster`] stores the authoritative [`SessionState`] and fans
//! every committed snapshot out to zero or more [`Subscription`]s. Each
//! subscription has its own unbounded queue, so a slow consumer never loses
//! an intermediate snapshot and never blocks the committer.
//!
//! # Subscription contract
//!
//! A new subscription first yields the default (empty) snapshot, then the
//! current snapshot if it differs from the default, then every later commit
//! in commit order.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use tokio::sync::mpsc;

use crate::state::SessionState;

type Sender = mpsc::UnboundedSender<Arc<SessionState>>;

struct Registry {
    current: Arc<SessionState>,
    subscribers: HashMap<u64, Sender>,
    next_id: u64,
}

/// Stores the current snapshot and distributes commits to subscribers.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct StateBroadcaster {
    registry: Arc<Mutex<Registry>>,
}

impl Default for StateBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl StateBroadcaster {
    /// Create a broadcaster holding the default snapshot.
    pub fn new() -> Self {
        let registry = Registry {
            current: Arc::new(SessionState::default()),
            subscribers: HashMap::new(),
            next_id: 0,
        };
        Self { registry: Arc::new(Mutex::new(registry)) }
    }

    /// Current snapshot.
    pub fn current(&self) -> Arc<SessionState> {
        Arc::clone(&lock(&self.registry).current)
    }

    /// Store `state` as current and send it to every live subscriber.
    ///
    /// Subscribers whose receiving side is gone are dropped.
    pub fn commit(&self, state: SessionState) -> Arc<SessionState> {
        let snapshot = Arc::new(state);
        let mut registry = lock(&self.registry);
        registry.current = Arc::clone(&snapshot);
        registry.subscribers.retain(|_, tx| tx.send(Arc::clone(&snapshot)).is_ok());
        snapshot
    }

    /// Open a new subscription.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = lock(&self.registry);

        let initial = Arc::new(SessionState::default());
        let _ = tx.send(initial);
        if *registry.current != SessionState::default() {
            let _ = tx.send(Arc::clone(&registry.current));
        }

        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.insert(id, tx);

        Subscription { id, rx, registry: Arc::downgrade(&self.registry) }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }
}

/// Independent, cancellable stream of snapshots.
///
/// Dropping the subscription cancels it.
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<Arc<SessionState>>,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the subscription is cancelled or the broadcaster
    /// is gone and all queued snapshots were consumed.
    pub async fn next(&mut self) -> Option<Arc<SessionState>> {
        self.rx.recv().await
    }

    /// Next queued snapshot without waiting. `None` if nothing is queued.
    pub fn try_next(&mut self) -> Option<Arc<SessionState>> {
        self.rx.try_recv().ok()
    }

    /// Drain every queued snapshot.
    pub fn drain(&mut self) -> Vec<Arc<SessionState>> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Stop receiving snapshots.
    pub fn cancel(mut self) {
        self.deregister();
    }

    fn deregister(&mut self) {
        self.rx.close();
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).subscribers.remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.deregister();
    }
}

/// Anything a UI layer can subscribe to for session snapshots.
pub trait SnapshotSource {
    /// Open a new subscription.
    fn subscribe(&self) -> Subscription;
}

impl SnapshotSource for StateBroadcaster {
    fn subscribe(&self) -> Subscription {
        StateBroadcaster::subscribe(self)
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_subscriber_sees_default_first() {
        let broadcaster = StateBroadcaster::new();
        let mut sub = broadcaster.subscribe();

        let snapshots = sub.drain();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(*snapshots[0], SessionState::default());
    }

    #[test]
    fn late_subscriber_sees_default_then_current() {
        let broadcaster = StateBroadcaster::new();
        broadcaster.commit(SessionState::default().with_initialized(true));

        let mut sub = broadcaster.subscribe();
        let snapshots = sub.drain();

        assert_eq!(snapshots.len(), 2);
        assert_eq!(*snapshots[0], SessionState::default());
        assert!(snapshots[1].initialized);
    }

    #[test]
    fn commits_reach_every_subscriber_in_order() {
        let broadcaster = StateBroadcaster::new();
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();

        let initialized = SessionState::default().with_initialized(true);
        broadcaster.commit(initialized.clone());
        broadcaster.commit(initialized.with_joined(true));

        for sub in [&mut a, &mut b] {
            let flags: Vec<_> = sub.drain().iter().map(|s| (s.initialized, s.joined)).collect();
            assert_eq!(flags, vec![(false, false), (true, false), (true, true)]);
        }
    }

    #[test]
    fn cancel_deregisters() {
        let broadcaster = StateBroadcaster::new();
        let a = broadcaster.subscribe();
        let _b = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        a.cancel();
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[test]
    fn drop_deregisters() {
        let broadcaster = StateBroadcaster::new();
        {
            let _sub = broadcaster.subscribe();
            assert_eq!(broadcaster.subscriber_count(), 1);
        }
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn subscription_outlives_broadcaster() {
        let broadcaster = StateBroadcaster::new();
        let mut sub = broadcaster.subscribe();
        broadcaster.commit(SessionState::default().with_initialized(true));
        drop(broadcaster);

        assert_eq!(sub.drain().len(), 2);
    }

    #[tokio::test]
    async fn next_waits_for_commit() {
        let broadcaster = StateBroadcaster::new();
        let mut sub = broadcaster.subscribe();
        assert_eq!(sub.next().await.map(|s| s.initialized), Some(false));

        let committer = broadcaster.clone();
        tokio::spawn(async move {
            committer.commit(SessionState::default().with_initialized(true));
        });

        assert_eq!(sub.next().await.map(|s| s.initialized), Some(true));
    }
}
