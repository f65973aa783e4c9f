/// Per-user connection registry
///
/// Maps user IDs to their live realtime connections (a user may hold several
/// — multiple tabs or devices). Publishing is fire-and-forget: closed
/// channels are pruned as they are discovered and never fail the caller.
///
/// The registry is process-local state shared via `Arc`; it is constructed
/// once at startup and cloned into handlers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::events::LifecycleEvent;

/// Sender half handed to the registry for each live connection
pub type EventSender = mpsc::UnboundedSender<LifecycleEvent>;

/// Handle tying a registration to the lifetime of its consumer
///
/// Dropping the guard unregisters the connection, so a stream that ends or a
/// client that disconnects always cleans up its map entry; the registry never
/// waits for a future publish to discover the dead sender.
#[derive(Debug)]
pub struct SubscriptionGuard {
    registry: ConnectionRegistry,
    user_id: Uuid,
    connection_id: Uuid,
}

impl SubscriptionGuard {
    /// ID of the connection this guard keeps registered
    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let registry = self.registry.clone();
        let user_id = self.user_id;
        let connection_id = self.connection_id;

        // Unregistration needs the async lock; outside a runtime (process
        // teardown) the entry dies with the registry anyway.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                registry.unsubscribe(user_id, connection_id).await;
            });
        }
    }
}

/// Registry of live realtime connections, keyed by user then connection
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<Uuid, HashMap<Uuid, EventSender>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection for a user
    ///
    /// Returns a guard that unregisters the connection when dropped and the
    /// receiving half to drain events from. Hold the guard for as long as the
    /// receiver is consumed.
    pub async fn subscribe(
        &self,
        user_id: Uuid,
    ) -> (SubscriptionGuard, mpsc::UnboundedReceiver<LifecycleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = Uuid::new_v4();

        let mut connections = self.connections.write().await;
        connections
            .entry(user_id)
            .or_default()
            .insert(connection_id, tx);

        debug!(%user_id, %connection_id, "Realtime connection registered");

        let guard = SubscriptionGuard {
            registry: self.clone(),
            user_id,
            connection_id,
        };
        (guard, rx)
    }

    /// Removes a connection, dropping the user's entry when it was the last
    pub async fn unsubscribe(&self, user_id: Uuid, connection_id: Uuid) {
        let mut connections = self.connections.write().await;
        if let Some(user_connections) = connections.get_mut(&user_id) {
            user_connections.remove(&connection_id);
            if user_connections.is_empty() {
                connections.remove(&user_id);
            }
        }
        debug!(%user_id, %connection_id, "Realtime connection removed");
    }

    /// Delivers an event to every live connection of a user
    ///
    /// Users with no connections are skipped silently. Senders whose receiver
    /// has gone away are pruned in passing.
    pub async fn publish(&self, user_id: Uuid, event: LifecycleEvent) {
        let mut connections = self.connections.write().await;
        let Some(user_connections) = connections.get_mut(&user_id) else {
            return;
        };

        user_connections.retain(|connection_id, tx| {
            let delivered = tx.send(event.clone()).is_ok();
            if !delivered {
                debug!(%user_id, %connection_id, "Pruning closed realtime connection");
            }
            delivered
        });

        if user_connections.is_empty() {
            connections.remove(&user_id);
        }
    }

    /// Delivers an event to each user in the slice
    pub async fn publish_to_all(&self, user_ids: &[Uuid], event: LifecycleEvent) {
        for user_id in user_ids {
            self.publish(*user_id, event.clone()).await;
        }
    }

    /// Number of users with at least one live connection
    pub async fn user_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Number of live connections for a user
    pub async fn connection_count(&self, user_id: Uuid) -> usize {
        self.connections
            .read()
            .await
            .get(&user_id)
            .map(|c| c.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> LifecycleEvent {
        LifecycleEvent::RoleUpdated {
            org_id: Uuid::new_v4(),
            role: "admin".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_all_connections() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();

        let (_guard1, mut rx1) = registry.subscribe(user_id).await;
        let (_guard2, mut rx2) = registry.subscribe(user_id).await;
        assert_eq!(registry.connection_count(user_id).await, 2);

        registry.publish(user_id, sample_event()).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_publish_to_absent_user_is_noop() {
        let registry = ConnectionRegistry::new();
        registry.publish(Uuid::new_v4(), sample_event()).await;
        assert_eq!(registry.user_count().await, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_empty_user_entry() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();

        let (guard, _rx) = registry.subscribe(user_id).await;
        assert_eq!(registry.user_count().await, 1);

        registry.unsubscribe(user_id, guard.connection_id()).await;
        assert_eq!(registry.user_count().await, 0);
        assert_eq!(registry.connection_count(user_id).await, 0);
    }

    #[tokio::test]
    async fn test_dropping_guard_unregisters_connection() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();

        let (guard, _rx) = registry.subscribe(user_id).await;
        assert_eq!(registry.user_count().await, 1);

        // A subscriber that never receives an event must still be cleaned up
        // when it goes away.
        drop(guard);
        tokio::task::yield_now().await;

        assert_eq!(registry.user_count().await, 0);
        assert_eq!(registry.connection_count(user_id).await, 0);
    }

    #[tokio::test]
    async fn test_publish_prunes_closed_connections() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();

        let (_guard, rx) = registry.subscribe(user_id).await;
        drop(rx);

        registry.publish(user_id, sample_event()).await;
        assert_eq!(registry.user_count().await, 0);
    }

    #[tokio::test]
    async fn test_events_are_isolated_per_user() {
        let registry = ConnectionRegistry::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let (_alice_guard, mut alice_rx) = registry.subscribe(alice).await;
        let (_bob_guard, mut bob_rx) = registry.subscribe(bob).await;

        registry.publish(alice, sample_event()).await;

        assert!(alice_rx.try_recv().is_ok());
        assert!(bob_rx.try_recv().is_err());
    }
}
