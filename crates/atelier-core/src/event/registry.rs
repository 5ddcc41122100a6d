//! Per-project connection registry.
//!
//! Each project with at least one live subscriber owns a broadcast channel.
//! A [`Subscription`] is the handle a WebSocket or SSE connection holds; when
//! the last subscription of a project is dropped the channel is removed, so
//! the registry never accumulates entries for projects nobody is watching.
//!
//! Every published event is also forwarded to the global [`EventBus`].

use std::sync::Arc;

use atelier_types::event::ProjectEvent;
use atelier_types::project::ProjectId;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::broadcast;

use super::bus::EventBus;

struct Channel {
    sender: broadcast::Sender<ProjectEvent>,
    subscribers: usize,
}

struct RegistryInner {
    channels: DashMap<ProjectId, Channel>,
    bus: EventBus,
    capacity: usize,
}

impl RegistryInner {
    fn release(&self, project_id: &ProjectId) {
        if let Entry::Occupied(mut entry) = self.channels.entry(*project_id) {
            let channel = entry.get_mut();
            channel.subscribers = channel.subscribers.saturating_sub(1);
            if channel.subscribers == 0 {
                entry.remove();
                tracing::debug!(%project_id, "last subscriber left, channel removed");
            }
        }
    }
}

/// Routes project events to the connections watching that project.
///
/// Cheap to clone; clones share the same channels.
#[derive(Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RegistryInner>,
}

impl ConnectionRegistry {
    /// Create a registry whose per-project channels buffer `capacity` events.
    pub fn new(bus: EventBus, capacity: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                channels: DashMap::new(),
                bus,
                capacity,
            }),
        }
    }

    /// Register a connection for `project_id`, creating its channel on demand.
    pub fn subscribe(&self, project_id: ProjectId) -> Subscription {
        let receiver = match self.inner.channels.entry(project_id) {
            Entry::Occupied(mut entry) => {
                let channel = entry.get_mut();
                channel.subscribers += 1;
                channel.sender.subscribe()
            }
            Entry::Vacant(entry) => {
                let (sender, receiver) = broadcast::channel(self.inner.capacity);
                entry.insert(Channel {
                    sender,
                    subscribers: 1,
                });
                receiver
            }
        };

        Subscription {
            project_id,
            receiver,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Deliver an event to the project's subscribers and to the global bus.
    pub fn publish(&self, event: ProjectEvent) {
        let project_id = event.project_id();
        if let Some(channel) = self.inner.channels.get(&project_id) {
            let _ = channel.sender.send(event.clone());
        }
        self.inner.bus.publish(event);
    }

    /// Number of live subscriptions for a project.
    pub fn connection_count(&self, project_id: &ProjectId) -> usize {
        self.inner
            .channels
            .get(project_id)
            .map(|c| c.subscribers)
            .unwrap_or(0)
    }

    /// Projects that currently have at least one subscriber.
    pub fn active_projects(&self) -> Vec<ProjectId> {
        let mut ids: Vec<ProjectId> = self.inner.channels.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    /// The global bus every event is forwarded to.
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("projects", &self.inner.channels.len())
            .finish()
    }
}

/// A live subscription to one project's events.
///
/// Dropping it unregisters the connection.
pub struct Subscription {
    project_id: ProjectId,
    receiver: broadcast::Receiver<ProjectEvent>,
    registry: Arc<RegistryInner>,
}

impl Subscription {
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Wait for the next event.
    ///
    /// Returns `Lagged` when this subscriber fell behind; the caller may keep
    /// receiving afterwards.
    pub async fn recv(&mut self) -> Result<ProjectEvent, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Take an already-buffered event without waiting.
    pub fn try_recv(&mut self) -> Result<ProjectEvent, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.release(&self.project_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ConnectionRegistry {
        ConnectionRegistry::new(EventBus::new(16), 16)
    }

    fn completed(id: ProjectId) -> ProjectEvent {
        ProjectEvent::WorkflowCompleted { project_id: id }
    }

    #[tokio::test]
    async fn subscriber_receives_only_its_project() {
        let registry = registry();
        let a = ProjectId::new();
        let b = ProjectId::new();
        let mut sub_a = registry.subscribe(a);

        registry.publish(completed(b));
        registry.publish(completed(a));

        let event = sub_a.recv().await.unwrap();
        assert_eq!(event.project_id(), a);
    }

    #[test]
    fn drop_removes_channel_after_last_subscriber() {
        let registry = registry();
        let id = ProjectId::new();

        let first = registry.subscribe(id);
        let second = registry.subscribe(id);
        assert_eq!(registry.connection_count(&id), 2);
        assert_eq!(registry.active_projects(), vec![id]);

        drop(first);
        assert_eq!(registry.connection_count(&id), 1);

        drop(second);
        assert_eq!(registry.connection_count(&id), 0);
        assert!(registry.active_projects().is_empty());
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let registry = registry();
        registry.publish(completed(ProjectId::new()));
        assert!(registry.active_projects().is_empty());
    }

    #[tokio::test]
    async fn publish_forwards_to_global_bus() {
        let registry = registry();
        let mut global = registry.bus().subscribe();
        let id = ProjectId::new();

        registry.publish(completed(id));

        let event = global.recv().await.unwrap();
        assert_eq!(event.project_id(), id);
    }

    #[test]
    fn try_recv_drains_buffered_events() {
        let registry = registry();
        let id = ProjectId::new();
        let mut sub = registry.subscribe(id);
        assert!(sub.try_recv().is_err());

        registry.publish(completed(id));
        assert!(sub.try_recv().is_ok());
        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn resubscribe_after_cleanup_creates_fresh_channel() {
        let registry = registry();
        let id = ProjectId::new();
        drop(registry.subscribe(id));

        let mut sub = registry.subscribe(id);
        registry.publish(completed(id));
        assert!(sub.recv().await.is_ok());
        assert_eq!(registry.connection_count(&id), 1);
    }
}
