//! Process-wide channel that sees the events of every project.
//!
//! The [`ConnectionRegistry`](super::ConnectionRegistry) forwards each
//! routed event here. Consumers that are not tied to one project (the
//! `/ws/events` firehose, the workspace watcher's echo tracker) read from it.

use atelier_types::event::ProjectEvent;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ProjectEvent>,
    capacity: usize,
}

impl EventBus {
    /// `capacity` is how many events a slow reader may fall behind before
    /// it sees `Lagged`. Zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProjectEvent> {
        self.sender.subscribe()
    }

    /// Returns how many readers the event reached. Zero readers is fine.
    pub fn publish(&self, event: ProjectEvent) -> usize {
        match self.sender.send(event) {
            Ok(reached) => reached,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(event = event.name(), project_id = %event.project_id(), "no global listeners");
                0
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_types::project::ProjectId;

    fn completed(project_id: ProjectId) -> ProjectEvent {
        ProjectEvent::WorkflowCompleted { project_id }
    }

    #[tokio::test]
    async fn interleaved_projects_arrive_in_publish_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let (a, b) = (ProjectId::new(), ProjectId::new());

        assert_eq!(bus.publish(completed(a)), 1);
        bus.publish(ProjectEvent::WorkflowCancelled { project_id: b });
        bus.publish(completed(a));

        let order: Vec<ProjectId> = (0..3).map(|_| rx.try_recv().unwrap().project_id()).collect();
        assert_eq!(order, vec![a, b, a]);
    }

    #[test]
    fn publishing_without_listeners_reaches_nobody() {
        let bus = EventBus::new(4);
        assert_eq!(bus.publish(completed(ProjectId::new())), 0);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn zero_capacity_is_raised() {
        assert_eq!(EventBus::new(0).capacity(), 1);
    }

    #[tokio::test]
    async fn slow_reader_lags_then_resumes() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        let id = ProjectId::new();
        for _ in 0..5 {
            bus.publish(completed(id));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert_eq!(rx.recv().await.unwrap().project_id(), id);
    }

    #[test]
    fn clones_share_one_channel() {
        let bus = EventBus::new(8);
        let mut rx = bus.clone().subscribe();
        bus.publish(completed(ProjectId::new()));
        assert!(rx.try_recv().is_ok());
    }
}
