//! Typed publish/subscribe channel for cross-component notifications.
//!
//! Toasts and completion notices go through an [`EventBus`] handed to each
//! component, so nothing depends on a global event target.

use tokio::sync::broadcast;

use crate::model::{CourseId, ExamId, MaterialKey, UserId};

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Info,
    Error,
}

/// Notifications published by the state machines.
#[derive(Debug, Clone, PartialEq)]
pub enum PortalEvent {
    Toast { level: ToastLevel, message: String },
    ExamSaved { course_id: CourseId, exam_id: Option<ExamId> },
    ExamDeleted { exam_id: ExamId, forced: bool },
    AttemptSubmitted { exam_id: ExamId, user_id: UserId },
    MaterialCompleted { course_id: CourseId, material: MaterialKey },
    MaterialsReordered { course_id: CourseId, failed: usize },
}

/// Cloneable handle to a broadcast channel of [`PortalEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PortalEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PortalEvent> {
        self.sender.subscribe()
    }

    /// Publish an event, returning how many subscribers received it.
    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: PortalEvent) -> usize {
        tracing::debug!(?event, "publishing portal event");
        self.sender.send(event).unwrap_or(0)
    }

    pub fn toast(&self, level: ToastLevel, message: impl Into<String>) -> usize {
        self.publish(PortalEvent::Toast {
            level,
            message: message.into(),
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        assert_eq!(bus.toast(ToastLevel::Success, "Avaliação salva"), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            PortalEvent::Toast {
                level: ToastLevel::Success,
                message: "Avaliação salva".into()
            }
        );
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        assert_eq!(
            bus.publish(PortalEvent::ExamDeleted {
                exam_id: 1,
                forced: false
            }),
            0
        );
    }
}
