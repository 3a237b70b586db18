use tokio::sync::broadcast;
use tracing::debug;

use super::events::PipelineEvent;

/// Event bus for distributing pipeline events throughout the application.
///
/// A single process-wide broadcast channel: the pipeline runs are
/// sequential, so there is no per-topic fanout to manage. Subscribers that
/// fall behind simply miss events; delivery is best-effort by design.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

impl EventBus {
    /// Creates a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emits an event to all current subscribers
    pub fn emit(&self, event: PipelineEvent) {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(event_type, receivers = receiver_count, "Pipeline event emitted");
            }
            Err(_) => {
                debug!(event_type, "Pipeline event emitted with no receivers");
            }
        }
    }

    /// Subscribe to pipeline events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}
