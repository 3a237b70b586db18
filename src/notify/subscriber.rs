use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::email::EmailSender;
use crate::event::{EventBus, PipelineEvent};

/// Listens to pipeline events and turns them into outbound emails.
///
/// Runs as a single background task per process. Send failures are
/// logged and swallowed; the pipeline that emitted the event has
/// already committed its writes by then.
pub struct NotificationSubscriber {
    email: Arc<dyn EmailSender + Send + Sync>,
    event_bus: Arc<EventBus>,
}

impl NotificationSubscriber {
    pub fn new(email: Arc<dyn EmailSender + Send + Sync>, event_bus: Arc<EventBus>) -> Self {
        Self { email, event_bus }
    }

    /// Start the subscription - spawns a background task that listens to
    /// pipeline events and routes them to the email sender
    pub fn start(self) -> JoinHandle<()> {
        // Subscribe before spawning so no event emitted right after this
        // call can be missed
        let mut receiver = self.event_bus.subscribe();

        info!("Starting notification subscription");

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => self.handle_event(event).await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Notification subscriber lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            warn!("Notification subscription ended - no more events");
        })
    }

    async fn handle_event(&self, event: PipelineEvent) {
        debug!(event_type = event.event_type(), "Received pipeline event");

        match event {
            PipelineEvent::RoundCompleted { round_id, .. } => {
                // Internal transition, results are not out yet
                debug!(round_id, "Round entered scoring, no email");
            }
            PipelineEvent::RoundScored {
                round_name,
                bets_scored,
                ..
            } => {
                if let Err(e) = self.email.send_round_scored(&round_name, bets_scored).await {
                    warn!(round_name, error = %e, "Failed to send round results email");
                }
            }
            PipelineEvent::WinnersDetermined {
                season_id,
                competition,
                winners,
                total_points,
            } => {
                if let Err(e) = self
                    .email
                    .send_winners_announcement(season_id, competition, &winners, total_points)
                    .await
                {
                    warn!(season_id, error = %e, "Failed to send winners announcement email");
                }
            }
        }
    }
}
