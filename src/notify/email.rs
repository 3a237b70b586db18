use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::user::UserModel;
use crate::winners::CompetitionType;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("email delivery failed: {0}")]
    Delivery(String),
}

/// Outbound email boundary.
///
/// Template rendering and actual delivery live behind this trait; the
/// core only decides when a mail goes out. Senders are fire-and-forget
/// from the pipeline's point of view, a failed send never rolls back
/// scoring or winner determination.
#[async_trait]
pub trait EmailSender {
    async fn send_round_scored(
        &self,
        round_name: &str,
        bets_scored: usize,
    ) -> Result<(), NotifyError>;

    async fn send_winners_announcement(
        &self,
        season_id: i64,
        competition: CompetitionType,
        winners: &[UserModel],
        total_points: i64,
    ) -> Result<(), NotifyError>;
}

/// Default sender that only logs what it would deliver. Used in dev and
/// wherever no mail provider is wired up.
pub struct LoggingEmailSender;

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send_round_scored(
        &self,
        round_name: &str,
        bets_scored: usize,
    ) -> Result<(), NotifyError> {
        info!(round_name, bets_scored, "Would send round results email");
        Ok(())
    }

    async fn send_winners_announcement(
        &self,
        season_id: i64,
        competition: CompetitionType,
        winners: &[UserModel],
        total_points: i64,
    ) -> Result<(), NotifyError> {
        let names: Vec<&str> = winners.iter().map(|u| u.username.as_str()).collect();
        info!(
            season_id,
            competition = %competition,
            winners = ?names,
            total_points,
            "Would send winners announcement email"
        );
        Ok(())
    }
}
