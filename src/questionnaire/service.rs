use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::models::QuestionType;
use super::normalize::{normalize_answer, prediction_matches};
use super::repository::QuestionnaireRepository;
use crate::bets::ScoringPolicy;
use crate::shared::AppError;

/// Outcome of one scoring sweep over season questionnaire answers.
#[derive(Debug, Default)]
pub struct AnswerScoringOutcome {
    /// Number of answers that received points this sweep
    pub answers_scored: usize,
    /// Per-season and per-answer failures; affected answers stay
    /// unscored and are retried on the next sweep
    pub errors: Vec<String>,
}

/// Awards points to season questionnaire answers.
///
/// A question becomes scorable once an admin records its valid-answer
/// set; the sweep then scores every unscored answer against it. Questions
/// whose valid answers are missing, or normalize to nothing, are left
/// alone so the set-once point write cannot lock in a zero by mistake.
pub struct QuestionnaireScoringService {
    questionnaire: Arc<dyn QuestionnaireRepository + Send + Sync>,
    policy: ScoringPolicy,
}

impl QuestionnaireScoringService {
    pub fn new(
        questionnaire: Arc<dyn QuestionnaireRepository + Send + Sync>,
        policy: ScoringPolicy,
    ) -> Self {
        Self {
            questionnaire,
            policy,
        }
    }

    /// Scores unscored answers in every season that has recorded valid
    /// answers. Failure to list those seasons is systemic and aborts the
    /// sweep; failures inside one season are recorded and the sweep moves
    /// on.
    #[instrument(skip(self))]
    pub async fn score_pending_answers(&self) -> Result<AnswerScoringOutcome, AppError> {
        let season_ids = self.questionnaire.get_scorable_season_ids().await?;
        info!(count = season_ids.len(), "Questionnaire sweep over scorable seasons");

        let mut outcome = AnswerScoringOutcome::default();

        for season_id in season_ids {
            match self.score_season(season_id).await {
                Ok((scored, season_errors)) => {
                    outcome.answers_scored += scored;
                    outcome.errors.extend(season_errors);
                }
                Err(e) => {
                    warn!(season_id, error = %e, "Failed to score season answers");
                    outcome.errors.push(format!("season {}: {}", season_id, e));
                }
            }
        }

        info!(
            answers_scored = outcome.answers_scored,
            errors = outcome.errors.len(),
            "Questionnaire sweep finished"
        );
        Ok(outcome)
    }

    async fn score_season(&self, season_id: i64) -> Result<(usize, Vec<String>), AppError> {
        let (questions, answers) = tokio::try_join!(
            self.questionnaire.get_questions_for_season(season_id),
            self.questionnaire.get_answers_for_season(season_id),
        )?;

        // Only questions whose valid answers normalize to something can
        // be scored against
        let scorable: HashMap<QuestionType, &serde_json::Value> = questions
            .iter()
            .filter(|q| !normalize_answer(&q.valid_answers).is_empty())
            .map(|q| (q.question_type, &q.valid_answers))
            .collect();

        let mut scored = 0;
        let mut errors = Vec::new();

        for answer in &answers {
            if answer.points.is_scored() {
                continue;
            }

            let valid_answers = match scorable.get(&answer.question_type) {
                Some(valid) => *valid,
                None => {
                    debug!(
                        season_id,
                        question_type = %answer.question_type,
                        "Question not scorable yet, skipping answer"
                    );
                    continue;
                }
            };

            let points = if prediction_matches(&answer.answer, valid_answers) {
                self.policy.questionnaire_correct_points
            } else {
                self.policy.incorrect_points
            };

            match self
                .questionnaire
                .record_points(answer.user_id, season_id, answer.question_type, points)
                .await
            {
                Ok(true) => scored += 1,
                Ok(false) => {
                    debug!(
                        user_id = %answer.user_id,
                        question_type = %answer.question_type,
                        "Answer already scored by a concurrent sweep"
                    );
                }
                Err(e) => errors.push(format!(
                    "answer by {} for {}: {}",
                    answer.user_id, answer.question_type, e
                )),
            }
        }

        Ok((scored, errors))
    }
}
