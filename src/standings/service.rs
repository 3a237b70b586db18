use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::models::StandingsEntry;
use crate::bets::BetRepository;
use crate::questionnaire::QuestionnaireRepository;
use crate::round::RoundRepository;
use crate::shared::AppError;

/// Computes ranked standings from scored point records.
///
/// Pure read/compute: nothing is persisted and identical inputs always
/// produce the identical table, including tie ordering. An `Err` means an
/// upstream fetch failed; an empty league is `Ok(vec![])`.
pub struct StandingsService {
    rounds: Arc<dyn RoundRepository + Send + Sync>,
    bets: Arc<dyn BetRepository + Send + Sync>,
    questionnaire: Arc<dyn QuestionnaireRepository + Send + Sync>,
}

impl StandingsService {
    pub fn new(
        rounds: Arc<dyn RoundRepository + Send + Sync>,
        bets: Arc<dyn BetRepository + Send + Sync>,
        questionnaire: Arc<dyn QuestionnaireRepository + Send + Sync>,
    ) -> Self {
        Self {
            rounds,
            bets,
            questionnaire,
        }
    }

    /// League standings: match-bet points over every round of the season
    /// plus questionnaire points.
    #[instrument(skip(self))]
    pub async fn calculate_standings(
        &self,
        season_id: i64,
    ) -> Result<Vec<StandingsEntry>, AppError> {
        let rounds = self.rounds.get_rounds_for_season(season_id).await?;
        let round_ids: Vec<i64> = rounds.iter().map(|r| r.id).collect();

        let (game_points, dynamic_points) = tokio::try_join!(
            self.bets.sum_scored_points_by_user(&round_ids),
            self.questionnaire.sum_scored_points_by_user(season_id),
        )?;

        let table = rank_entries(game_points, dynamic_points);
        debug!(season_id, entries = table.len(), "League standings computed");
        Ok(table)
    }

    /// Cup standings for the last-round-special competition: match-bet
    /// points over the season's cup rounds only, no questionnaire points.
    #[instrument(skip(self))]
    pub async fn calculate_cup_standings(
        &self,
        season_id: i64,
    ) -> Result<Vec<StandingsEntry>, AppError> {
        let rounds = self.rounds.get_rounds_for_season(season_id).await?;
        let cup_round_ids: Vec<i64> = rounds
            .iter()
            .filter(|r| r.is_cup_round)
            .map(|r| r.id)
            .collect();

        let game_points = self.bets.sum_scored_points_by_user(&cup_round_ids).await?;

        let table = rank_entries(game_points, HashMap::new());
        debug!(season_id, entries = table.len(), "Cup standings computed");
        Ok(table)
    }
}

/// Builds the ranked table from per-user point sums.
///
/// Ordering is combined total descending with user ID ascending as the
/// tie-break, which keeps repeated runs byte-identical. Ranks are dense:
/// totals [50, 50, 40] rank [1, 1, 2].
fn rank_entries(
    game_points: HashMap<Uuid, i64>,
    dynamic_points: HashMap<Uuid, i64>,
) -> Vec<StandingsEntry> {
    let user_ids: HashSet<Uuid> = game_points
        .keys()
        .chain(dynamic_points.keys())
        .copied()
        .collect();

    let mut entries: Vec<StandingsEntry> = user_ids
        .into_iter()
        .map(|user_id| {
            let game = game_points.get(&user_id).copied().unwrap_or(0);
            let dynamic = dynamic_points.get(&user_id).copied().unwrap_or(0);
            StandingsEntry {
                user_id,
                game_points: game,
                dynamic_points: dynamic,
                combined_total: game + dynamic,
                rank: 0,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.combined_total
            .cmp(&a.combined_total)
            .then(a.user_id.cmp(&b.user_id))
    });

    let mut rank = 0u32;
    let mut previous_total = None;
    for entry in entries.iter_mut() {
        if previous_total != Some(entry.combined_total) {
            rank += 1;
            previous_total = Some(entry.combined_total);
        }
        entry.rank = rank;
    }

    entries
}
