use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::{CompetitionType, SeasonWinnerModel, WinnerDeterminationResult};
use super::repository::SeasonWinnerRepository;
use crate::event::{EventBus, PipelineEvent};
use crate::round::{RoundRepository, RoundStatus};
use crate::season::{SeasonModel, SeasonRepository};
use crate::shared::AppError;
use crate::standings::StandingsService;
use crate::user::UserRepository;

/// Determines and records season winners exactly once.
///
/// A season becomes a candidate when its scheduled end has passed and
/// every remaining round is scored or cancelled. Each candidate is
/// processed once per competition; the existence check plus the
/// conflict-guarded insert make the whole operation idempotent under
/// retries and concurrent runs.
pub struct WinnerDeterminationService {
    seasons: Arc<dyn SeasonRepository + Send + Sync>,
    rounds: Arc<dyn RoundRepository + Send + Sync>,
    standings: Arc<StandingsService>,
    winners: Arc<dyn SeasonWinnerRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
    event_bus: Arc<EventBus>,
}

impl WinnerDeterminationService {
    pub fn new(
        seasons: Arc<dyn SeasonRepository + Send + Sync>,
        rounds: Arc<dyn RoundRepository + Send + Sync>,
        standings: Arc<StandingsService>,
        winners: Arc<dyn SeasonWinnerRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            seasons,
            rounds,
            standings,
            winners,
            users,
            event_bus,
        }
    }

    /// Processes every completed season, one result entry per
    /// (season, competition) pair.
    ///
    /// Failure to list candidate seasons is systemic and aborts the run;
    /// everything after that is isolated per season and per competition.
    #[instrument(skip(self))]
    pub async fn determine_winners_for_completed_seasons(
        &self,
    ) -> Result<Vec<WinnerDeterminationResult>, AppError> {
        let ended = self.seasons.get_ended_seasons(Utc::now()).await?;
        info!(count = ended.len(), "Checking ended seasons for winner determination");

        let mut results = Vec::new();

        for season in ended {
            let complete = match self.is_season_complete(season.id).await {
                Ok(complete) => complete,
                Err(e) => {
                    warn!(season_id = season.id, error = %e, "Season completion check failed");
                    let mut result =
                        WinnerDeterminationResult::new(season.id, CompetitionType::League);
                    result.errors.push(format!("completion check: {}", e));
                    results.push(result);
                    continue;
                }
            };

            if !complete {
                debug!(season_id = season.id, "Season still has unscored rounds, skipping");
                continue;
            }

            for competition in [CompetitionType::League, CompetitionType::LastRoundSpecial] {
                results.push(self.determine_for_pair(&season, competition).await);
            }
        }

        Ok(results)
    }

    /// A season is complete when its rounds exist, at least one was
    /// scored, and none is still open or scoring.
    async fn is_season_complete(&self, season_id: i64) -> Result<bool, AppError> {
        let rounds = self.rounds.get_rounds_for_season(season_id).await?;

        let any_scored = rounds.iter().any(|r| r.status == RoundStatus::Scored);
        let all_settled = rounds
            .iter()
            .all(|r| matches!(r.status, RoundStatus::Scored | RoundStatus::Cancelled));

        Ok(any_scored && all_settled)
    }

    async fn determine_for_pair(
        &self,
        season: &SeasonModel,
        competition: CompetitionType,
    ) -> WinnerDeterminationResult {
        let mut result = WinnerDeterminationResult::new(season.id, competition);

        match self.winners.winners_exist(season.id, competition).await {
            Ok(true) => {
                debug!(
                    season_id = season.id,
                    competition = %competition,
                    "Winners already determined, skipping"
                );
                result.is_season_already_determined = true;
                return result;
            }
            Ok(false) => {}
            Err(e) => {
                result.errors.push(format!("existence check: {}", e));
                return result;
            }
        }

        let table = match competition {
            CompetitionType::League => self.standings.calculate_standings(season.id).await,
            CompetitionType::LastRoundSpecial => {
                self.standings.calculate_cup_standings(season.id).await
            }
        };
        let table = match table {
            Ok(table) => table,
            Err(e) => {
                result.errors.push(format!("standings: {}", e));
                return result;
            }
        };

        let top_total = match table.first() {
            Some(top) => top.combined_total,
            None => {
                debug!(
                    season_id = season.id,
                    competition = %competition,
                    "No point records, nothing to determine"
                );
                return result;
            }
        };

        // Everyone sharing the top total wins; the table is sorted by
        // total descending so the winners sit at the front
        let winning_ids: Vec<Uuid> = table
            .iter()
            .take_while(|entry| entry.combined_total == top_total)
            .map(|entry| entry.user_id)
            .collect();

        let rows: Vec<SeasonWinnerModel> = winning_ids
            .iter()
            .map(|user_id| SeasonWinnerModel {
                season_id: season.id,
                competition_type: competition,
                user_id: *user_id,
                final_points: top_total,
            })
            .collect();

        let written = match self.winners.insert_winners(&rows).await {
            Ok(written) => written,
            Err(e) => {
                result.errors.push(format!("winner insert: {}", e));
                return result;
            }
        };

        if written == 0 {
            // A concurrent run inserted between our existence check and
            // the write; the constraint absorbed the race
            debug!(
                season_id = season.id,
                competition = %competition,
                "Winners inserted by a concurrent run"
            );
            result.is_season_already_determined = true;
            return result;
        }

        match self.users.get_users_by_ids(&winning_ids).await {
            Ok(users) => result.winners = users,
            Err(e) => result.errors.push(format!("winner hydration: {}", e)),
        }

        info!(
            season_id = season.id,
            season_name = %season.name,
            competition = %competition,
            winners = winning_ids.len(),
            top_total,
            "Season winners determined"
        );

        self.event_bus.emit(PipelineEvent::WinnersDetermined {
            season_id: season.id,
            competition,
            winners: result.winners.clone(),
            total_points: top_total,
        });

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bets::models::{BetModel, BetPoints};
    use crate::bets::repository::InMemoryBetRepository;
    use crate::fixture::MatchOutcome;
    use crate::questionnaire::repository::InMemoryQuestionnaireRepository;
    use crate::round::{InMemoryRoundRepository, RoundModel};
    use crate::season::InMemorySeasonRepository;
    use crate::user::{InMemoryUserRepository, UserModel};
    use crate::winners::repository::InMemorySeasonWinnerRepository;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    /// Test helper functions for creating test data
    mod helpers {
        use super::*;

        pub struct Setup {
            pub seasons: Arc<InMemorySeasonRepository>,
            pub rounds: Arc<InMemoryRoundRepository>,
            pub bets: Arc<InMemoryBetRepository>,
            pub users: Arc<InMemoryUserRepository>,
            pub winners: Arc<InMemorySeasonWinnerRepository>,
            pub event_bus: Arc<EventBus>,
            pub service: WinnerDeterminationService,
        }

        pub fn setup() -> Setup {
            let seasons = Arc::new(InMemorySeasonRepository::new());
            let rounds = Arc::new(InMemoryRoundRepository::new());
            let bets = Arc::new(InMemoryBetRepository::new());
            let questionnaire = Arc::new(InMemoryQuestionnaireRepository::new());
            let users = Arc::new(InMemoryUserRepository::new());
            let winners = Arc::new(InMemorySeasonWinnerRepository::new());
            let event_bus = Arc::new(EventBus::default());

            let standings = Arc::new(StandingsService::new(
                rounds.clone(),
                bets.clone(),
                questionnaire.clone(),
            ));
            let service = WinnerDeterminationService::new(
                seasons.clone(),
                rounds.clone(),
                standings,
                winners.clone(),
                users.clone(),
                event_bus.clone(),
            );

            Setup {
                seasons,
                rounds,
                bets,
                users,
                winners,
                event_bus,
                service,
            }
        }

        pub fn ended_season(id: i64) -> SeasonModel {
            SeasonModel {
                id,
                name: format!("Season {}", id),
                ends_at: Utc::now() - Duration::days(7),
            }
        }

        pub fn scored_round(id: i64, season_id: i64, is_cup_round: bool) -> RoundModel {
            RoundModel {
                id,
                season_id,
                name: format!("Round {}", id),
                status: RoundStatus::Scored,
                is_cup_round,
                deadline: Utc::now() - Duration::days(8),
            }
        }

        pub fn scored_bet(user_id: Uuid, fixture_id: i64, round_id: i64, points: i32) -> BetModel {
            BetModel {
                user_id,
                fixture_id,
                round_id,
                predicted: MatchOutcome::HomeWin,
                predicted_home: None,
                predicted_away: None,
                points: BetPoints::Scored(points),
            }
        }

        pub fn user(id: Uuid, name: &str) -> UserModel {
            UserModel {
                id,
                username: name.to_string(),
                email: format!("{}@example.com", name),
            }
        }
    }

    use helpers::*;

    #[tokio::test]
    async fn test_determines_league_and_cup_winners() {
        let setup = setup();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        setup.seasons.insert_season(ended_season(1));
        setup.rounds.insert_round(scored_round(1, 1, false), vec![10]);
        setup.rounds.insert_round(scored_round(2, 1, true), vec![20]);
        setup.bets.insert_bet(scored_bet(alice, 10, 1, 5));
        setup.bets.insert_bet(scored_bet(bob, 10, 1, 2));
        setup.bets.insert_bet(scored_bet(bob, 20, 2, 3));
        setup.users.insert_user(user(alice, "alice"));
        setup.users.insert_user(user(bob, "bob"));

        let results = setup
            .service
            .determine_winners_for_completed_seasons()
            .await
            .unwrap();

        assert_eq!(results.len(), 2);

        let league = results
            .iter()
            .find(|r| r.competition_type == CompetitionType::League)
            .unwrap();
        assert!(!league.is_season_already_determined);
        assert_eq!(league.winners.len(), 1);
        assert_eq!(league.winners[0].username, "alice");

        // Bob wins the cup on the cup round alone
        let cup = results
            .iter()
            .find(|r| r.competition_type == CompetitionType::LastRoundSpecial)
            .unwrap();
        assert_eq!(cup.winners.len(), 1);
        assert_eq!(cup.winners[0].username, "bob");

        assert_eq!(setup.winners.winner_count(), 2);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent_noop() {
        let setup = setup();
        let alice = Uuid::new_v4();

        setup.seasons.insert_season(ended_season(1));
        setup.rounds.insert_round(scored_round(1, 1, false), vec![10]);
        setup.bets.insert_bet(scored_bet(alice, 10, 1, 5));
        setup.users.insert_user(user(alice, "alice"));

        setup
            .service
            .determine_winners_for_completed_seasons()
            .await
            .unwrap();
        let rows_after_first = setup.winners.winner_count();

        let mut rx = setup.event_bus.subscribe();
        let second = setup
            .service
            .determine_winners_for_completed_seasons()
            .await
            .unwrap();

        let league = second
            .iter()
            .find(|r| r.competition_type == CompetitionType::League)
            .unwrap();
        assert!(league.is_season_already_determined);
        assert!(league.winners.is_empty());
        assert_eq!(setup.winners.winner_count(), rows_after_first);
        // No event on the no-op run
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_tied_top_users_are_all_recorded() {
        let setup = setup();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        setup.seasons.insert_season(ended_season(1));
        setup.rounds.insert_round(scored_round(1, 1, false), vec![10]);
        setup.bets.insert_bet(scored_bet(alice, 10, 1, 50));
        setup.bets.insert_bet(scored_bet(bob, 10, 1, 50));
        setup.users.insert_user(user(alice, "alice"));
        setup.users.insert_user(user(bob, "bob"));

        let results = setup
            .service
            .determine_winners_for_completed_seasons()
            .await
            .unwrap();

        let league = results
            .iter()
            .find(|r| r.competition_type == CompetitionType::League)
            .unwrap();
        assert_eq!(league.winners.len(), 2);

        let stored = setup.winners.get_winners_for_season(1).await.unwrap();
        let league_rows: Vec<_> = stored
            .iter()
            .filter(|w| w.competition_type == CompetitionType::League)
            .collect();
        assert_eq!(league_rows.len(), 2);
        assert!(league_rows.iter().all(|w| w.final_points == 50));
    }

    #[tokio::test]
    async fn test_season_with_open_round_is_not_a_candidate() {
        let setup = setup();

        setup.seasons.insert_season(ended_season(1));
        setup.rounds.insert_round(scored_round(1, 1, false), vec![10]);
        setup.rounds.insert_round(
            RoundModel {
                status: RoundStatus::Open,
                ..scored_round(2, 1, false)
            },
            vec![20],
        );

        let results = setup
            .service
            .determine_winners_for_completed_seasons()
            .await
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(setup.winners.winner_count(), 0);
    }

    #[tokio::test]
    async fn test_running_season_is_not_a_candidate() {
        let setup = setup();

        setup.seasons.insert_season(SeasonModel {
            ends_at: Utc::now() + Duration::days(90),
            ..ended_season(1)
        });
        setup.rounds.insert_round(scored_round(1, 1, false), vec![10]);

        let results = setup
            .service
            .determine_winners_for_completed_seasons()
            .await
            .unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_rounds_do_not_block_completion() {
        let setup = setup();
        let alice = Uuid::new_v4();

        setup.seasons.insert_season(ended_season(1));
        setup.rounds.insert_round(scored_round(1, 1, false), vec![10]);
        setup.rounds.insert_round(
            RoundModel {
                status: RoundStatus::Cancelled,
                ..scored_round(2, 1, false)
            },
            vec![20],
        );
        setup.bets.insert_bet(scored_bet(alice, 10, 1, 5));
        setup.users.insert_user(user(alice, "alice"));

        let results = setup
            .service
            .determine_winners_for_completed_seasons()
            .await
            .unwrap();

        let league = results
            .iter()
            .find(|r| r.competition_type == CompetitionType::League)
            .unwrap();
        assert_eq!(league.winners.len(), 1);
    }

    #[tokio::test]
    async fn test_no_point_records_determines_nothing() {
        let setup = setup();

        setup.seasons.insert_season(ended_season(1));
        setup.rounds.insert_round(scored_round(1, 1, false), vec![10]);

        let results = setup
            .service
            .determine_winners_for_completed_seasons()
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.winners.is_empty()));
        assert!(results.iter().all(|r| !r.is_season_already_determined));
        assert_eq!(setup.winners.winner_count(), 0);
    }

    #[tokio::test]
    async fn test_winner_event_is_emitted() {
        let setup = setup();
        let alice = Uuid::new_v4();

        setup.seasons.insert_season(ended_season(1));
        setup.rounds.insert_round(scored_round(1, 1, false), vec![10]);
        setup.bets.insert_bet(scored_bet(alice, 10, 1, 50));
        setup.users.insert_user(user(alice, "alice"));

        let mut rx = setup.event_bus.subscribe();
        setup
            .service
            .determine_winners_for_completed_seasons()
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            PipelineEvent::WinnersDetermined {
                season_id,
                competition,
                winners,
                total_points,
            } => {
                assert_eq!(season_id, 1);
                assert_eq!(competition, CompetitionType::League);
                assert_eq!(winners.len(), 1);
                assert_eq!(total_points, 50);
            }
            other => panic!("Expected WinnersDetermined, got {:?}", other),
        }
    }

    /// Winner repository that fails for one season, for isolation tests
    struct FlakyWinnerRepository {
        inner: InMemorySeasonWinnerRepository,
        fail_season: i64,
    }

    #[async_trait]
    impl SeasonWinnerRepository for FlakyWinnerRepository {
        async fn winners_exist(
            &self,
            season_id: i64,
            competition_type: CompetitionType,
        ) -> Result<bool, AppError> {
            if season_id == self.fail_season {
                return Err(AppError::DatabaseError("connection reset".to_string()));
            }
            self.inner.winners_exist(season_id, competition_type).await
        }

        async fn insert_winners(&self, winners: &[SeasonWinnerModel]) -> Result<u64, AppError> {
            if winners.iter().any(|w| w.season_id == self.fail_season) {
                return Err(AppError::DatabaseError("connection reset".to_string()));
            }
            self.inner.insert_winners(winners).await
        }

        async fn get_winners_for_season(
            &self,
            season_id: i64,
        ) -> Result<Vec<SeasonWinnerModel>, AppError> {
            self.inner.get_winners_for_season(season_id).await
        }
    }

    #[tokio::test]
    async fn test_one_bad_season_does_not_block_others() {
        let seasons = Arc::new(InMemorySeasonRepository::new());
        let rounds = Arc::new(InMemoryRoundRepository::new());
        let bets = Arc::new(InMemoryBetRepository::new());
        let questionnaire = Arc::new(InMemoryQuestionnaireRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let winners = Arc::new(FlakyWinnerRepository {
            inner: InMemorySeasonWinnerRepository::new(),
            fail_season: 1,
        });
        let event_bus = Arc::new(EventBus::default());
        let standings = Arc::new(StandingsService::new(
            rounds.clone(),
            bets.clone(),
            questionnaire.clone(),
        ));
        let service = WinnerDeterminationService::new(
            seasons.clone(),
            rounds.clone(),
            standings,
            winners.clone(),
            users.clone(),
            event_bus,
        );

        let alice = Uuid::new_v4();
        for season_id in [1, 2] {
            seasons.insert_season(ended_season(season_id));
            let round_id = season_id * 10;
            rounds.insert_round(
                scored_round(round_id, season_id, false),
                vec![round_id + 1],
            );
            bets.insert_bet(scored_bet(alice, round_id + 1, round_id, 5));
        }
        users.insert_user(user(alice, "alice"));

        let results = service
            .determine_winners_for_completed_seasons()
            .await
            .unwrap();

        let bad: Vec<_> = results.iter().filter(|r| r.season_id == 1).collect();
        assert!(bad.iter().all(|r| !r.errors.is_empty()));

        let good = results
            .iter()
            .find(|r| r.season_id == 2 && r.competition_type == CompetitionType::League)
            .unwrap();
        assert!(good.errors.is_empty());
        assert_eq!(good.winners.len(), 1);
    }
}
