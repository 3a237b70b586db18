//! Test assertion helpers - fluent API for verifying test expectations
#![allow(dead_code)] // Test utilities may not all be used in every test

use uuid::Uuid;

use matchday::cron::PipelineOutcome;
use matchday::standings::StandingsEntry;
use matchday::winners::{CompetitionType, SeasonWinnerRepository};

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct OutcomeAssertion<'a> {
    outcome: &'a PipelineOutcome,
}

impl<'a> OutcomeAssertion<'a> {
    pub fn for_outcome(outcome: &'a PipelineOutcome) -> Self {
        Self { outcome }
    }

    pub fn succeeded(self) -> Self {
        assert!(
            self.outcome.success,
            "expected a successful run, got: {:?}",
            self.outcome
        );
        self
    }

    pub fn failed(self) -> Self {
        assert!(
            !self.outcome.success,
            "expected a failed run, got: {:?}",
            self.outcome
        );
        self
    }

    /// No errors at all, clean run
    pub fn clean(self) -> Self {
        assert_eq!(
            self.outcome.error_count, 0,
            "unexpected errors: {:?}",
            self.outcome.detailed_errors
        );
        self
    }

    pub fn error_count(self, expected: usize) -> Self {
        assert_eq!(
            self.outcome.error_count, expected,
            "error count mismatch: {:?}",
            self.outcome.detailed_errors
        );
        self
    }

    pub fn determined_winners(self, expected: usize) -> Self {
        assert_eq!(
            self.outcome.total_winners_determined, expected,
            "winner count mismatch in {:?}",
            self.outcome
        );
        self
    }
}

pub struct StandingsAssertion<'a> {
    setup: &'a TestSetup,
    table: &'a [StandingsEntry],
}

impl<'a> StandingsAssertion<'a> {
    pub fn for_table(setup: &'a TestSetup, table: &'a [StandingsEntry]) -> Self {
        Self { setup, table }
    }

    /// Assert the exact top-to-bottom user order
    pub fn order(self, expected: &[&str]) -> Self {
        let actual: Vec<Uuid> = self.table.iter().map(|e| e.user_id).collect();
        let expected_ids: Vec<Uuid> = expected.iter().map(|n| self.setup.user_id(n)).collect();
        assert_eq!(actual, expected_ids, "standings order mismatch");
        self
    }

    /// Assert one user's rank and combined total
    pub fn entry(self, user: &str, rank: u32, combined_total: i64) -> Self {
        let id = self.setup.user_id(user);
        let entry = self
            .table
            .iter()
            .find(|e| e.user_id == id)
            .unwrap_or_else(|| panic!("{} missing from standings", user));
        assert_eq!(entry.rank, rank, "{} has the wrong rank", user);
        assert_eq!(
            entry.combined_total, combined_total,
            "{} has the wrong total",
            user
        );
        self
    }

    pub fn len(self, expected: usize) -> Self {
        assert_eq!(self.table.len(), expected, "standings size mismatch");
        self
    }
}

/// Assert the stored winner rows for one competition, in any order
pub async fn assert_winners(
    setup: &TestSetup,
    season_id: i64,
    competition: CompetitionType,
    expected: &[&str],
    final_points: i64,
) {
    let rows = setup.winners.get_winners_for_season(season_id).await.unwrap();
    let competition_rows: Vec<_> = rows
        .iter()
        .filter(|w| w.competition_type == competition)
        .collect();

    let mut actual: Vec<Uuid> = competition_rows.iter().map(|w| w.user_id).collect();
    actual.sort();
    let mut expected_ids: Vec<Uuid> = expected.iter().map(|n| setup.user_id(n)).collect();
    expected_ids.sort();
    assert_eq!(actual, expected_ids, "{} winner set mismatch", competition);

    for row in competition_rows {
        assert_eq!(
            row.final_points, final_points,
            "{} winning total mismatch",
            competition
        );
    }
}
