pub mod actions;
pub mod assertions;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use assertions::{assert_winners, OutcomeAssertion, StandingsAssertion};
#[allow(unused_imports)]
pub use mocks::{BrokenQuestionnaireRepository, RecordingAlerter, RecordingEmailSender};
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder, TEST_CRON_SECRET};
