pub mod models;
pub mod repository;
pub mod service;

pub use models::{CompetitionType, SeasonWinnerModel, WinnerDeterminationResult};
pub use repository::{
    InMemorySeasonWinnerRepository, PostgresSeasonWinnerRepository, SeasonWinnerRepository,
};
pub use service::WinnerDeterminationService;
