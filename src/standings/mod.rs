pub mod handlers;
pub mod models;
pub mod service;

pub use models::StandingsEntry;
pub use service::StandingsService;
