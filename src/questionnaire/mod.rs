pub mod models;
pub mod normalize;
pub mod repository;
pub mod service;

pub use models::{QuestionType, SeasonAnswerModel, SeasonQuestionModel};
pub use normalize::{normalize_answer, prediction_matches};
pub use repository::{
    InMemoryQuestionnaireRepository, PostgresQuestionnaireRepository, QuestionnaireRepository,
};
pub use service::{AnswerScoringOutcome, QuestionnaireScoringService};
