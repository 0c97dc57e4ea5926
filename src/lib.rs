pub mod api;
pub mod auto_tagger;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod retest;
pub mod similarity;
pub mod worksheet_service;

pub use auto_tagger::{apply_suggestion, Detector, MetadataExtractor, MetadataReview};
pub use catalog::{DataStore, LearningHistory, QuestionCatalog, SeedData};
pub use config::Config;
pub use errors::*;
pub use models::*;
pub use retest::{classify_trend, RetestComposer};
pub use similarity::{ScoreBreakdown, SimilarQuestion, SimilarityRanker, SimilarityWeights};
pub use worksheet_service::{ReviewDecision, ReviewOutcome, WorksheetService};
