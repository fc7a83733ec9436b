/// Collaborative-filtering engine and the service that serves it
///
/// Training flows one way: rating store → interaction matrix → similarity
/// matrices → scorers → blender. Every scorer implements [`Scorer`] so the
/// recommendation kind can be resolved once, at the engine facade.
use crate::{error::NoSignalWarning, models::PredictionSource};

pub mod blender;
pub mod catalog;
pub mod cold_start;
pub mod engine;
pub mod evaluator;
pub mod item_based;
pub mod matrix;
pub mod recommendation_service;
pub mod similarity;
pub mod store;
pub mod user_based;

pub use catalog::{MovieCatalog, MovieFilter};
pub use engine::TrainedModel;
pub use recommendation_service::RecommendationService;
pub use store::{InMemoryRatingStore, RatingStore};

/// A predicted score before it is attached to user and movie ids
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub score: f64,
    pub source: PredictionSource,
    pub support: usize,
}

/// Predicts a user's rating for a movie from a trained model
///
/// Indices are the model's dense matrix indices. A scorer without evidence
/// for the pair returns [`NoSignalWarning`] rather than a zero score.
pub trait Scorer {
    fn estimate(&self, user: usize, movie: usize) -> Result<Estimate, NoSignalWarning>;
}
