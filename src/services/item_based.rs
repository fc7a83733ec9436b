use crate::{
    error::NoSignalWarning,
    models::PredictionSource,
    services::{engine::TrainedModel, Estimate, Scorer},
};

/// Predicts from the user's own ratings of similar movies
///
/// The K movies most similar to the candidate that the user has rated each
/// contribute their mean-centered rating:
///
/// `candidate_mean + Σ sim · (rating − movie_mean) / Σ |sim|`
pub struct ItemBasedScorer<'a> {
    model: &'a TrainedModel,
}

impl<'a> ItemBasedScorer<'a> {
    pub fn new(model: &'a TrainedModel) -> Self {
        Self { model }
    }
}

impl Scorer for ItemBasedScorer<'_> {
    fn estimate(&self, user: usize, movie: usize) -> Result<Estimate, NoSignalWarning> {
        let matrix = &self.model.matrix;
        let rated = matrix.row(user);
        let limit = self.model.config.neighbors;

        let mut weighted = 0.0;
        let mut norm = 0.0;
        let mut used = 0;

        // The candidate is never its own neighbor
        for &(other, similarity) in self.model.item_similarity.neighbors(movie) {
            if used == limit {
                break;
            }
            if let Some(&rating) = rated.get(&other) {
                weighted += similarity * (rating - matrix.movie_mean(other));
                norm += similarity.abs();
                used += 1;
            }
        }

        if used == 0 || norm == 0.0 {
            return Err(NoSignalWarning {
                user_id: matrix.user_id(user),
                movie_id: matrix.movie_id(movie),
            });
        }

        let score = matrix.movie_mean(movie) + weighted / norm;
        Ok(Estimate {
            score: self.model.config.scale.clamp(score),
            source: PredictionSource::ItemBased,
            support: used,
        })
    }
}
