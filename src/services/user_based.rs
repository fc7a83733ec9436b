use crate::{
    error::NoSignalWarning,
    models::PredictionSource,
    services::{engine::TrainedModel, Estimate, Scorer},
};

/// Predicts from the ratings of similar users
///
/// Among the users who rated the candidate, the K most similar to the target
/// contribute their mean-centered rating weighted by similarity:
///
/// `target_mean + Σ sim · (rating − neighbor_mean) / Σ |sim|`
pub struct UserBasedScorer<'a> {
    model: &'a TrainedModel,
}

impl<'a> UserBasedScorer<'a> {
    pub fn new(model: &'a TrainedModel) -> Self {
        Self { model }
    }
}

impl Scorer for UserBasedScorer<'_> {
    fn estimate(&self, user: usize, movie: usize) -> Result<Estimate, NoSignalWarning> {
        let matrix = &self.model.matrix;
        let raters = matrix.column(movie);
        let limit = self.model.config.neighbors;

        let mut weighted = 0.0;
        let mut norm = 0.0;
        let mut used = 0;

        for &(neighbor, similarity) in self.model.user_similarity.neighbors(user) {
            if used == limit {
                break;
            }
            if let Some(&rating) = raters.get(&neighbor) {
                weighted += similarity * (rating - matrix.user_mean(neighbor));
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

        let score = matrix.user_mean(user) + weighted / norm;
        Ok(Estimate {
            score: self.model.config.scale.clamp(score),
            source: PredictionSource::UserBased,
            support: used,
        })
    }
}
