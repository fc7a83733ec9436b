use std::cmp::Ordering;
use std::collections::HashSet;

use crate::{
    error::NoSignalWarning,
    models::{MovieId, Prediction, PredictionSource},
    services::{
        engine::TrainedModel, item_based::ItemBasedScorer, user_based::UserBasedScorer, Estimate,
        Scorer,
    },
};

/// Weighted blend of the user-based and item-based scorers
///
/// `w · user + (1 − w) · item`. A silent source hands full weight to the
/// other; both silent propagates the warning so the caller can fall back.
pub struct HybridScorer<'a> {
    user: UserBasedScorer<'a>,
    item: ItemBasedScorer<'a>,
    user_weight: f64,
}

impl<'a> HybridScorer<'a> {
    pub fn new(model: &'a TrainedModel) -> Self {
        Self {
            user: UserBasedScorer::new(model),
            item: ItemBasedScorer::new(model),
            user_weight: model.config.hybrid_user_weight,
        }
    }
}

impl Scorer for HybridScorer<'_> {
    fn estimate(&self, user: usize, movie: usize) -> Result<Estimate, NoSignalWarning> {
        match (self.user.estimate(user, movie), self.item.estimate(user, movie)) {
            (Ok(by_user), Ok(by_item)) => Ok(Estimate {
                score: self.user_weight * by_user.score + (1.0 - self.user_weight) * by_item.score,
                source: PredictionSource::Hybrid,
                support: by_user.support + by_item.support,
            }),
            (Ok(by_user), Err(_)) => Ok(by_user),
            (Err(_), Ok(by_item)) => Ok(by_item),
            (Err(warning), Err(_)) => Err(warning),
        }
    }
}

/// Score descending, then support descending, then movie id ascending
pub fn compare_predictions(a: &Prediction, b: &Prediction) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then(b.support.cmp(&a.support))
        .then(a.movie_id.cmp(&b.movie_id))
}

/// Ranks every movie the user has not rated and returns the best `top_n`
///
/// Candidates without neighbor signal take their popularity score. When the
/// user has rated nearly everything the list is topped up from the
/// popularity ranking, so it holds `min(top_n, universe)` distinct movies.
pub fn rank(model: &TrainedModel, user: usize, scorer: &dyn Scorer, top_n: usize) -> Vec<Prediction> {
    if top_n == 0 {
        return Vec::new();
    }

    let matrix = &model.matrix;
    let user_id = matrix.user_id(user);
    let rated = matrix.row(user);
    let mut fallbacks = 0usize;

    let mut ranked: Vec<Prediction> = (0..matrix.n_movies())
        .filter(|movie| !rated.contains_key(movie))
        .map(|movie| match scorer.estimate(user, movie) {
            Ok(estimate) => Prediction {
                user_id,
                movie_id: matrix.movie_id(movie),
                score: estimate.score,
                source: estimate.source,
                support: estimate.support,
            },
            Err(warning) => {
                tracing::trace!(%warning, "Scoring fell back to popularity");
                fallbacks += 1;
                model.popularity.prediction(matrix, user_id, movie)
            }
        })
        .collect();

    if fallbacks > 0 {
        tracing::debug!(user_id, fallbacks, "Candidates without neighbor signal used popularity");
    }

    ranked.sort_by(compare_predictions);
    ranked.truncate(top_n);

    let wanted = top_n.min(matrix.n_movies());
    if ranked.len() < wanted {
        let mut taken: HashSet<MovieId> = ranked.iter().map(|p| p.movie_id).collect();
        for &movie in model.popularity.order() {
            if ranked.len() == wanted {
                break;
            }
            if taken.insert(matrix.movie_id(movie)) {
                ranked.push(model.popularity.prediction(matrix, user_id, movie));
            }
        }
        tracing::debug!(user_id, backfilled = ranked.len(), "Backfilled from popularity ranking");
    }

    ranked
}
