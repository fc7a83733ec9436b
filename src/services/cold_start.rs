use crate::{
    models::{MovieId, Prediction, PredictionSource, UserId},
    services::matrix::InteractionMatrix,
};

/// Popularity ranking used for unknown users and as the scoring fallback
///
/// Each movie scores its Bayesian average, which shrinks thinly rated movies
/// toward the global mean. The ranking is fixed at training time.
#[derive(Debug, Clone, PartialEq)]
pub struct PopularityRanking {
    scores: Vec<f64>,
    order: Vec<usize>,
}

impl PopularityRanking {
    pub fn build(matrix: &InteractionMatrix, min_votes: f64) -> Self {
        let prior = matrix.global_mean();
        let scores: Vec<f64> = (0..matrix.n_movies())
            .map(|movie| {
                bayesian_average(
                    matrix.movie_mean(movie),
                    matrix.movie_count(movie),
                    prior,
                    min_votes,
                )
            })
            .collect();

        let mut order: Vec<usize> = (0..matrix.n_movies()).collect();
        // Index order is id order, so the final tie-break is the lower id
        order.sort_by(|&a, &b| {
            scores[b]
                .total_cmp(&scores[a])
                .then(matrix.movie_count(b).cmp(&matrix.movie_count(a)))
                .then(a.cmp(&b))
        });

        Self { scores, order }
    }

    pub fn score(&self, movie: usize) -> f64 {
        self.scores[movie]
    }

    /// Movie indices, most popular first
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn prediction(&self, matrix: &InteractionMatrix, user_id: UserId, movie: usize) -> Prediction {
        Prediction {
            user_id,
            movie_id: matrix.movie_id(movie),
            score: self.scores[movie],
            source: PredictionSource::PopularityFallback,
            support: matrix.movie_count(movie),
        }
    }

    /// The head of the ranking; identical for every caller
    pub fn top(&self, matrix: &InteractionMatrix, user_id: UserId, n: usize) -> Vec<Prediction> {
        self.order
            .iter()
            .take(n)
            .map(|&movie| self.prediction(matrix, user_id, movie))
            .collect()
    }
}

/// `(v·R + m·C) / (v + m)` for `v` votes averaging `R`, prior mean `C`
/// and `m` pseudo-votes
pub fn bayesian_average(mean: f64, votes: usize, prior: f64, min_votes: f64) -> f64 {
    let v = votes as f64;
    if v + min_votes == 0.0 {
        return prior;
    }
    (v * mean + min_votes * prior) / (v + min_votes)
}

/// Prediction for a movie absent from the training snapshot
pub fn unseen_movie(matrix: &InteractionMatrix, user_id: UserId, movie_id: MovieId) -> Prediction {
    Prediction {
        user_id,
        movie_id,
        score: matrix.global_mean(),
        source: PredictionSource::PopularityFallback,
        support: 0,
    }
}
