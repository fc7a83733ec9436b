use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MovieId, UserId};

/// Accuracy and ranking metrics from an offline evaluation run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationReport {
    pub rmse: f64,
    pub mae: f64,
    pub precision_at_k: f64,
    pub recall_at_k: f64,
    pub k: usize,
    pub train_size: usize,
    pub test_size: usize,
    /// Test ratings whose prediction came from the popularity fallback
    pub fallback_predictions: usize,
    /// Users with at least one relevant test rating
    pub ranked_users: usize,
}

/// Shape of an interaction matrix
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MatrixStats {
    pub users: usize,
    pub movies: usize,
    pub ratings: usize,
    /// Share of empty cells in the user x movie grid
    pub sparsity: f64,
    pub global_mean: f64,
}

/// Public description of the currently served model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub version: u64,
    pub trained_at: DateTime<Utc>,
    pub stats: MatrixStats,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SimilarFan {
    pub user_id: UserId,
    pub similarity: f64,
}

/// Collaborative evidence behind recommending a movie to a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Explanation {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Users who rated the movie at or above the relevance threshold
    pub fans: usize,
    /// Fans whose similarity to the user clears the explanation floor
    pub similar_fans: usize,
    pub top_similar_fan: Option<SimilarFan>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RatingBucket {
    pub value: f64,
    pub count: usize,
}

/// Rating history summary of one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: UserId,
    pub total_ratings: usize,
    pub average_rating: f64,
    /// Ascending by rating value
    pub rating_distribution: Vec<RatingBucket>,
}

/// Rating summary of one movie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieRatingStats {
    pub average_rating: f64,
    pub total_ratings: usize,
    /// Ascending by rating value
    pub rating_distribution: Vec<RatingBucket>,
}

/// Entry of the cold-start popularity ranking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PopularMovie {
    pub movie_id: MovieId,
    /// Bayesian average rating
    pub score: f64,
    pub ratings: usize,
}
