use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod engine_config;
pub mod movie;
pub mod report;

pub use engine_config::{EngineConfig, RatingScale, SplitConfig, SplitStrategy};
pub use movie::Movie;
pub use report::{
    EvaluationReport, Explanation, MatrixStats, ModelInfo, MovieRatingStats, PopularMovie, RatingBucket, SimilarFan,
    UserProfile,
};

pub type UserId = u64;
pub type MovieId = u64;

/// A single explicit rating from the rating store
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    #[serde(alias = "rating")]
    pub value: f64,
    /// Unix seconds
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl Rating {
    pub fn new(user_id: UserId, movie_id: MovieId, value: f64) -> Self {
        Self {
            user_id,
            movie_id,
            value,
            timestamp: None,
        }
    }
}

/// Which strategy ranks the candidates of a recommendation request
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    User,
    Item,
    #[default]
    Hybrid,
}

impl Display for RecommendationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendationKind::User => write!(f, "user"),
            RecommendationKind::Item => write!(f, "item"),
            RecommendationKind::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Where a predicted score came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    UserBased,
    ItemBased,
    Hybrid,
    PopularityFallback,
}

/// A predicted score for one (user, movie) pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub score: f64,
    pub source: PredictionSource,
    /// Neighbors or co-raters actually used; rating count for the popularity fallback
    pub support: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_deserializes_movielens_field_names() {
        let json = r#"{"user_id": 1, "movie_id": 31, "rating": 2.5, "timestamp": 1260759144}"#;
        let rating: Rating = serde_json::from_str(json).unwrap();
        assert_eq!(rating.user_id, 1);
        assert_eq!(rating.movie_id, 31);
        assert_eq!(rating.value, 2.5);
        assert_eq!(rating.timestamp, Some(1260759144));
    }

    #[test]
    fn test_rating_timestamp_is_optional() {
        let json = r#"{"user_id": 4, "movie_id": 10, "value": 4.0}"#;
        let rating: Rating = serde_json::from_str(json).unwrap();
        assert_eq!(rating, Rating::new(4, 10, 4.0));
    }

    #[test]
    fn test_recommendation_kind_serde() {
        let kind: RecommendationKind = serde_json::from_str("\"item\"").unwrap();
        assert_eq!(kind, RecommendationKind::Item);
        assert_eq!(RecommendationKind::default(), RecommendationKind::Hybrid);
        assert_eq!(format!("{}", RecommendationKind::User), "user");
    }

    #[test]
    fn test_prediction_source_serialization() {
        let json = serde_json::to_string(&PredictionSource::PopularityFallback).unwrap();
        assert_eq!(json, "\"popularity_fallback\"");
        let json = serde_json::to_string(&PredictionSource::UserBased).unwrap();
        assert_eq!(json, "\"user_based\"");
    }
}
