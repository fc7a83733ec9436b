use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Inclusive bounds of the explicit rating scale
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RatingScale {
    pub min: f64,
    pub max: f64,
}

impl Default for RatingScale {
    fn default() -> Self {
        Self { min: 0.5, max: 5.0 }
    }
}

impl RatingScale {
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Hyperparameters of a training run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Neighbors (K) consulted per prediction
    pub neighbors: usize,
    /// Co-raters required before an item pair gets a non-zero Pearson score
    pub min_co_raters: usize,
    /// Weight of the user-based score; the item-based score gets the rest
    pub hybrid_user_weight: f64,
    /// Prior vote count of the Bayesian popularity average
    pub popularity_min_votes: f64,
    /// Rating at or above which a user counts as a fan of a movie
    pub relevance_threshold: f64,
    pub scale: RatingScale,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            neighbors: 20,
            min_co_raters: 2,
            hybrid_user_weight: 0.5,
            popularity_min_votes: 5.0,
            relevance_threshold: 4.0,
            scale: RatingScale::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.neighbors == 0 {
            return Err(EngineError::Config(
                "neighbors must be at least 1".to_string(),
            ));
        }
        if self.min_co_raters == 0 {
            return Err(EngineError::Config(
                "min_co_raters must be at least 1".to_string(),
            ));
        }
        if !self.hybrid_user_weight.is_finite() || !(0.0..=1.0).contains(&self.hybrid_user_weight)
        {
            return Err(EngineError::Config(format!(
                "hybrid_user_weight must be within [0, 1], got {}",
                self.hybrid_user_weight
            )));
        }
        if !self.popularity_min_votes.is_finite() || self.popularity_min_votes < 0.0 {
            return Err(EngineError::Config(format!(
                "popularity_min_votes must be a non-negative number, got {}",
                self.popularity_min_votes
            )));
        }
        if !self.scale.min.is_finite() || !self.scale.max.is_finite() || self.scale.min >= self.scale.max
        {
            return Err(EngineError::Config(format!(
                "rating scale [{}, {}] is empty",
                self.scale.min, self.scale.max
            )));
        }
        if !self.scale.contains(self.relevance_threshold) {
            return Err(EngineError::Config(format!(
                "relevance_threshold {} is outside the rating scale",
                self.relevance_threshold
            )));
        }
        Ok(())
    }
}

/// How the evaluator partitions ratings into train and test
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// Hold out a share of each user's ratings; every user keeps at least one in train
    #[default]
    PerUser,
    /// Hold out a share of all ratings regardless of user
    Uniform,
}

/// Offline evaluation settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SplitConfig {
    pub test_fraction: f64,
    pub seed: u64,
    pub strategy: SplitStrategy,
    /// Cutoff for precision@k / recall@k
    pub k: usize,
    /// Test ratings at or above this value count as relevant
    pub relevance_threshold: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            strategy: SplitStrategy::PerUser,
            k: 10,
            relevance_threshold: 4.0,
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if !self.test_fraction.is_finite() || self.test_fraction <= 0.0 || self.test_fraction >= 1.0
        {
            return Err(EngineError::Config(format!(
                "test_fraction must be within (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.k == 0 {
            return Err(EngineError::Config("k must be at least 1".to_string()));
        }
        if !self.relevance_threshold.is_finite() {
            return Err(EngineError::Config(
                "relevance_threshold must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
