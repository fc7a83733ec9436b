use serde::Deserialize;

use crate::models::{EngineConfig, RatingScale};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// JSON file with the initial rating snapshot (array of ratings)
    #[serde(default)]
    pub ratings_path: Option<String>,

    /// JSON file with the movie catalog (array of movies)
    #[serde(default)]
    pub movies_path: Option<String>,

    /// Keep only this many of the most active users at startup
    #[serde(default)]
    pub sample_users: Option<usize>,

    /// Keep only this many of the most rated movies at startup
    #[serde(default)]
    pub sample_movies: Option<usize>,

    /// Neighbors consulted per prediction (K)
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,

    /// Minimum co-raters before two movies get a non-zero similarity
    #[serde(default = "default_min_co_raters")]
    pub min_co_raters: usize,

    /// Weight of the user-based score in the hybrid blend
    #[serde(default = "default_hybrid_user_weight")]
    pub hybrid_user_weight: f64,

    /// Prior vote count for the Bayesian popularity average
    #[serde(default = "default_popularity_min_votes")]
    pub popularity_min_votes: f64,

    /// Rating at or above which a user counts as a fan in explanations
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,

    #[serde(default = "default_rating_min")]
    pub rating_min: f64,

    #[serde(default = "default_rating_max")]
    pub rating_max: f64,

    /// Recommendations returned when a request does not ask for a count
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_neighbors() -> usize {
    20
}

fn default_min_co_raters() -> usize {
    2
}

fn default_hybrid_user_weight() -> f64 {
    0.5
}

fn default_popularity_min_votes() -> f64 {
    5.0
}

fn default_relevance_threshold() -> f64 {
    4.0
}

fn default_rating_min() -> f64 {
    0.5
}

fn default_rating_max() -> f64 {
    5.0
}

fn default_top_n() -> usize {
    10
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Densest-subset bounds for the startup snapshot, if sampling is on
    ///
    /// A bound left unset does not restrict its side.
    pub fn sample(&self) -> Option<(usize, usize)> {
        match (self.sample_users, self.sample_movies) {
            (None, None) => None,
            (users, movies) => Some((users.unwrap_or(usize::MAX), movies.unwrap_or(usize::MAX))),
        }
    }

    /// Engine hyperparameters described by this configuration
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            neighbors: self.neighbors,
            min_co_raters: self.min_co_raters,
            hybrid_user_weight: self.hybrid_user_weight,
            popularity_min_votes: self.popularity_min_votes,
            relevance_threshold: self.relevance_threshold,
            scale: RatingScale {
                min: self.rating_min,
                max: self.rating_max,
            },
        }
    }
}
