use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, RwLock};

use crate::{
    error::{AppError, AppResult},
    models::{
        EngineConfig, EvaluationReport, Explanation, ModelInfo, MovieId, MovieRatingStats,
        PopularMovie, Prediction, Rating, RecommendationKind, SplitConfig, UserId, UserProfile,
    },
    services::{engine, RatingStore, TrainedModel},
};

/// Serves recommendations from the current model and retrains it on demand
///
/// Retraining builds a complete model off the async runtime and swaps it in
/// under a short write lock. Readers clone the `Arc` and keep whichever
/// snapshot they started with.
pub struct RecommendationService {
    store: Arc<dyn RatingStore>,
    config: EngineConfig,
    current: RwLock<Option<Arc<TrainedModel>>>,
    retrain_lock: Mutex<()>,
    versions: AtomicU64,
}

impl RecommendationService {
    pub fn new(store: Arc<dyn RatingStore>, config: EngineConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            current: RwLock::new(None),
            retrain_lock: Mutex::new(()),
            versions: AtomicU64::new(0),
        })
    }

    /// Rebuilds the model from a fresh store snapshot
    ///
    /// On failure the served model is left as it was.
    pub async fn retrain(&self) -> AppResult<ModelInfo> {
        let _guard = self.retrain_lock.lock().await;
        let start = Instant::now();

        let ratings = self.store.snapshot().await?;
        let config = self.config;
        let model = tokio::task::spawn_blocking(move || engine::train(&ratings, &config))
            .await
            .map_err(|e| AppError::Internal(format!("Training task failed: {}", e)))?
            .map_err(|e| {
                tracing::error!(error = %e, "Retrain failed, keeping current model");
                e
            })?;

        let version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
        let model = Arc::new(model.with_version(version));
        let info = model.info();

        *self.current.write().await = Some(model);

        tracing::info!(
            version,
            users = info.stats.users,
            movies = info.stats.movies,
            ratings = info.stats.ratings,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model swapped in"
        );

        Ok(info)
    }

    /// The model currently served
    pub async fn current(&self) -> AppResult<Arc<TrainedModel>> {
        self.current
            .read()
            .await
            .clone()
            .ok_or(AppError::ModelUnavailable)
    }

    pub async fn model_info(&self) -> AppResult<ModelInfo> {
        Ok(self.current().await?.info())
    }

    pub async fn recommend(
        &self,
        user_id: UserId,
        top_n: usize,
        kind: RecommendationKind,
    ) -> AppResult<Vec<Prediction>> {
        let model = self.current().await?;
        Ok(engine::recommend(&model, user_id, top_n, kind))
    }

    pub async fn predict_one(&self, user_id: UserId, movie_id: MovieId) -> AppResult<Prediction> {
        let model = self.current().await?;
        Ok(engine::predict_one(&model, user_id, movie_id))
    }

    /// Stores a rating and returns what the current model predicted for it
    ///
    /// The rating takes effect at the next retrain. Without a model the
    /// rating is still stored and no feedback is returned.
    pub async fn submit_rating(&self, rating: Rating) -> AppResult<Option<Prediction>> {
        if !self.config.scale.contains(rating.value) {
            return Err(AppError::InvalidInput(format!(
                "rating {} is outside [{}, {}]",
                rating.value, self.config.scale.min, self.config.scale.max
            )));
        }

        self.store.append(rating).await?;
        tracing::info!(
            user_id = rating.user_id,
            movie_id = rating.movie_id,
            value = rating.value,
            "Rating stored"
        );

        let feedback = match self.current().await {
            Ok(model) => Some(engine::predict_one(&model, rating.user_id, rating.movie_id)),
            Err(_) => None,
        };
        Ok(feedback)
    }

    /// Offline evaluation over the full store, isolated from the served model
    pub async fn evaluate(&self, split: SplitConfig) -> AppResult<EvaluationReport> {
        let ratings = self.store.snapshot().await?;
        let config = self.config;
        let report = tokio::task::spawn_blocking(move || engine::evaluate(&config, &ratings, &split))
            .await
            .map_err(|e| AppError::Internal(format!("Evaluation task failed: {}", e)))??;
        Ok(report)
    }

    pub async fn explain(&self, user_id: UserId, movie_id: MovieId) -> AppResult<Explanation> {
        let model = self.current().await?;
        engine::explain(&model, user_id, movie_id)
            .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", movie_id)))
    }

    pub async fn user_profile(&self, user_id: UserId) -> AppResult<UserProfile> {
        let model = self.current().await?;
        engine::user_profile(&model, user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn popular(&self, top_n: usize) -> AppResult<Vec<PopularMovie>> {
        let model = self.current().await?;
        Ok(engine::popular(&model, top_n))
    }

    /// Rating summary from the served model, `None` before the first training
    pub async fn movie_stats(&self, movie_id: MovieId) -> Option<MovieRatingStats> {
        let model = self.current.read().await.clone()?;
        engine::movie_stats(&model, movie_id)
    }
}
