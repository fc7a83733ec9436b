use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::{AppState, MAX_TOP_N};
use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{Explanation, MovieId, Prediction, RecommendationKind, UserId},
    services::MovieCatalog,
};

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub top_n: Option<usize>,
    #[serde(rename = "type", default)]
    pub kind: RecommendationKind,
}

/// A ranked prediction with its catalog metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendedMovie {
    #[serde(flatten)]
    pub prediction: Prediction,
    /// `None` when the movie is missing from the catalog
    pub title: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl RecommendedMovie {
    fn new(prediction: Prediction, catalog: Option<&MovieCatalog>) -> Self {
        match catalog.and_then(|c| c.get(prediction.movie_id)) {
            Some(movie) => Self {
                prediction,
                title: Some(movie.title.clone()),
                genres: movie.genres.clone(),
            },
            None => Self {
                prediction,
                title: None,
                genres: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: UserId,
    pub kind: RecommendationKind,
    pub model_version: u64,
    pub recommendations: Vec<RecommendedMovie>,
}

/// Resolves a client `top_n` against the configured default and cap
pub(super) fn resolve_top_n(requested: Option<usize>, default: usize) -> AppResult<usize> {
    let top_n = requested.unwrap_or(default);
    if top_n == 0 || top_n > MAX_TOP_N {
        return Err(AppError::InvalidInput(format!(
            "top_n must be within [1, {}], got {}",
            MAX_TOP_N, top_n
        )));
    }
    Ok(top_n)
}

/// Handler for the recommendations endpoint
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<UserId>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let top_n = resolve_top_n(query.top_n, state.default_top_n)?;
    let model = state.service.current().await?;
    let recommendations =
        crate::services::engine::recommend(&model, user_id, top_n, query.kind);

    tracing::info!(
        request_id = %request_id,
        user_id,
        kind = %query.kind,
        count = recommendations.len(),
        "Served recommendations"
    );

    let catalog = state.catalog.as_deref();
    Ok(Json(RecommendationResponse {
        user_id,
        kind: query.kind,
        model_version: model.version(),
        recommendations: recommendations
            .into_iter()
            .map(|prediction| RecommendedMovie::new(prediction, catalog))
            .collect(),
    }))
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Path((user_id, movie_id)): Path<(UserId, MovieId)>,
) -> AppResult<Json<Prediction>> {
    let prediction = state.service.predict_one(user_id, movie_id).await?;
    Ok(Json(prediction))
}

pub async fn explain(
    State(state): State<Arc<AppState>>,
    Path((user_id, movie_id)): Path<(UserId, MovieId)>,
) -> AppResult<Json<Explanation>> {
    let explanation = state.service.explain(user_id, movie_id).await?;
    Ok(Json(explanation))
}
