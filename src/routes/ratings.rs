use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{Prediction, Rating},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct RatingFeedback {
    pub rating: Rating,
    /// What the served model predicted before this rating; absent until a
    /// model is trained
    pub predicted: Option<Prediction>,
}

/// Stores a rating; it reaches the model at the next retrain
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(rating): Json<Rating>,
) -> AppResult<(StatusCode, Json<RatingFeedback>)> {
    let predicted = state.service.submit_rating(rating).await?;
    tracing::debug!(request_id = %request_id, has_feedback = predicted.is_some(), "Rating accepted");
    Ok((StatusCode::CREATED, Json(RatingFeedback { rating, predicted })))
}
