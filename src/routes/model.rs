use std::sync::Arc;

use axum::{extract::State, Json};

use super::AppState;
use crate::{
    error::AppResult,
    models::{EvaluationReport, ModelInfo, SplitConfig},
};

/// Retrains from the rating store and swaps the served model
pub async fn train(State(state): State<Arc<AppState>>) -> AppResult<Json<ModelInfo>> {
    let info = state.service.retrain().await?;
    Ok(Json(info))
}

pub async fn info(State(state): State<Arc<AppState>>) -> AppResult<Json<ModelInfo>> {
    let info = state.service.model_info().await?;
    Ok(Json(info))
}

/// Runs an offline evaluation; the served model is untouched
pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    Json(split): Json<SplitConfig>,
) -> AppResult<Json<EvaluationReport>> {
    let report = state.service.evaluate(split).await?;
    Ok(Json(report))
}
