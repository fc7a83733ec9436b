use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use super::AppState;
use crate::{
    error::AppResult,
    models::{UserId, UserProfile},
};

pub async fn profile(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<UserProfile>> {
    let profile = state.service.user_profile(user_id).await?;
    Ok(Json(profile))
}
