use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{recommendations::resolve_top_n, AppState, MAX_TOP_N};
use crate::{
    error::{AppError, AppResult},
    models::{Movie, MovieId, MovieRatingStats, PopularMovie},
    services::{MovieCatalog, MovieFilter},
};

/// Page size when a listing does not ask for one
const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct MovieListQuery {
    pub limit: Option<usize>,
    pub genre: Option<String>,
    pub search: Option<String>,
}

/// Catalog entry with rating statistics from the served model
#[derive(Debug, Serialize)]
pub struct MovieDetails {
    #[serde(flatten)]
    pub movie: Movie,
    /// Omitted before training or when nobody rated the movie
    #[serde(flatten)]
    pub stats: Option<MovieRatingStats>,
}

fn catalog(state: &AppState) -> AppResult<&MovieCatalog> {
    state.catalog.as_deref().ok_or(AppError::CatalogUnavailable)
}

/// Head of the cold-start popularity ranking
pub async fn popular(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PopularQuery>,
) -> AppResult<Json<Vec<PopularMovie>>> {
    let top_n = resolve_top_n(query.top_n, state.default_top_n)?;
    let movies = state.service.popular(top_n).await?;
    Ok(Json(movies))
}

/// Catalog listing with optional genre and title filters
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MovieListQuery>,
) -> AppResult<Json<Vec<Movie>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if limit == 0 || limit > MAX_TOP_N {
        return Err(AppError::InvalidInput(format!(
            "limit must be within [1, {}], got {}",
            MAX_TOP_N, limit
        )));
    }

    let filter = MovieFilter {
        genre: query.genre,
        search: query.search,
        limit,
    };
    Ok(Json(catalog(&state)?.list(&filter)))
}

pub async fn details(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<MovieId>,
) -> AppResult<Json<MovieDetails>> {
    let movie = catalog(&state)?
        .get(movie_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", movie_id)))?;
    let stats = state.service.movie_stats(movie_id).await;

    Ok(Json(MovieDetails { movie, stats }))
}
