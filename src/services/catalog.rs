use std::collections::HashMap;
use std::path::Path;

use crate::{
    error::AppResult,
    models::{Movie, MovieId},
};

/// Listing filters for the catalog
#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    pub genre: Option<String>,
    pub search: Option<String>,
    pub limit: usize,
}

/// Movie metadata keyed by id, read-only after load
#[derive(Debug, Default)]
pub struct MovieCatalog {
    movies: Vec<Movie>,
    by_id: HashMap<MovieId, usize>,
}

impl MovieCatalog {
    /// Later entries replace earlier ones with the same id
    pub fn with_movies(movies: Vec<Movie>) -> Self {
        let mut catalog = Self::default();
        for movie in movies {
            match catalog.by_id.get(&movie.movie_id) {
                Some(&position) => catalog.movies[position] = movie,
                None => {
                    catalog.by_id.insert(movie.movie_id, catalog.movies.len());
                    catalog.movies.push(movie);
                }
            }
        }
        catalog
    }

    /// Loads a JSON array of `{movie_id, title, genres}` records
    pub async fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let movies: Vec<Movie> = serde_json::from_str(&raw)?;
        let catalog = Self::with_movies(movies);

        tracing::info!(path = %path.display(), movies = catalog.len(), "Loaded movie catalog");

        Ok(catalog)
    }

    pub fn get(&self, movie_id: MovieId) -> Option<&Movie> {
        self.by_id.get(&movie_id).map(|&position| &self.movies[position])
    }

    /// Movies in file order passing every filter, at most `filter.limit`
    pub fn list(&self, filter: &MovieFilter) -> Vec<Movie> {
        self.movies
            .iter()
            .filter(|m| filter.genre.as_deref().map_or(true, |g| m.has_genre(g)))
            .filter(|m| filter.search.as_deref().map_or(true, |s| m.title_contains(s)))
            .take(filter.limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn movie(movie_id: MovieId, title: &str, genres: &[&str]) -> Movie {
        Movie {
            movie_id,
            title: title.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn catalog() -> MovieCatalog {
        MovieCatalog::with_movies(vec![
            movie(1, "Toy Story (1995)", &["Animation", "Comedy"]),
            movie(2, "Heat (1995)", &["Action", "Crime"]),
            movie(3, "Toy Story 2 (1999)", &["Animation", "Comedy"]),
            movie(4, "Die Hard (1988)", &["Action", "Thriller"]),
        ])
    }

    fn filter(genre: Option<&str>, search: Option<&str>, limit: usize) -> MovieFilter {
        MovieFilter {
            genre: genre.map(str::to_string),
            search: search.map(str::to_string),
            limit,
        }
    }

    fn ids(movies: &[Movie]) -> Vec<MovieId> {
        movies.iter().map(|m| m.movie_id).collect()
    }

    #[test]
    fn test_list_applies_filters_in_file_order() {
        let catalog = catalog();

        assert_eq!(ids(&catalog.list(&filter(None, None, 50))), vec![1, 2, 3, 4]);
        assert_eq!(ids(&catalog.list(&filter(None, None, 2))), vec![1, 2]);
        assert_eq!(ids(&catalog.list(&filter(Some("action"), None, 50))), vec![2, 4]);
        assert_eq!(ids(&catalog.list(&filter(None, Some("TOY"), 50))), vec![1, 3]);
        assert_eq!(ids(&catalog.list(&filter(Some("comedy"), Some("2"), 50))), vec![3]);
        assert!(catalog.list(&filter(Some("Western"), None, 50)).is_empty());
    }

    #[test]
    fn test_duplicate_ids_keep_last_entry() {
        let catalog = MovieCatalog::with_movies(vec![
            movie(1, "Old Title", &[]),
            movie(2, "Heat (1995)", &["Action"]),
            movie(1, "New Title", &["Drama"]),
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(1).unwrap().title, "New Title");
        assert_eq!(ids(&catalog.list(&filter(None, None, 10))), vec![1, 2]);
        assert!(catalog.get(9).is_none());
    }

    #[tokio::test]
    async fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("movies-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(
            &path,
            r#"[{"movieId": 1, "title": "Toy Story (1995)", "genres": "Animation|Comedy"},
                {"movie_id": 2, "title": "Heat (1995)", "genres": ["Action"]}]"#,
        )
        .await
        .unwrap();

        let catalog = MovieCatalog::from_json_file(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(1).unwrap().genres, vec!["Animation", "Comedy"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let result = MovieCatalog::from_json_file("/nonexistent/movies.json").await;
        assert!(matches!(result, Err(AppError::Io(_))));
    }
}
