use std::path::Path;

use tokio::sync::RwLock;

use crate::{config::Config, error::AppResult, models::Rating, services::matrix::densest_subset};

/// Source of rating snapshots for training
///
/// Implementations own persistence. The engine only ever sees an ordered
/// snapshot; later appends win over earlier ones for the same pair.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingStore: Send + Sync {
    /// All ratings in insertion order
    async fn snapshot(&self) -> AppResult<Vec<Rating>>;

    async fn append(&self, rating: Rating) -> AppResult<()>;

    /// Number of stored ratings, duplicates included
    async fn len(&self) -> AppResult<usize>;
}

/// Rating store held in process memory
#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    ratings: RwLock<Vec<Rating>>,
}

impl InMemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ratings(ratings: Vec<Rating>) -> Self {
        Self {
            ratings: RwLock::new(ratings),
        }
    }

    /// Loads a JSON array of `{user_id, movie_id, rating[, timestamp]}` records
    pub async fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let ratings: Vec<Rating> = serde_json::from_str(&raw)?;

        tracing::info!(
            path = %path.display(),
            ratings = ratings.len(),
            "Loaded ratings from file"
        );

        Ok(Self::with_ratings(ratings))
    }

    /// Startup store: the configured ratings file, sampled when requested
    pub async fn from_config(config: &Config) -> AppResult<Self> {
        let store = match &config.ratings_path {
            Some(path) => Self::from_json_file(path).await?,
            None => Self::new(),
        };

        Ok(match config.sample() {
            Some((n_users, n_movies)) => store.into_densest(n_users, n_movies),
            None => store,
        })
    }

    /// Restricts the store to its `n_users` most active users and `n_movies`
    /// most rated movies
    pub fn into_densest(self, n_users: usize, n_movies: usize) -> Self {
        let ratings = self.ratings.into_inner();
        let sampled = densest_subset(&ratings, n_users, n_movies);

        tracing::info!(
            before = ratings.len(),
            after = sampled.len(),
            n_users,
            n_movies,
            "Sampled densest rating subset"
        );

        Self::with_ratings(sampled)
    }
}

#[async_trait::async_trait]
impl RatingStore for InMemoryRatingStore {
    async fn snapshot(&self) -> AppResult<Vec<Rating>> {
        Ok(self.ratings.read().await.clone())
    }

    async fn append(&self, rating: Rating) -> AppResult<()> {
        self.ratings.write().await.push(rating);
        Ok(())
    }

    async fn len(&self) -> AppResult<usize> {
        Ok(self.ratings.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_append_preserves_order() {
        let store = InMemoryRatingStore::new();
        tokio_test::block_on(async {
            store.append(Rating::new(1, 1, 4.0)).await.unwrap();
            store.append(Rating::new(1, 1, 2.0)).await.unwrap();

            let snapshot = store.snapshot().await.unwrap();
            assert_eq!(snapshot.len(), 2);
            assert_eq!(snapshot[1].value, 2.0);
            assert_eq!(store.len().await.unwrap(), 2);
        });
    }

    #[tokio::test]
    async fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("ratings-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(
            &path,
            r#"[{"user_id": 1, "movie_id": 10, "rating": 4.5, "timestamp": 964982703},
                {"user_id": 2, "movie_id": 10, "rating": 3.0}]"#,
        )
        .await
        .unwrap();

        let store = InMemoryRatingStore::from_json_file(&path).await.unwrap();
        let snapshot = store.snapshot().await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].value, 4.5);
        assert_eq!(snapshot[0].timestamp, Some(964982703));
        assert_eq!(snapshot[1].timestamp, None);
    }

    #[tokio::test]
    async fn test_into_densest_drops_sparse_rows_and_columns() {
        let store = InMemoryRatingStore::with_ratings(vec![
            Rating::new(1, 10, 4.0),
            Rating::new(1, 20, 4.0),
            Rating::new(2, 10, 3.0),
            Rating::new(2, 20, 2.0),
            Rating::new(3, 30, 5.0),
        ]);

        let store = store.into_densest(2, 2);
        let snapshot = store.snapshot().await.unwrap();

        assert_eq!(store.len().await.unwrap(), 4);
        assert!(snapshot.iter().all(|r| r.user_id != 3 && r.movie_id != 30));
    }

    #[tokio::test]
    async fn test_from_config_applies_sampling() {
        let path = std::env::temp_dir().join(format!("ratings-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(
            &path,
            r#"[{"user_id": 1, "movie_id": 10, "rating": 4.0},
                {"user_id": 1, "movie_id": 20, "rating": 3.5},
                {"user_id": 2, "movie_id": 10, "rating": 2.0},
                {"user_id": 3, "movie_id": 30, "rating": 5.0}]"#,
        )
        .await
        .unwrap();

        let vars = vec![
            ("RATINGS_PATH".to_string(), path.display().to_string()),
            ("SAMPLE_USERS".to_string(), "1".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        let sampled = InMemoryRatingStore::from_config(&config).await.unwrap();

        let config = Config {
            sample_users: None,
            ..config
        };
        let full = InMemoryRatingStore::from_config(&config).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        let snapshot = sampled.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().all(|r| r.user_id == 1));
        assert_eq!(full.len().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let result = InMemoryRatingStore::from_json_file("/nonexistent/ratings.json").await;
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[tokio::test]
    async fn test_malformed_file_is_serialization_error() {
        let path = std::env::temp_dir().join(format!("ratings-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "not json").await.unwrap();

        let result = InMemoryRatingStore::from_json_file(&path).await;
        tokio::fs::remove_file(&path).await.unwrap();

        assert!(matches!(result, Err(AppError::Serialization(_))));
    }
}
