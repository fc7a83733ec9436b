use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{
    error::{EngineError, EngineResult},
    models::{MatrixStats, MovieId, Rating, RatingScale, UserId},
};

/// Dense index over a sparse id universe
///
/// Ids are assigned positions in ascending id order, so comparing two indices
/// compares the underlying ids as well.
#[derive(Debug, Clone, PartialEq)]
pub struct IdIndex {
    ids: Vec<u64>,
    positions: HashMap<u64, usize>,
}

impl IdIndex {
    fn from_ids(mut ids: Vec<u64>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        let positions = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        Self { ids, positions }
    }

    pub fn index_of(&self, id: u64) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn id_at(&self, index: usize) -> u64 {
        self.ids[index]
    }

    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Sparse user x movie rating matrix for one training snapshot
///
/// Each row maps movie index to rating and each column maps user index to
/// rating; both views hold the same cells.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionMatrix {
    users: IdIndex,
    movies: IdIndex,
    rows: Vec<BTreeMap<usize, f64>>,
    columns: Vec<BTreeMap<usize, f64>>,
    user_means: Vec<f64>,
    movie_means: Vec<f64>,
    global_mean: f64,
    ratings: usize,
}

impl InteractionMatrix {
    /// Builds the matrix from an ordered rating snapshot
    ///
    /// Duplicate (user, movie) pairs keep the last value in input order.
    /// Fails if the snapshot is empty or holds a value outside `scale`.
    pub fn build(ratings: &[Rating], scale: &RatingScale) -> EngineResult<Self> {
        if ratings.is_empty() {
            return Err(EngineError::Data("rating set is empty".to_string()));
        }

        let mut cells: HashMap<(UserId, MovieId), f64> = HashMap::with_capacity(ratings.len());
        for (position, rating) in ratings.iter().enumerate() {
            if !scale.contains(rating.value) {
                return Err(EngineError::Data(format!(
                    "rating #{} (user {}, movie {}) has value {} outside [{}, {}]",
                    position, rating.user_id, rating.movie_id, rating.value, scale.min, scale.max
                )));
            }
            cells.insert((rating.user_id, rating.movie_id), rating.value);
        }

        let duplicates = ratings.len() - cells.len();
        if duplicates > 0 {
            tracing::debug!(duplicates, "Collapsed duplicate ratings, keeping last write");
        }

        let users = IdIndex::from_ids(cells.keys().map(|(u, _)| *u).collect());
        let movies = IdIndex::from_ids(cells.keys().map(|(_, m)| *m).collect());

        let mut rows = vec![BTreeMap::new(); users.len()];
        let mut columns = vec![BTreeMap::new(); movies.len()];

        for (&(user_id, movie_id), &value) in &cells {
            // Both ids were just inserted into the indices
            let u = users.positions[&user_id];
            let m = movies.positions[&movie_id];
            rows[u].insert(m, value);
            columns[m].insert(u, value);
        }

        // Summed in index order so the mean is identical across runs
        let total: f64 = rows.iter().flat_map(|row| row.values()).sum();

        let user_means = rows.iter().map(mean_of).collect();
        let movie_means = columns.iter().map(mean_of).collect();

        let matrix = Self {
            global_mean: total / cells.len() as f64,
            ratings: cells.len(),
            users,
            movies,
            rows,
            columns,
            user_means,
            movie_means,
        };

        let stats = matrix.stats();
        tracing::info!(
            users = stats.users,
            movies = stats.movies,
            ratings = stats.ratings,
            sparsity = stats.sparsity,
            "Interaction matrix built"
        );

        Ok(matrix)
    }

    pub fn users(&self) -> &IdIndex {
        &self.users
    }

    pub fn movies(&self) -> &IdIndex {
        &self.movies
    }

    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    pub fn n_movies(&self) -> usize {
        self.movies.len()
    }

    pub fn user_index(&self, user_id: UserId) -> Option<usize> {
        self.users.index_of(user_id)
    }

    pub fn movie_index(&self, movie_id: MovieId) -> Option<usize> {
        self.movies.index_of(movie_id)
    }

    pub fn user_id(&self, user: usize) -> UserId {
        self.users.id_at(user)
    }

    pub fn movie_id(&self, movie: usize) -> MovieId {
        self.movies.id_at(movie)
    }

    /// Ratings of one user, keyed by movie index
    pub fn row(&self, user: usize) -> &BTreeMap<usize, f64> {
        &self.rows[user]
    }

    /// Ratings of one movie, keyed by user index
    pub fn column(&self, movie: usize) -> &BTreeMap<usize, f64> {
        &self.columns[movie]
    }

    pub fn rows(&self) -> &[BTreeMap<usize, f64>] {
        &self.rows
    }

    pub fn columns(&self) -> &[BTreeMap<usize, f64>] {
        &self.columns
    }

    pub fn rating(&self, user: usize, movie: usize) -> Option<f64> {
        self.rows[user].get(&movie).copied()
    }

    pub fn user_mean(&self, user: usize) -> f64 {
        self.user_means[user]
    }

    pub fn movie_mean(&self, movie: usize) -> f64 {
        self.movie_means[movie]
    }

    pub fn movie_count(&self, movie: usize) -> usize {
        self.columns[movie].len()
    }

    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    pub fn stats(&self) -> MatrixStats {
        let cells = self.n_users() as f64 * self.n_movies() as f64;
        MatrixStats {
            users: self.n_users(),
            movies: self.n_movies(),
            ratings: self.ratings,
            sparsity: 1.0 - self.ratings as f64 / cells,
            global_mean: self.global_mean,
        }
    }
}

fn mean_of(values: &BTreeMap<usize, f64>) -> f64 {
    values.values().sum::<f64>() / values.len() as f64
}

/// Collapses duplicate (user, movie) pairs, keeping the last write
///
/// Survivors stay at the input position of their last write. The result is
/// the record set [`InteractionMatrix::build`] actually trains on.
pub fn dedup_last_write(ratings: &[Rating]) -> Vec<Rating> {
    let mut last: HashMap<(UserId, MovieId), usize> = HashMap::with_capacity(ratings.len());
    for (position, rating) in ratings.iter().enumerate() {
        last.insert((rating.user_id, rating.movie_id), position);
    }

    ratings
        .iter()
        .enumerate()
        .filter(|&(position, rating)| last.get(&(rating.user_id, rating.movie_id)) == Some(&position))
        .map(|(_, rating)| *rating)
        .collect()
}

/// Keeps only ratings among the `n_users` most active users and the
/// `n_movies` most rated movies
///
/// Counts ties resolve toward the lower id. Input order is preserved.
pub fn densest_subset(ratings: &[Rating], n_users: usize, n_movies: usize) -> Vec<Rating> {
    let mut user_counts: HashMap<UserId, usize> = HashMap::new();
    let mut movie_counts: HashMap<MovieId, usize> = HashMap::new();
    for rating in ratings {
        *user_counts.entry(rating.user_id).or_insert(0) += 1;
        *movie_counts.entry(rating.movie_id).or_insert(0) += 1;
    }

    let top_users = most_frequent(user_counts, n_users);
    let top_movies = most_frequent(movie_counts, n_movies);

    ratings
        .iter()
        .filter(|r| top_users.contains(&r.user_id) && top_movies.contains(&r.movie_id))
        .copied()
        .collect()
}

fn most_frequent(counts: HashMap<u64, usize>, limit: usize) -> HashSet<u64> {
    let mut ranked: Vec<(u64, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(id, _)| id).collect()
}
