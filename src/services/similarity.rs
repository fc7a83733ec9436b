use std::collections::BTreeMap;
use std::time::Instant;

use rayon::prelude::*;

use crate::services::matrix::InteractionMatrix;

/// Symmetric similarity matrix with zero entries pruned
///
/// Only non-zero off-diagonal cells are stored. The diagonal reads as 1.0
/// but never appears among a row's neighbors.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    /// Per row, sorted by target index
    rows: Vec<Vec<(usize, f64)>>,
    /// Per row, sorted by similarity descending, then target index ascending
    ranked: Vec<Vec<(usize, f64)>>,
}

impl SimilarityMatrix {
    /// Mirrors an upper triangle (entries of row `a` all target `b > a`)
    fn from_upper(upper: Vec<Vec<(usize, f64)>>) -> Self {
        let n = upper.len();
        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];

        for (a, entries) in upper.into_iter().enumerate() {
            for (b, similarity) in entries {
                rows[a].push((b, similarity));
                rows[b].push((a, similarity));
            }
        }

        for row in &mut rows {
            row.sort_by_key(|&(target, _)| target);
        }

        let ranked = rows
            .iter()
            .map(|row| {
                let mut ranked = row.clone();
                ranked.sort_by(|x, y| y.1.total_cmp(&x.1).then(x.0.cmp(&y.0)));
                ranked
            })
            .collect();

        Self { rows, ranked }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, a: usize, b: usize) -> f64 {
        if a == b {
            return 1.0;
        }
        match self.rows[a].binary_search_by_key(&b, |&(target, _)| target) {
            Ok(pos) => self.rows[a][pos].1,
            Err(_) => 0.0,
        }
    }

    /// Non-zero neighbors of `a` in neighbor-set order
    pub fn neighbors(&self, a: usize) -> &[(usize, f64)] {
        &self.ranked[a]
    }

    /// Count of stored (non-zero, off-diagonal) cells
    pub fn non_zero(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

/// User-user cosine similarity over co-rated movies
pub fn user_similarity(matrix: &InteractionMatrix) -> SimilarityMatrix {
    let start = Instant::now();
    let similarity = pairwise(matrix.rows(), cosine);

    tracing::info!(
        users = similarity.len(),
        non_zero = similarity.non_zero(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "User similarity computed"
    );

    similarity
}

/// Item-item Pearson correlation over co-raters
pub fn item_similarity(matrix: &InteractionMatrix, min_co_raters: usize) -> SimilarityMatrix {
    let start = Instant::now();
    let similarity = pairwise(matrix.columns(), |a, b| pearson(a, b, min_co_raters));

    tracing::info!(
        movies = similarity.len(),
        non_zero = similarity.non_zero(),
        min_co_raters,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Item similarity computed"
    );

    similarity
}

/// Scores every unordered pair once and mirrors the result
///
/// This pass is O(n² · d) for n vectors of overlap d and dominates training
/// time. Rows are scored in parallel; each pair writes its own cell so the
/// outcome does not depend on scheduling.
fn pairwise<F>(vectors: &[BTreeMap<usize, f64>], measure: F) -> SimilarityMatrix
where
    F: Fn(&BTreeMap<usize, f64>, &BTreeMap<usize, f64>) -> f64 + Sync,
{
    let n = vectors.len();
    let upper: Vec<Vec<(usize, f64)>> = (0..n)
        .into_par_iter()
        .map(|a| {
            ((a + 1)..n)
                .filter_map(|b| {
                    let similarity = measure(&vectors[a], &vectors[b]);
                    (similarity != 0.0).then_some((b, similarity))
                })
                .collect()
        })
        .collect();

    SimilarityMatrix::from_upper(upper)
}

/// Value pairs for the keys both vectors share, in ascending key order
fn co_rated(a: &BTreeMap<usize, f64>, b: &BTreeMap<usize, f64>) -> Vec<(f64, f64)> {
    let (small, large, swapped) = if a.len() <= b.len() {
        (a, b, false)
    } else {
        (b, a, true)
    };

    small
        .iter()
        .filter_map(|(key, &x)| {
            large
                .get(key)
                .map(|&y| if swapped { (y, x) } else { (x, y) })
        })
        .collect()
}

/// Cosine similarity restricted to co-rated entries
///
/// No overlap or a zero-magnitude side yields 0.
pub fn cosine(a: &BTreeMap<usize, f64>, b: &BTreeMap<usize, f64>) -> f64 {
    let pairs = co_rated(a, b);
    if pairs.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b).sqrt()).clamp(-1.0, 1.0)
}

/// Pearson correlation restricted to co-rated entries
///
/// Fewer than `min_co_raters` shared entries, or zero variance on either
/// side, yields 0.
pub fn pearson(a: &BTreeMap<usize, f64>, b: &BTreeMap<usize, f64>, min_co_raters: usize) -> f64 {
    let pairs = co_rated(a, b);
    if pairs.is_empty() || pairs.len() < min_co_raters {
        return 0.0;
    }

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut covariance, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_a;
        let dy = y - mean_b;
        covariance += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    (covariance / (var_a * var_b).sqrt()).clamp(-1.0, 1.0)
}
