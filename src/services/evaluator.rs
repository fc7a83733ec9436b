use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::{
    error::{EngineError, EngineResult},
    models::{
        EngineConfig, EvaluationReport, MovieId, PredictionSource, Rating, RecommendationKind,
        SplitConfig, SplitStrategy, UserId,
    },
    services::{engine, matrix::dedup_last_write},
};

/// Disjoint partition of a rating set, each side in input order
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Vec<Rating>,
    pub test: Vec<Rating>,
}

/// Partitions ratings into train and test, deterministically for a seed
///
/// Records are split as given; callers that train on the result should
/// collapse duplicate pairs first.
pub fn split(ratings: &[Rating], config: &SplitConfig) -> Split {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut held_out = vec![false; ratings.len()];

    match config.strategy {
        SplitStrategy::PerUser => {
            let mut by_user: BTreeMap<UserId, Vec<usize>> = BTreeMap::new();
            for (position, rating) in ratings.iter().enumerate() {
                by_user.entry(rating.user_id).or_default().push(position);
            }
            for positions in by_user.values_mut() {
                let holdout = holdout_size(positions.len(), config.test_fraction);
                positions.shuffle(&mut rng);
                for &position in &positions[..holdout] {
                    held_out[position] = true;
                }
            }
        }
        SplitStrategy::Uniform => {
            let mut positions: Vec<usize> = (0..ratings.len()).collect();
            let holdout = holdout_size(positions.len(), config.test_fraction);
            positions.shuffle(&mut rng);
            for &position in &positions[..holdout] {
                held_out[position] = true;
            }
        }
    }

    let (test, train): (Vec<_>, Vec<_>) = ratings
        .iter()
        .zip(held_out)
        .partition(|&(_, is_test)| is_test);

    Split {
        train: train.into_iter().map(|(rating, _)| *rating).collect(),
        test: test.into_iter().map(|(rating, _)| *rating).collect(),
    }
}

/// `round(n · fraction)` clamped to `[0, n − 1]`
fn holdout_size(n: usize, fraction: f64) -> usize {
    if n < 2 {
        return 0;
    }
    ((n as f64 * fraction).round() as usize).min(n - 1)
}

pub fn rmse(errors: &[f64]) -> f64 {
    if errors.is_empty() {
        return 0.0;
    }
    (errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64).sqrt()
}

pub fn mae(errors: &[f64]) -> f64 {
    if errors.is_empty() {
        return 0.0;
    }
    errors.iter().map(|e| e.abs()).sum::<f64>() / errors.len() as f64
}

/// Precision and recall of a top-k list against a relevant set
pub fn precision_recall_at_k(
    recommended: &[MovieId],
    relevant: &HashSet<MovieId>,
    k: usize,
) -> (f64, f64) {
    if k == 0 || relevant.is_empty() {
        return (0.0, 0.0);
    }
    let hits = recommended
        .iter()
        .take(k)
        .filter(|movie| relevant.contains(movie))
        .count() as f64;
    (hits / k as f64, hits / relevant.len() as f64)
}

/// Trains on a held-out split and scores the test side
///
/// Duplicate pairs collapse to their last write before splitting, so no pair
/// lands on both sides.
pub fn evaluate(
    config: &EngineConfig,
    ratings: &[Rating],
    split_config: &SplitConfig,
) -> EngineResult<EvaluationReport> {
    config.validate()?;
    split_config.validate()?;
    let start = Instant::now();

    let records = dedup_last_write(ratings);
    if records.len() < ratings.len() {
        tracing::debug!(
            duplicates = ratings.len() - records.len(),
            "Collapsed duplicate ratings before splitting"
        );
    }

    let Split { train, test } = split(&records, split_config);
    if test.is_empty() {
        return Err(EngineError::Data(format!(
            "test partition is empty for {} ratings at fraction {}",
            records.len(),
            split_config.test_fraction
        )));
    }

    let model = engine::train(&train, config)?;

    let mut errors = Vec::with_capacity(test.len());
    let mut fallback_predictions = 0;
    let mut relevant: BTreeMap<UserId, HashSet<MovieId>> = BTreeMap::new();

    for rating in &test {
        let prediction = engine::predict_one(&model, rating.user_id, rating.movie_id);
        errors.push(prediction.score - rating.value);
        if prediction.source == PredictionSource::PopularityFallback {
            fallback_predictions += 1;
        }
        if rating.value >= split_config.relevance_threshold {
            relevant
                .entry(rating.user_id)
                .or_default()
                .insert(rating.movie_id);
        }
    }

    let k = split_config.k;
    let (mut precision_sum, mut recall_sum) = (0.0, 0.0);
    for (&user_id, movies) in &relevant {
        let recommended: Vec<MovieId> =
            engine::recommend(&model, user_id, k, RecommendationKind::Hybrid)
                .iter()
                .map(|p| p.movie_id)
                .collect();
        let (precision, recall) = precision_recall_at_k(&recommended, movies, k);
        precision_sum += precision;
        recall_sum += recall;
    }

    let ranked_users = relevant.len();
    let (precision_at_k, recall_at_k) = if ranked_users == 0 {
        (0.0, 0.0)
    } else {
        (
            precision_sum / ranked_users as f64,
            recall_sum / ranked_users as f64,
        )
    };

    let report = EvaluationReport {
        rmse: rmse(&errors),
        mae: mae(&errors),
        precision_at_k,
        recall_at_k,
        k,
        train_size: train.len(),
        test_size: test.len(),
        fallback_predictions,
        ranked_users,
    };

    tracing::info!(
        rmse = report.rmse,
        mae = report.mae,
        precision_at_k = report.precision_at_k,
        recall_at_k = report.recall_at_k,
        test_size = report.test_size,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Evaluation complete"
    );

    Ok(report)
}
