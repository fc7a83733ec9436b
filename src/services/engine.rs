use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::{
    error::{EngineResult, NoSignalWarning},
    models::{
        EngineConfig, EvaluationReport, Explanation, ModelInfo, MovieId, MovieRatingStats,
        PopularMovie, Prediction, Rating, RatingBucket, RecommendationKind, SimilarFan,
        SplitConfig, UserId, UserProfile,
    },
    services::{
        blender::{self, HybridScorer},
        cold_start::{self, PopularityRanking},
        evaluator,
        item_based::ItemBasedScorer,
        matrix::InteractionMatrix,
        similarity::{self, SimilarityMatrix},
        user_based::UserBasedScorer,
        Scorer,
    },
};

/// Minimum similarity for a fan to appear in an explanation
pub const EXPLANATION_FLOOR: f64 = 0.1;

/// Everything a training run produces, read-only once built
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub(crate) version: u64,
    pub(crate) trained_at: DateTime<Utc>,
    pub(crate) config: EngineConfig,
    pub(crate) matrix: InteractionMatrix,
    pub(crate) user_similarity: SimilarityMatrix,
    pub(crate) item_similarity: SimilarityMatrix,
    pub(crate) popularity: PopularityRanking,
}

impl TrainedModel {
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn matrix(&self) -> &InteractionMatrix {
        &self.matrix
    }

    pub fn user_similarity(&self) -> &SimilarityMatrix {
        &self.user_similarity
    }

    pub fn item_similarity(&self) -> &SimilarityMatrix {
        &self.item_similarity
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            version: self.version,
            trained_at: self.trained_at,
            stats: self.matrix.stats(),
        }
    }
}

/// Builds a model from a rating snapshot
///
/// CPU-bound; async callers should run it on a blocking thread.
pub fn train(ratings: &[Rating], config: &EngineConfig) -> EngineResult<TrainedModel> {
    config.validate()?;
    let start = Instant::now();

    let matrix = InteractionMatrix::build(ratings, &config.scale)?;
    let user_similarity = similarity::user_similarity(&matrix);
    let item_similarity = similarity::item_similarity(&matrix, config.min_co_raters);
    let popularity = PopularityRanking::build(&matrix, config.popularity_min_votes);

    tracing::info!(
        users = matrix.n_users(),
        movies = matrix.n_movies(),
        user_pairs = user_similarity.non_zero(),
        item_pairs = item_similarity.non_zero(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Model trained"
    );

    Ok(TrainedModel {
        version: 0,
        trained_at: Utc::now(),
        config: *config,
        matrix,
        user_similarity,
        item_similarity,
        popularity,
    })
}

fn scorer_for(model: &TrainedModel, kind: RecommendationKind) -> Box<dyn Scorer + '_> {
    match kind {
        RecommendationKind::User => Box::new(UserBasedScorer::new(model)),
        RecommendationKind::Item => Box::new(ItemBasedScorer::new(model)),
        RecommendationKind::Hybrid => Box::new(HybridScorer::new(model)),
    }
}

/// Top `top_n` movies for a user
///
/// Unknown users get the head of the popularity ranking. The result always
/// holds `min(top_n, universe)` distinct movies.
pub fn recommend(
    model: &TrainedModel,
    user_id: UserId,
    top_n: usize,
    kind: RecommendationKind,
) -> Vec<Prediction> {
    match model.matrix.user_index(user_id) {
        Some(user) => {
            let scorer = scorer_for(model, kind);
            blender::rank(model, user, scorer.as_ref(), top_n)
        }
        None => {
            tracing::debug!(user_id, "Unknown user, serving popularity ranking");
            model.popularity.top(&model.matrix, user_id, top_n)
        }
    }
}

/// Hybrid prediction for one pair, falling back to popularity
pub fn predict_one(model: &TrainedModel, user_id: UserId, movie_id: MovieId) -> Prediction {
    let matrix = &model.matrix;
    let Some(movie) = matrix.movie_index(movie_id) else {
        return cold_start::unseen_movie(matrix, user_id, movie_id);
    };

    let estimate = match matrix.user_index(user_id) {
        Some(user) => HybridScorer::new(model).estimate(user, movie),
        None => Err(NoSignalWarning { user_id, movie_id }),
    };

    match estimate {
        Ok(estimate) => Prediction {
            user_id,
            movie_id,
            score: estimate.score,
            source: estimate.source,
            support: estimate.support,
        },
        Err(warning) => {
            tracing::debug!(%warning, "Prediction fell back to popularity");
            model.popularity.prediction(matrix, user_id, movie)
        }
    }
}

/// Offline accuracy and ranking evaluation on a held-out split
pub fn evaluate(
    config: &EngineConfig,
    ratings: &[Rating],
    split: &SplitConfig,
) -> EngineResult<EvaluationReport> {
    evaluator::evaluate(config, ratings, split)
}

/// Collaborative evidence for recommending `movie_id` to `user_id`
///
/// `None` when the movie is not in the model. An unknown user still sees
/// the fan count but no similar fans.
pub fn explain(model: &TrainedModel, user_id: UserId, movie_id: MovieId) -> Option<Explanation> {
    let matrix = &model.matrix;
    let movie = matrix.movie_index(movie_id)?;
    let user = matrix.user_index(user_id);

    let fans: Vec<usize> = matrix
        .column(movie)
        .iter()
        .filter(|&(&fan, &rating)| rating >= model.config.relevance_threshold && Some(fan) != user)
        .map(|(&fan, _)| fan)
        .collect();

    let mut similar: Vec<(usize, f64)> = match user {
        Some(user) => fans
            .iter()
            .map(|&fan| (fan, model.user_similarity.get(user, fan)))
            .filter(|&(_, similarity)| similarity > EXPLANATION_FLOOR)
            .collect(),
        None => Vec::new(),
    };
    similar.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    Some(Explanation {
        user_id,
        movie_id,
        fans: fans.len(),
        similar_fans: similar.len(),
        top_similar_fan: similar.first().map(|&(fan, similarity)| SimilarFan {
            user_id: matrix.user_id(fan),
            similarity,
        }),
    })
}

pub fn user_profile(model: &TrainedModel, user_id: UserId) -> Option<UserProfile> {
    let matrix = &model.matrix;
    let user = matrix.user_index(user_id)?;
    let row = matrix.row(user);

    Some(UserProfile {
        user_id,
        total_ratings: row.len(),
        average_rating: matrix.user_mean(user),
        rating_distribution: distribution(row.values().copied()),
    })
}

/// Rating summary of one movie in the served snapshot
pub fn movie_stats(model: &TrainedModel, movie_id: MovieId) -> Option<MovieRatingStats> {
    let matrix = &model.matrix;
    let movie = matrix.movie_index(movie_id)?;
    let column = matrix.column(movie);

    Some(MovieRatingStats {
        average_rating: matrix.movie_mean(movie),
        total_ratings: column.len(),
        rating_distribution: distribution(column.values().copied()),
    })
}

/// Counts per distinct rating value, ascending
fn distribution(values: impl Iterator<Item = f64>) -> Vec<RatingBucket> {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(f64::total_cmp);

    let mut buckets: Vec<RatingBucket> = Vec::new();
    for value in values {
        match buckets.last_mut() {
            Some(bucket) if bucket.value == value => bucket.count += 1,
            _ => buckets.push(RatingBucket { value, count: 1 }),
        }
    }
    buckets
}

/// Head of the popularity ranking
pub fn popular(model: &TrainedModel, top_n: usize) -> Vec<PopularMovie> {
    model
        .popularity
        .order()
        .iter()
        .take(top_n)
        .map(|&movie| PopularMovie {
            movie_id: model.matrix.movie_id(movie),
            score: model.popularity.score(movie),
            ratings: model.matrix.movie_count(movie),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::models::PredictionSource;
    use std::collections::HashSet;

    fn catalogue() -> Vec<Rating> {
        let mut ratings = Vec::new();
        for user in 1..=6u64 {
            for movie in 1..=8u64 {
                if (user + movie) % 3 != 0 {
                    let value = 0.5 + ((user * 7 + movie * 3) % 10) as f64 * 0.5;
                    ratings.push(Rating::new(user, movie, value));
                }
            }
        }
        ratings
    }

    #[test]
    fn test_train_rejects_empty_input() {
        let result = train(&[], &EngineConfig::default());
        assert!(matches!(result, Err(EngineError::Data(_))));
    }

    #[test]
    fn test_train_rejects_invalid_config() {
        let config = EngineConfig {
            hybrid_user_weight: 1.5,
            ..EngineConfig::default()
        };
        let result = train(&catalogue(), &config);
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_recommend_returns_distinct_items_from_universe() {
        let ratings = catalogue();
        let model = train(&ratings, &EngineConfig::default()).unwrap();
        let universe: HashSet<MovieId> = ratings.iter().map(|r| r.movie_id).collect();

        for kind in [
            RecommendationKind::User,
            RecommendationKind::Item,
            RecommendationKind::Hybrid,
        ] {
            for top_n in [0, 1, 3, 20] {
                let recs = recommend(&model, 2, top_n, kind);
                let ids: HashSet<MovieId> = recs.iter().map(|p| p.movie_id).collect();

                assert_eq!(recs.len(), top_n.min(universe.len()));
                assert_eq!(ids.len(), recs.len());
                assert!(ids.is_subset(&universe));
            }
        }
    }

    #[test]
    fn test_unknown_users_share_popularity_list() {
        let model = train(&catalogue(), &EngineConfig::default()).unwrap();

        let first: Vec<MovieId> = recommend(&model, 1000, 5, RecommendationKind::Hybrid)
            .iter()
            .map(|p| p.movie_id)
            .collect();
        let second = recommend(&model, 2000, 5, RecommendationKind::User);

        assert_eq!(first.len(), 5);
        assert_eq!(first, second.iter().map(|p| p.movie_id).collect::<Vec<_>>());
        assert!(second
            .iter()
            .all(|p| p.source == PredictionSource::PopularityFallback && p.user_id == 2000));
    }

    #[test]
    fn test_isolated_user_gets_popularity_ranking() {
        let mut ratings = catalogue();
        ratings.push(Rating::new(99, 100, 3.0));
        let model = train(&ratings, &EngineConfig::default()).unwrap();
        let user = model.matrix().user_index(99).unwrap();

        assert!(model.user_similarity().neighbors(user).is_empty());

        let recs = recommend(&model, 99, 4, RecommendationKind::Hybrid);
        let expected: Vec<MovieId> = model
            .popularity
            .order()
            .iter()
            .map(|&m| model.matrix.movie_id(m))
            .filter(|&id| id != 100)
            .take(4)
            .collect();

        assert!(recs
            .iter()
            .all(|p| p.source == PredictionSource::PopularityFallback));
        let mut got: Vec<MovieId> = recs.iter().map(|p| p.movie_id).collect();
        let mut want = expected.clone();
        got.sort_unstable();
        want.sort_unstable();
        assert_eq!(got, want);
    }

    #[test]
    fn test_training_is_deterministic() {
        let ratings = catalogue();
        let first = train(&ratings, &EngineConfig::default()).unwrap();
        let second = train(&ratings, &EngineConfig::default()).unwrap();

        assert_eq!(first.matrix, second.matrix);
        assert_eq!(first.user_similarity, second.user_similarity);
        assert_eq!(first.item_similarity, second.item_similarity);
        for user in 1..=6 {
            assert_eq!(
                recommend(&first, user, 5, RecommendationKind::Hybrid),
                recommend(&second, user, 5, RecommendationKind::Hybrid)
            );
        }
    }

    #[test]
    fn test_predict_one_unknown_movie() {
        let model = train(&catalogue(), &EngineConfig::default()).unwrap();
        let prediction = predict_one(&model, 1, 4242);

        assert_eq!(prediction.score, model.matrix.global_mean());
        assert_eq!(prediction.support, 0);
        assert_eq!(prediction.source, PredictionSource::PopularityFallback);
    }

    #[test]
    fn test_predict_one_unknown_user_uses_popularity() {
        let model = train(&catalogue(), &EngineConfig::default()).unwrap();
        let movie = model.matrix.movie_index(3).unwrap();

        let prediction = predict_one(&model, 777, 3);
        assert_eq!(prediction.score, model.popularity.score(movie));
        assert_eq!(prediction.support, model.matrix.movie_count(movie));
    }

    #[test]
    fn test_predict_one_is_within_scale() {
        let model = train(&catalogue(), &EngineConfig::default()).unwrap();
        for user in 1..=6 {
            for movie in 1..=8 {
                let prediction = predict_one(&model, user, movie);
                assert!(model.config().scale.contains(prediction.score));
            }
        }
    }

    #[test]
    fn test_explain_counts_fans() {
        let ratings = vec![
            Rating::new(1, 1, 5.0),
            Rating::new(1, 2, 4.0),
            Rating::new(2, 1, 5.0),
            Rating::new(2, 2, 4.5),
            Rating::new(2, 3, 4.0),
            Rating::new(3, 3, 2.0),
            Rating::new(4, 3, 4.5),
        ];
        let model = train(&ratings, &EngineConfig::default()).unwrap();

        let explanation = explain(&model, 1, 3).unwrap();
        assert_eq!(explanation.fans, 2);
        assert_eq!(explanation.similar_fans, 1);
        let top = explanation.top_similar_fan.unwrap();
        assert_eq!(top.user_id, 2);
        assert!(top.similarity > EXPLANATION_FLOOR);

        assert!(explain(&model, 1, 99).is_none());

        let stranger = explain(&model, 50, 3).unwrap();
        assert_eq!(stranger.fans, 2);
        assert_eq!(stranger.similar_fans, 0);
        assert!(stranger.top_similar_fan.is_none());
    }

    #[test]
    fn test_fan_threshold_follows_config() {
        let ratings = vec![
            Rating::new(1, 1, 5.0),
            Rating::new(2, 1, 5.0),
            Rating::new(2, 3, 4.0),
            Rating::new(4, 3, 4.5),
        ];
        let config = EngineConfig {
            relevance_threshold: 4.5,
            ..EngineConfig::default()
        };
        let model = train(&ratings, &config).unwrap();

        let explanation = explain(&model, 1, 3).unwrap();
        assert_eq!(explanation.fans, 1);
        assert_eq!(explanation.similar_fans, 0);
    }

    #[test]
    fn test_user_profile_distribution() {
        let ratings = vec![
            Rating::new(1, 1, 4.0),
            Rating::new(1, 2, 2.0),
            Rating::new(1, 3, 4.0),
            Rating::new(2, 1, 3.0),
        ];
        let model = train(&ratings, &EngineConfig::default()).unwrap();

        let profile = user_profile(&model, 1).unwrap();
        assert_eq!(profile.total_ratings, 3);
        assert!((profile.average_rating - 10.0 / 3.0).abs() < 1e-12);
        assert_eq!(
            profile.rating_distribution,
            vec![
                RatingBucket { value: 2.0, count: 1 },
                RatingBucket { value: 4.0, count: 2 },
            ]
        );
        assert!(user_profile(&model, 9).is_none());
    }

    #[test]
    fn test_movie_stats() {
        let ratings = vec![
            Rating::new(1, 7, 4.0),
            Rating::new(2, 7, 3.0),
            Rating::new(3, 7, 4.0),
            Rating::new(3, 8, 1.0),
        ];
        let model = train(&ratings, &EngineConfig::default()).unwrap();

        let stats = movie_stats(&model, 7).unwrap();
        assert_eq!(stats.total_ratings, 3);
        assert!((stats.average_rating - 11.0 / 3.0).abs() < 1e-12);
        assert_eq!(
            stats.rating_distribution,
            vec![
                RatingBucket { value: 3.0, count: 1 },
                RatingBucket { value: 4.0, count: 2 },
            ]
        );
        assert!(movie_stats(&model, 9).is_none());
    }

    #[test]
    fn test_user_based_recommendation_for_sparse_user() {
        let ratings = vec![
            Rating::new(1, 1, 5.0),
            Rating::new(1, 2, 3.0),
            Rating::new(2, 1, 5.0),
            Rating::new(2, 2, 3.0),
            Rating::new(3, 1, 1.0),
        ];
        let model = train(&ratings, &EngineConfig::default()).unwrap();

        // User 3 already rated movie 1, so movie 2 is the only candidate
        let recs = recommend(&model, 3, 1, RecommendationKind::User);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].movie_id, 2);
        assert_eq!(recs[0].source, PredictionSource::UserBased);
        assert_eq!(recs[0].score, 0.5);

        // The neighbors' enthusiasm for movie 1 outweighs movie 2
        let on_rated = UserBasedScorer::new(&model)
            .estimate(model.matrix.user_index(3).unwrap(), model.matrix.movie_index(1).unwrap())
            .unwrap();
        assert!(on_rated.score > recs[0].score);

        // Asking for more backfills the rated movie from popularity
        let recs = recommend(&model, 3, 2, RecommendationKind::User);
        let ids: Vec<MovieId> = recs.iter().map(|p| p.movie_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(recs[1].source, PredictionSource::PopularityFallback);
    }

    #[test]
    fn test_popular_matches_ranking() {
        let model = train(&catalogue(), &EngineConfig::default()).unwrap();
        let popular = popular(&model, 3);

        assert_eq!(popular.len(), 3);
        assert!(popular.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(popular.len(), recommend(&model, 0, 3, RecommendationKind::Hybrid).len());
    }

    #[test]
    fn test_model_info_reflects_version() {
        let model = train(&catalogue(), &EngineConfig::default())
            .unwrap()
            .with_version(7);
        let info = model.info();

        assert_eq!(info.version, 7);
        assert_eq!(info.stats, model.matrix.stats());
    }
}
