//! Per-request recommendation over a rating source.
//!
//! The recommender pulls the full rating data from a `RatingSource` on
//! every call and rebuilds the rating and similarity matrices from it.
//! With caching enabled, the matrices are kept and reused for as long as
//! the data-version token of the source data stays the same; the output
//! is identical either way.
use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use config::Hyperparameters;
use data::{fingerprint, Rating, RatingSource};
use matrix::RatingMatrix;
use ranking::{rank, Recommendation};
use similarity::SimilarityMatrix;
use {BookId, RecommendationError, UserId};

/// Rating and similarity matrices built from one snapshot of the data.
#[derive(Debug)]
pub struct Model {
    token: u64,
    ratings: RatingMatrix,
    similarities: SimilarityMatrix,
}

impl Model {
    /// Build the matrices for a snapshot of the data.
    pub fn build(
        users: &[UserId],
        book_ids: &[BookId],
        ratings: &[Rating],
        hyper: &Hyperparameters,
    ) -> Result<Self, RecommendationError> {
        let matrix = RatingMatrix::build(users, book_ids, ratings, hyper.get_max_matrix_cells())?;
        let similarities = SimilarityMatrix::compute(&matrix, hyper.get_num_threads());

        Ok(Model {
            token: fingerprint(users, book_ids, ratings),
            ratings: matrix,
            similarities,
        })
    }

    /// Data-version token of the snapshot.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// The rating matrix.
    pub fn ratings(&self) -> &RatingMatrix {
        &self.ratings
    }

    /// The book similarity matrix.
    pub fn similarities(&self) -> &SimilarityMatrix {
        &self.similarities
    }

    /// Recommend up to `cap` books for `user_id`.
    pub fn recommend(&self, user_id: &str, cap: usize) -> Result<Recommendation, RecommendationError> {
        rank(user_id, &self.similarities, &self.ratings, cap)
    }
}

/// Item-based collaborative filtering recommender.
#[derive(Debug)]
pub struct Recommender {
    hyper: Hyperparameters,
    cache: Mutex<Option<Arc<Model>>>,
}

impl Recommender {
    /// Build a new recommender.
    pub fn new(hyper: Hyperparameters) -> Self {
        Recommender {
            hyper,
            cache: Mutex::new(None),
        }
    }

    /// The recommender's hyperparameters.
    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyper
    }

    /// Recommend books for `user_id`.
    ///
    /// Users without ratings get the first books of the catalog. Users the
    /// source does not know are reported as `UserNotFound`. An empty user
    /// set or catalog gives an empty recommendation.
    pub fn recommend<S: RatingSource>(
        &self,
        source: &S,
        user_id: &str,
    ) -> Result<Recommendation, RecommendationError> {
        let cap = self.hyper.get_cap();

        if source.ratings_for_user(user_id)?.is_empty() {
            if !source.all_users()?.iter().any(|user| user == user_id) {
                return Err(RecommendationError::UserNotFound(user_id.to_owned()));
            }

            debug!(user_id, "no ratings, recommending from catalog order");
            return Ok(Recommendation::fallback(source.first_n_books(cap)?));
        }

        let model = match self.model(source)? {
            Some(model) => model,
            None => return Ok(Recommendation::personalized(Vec::new())),
        };

        let recommendation = model.recommend(user_id, cap)?;

        debug!(
            user_id,
            recommended = ?recommendation.book_ids(),
            "computed recommendation"
        );

        Ok(recommendation)
    }

    /// Recommend books for every known user, in user order.
    ///
    /// The matrices are built once. Returns nothing when the user set or
    /// the catalog is empty.
    pub fn recommend_all<S: RatingSource>(
        &self,
        source: &S,
    ) -> Result<Vec<(UserId, Recommendation)>, RecommendationError> {
        let cap = self.hyper.get_cap();

        let model = match self.model(source)? {
            Some(model) => model,
            None => return Ok(Vec::new()),
        };

        let recommend = |user_id: &UserId| {
            model
                .recommend(user_id, cap)
                .map(|recommendation| (user_id.clone(), recommendation))
        };

        let users = model.ratings().users();
        let recommendations = if self.hyper.get_num_threads() > 1 {
            users.par_iter().map(recommend).collect::<Result<Vec<_>, _>>()?
        } else {
            users.iter().map(recommend).collect::<Result<Vec<_>, _>>()?
        };

        info!(num_users = recommendations.len(), "computed recommendations for all users");

        Ok(recommendations)
    }

    /// Build (or fetch from cache) the matrices for the current data.
    ///
    /// Returns `None` when there are no users or no books.
    pub fn model<S: RatingSource>(
        &self,
        source: &S,
    ) -> Result<Option<Arc<Model>>, RecommendationError> {
        let users = source.all_users()?;
        let book_ids = source.all_book_ids()?;

        if users.is_empty() || book_ids.is_empty() {
            debug!(
                num_users = users.len(),
                num_books = book_ids.len(),
                "nothing to recommend from"
            );
            return Ok(None);
        }

        let ratings = source.all_ratings()?;

        if !self.hyper.get_cache() {
            return Ok(Some(Arc::new(Model::build(
                &users,
                &book_ids,
                &ratings,
                &self.hyper,
            )?)));
        }

        let token = fingerprint(&users, &book_ids, &ratings);
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(ref model) = *cache {
            if model.token() == token {
                debug!(token, "reusing cached model");
                return Ok(Some(model.clone()));
            }
        }

        let model = Arc::new(Model::build(&users, &book_ids, &ratings, &self.hyper)?);
        *cache = Some(model.clone());

        debug!(token, "cached new model");

        Ok(Some(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use failure;
    use failure::Fail;

    use data::Ratings;
    use ranking::RecommendationKind;

    fn bookstore() -> Ratings {
        Ratings::new(
            vec!["u1".to_owned(), "u2".to_owned(), "u3".to_owned(), "u4".to_owned()],
            vec![1, 2, 3, 4],
            vec![
                Rating::new("u1", 1, 5, 0),
                Rating::new("u1", 2, 5, 1),
                Rating::new("u2", 1, 1, 2),
                Rating::new("u2", 3, 5, 3),
                Rating::new("u3", 2, 5, 4),
                Rating::new("u3", 4, 3, 5),
            ],
        )
    }

    #[test]
    fn recommends_unrated_books() {
        let recommender = Recommender::new(Hyperparameters::new());
        let recommendation = recommender.recommend(&bookstore(), "u1").unwrap();

        assert_eq!(recommendation.kind(), RecommendationKind::Personalized);
        assert_eq!(recommendation.book_ids(), vec![4, 3]);
    }

    #[test]
    fn user_without_ratings_gets_fallback() {
        let recommender = Recommender::new(Hyperparameters::new().cap(2));
        let recommendation = recommender.recommend(&bookstore(), "u4").unwrap();

        assert_eq!(recommendation.kind(), RecommendationKind::Fallback);
        assert_eq!(recommendation.book_ids(), vec![1, 2]);
    }

    #[test]
    fn unknown_user_is_reported() {
        let recommender = Recommender::new(Hyperparameters::new());

        match recommender.recommend(&bookstore(), "nobody") {
            Err(RecommendationError::UserNotFound(user)) => assert_eq!(user, "nobody"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn empty_catalog_is_degenerate() {
        let recommender = Recommender::new(Hyperparameters::new());
        let no_books = Ratings::new(vec!["u1".to_owned()], Vec::new(), Vec::new());
        let no_books_rated = Ratings::new(
            vec!["u1".to_owned()],
            Vec::new(),
            vec![Rating::new("u1", 1, 5, 0)],
        );

        assert!(recommender.recommend(&no_books, "u1").unwrap().is_empty());
        assert!(recommender.recommend(&no_books_rated, "u1").unwrap().is_empty());
        assert!(recommender.recommend_all(&no_books).unwrap().is_empty());
        assert!(recommender.model(&Ratings::default()).unwrap().is_none());
    }

    #[test]
    fn user_who_rated_everything() {
        let recommender = Recommender::new(Hyperparameters::new());
        let ratings = Ratings::new(
            vec!["u1".to_owned()],
            vec![1, 2],
            vec![Rating::new("u1", 1, 5, 0), Rating::new("u1", 2, 4, 0)],
        );

        assert!(recommender.recommend(&ratings, "u1").unwrap().is_empty());
    }

    #[test]
    fn idempotent() {
        let recommender = Recommender::new(Hyperparameters::new());
        let data = bookstore();

        assert_eq!(
            recommender.recommend(&data, "u2").unwrap(),
            recommender.recommend(&data, "u2").unwrap()
        );
    }

    #[test]
    fn cache_preserves_output() {
        let plain = Recommender::new(Hyperparameters::new());
        let cached = Recommender::new(Hyperparameters::new().cache(true));
        let mut data = bookstore();

        let first = cached.model(&data).unwrap().unwrap();
        let again = cached.model(&data).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        for user in &["u1", "u2", "u3", "u4"] {
            assert_eq!(
                plain.recommend(&data, user).unwrap(),
                cached.recommend(&data, user).unwrap()
            );
        }

        data.push(Rating::new("u4", 3, 4, 6));
        let rebuilt = cached.model(&data).unwrap().unwrap();
        assert_ne!(rebuilt.token(), first.token());
        assert_eq!(
            plain.recommend(&data, "u4").unwrap(),
            cached.recommend(&data, "u4").unwrap()
        );
    }

    #[test]
    fn batch_matches_single_requests() {
        let data = bookstore();
        let single = Recommender::new(Hyperparameters::new());
        let batch = Recommender::new(Hyperparameters::new().num_threads(4))
            .recommend_all(&data)
            .unwrap();

        let users: Vec<&str> = batch.iter().map(|(user, _)| user.as_str()).collect();
        assert_eq!(users, vec!["u1", "u2", "u3", "u4"]);

        for (user, recommendation) in &batch {
            assert_eq!(recommendation, &single.recommend(&data, user).unwrap());
        }
    }

    #[test]
    fn cap_is_enforced() {
        let users: Vec<UserId> = (0..20).map(|x| format!("user{}", x)).collect();
        let book_ids: Vec<BookId> = (0..50).collect();
        let ratings = (0..20)
            .flat_map(|user| {
                (0..5).map(move |offset| {
                    Rating::new(&format!("user{}", user), (user * 2 + offset) % 50, 1 + offset as i32, 0)
                })
            })
            .collect();
        let data = Ratings::new(users.clone(), book_ids, ratings);

        for cap in 0..6 {
            let recommender = Recommender::new(Hyperparameters::new().cap(cap));
            for user in &users {
                assert!(recommender.recommend(&data, user).unwrap().len() <= cap);
            }
        }
    }

    #[test]
    fn non_positive_stars_count_as_unrated() {
        let recommender = Recommender::new(Hyperparameters::new());
        let data = Ratings::new(
            vec!["a".to_owned(), "b".to_owned()],
            vec![1, 2, 3],
            vec![
                Rating::new("a", 2, 0, 0),
                Rating::new("b", 1, 5, 1),
                Rating::new("b", 3, -2, 2),
            ],
        );

        let zero = recommender.recommend(&data, "a").unwrap();
        assert_eq!(zero.kind(), RecommendationKind::Fallback);
        assert_eq!(zero.book_ids(), vec![1, 2, 3]);

        let negative = recommender.recommend(&data, "b").unwrap();
        assert_eq!(negative.kind(), RecommendationKind::Personalized);
        assert_eq!(negative.book_ids(), vec![2, 3]);
        assert_eq!(negative.books()[1].score, -1.0);
    }

    struct UnavailableSource;

    impl RatingSource for UnavailableSource {
        fn all_users(&self) -> Result<Vec<UserId>, failure::Error> {
            Err(format_err!("database unavailable"))
        }
        fn all_book_ids(&self) -> Result<Vec<BookId>, failure::Error> {
            Err(format_err!("database unavailable"))
        }
        fn all_ratings(&self) -> Result<Vec<Rating>, failure::Error> {
            Err(format_err!("database unavailable"))
        }
        fn ratings_for_user(&self, _: &str) -> Result<Vec<Rating>, failure::Error> {
            Err(format_err!("database unavailable"))
        }
        fn first_n_books(&self, _: usize) -> Result<Vec<BookId>, failure::Error> {
            Err(format_err!("database unavailable"))
        }
    }

    #[test]
    fn source_failure_keeps_cause() {
        let recommender = Recommender::new(Hyperparameters::new());

        match recommender.recommend(&UnavailableSource, "u1") {
            Err(error @ RecommendationError::Source(_)) => {
                assert_eq!(error.to_string(), "Rating source failed: database unavailable");
                assert_eq!(
                    error.cause().map(|cause| cause.to_string()),
                    Some("database unavailable".to_owned())
                );
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn matrix_limit_surfaces() {
        let recommender = Recommender::new(Hyperparameters::new().max_matrix_cells(10));

        match recommender.recommend(&bookstore(), "u1") {
            Err(RecommendationError::MatrixTooLarge { cells, limit }) => {
                assert_eq!(cells, 16);
                assert_eq!(limit, 10);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
