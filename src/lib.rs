#![deny(missing_docs)]
//! # bookrec
//!
//! `bookrec` implements item-based collaborative filtering over a book
//! catalog: given every user's star ratings, it recommends the books a user
//! has not rated yet that are most similar, across everybody's ratings, to
//! the books they have rated.
//!
//! Each call builds a dense users × books rating matrix, computes the
//! cosine similarity between every pair of book columns and ranks the
//! unrated books by their mean similarity to the rated ones.
//!
//! ## Example
//!
//! ```rust
//! # extern crate bookrec;
//! use bookrec::data::{Rating, Ratings};
//! use bookrec::config::Hyperparameters;
//! use bookrec::recommender::Recommender;
//!
//! let ratings = Ratings::new(
//!     vec!["ann".to_owned(), "bob".to_owned(), "cat".to_owned()],
//!     vec![1, 2, 3, 4],
//!     vec![
//!         Rating::new("ann", 1, 5, 0),
//!         Rating::new("ann", 2, 5, 1),
//!         Rating::new("bob", 1, 1, 2),
//!         Rating::new("bob", 3, 5, 3),
//!         Rating::new("cat", 2, 5, 4),
//!         Rating::new("cat", 4, 3, 5),
//!     ],
//! );
//!
//! let recommender = Recommender::new(Hyperparameters::new().cap(3));
//! let recommendation = recommender.recommend(&ratings, "ann").unwrap();
//!
//! assert_eq!(recommendation.book_ids(), vec![4, 3]);
//! ```
#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate itertools;

#[macro_use]
extern crate failure;
#[macro_use]
extern crate tracing;

#[cfg(feature = "datasets")]
extern crate csv;
extern crate ndarray;
#[cfg(feature = "datasets")]
extern crate rand;
extern crate rayon;
extern crate serde;
extern crate serde_json;
extern crate siphasher;

#[cfg(test)]
extern crate proptest;

pub mod config;
pub mod data;
#[cfg(feature = "datasets")]
pub mod datasets;
pub mod evaluation;
pub mod matrix;
pub mod ranking;
pub mod recommender;
pub mod similarity;

/// Alias for user identifiers.
pub type UserId = String;
/// Alias for book identifiers.
pub type BookId = u64;
/// Alias for star values.
pub type Stars = i32;
/// Alias for timestamps.
pub type Timestamp = u64;

/// Recommendation error types.
#[derive(Debug, Fail)]
pub enum RecommendationError {
    /// The target user is not known to the rating source.
    #[fail(display = "User {:?} not found.", _0)]
    UserNotFound(UserId),
    /// The dense rating matrix would exceed the configured cell limit.
    #[fail(
        display = "Rating matrix of {} cells exceeds the limit of {} cells.",
        cells,
        limit
    )]
    MatrixTooLarge {
        /// Number of cells the matrix would need.
        cells: usize,
        /// Configured maximum.
        limit: usize,
    },
    /// The rating source failed to produce data.
    #[fail(display = "Rating source failed: {}", _0)]
    Source(#[cause] failure::Error),
}

impl From<failure::Error> for RecommendationError {
    fn from(error: failure::Error) -> Self {
        RecommendationError::Source(error)
    }
}
