//! Ranking of unrated books by mean similarity to rated ones.
use std::cmp::Ordering;

use matrix::RatingMatrix;
use similarity::SimilarityMatrix;
use {BookId, RecommendationError};

/// How a recommendation was produced.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecommendationKind {
    /// Ranked by similarity to the user's rated books.
    Personalized,
    /// The first books of the catalog: the user has no ratings.
    Fallback,
}

/// A recommended book with its score.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScoredBook {
    /// The book.
    pub book_id: BookId,
    /// Mean similarity to the user's rated books. Fallback entries score 0.
    pub score: f64,
}

/// An ordered list of recommended books.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    kind: RecommendationKind,
    books: Vec<ScoredBook>,
}

impl Recommendation {
    /// Build a personalized recommendation.
    pub fn personalized(books: Vec<ScoredBook>) -> Self {
        Recommendation {
            kind: RecommendationKind::Personalized,
            books,
        }
    }

    /// Build a non-personalized recommendation from catalog order.
    pub fn fallback(book_ids: Vec<BookId>) -> Self {
        Recommendation {
            kind: RecommendationKind::Fallback,
            books: book_ids
                .into_iter()
                .map(|book_id| ScoredBook { book_id, score: 0.0 })
                .collect(),
        }
    }

    /// How the recommendation was produced.
    pub fn kind(&self) -> RecommendationKind {
        self.kind
    }

    /// The recommended books with their scores, best first.
    pub fn books(&self) -> &[ScoredBook] {
        &self.books
    }

    /// The recommended book identifiers, best first.
    pub fn book_ids(&self) -> Vec<BookId> {
        self.books.iter().map(|x| x.book_id).collect()
    }

    /// Number of recommended books.
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// Whether nothing was recommended.
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

/// Column indices of the books `user_id` rated above zero.
pub fn rated_columns(ratings: &RatingMatrix, user_id: &str) -> Option<Vec<usize>> {
    ratings.user_row(user_id).map(|row| {
        row.iter()
            .enumerate()
            .filter(|&(_, &stars)| stars > 0.0)
            .map(|(idx, _)| idx)
            .collect()
    })
}

/// Score every book `user_id` has not rated, best first.
///
/// Scores are the mean similarity to the rated books. Equal scores keep
/// catalog order. Returns an empty list when the user has no ratings.
pub fn score_candidates(
    user_id: &str,
    similarities: &SimilarityMatrix,
    ratings: &RatingMatrix,
) -> Result<Vec<ScoredBook>, RecommendationError> {
    let rated = rated_columns(ratings, user_id)
        .ok_or_else(|| RecommendationError::UserNotFound(user_id.to_owned()))?;

    if rated.is_empty() {
        return Ok(Vec::new());
    }

    let mut is_rated = vec![false; ratings.num_books()];
    for &idx in &rated {
        is_rated[idx] = true;
    }

    let num_rated = rated.len() as f64;
    let mut scored: Vec<(usize, f64)> = (0..ratings.num_books())
        .filter(|&candidate| !is_rated[candidate])
        .map(|candidate| {
            let total: f64 = rated
                .iter()
                .map(|&rated_idx| similarities.get(rated_idx, candidate))
                .sum();
            (candidate, total / num_rated)
        })
        .collect();

    // Stable: ties stay in catalog order.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    Ok(scored
        .into_iter()
        .map(|(idx, score)| ScoredBook {
            book_id: ratings.book_ids()[idx],
            score,
        })
        .collect())
}

/// Recommend up to `cap` books for `user_id`.
///
/// A known user without ratings above zero gets the first `cap` books of
/// the catalog. An unknown user is an error.
pub fn rank(
    user_id: &str,
    similarities: &SimilarityMatrix,
    ratings: &RatingMatrix,
    cap: usize,
) -> Result<Recommendation, RecommendationError> {
    let rated = rated_columns(ratings, user_id)
        .ok_or_else(|| RecommendationError::UserNotFound(user_id.to_owned()))?;

    if rated.is_empty() {
        return Ok(Recommendation::fallback(
            ratings.book_ids().iter().take(cap).cloned().collect(),
        ));
    }

    let mut scored = score_candidates(user_id, similarities, ratings)?;
    scored.truncate(cap);

    Ok(Recommendation::personalized(scored))
}
