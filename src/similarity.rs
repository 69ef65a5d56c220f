//! Book-to-book cosine similarity.
//!
//! Each book is represented by its column of the zero-filled rating matrix.
//! The similarity of books `a` and `b` is
//!
//! ```text
//! sim(a, b) = a · b / (|a| |b|)
//! ```
//!
//! with `sim(a, b) = 0` whenever either book has no ratings. The diagonal is
//! exactly 1 for rated books and 0 for unrated ones.
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;

use matrix::RatingMatrix;
use BookId;

/// Square, symmetric matrix of book similarities, indexed like the
/// columns of the rating matrix it was computed from.
#[derive(Clone, Debug)]
pub struct SimilarityMatrix {
    book_ids: Vec<BookId>,
    values: Array2<f64>,
}

impl SimilarityMatrix {
    /// Compute the similarities between the columns of `ratings`.
    pub fn compute(ratings: &RatingMatrix, num_threads: usize) -> Self {
        SimilarityMatrix {
            book_ids: ratings.book_ids().to_owned(),
            values: cosine_similarity(ratings.values().view(), num_threads),
        }
    }

    /// The similarity values.
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Similarity between the books at column indices `a` and `b`.
    pub fn get(&self, a: usize, b: usize) -> f64 {
        self.values[(a, b)]
    }

    /// Book labels of rows and columns.
    pub fn book_ids(&self) -> &[BookId] {
        &self.book_ids
    }

    /// Number of books.
    pub fn len(&self) -> usize {
        self.book_ids.len()
    }

    /// Whether there are no books.
    pub fn is_empty(&self) -> bool {
        self.book_ids.is_empty()
    }
}

/// Cosine similarity between the columns of `ratings`.
///
/// Every unordered pair is computed once and mirrored, so the result is
/// exactly symmetric. Rows of the result are split between `num_threads`
/// workers; the values do not depend on the split.
pub fn cosine_similarity(ratings: ArrayView2<f64>, num_threads: usize) -> Array2<f64> {
    let columns = ratings.t();
    let num_books = columns.len_of(Axis(0));

    let norms: Array1<f64> = columns
        .outer_iter()
        .map(|column| column.dot(&column).sqrt())
        .collect();

    let upper_row = |a: usize| -> Vec<f64> {
        let column_a = columns.index_axis(Axis(0), a);

        (a..num_books)
            .map(|b| {
                if norms[a] == 0.0 || norms[b] == 0.0 {
                    0.0
                } else if a == b {
                    1.0
                } else {
                    let dot = column_a.dot(&columns.index_axis(Axis(0), b));
                    clamp(dot / (norms[a] * norms[b]))
                }
            })
            .collect()
    };

    let rows: Vec<Vec<f64>> = if num_threads > 1 && num_books > 1 {
        let indices: Vec<usize> = (0..num_books).collect();
        let chunk_size = (num_books + num_threads - 1) / num_threads;

        indices
            .par_chunks(chunk_size)
            .map(|chunk| chunk.iter().map(|&a| upper_row(a)).collect::<Vec<_>>())
            .collect::<Vec<_>>()
            .into_iter()
            .flat_map(|chunk| chunk.into_iter())
            .collect()
    } else {
        (0..num_books).map(upper_row).collect()
    };

    let mut similarities = Array2::zeros((num_books, num_books));

    for (a, row) in rows.into_iter().enumerate() {
        for (offset, value) in row.into_iter().enumerate() {
            let b = a + offset;
            similarities[(a, b)] = value;
            similarities[(b, a)] = value;
        }
    }

    similarities
}

// Rounding can push the ratio of nearly parallel vectors just past 1.
fn clamp(value: f64) -> f64 {
    value.max(-1.0).min(1.0)
}
