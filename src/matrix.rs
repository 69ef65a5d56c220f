//! Dense users × books rating matrix.
use std::collections::HashMap;

use ndarray::{Array2, ArrayView1, Axis};

use data::Rating;
use {BookId, RecommendationError, UserId};

/// Value of cells without a rating.
pub const UNRATED: f64 = f64::NAN;

/// A users × books matrix of star ratings.
///
/// Rows follow the order of the user catalog and columns the order of the
/// book catalog. Cells without a rating hold `UNRATED` in `raw` and zero in
/// `values`.
#[derive(Clone, Debug)]
pub struct RatingMatrix {
    users: Vec<UserId>,
    book_ids: Vec<BookId>,
    user_index: HashMap<UserId, usize>,
    book_index: HashMap<BookId, usize>,
    raw: Array2<f64>,
    values: Array2<f64>,
}

impl RatingMatrix {
    /// Build the matrix for the given catalogs.
    ///
    /// Ratings naming an unknown user or book are skipped. When a pair is
    /// rated more than once the last rating wins. Fails only when
    /// `max_cells` is set and the matrix would be larger.
    pub fn build(
        users: &[UserId],
        book_ids: &[BookId],
        ratings: &[Rating],
        max_cells: Option<usize>,
    ) -> Result<Self, RecommendationError> {
        let cells = users.len().saturating_mul(book_ids.len());

        if let Some(limit) = max_cells {
            if cells > limit {
                return Err(RecommendationError::MatrixTooLarge { cells, limit });
            }
        }

        let user_index: HashMap<UserId, usize> = users
            .iter()
            .enumerate()
            .map(|(idx, user)| (user.clone(), idx))
            .collect();
        let book_index: HashMap<BookId, usize> = book_ids
            .iter()
            .enumerate()
            .map(|(idx, &book_id)| (book_id, idx))
            .collect();

        let mut raw = Array2::from_elem((users.len(), book_ids.len()), UNRATED);
        let mut skipped = 0;

        for rating in ratings {
            let cell = (
                user_index.get(rating.user_id()),
                book_index.get(&rating.book_id()),
            );

            match cell {
                (Some(&row), Some(&col)) => {
                    if !raw[(row, col)].is_nan() {
                        debug!(
                            user_id = rating.user_id(),
                            book_id = rating.book_id(),
                            "duplicate rating, keeping the last one"
                        );
                    }
                    raw[(row, col)] = f64::from(rating.stars());
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(skipped, "ratings referencing unknown users or books were skipped");
        }

        let values = raw.mapv(|x| if x.is_nan() { 0.0 } else { x });

        debug!(
            num_users = users.len(),
            num_books = book_ids.len(),
            num_ratings = ratings.len(),
            "built rating matrix"
        );

        Ok(RatingMatrix {
            users: users.to_owned(),
            book_ids: book_ids.to_owned(),
            user_index,
            book_index,
            raw,
            values,
        })
    }

    /// Ratings with unrated cells set to zero.
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Ratings with unrated cells set to `UNRATED`.
    pub fn raw(&self) -> &Array2<f64> {
        &self.raw
    }

    /// The zero-filled row of `user_id`, if the user is known.
    pub fn user_row<'a>(&'a self, user_id: &str) -> Option<ArrayView1<'a, f64>> {
        self.user_index
            .get(user_id)
            .map(|&row| self.values.index_axis(Axis(0), row))
    }

    /// Row index of `user_id`.
    pub fn user_idx(&self, user_id: &str) -> Option<usize> {
        self.user_index.get(user_id).cloned()
    }

    /// Column index of `book_id`.
    pub fn book_idx(&self, book_id: BookId) -> Option<usize> {
        self.book_index.get(&book_id).cloned()
    }

    /// Row labels.
    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    /// Column labels.
    pub fn book_ids(&self) -> &[BookId] {
        &self.book_ids
    }

    /// Number of rows.
    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    /// Number of columns.
    pub fn num_books(&self) -> usize {
        self.book_ids.len()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.num_users(), self.num_books())
    }

    /// Whether there is nothing to recommend from.
    pub fn is_degenerate(&self) -> bool {
        self.num_users() == 0 || self.num_books() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(names: &[&str]) -> Vec<UserId> {
        names.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn every_user_and_book_present() {
        let matrix = RatingMatrix::build(
            &users(&["ann", "bob", "cat"]),
            &[10, 20, 30],
            &[Rating::new("bob", 20, 4, 0)],
            None,
        )
        .unwrap();

        assert_eq!(matrix.shape(), (3, 3));
        assert_eq!(matrix.values()[(1, 1)], 4.0);
        assert_eq!(matrix.values().iter().filter(|&&x| x == 0.0).count(), 8);
        assert_eq!(matrix.raw().iter().filter(|x| x.is_nan()).count(), 8);
        assert_eq!(matrix.user_row("cat").unwrap().sum(), 0.0);
        assert!(matrix.user_row("eve").is_none());
    }

    #[test]
    fn last_duplicate_wins() {
        let matrix = RatingMatrix::build(
            &users(&["ann"]),
            &[1],
            &[Rating::new("ann", 1, 2, 0), Rating::new("ann", 1, 5, 1)],
            None,
        )
        .unwrap();

        assert_eq!(matrix.values()[(0, 0)], 5.0);
    }

    #[test]
    fn unknown_references_skipped() {
        let matrix = RatingMatrix::build(
            &users(&["ann"]),
            &[1],
            &[Rating::new("eve", 1, 2, 0), Rating::new("ann", 9, 5, 1)],
            None,
        )
        .unwrap();

        assert_eq!(matrix.values()[(0, 0)], 0.0);
    }

    #[test]
    fn degenerate_shapes() {
        let no_books = RatingMatrix::build(&users(&["ann"]), &[], &[], None).unwrap();
        let no_users = RatingMatrix::build(&[], &[1, 2], &[], None).unwrap();

        assert!(no_books.is_degenerate());
        assert!(no_users.is_degenerate());
    }

    #[test]
    fn cell_limit() {
        let result = RatingMatrix::build(&users(&["ann", "bob"]), &[1, 2, 3], &[], Some(5));

        match result {
            Err(RecommendationError::MatrixTooLarge { cells, limit }) => {
                assert_eq!(cells, 6);
                assert_eq!(limit, 5);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
