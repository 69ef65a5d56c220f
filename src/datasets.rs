//! Loading rating data from CSV files, and synthetic data for experiments.
//!
//! The ratings file has a header row and the columns
//! `user_id,book_id,stars,timestamp`; the timestamp column may be omitted.
//! The optional users and books files hold a single `user_id` or `book_id`
//! column, in catalog order.
use std::path::Path;

use csv;
use failure;
use rand::Rng;

use config::StarRange;
use data::{Rating, Ratings};
use {BookId, UserId};

#[derive(Deserialize)]
struct UserRecord {
    user_id: UserId,
}

#[derive(Deserialize)]
struct BookRecord {
    book_id: BookId,
}

/// Load ratings, rejecting any whose stars fall outside `star_range`.
pub fn load_ratings<P: AsRef<Path>>(
    path: P,
    star_range: &StarRange,
) -> Result<Vec<Rating>, failure::Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut ratings = Vec::new();

    for record in reader.deserialize() {
        let rating: Rating = record?;
        rating.validate(star_range)?;
        ratings.push(rating);
    }

    Ok(ratings)
}

/// Load the user catalog.
pub fn load_users<P: AsRef<Path>>(path: P) -> Result<Vec<UserId>, failure::Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let users = reader
        .deserialize()
        .map(|record| record.map(|x: UserRecord| x.user_id))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(users)
}

/// Load the book catalog.
pub fn load_books<P: AsRef<Path>>(path: P) -> Result<Vec<BookId>, failure::Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let book_ids = reader
        .deserialize()
        .map(|record| record.map(|x: BookRecord| x.book_id))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(book_ids)
}

/// Load a complete rating store.
///
/// Catalogs not given as files are inferred from the ratings: users in order
/// of first appearance, books in ascending order.
pub fn load<P: AsRef<Path>>(
    ratings: P,
    users: Option<P>,
    books: Option<P>,
    star_range: &StarRange,
) -> Result<Ratings, failure::Error> {
    let data = load_ratings(ratings, star_range)?;
    let inferred = Ratings::from(data.clone());

    let users = match users {
        Some(path) => load_users(path)?,
        None => inferred.users().to_owned(),
    };
    let book_ids = match books {
        Some(path) => load_books(path)?,
        None => inferred.book_ids().to_owned(),
    };

    info!(
        num_users = users.len(),
        num_books = book_ids.len(),
        num_ratings = data.len(),
        "loaded rating data"
    );

    Ok(Ratings::new(users, book_ids, data))
}

/// Generate random ratings: every (user, book) pair is rated with
/// probability `density`, with stars drawn uniformly from `star_range`.
///
/// Users are named `user{n}` and books numbered from 1.
pub fn synthetic<R: Rng>(
    num_users: usize,
    num_books: usize,
    density: f64,
    star_range: &StarRange,
    rng: &mut R,
) -> Ratings {
    let users: Vec<UserId> = (0..num_users).map(|idx| format!("user{}", idx)).collect();
    let book_ids: Vec<BookId> = (1..=num_books as BookId).collect();

    let mut ratings = Vec::new();
    let mut timestamp = 0;

    for (user, &book_id) in iproduct!(users.iter(), book_ids.iter()) {
        if rng.gen::<f64>() < density {
            let stars = rng.gen_range(star_range.min()..=star_range.max());
            ratings.push(Rating::new(user, book_id, stars, timestamp));
            timestamp += 1;
        }
    }

    Ratings::new(users, book_ids, ratings)
}
