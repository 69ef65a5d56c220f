//! Rating records and the sources that provide them.
use std::hash::Hasher;

use failure;
use itertools::Itertools;
use siphasher::sip::SipHasher;

use config::StarRange;
use {BookId, Stars, Timestamp, UserId};

// Fixed keys: the fingerprint has to be stable across processes.
const FINGERPRINT_KEYS: (u64, u64) = (0x626f_6f6b_7265_6321, 0x7261_7469_6e67_7321);

/// A single star rating a user gave a book.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Rating {
    user_id: UserId,
    book_id: BookId,
    stars: Stars,
    #[serde(default)]
    timestamp: Timestamp,
}

/// Rating validation errors.
#[derive(Debug, Fail, PartialEq)]
pub enum RatingError {
    /// The star value falls outside the accepted range.
    #[fail(
        display = "Rating of book {} by {:?} has {} stars, expected {} to {}.",
        book_id,
        user_id,
        stars,
        min,
        max
    )]
    StarsOutOfRange {
        /// Rating user.
        user_id: UserId,
        /// Rated book.
        book_id: BookId,
        /// Offending value.
        stars: Stars,
        /// Lowest accepted value.
        min: Stars,
        /// Highest accepted value.
        max: Stars,
    },
}

impl Rating {
    /// Build a new rating. No range checks are applied; see `validate`.
    pub fn new(user_id: &str, book_id: BookId, stars: Stars, timestamp: Timestamp) -> Self {
        Rating {
            user_id: user_id.to_owned(),
            book_id,
            stars,
            timestamp,
        }
    }

    /// The rating user.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The rated book.
    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    /// The star value.
    pub fn stars(&self) -> Stars {
        self.stars
    }

    /// When the rating was made.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Check the star value against `range`.
    pub fn validate(&self, range: &StarRange) -> Result<(), RatingError> {
        if range.contains(self.stars) {
            Ok(())
        } else {
            Err(RatingError::StarsOutOfRange {
                user_id: self.user_id.clone(),
                book_id: self.book_id,
                stars: self.stars,
                min: range.min(),
                max: range.max(),
            })
        }
    }
}

/// Everything the recommender needs from the surrounding application.
///
/// Implementations are expected to return users and books in a stable
/// order: it determines matrix layout, the fallback list and tie-breaks.
pub trait RatingSource {
    /// All known users.
    fn all_users(&self) -> Result<Vec<UserId>, failure::Error>;
    /// All known books, in catalog order.
    fn all_book_ids(&self) -> Result<Vec<BookId>, failure::Error>;
    /// Every rating of every user.
    fn all_ratings(&self) -> Result<Vec<Rating>, failure::Error>;
    /// The ratings of a single user.
    fn ratings_for_user(&self, user_id: &str) -> Result<Vec<Rating>, failure::Error>;
    /// The first `n` books in catalog order.
    fn first_n_books(&self, n: usize) -> Result<Vec<BookId>, failure::Error>;
}

/// An in-memory rating store.
#[derive(Clone, Debug, Default)]
pub struct Ratings {
    users: Vec<UserId>,
    book_ids: Vec<BookId>,
    ratings: Vec<Rating>,
}

impl Ratings {
    /// Build a store from explicit user and book catalogs.
    pub fn new(users: Vec<UserId>, book_ids: Vec<BookId>, ratings: Vec<Rating>) -> Self {
        Ratings {
            users,
            book_ids,
            ratings,
        }
    }

    /// The ratings held.
    pub fn data(&self) -> &[Rating] {
        &self.ratings
    }

    /// Known users.
    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    /// Known books.
    pub fn book_ids(&self) -> &[BookId] {
        &self.book_ids
    }

    /// Number of ratings.
    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    /// Whether there are no ratings.
    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Number of users.
    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    /// Number of books.
    pub fn num_books(&self) -> usize {
        self.book_ids.len()
    }

    /// Whether `user_id` is a known user.
    pub fn contains_user(&self, user_id: &str) -> bool {
        self.users.iter().any(|user| user == user_id)
    }

    /// Add a rating, registering unseen users and books at the end of
    /// their catalogs.
    pub fn push(&mut self, rating: Rating) {
        if !self.contains_user(rating.user_id()) {
            self.users.push(rating.user_id().to_owned());
        }
        if !self.book_ids.contains(&rating.book_id()) {
            self.book_ids.push(rating.book_id());
        }
        self.ratings.push(rating);
    }

    /// Split the ratings into two stores sharing the same catalogs.
    pub fn split_by<F: Fn(&Rating) -> bool>(&self, func: F) -> (Self, Self) {
        let (head, tail): (Vec<Rating>, Vec<Rating>) =
            self.ratings.iter().cloned().partition(|x| func(x));

        (
            Ratings::new(self.users.clone(), self.book_ids.clone(), head),
            Ratings::new(self.users.clone(), self.book_ids.clone(), tail),
        )
    }

    /// Data-version token: equal catalogs and ratings give equal tokens.
    pub fn fingerprint(&self) -> u64 {
        fingerprint(&self.users, &self.book_ids, &self.ratings)
    }
}

impl From<Vec<Rating>> for Ratings {
    /// Infer the catalogs from the ratings: users in order of first
    /// appearance, books in ascending order.
    fn from(data: Vec<Rating>) -> Ratings {
        let users = data
            .iter()
            .map(|x| x.user_id().to_owned())
            .unique()
            .collect();
        let book_ids = data.iter().map(|x| x.book_id()).unique().sorted().collect();

        Ratings {
            users,
            book_ids,
            ratings: data,
        }
    }
}

impl RatingSource for Ratings {
    fn all_users(&self) -> Result<Vec<UserId>, failure::Error> {
        Ok(self.users.clone())
    }

    fn all_book_ids(&self) -> Result<Vec<BookId>, failure::Error> {
        Ok(self.book_ids.clone())
    }

    fn all_ratings(&self) -> Result<Vec<Rating>, failure::Error> {
        Ok(self.ratings.clone())
    }

    fn ratings_for_user(&self, user_id: &str) -> Result<Vec<Rating>, failure::Error> {
        Ok(self
            .ratings
            .iter()
            .filter(|x| x.user_id() == user_id)
            .cloned()
            .collect())
    }

    fn first_n_books(&self, n: usize) -> Result<Vec<BookId>, failure::Error> {
        Ok(self.book_ids.iter().take(n).cloned().collect())
    }
}

/// Compute the data-version token of a snapshot of the rating data.
pub fn fingerprint(users: &[UserId], book_ids: &[BookId], ratings: &[Rating]) -> u64 {
    let mut hasher = SipHasher::new_with_keys(FINGERPRINT_KEYS.0, FINGERPRINT_KEYS.1);

    hasher.write_usize(users.len());
    for user in users {
        hasher.write_usize(user.len());
        hasher.write(user.as_bytes());
    }

    hasher.write_usize(book_ids.len());
    for &book_id in book_ids {
        hasher.write_u64(book_id);
    }

    hasher.write_usize(ratings.len());
    for rating in ratings {
        hasher.write_usize(rating.user_id.len());
        hasher.write(rating.user_id.as_bytes());
        hasher.write_u64(rating.book_id);
        hasher.write_i32(rating.stars);
        hasher.write_u64(rating.timestamp);
    }

    hasher.finish()
}
