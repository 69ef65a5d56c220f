//! Offline evaluation of recommendation quality.
use std::collections::{HashMap, HashSet};

use rayon::prelude::*;

use data::{Rating, Ratings};
use ranking::score_candidates;
use recommender::Recommender;
use {BookId, RecommendationError, Timestamp, UserId};

/// Leave-last-out evaluation results.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    /// Number of users evaluated.
    pub num_users: usize,
    /// Fraction of held-out books that made it into the top `cap`.
    pub hit_rate: f64,
    /// Mean reciprocal rank of the held-out books.
    pub mrr: f64,
}

/// Hold out the latest rating of every user with at least two ratings.
///
/// Ties on timestamp are broken by the larger book id.
pub fn leave_last_out(data: &Ratings) -> (Ratings, Vec<Rating>) {
    let mut latest: HashMap<&str, &Rating> = HashMap::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for rating in data.data() {
        *counts.entry(rating.user_id()).or_insert(0) += 1;

        let entry = latest.entry(rating.user_id()).or_insert(rating);
        if (rating.timestamp(), rating.book_id()) > (entry.timestamp(), entry.book_id()) {
            *entry = rating;
        }
    }

    let held_out: Vec<Rating> = data
        .users()
        .iter()
        .filter(|user| counts.get(user.as_str()).cloned().unwrap_or(0) >= 2)
        .filter_map(|user| latest.get(user.as_str()).map(|&rating| rating.clone()))
        .collect();

    let held_out_keys: HashSet<(&str, BookId, Timestamp)> = held_out
        .iter()
        .map(|x| (x.user_id(), x.book_id(), x.timestamp()))
        .collect();
    let (test, train) =
        data.split_by(|x| held_out_keys.contains(&(x.user_id(), x.book_id(), x.timestamp())));

    debug!(
        train = train.len(),
        test = test.len(),
        "split ratings for evaluation"
    );

    (train, held_out)
}

/// Evaluate `recommender` by hiding each user's latest rating and checking
/// where the hidden book lands in the user's ranking.
pub fn evaluate(recommender: &Recommender, data: &Ratings) -> Result<Evaluation, RecommendationError> {
    let (train, held_out) = leave_last_out(data);
    let cap = recommender.hyperparameters().get_cap();

    let model = match recommender.model(&train)? {
        Some(model) => model,
        None => {
            return Ok(Evaluation {
                num_users: 0,
                hit_rate: 0.0,
                mrr: 0.0,
            })
        }
    };

    let ranks: Vec<(UserId, Option<usize>)> = held_out
        .par_iter()
        .map(|test| -> Result<(UserId, Option<usize>), RecommendationError> {
            let scored = score_candidates(test.user_id(), model.similarities(), model.ratings())?;
            let rank = scored.iter().position(|x| x.book_id == test.book_id());

            Ok((test.user_id().to_owned(), rank))
        })
        .collect::<Result<Vec<_>, RecommendationError>>()?;

    let num_users = ranks.len();
    if num_users == 0 {
        return Ok(Evaluation {
            num_users,
            hit_rate: 0.0,
            mrr: 0.0,
        });
    }

    let hits = ranks
        .iter()
        .filter(|&&(_, rank)| rank.map(|x| x < cap).unwrap_or(false))
        .count();
    let reciprocal_ranks: f64 = ranks
        .iter()
        .map(|&(_, rank)| rank.map(|x| 1.0 / (x + 1) as f64).unwrap_or(0.0))
        .sum();

    let evaluation = Evaluation {
        num_users,
        hit_rate: hits as f64 / num_users as f64,
        mrr: reciprocal_ranks / num_users as f64,
    };

    info!(
        num_users,
        hit_rate = evaluation.hit_rate,
        mrr = evaluation.mrr,
        "evaluated recommender"
    );

    Ok(evaluation)
}
