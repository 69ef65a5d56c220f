extern crate bookrec;
extern crate clap;
#[macro_use]
extern crate failure;
extern crate serde_json;
extern crate tracing_subscriber;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bookrec::config::Hyperparameters;
use bookrec::datasets;
use bookrec::evaluation::evaluate;
use bookrec::recommender::Recommender;
use bookrec::RecommendationError;

/// Recommend books from CSV rating data.
#[derive(Parser, Debug)]
#[command(name = "recommend")]
struct Args {
    /// Ratings CSV: user_id,book_id,stars[,timestamp].
    #[arg(long)]
    ratings: PathBuf,
    /// Users CSV with a user_id column; inferred from ratings if absent.
    #[arg(long)]
    users: Option<PathBuf>,
    /// Books CSV with a book_id column; inferred from ratings if absent.
    #[arg(long)]
    books: Option<PathBuf>,
    /// JSON hyperparameters file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Maximum number of recommendations per user.
    #[arg(long)]
    cap: Option<usize>,
    /// Number of worker threads.
    #[arg(long)]
    threads: Option<usize>,
    /// Recommend for this user.
    #[arg(long, conflicts_with_all = ["all", "evaluate"])]
    user: Option<String>,
    /// Recommend for every user.
    #[arg(long, conflicts_with = "evaluate")]
    all: bool,
    /// Report leave-last-out hit rate and MRR.
    #[arg(long)]
    evaluate: bool,
}

fn run(args: Args) -> Result<(), failure::Error> {
    let mut hyper = match args.config {
        Some(ref path) => Hyperparameters::from_json_file(path)?,
        None => Hyperparameters::new(),
    };
    if let Some(cap) = args.cap {
        hyper = hyper.cap(cap);
    }
    if let Some(threads) = args.threads {
        hyper = hyper.num_threads(threads);
    }
    hyper.validate()?;

    let data = datasets::load(
        args.ratings.as_path(),
        args.users.as_ref().map(|x| x.as_path()),
        args.books.as_ref().map(|x| x.as_path()),
        &hyper.get_star_range(),
    )?;
    let recommender = Recommender::new(hyper);

    if args.evaluate {
        let evaluation = evaluate(&recommender, &data)?;
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
    } else if args.all {
        let recommendations = recommender.recommend_all(&data)?;
        println!("{}", serde_json::to_string_pretty(&recommendations)?);
    } else if let Some(user) = args.user {
        match recommender.recommend(&data, &user) {
            Ok(recommendation) => {
                println!("{}", serde_json::to_string_pretty(&recommendation)?);
            }
            Err(RecommendationError::UserNotFound(_)) => {
                println!("No ratings found for this user. Please rate some books first.");
            }
            Err(error) => return Err(error.into()),
        }
    } else {
        bail!("one of --user, --all or --evaluate is required");
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run(Args::parse()) {
        eprintln!("Error: {}", error);
        process::exit(1);
    }
}
