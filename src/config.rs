//! Recommender configuration.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use failure;
use serde_json;

use Stars;

/// Inclusive range of accepted star values.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StarRange {
    min: Stars,
    max: Stars,
}

impl StarRange {
    /// Build a new inclusive range.
    pub fn new(min: Stars, max: Stars) -> Self {
        StarRange { min, max }
    }

    /// Lowest accepted value.
    pub fn min(&self) -> Stars {
        self.min
    }

    /// Highest accepted value.
    pub fn max(&self) -> Stars {
        self.max
    }

    /// Whether `stars` falls in the range.
    pub fn contains(&self, stars: Stars) -> bool {
        self.min <= stars && stars <= self.max
    }
}

impl Default for StarRange {
    fn default() -> Self {
        StarRange::new(1, 5)
    }
}

/// Configuration errors.
#[derive(Debug, Fail)]
pub enum ConfigError {
    /// A setting has a value the recommender cannot use.
    #[fail(display = "Invalid configuration: {}", _0)]
    Invalid(String),
}

/// Hyperparameters of the recommender.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Hyperparameters {
    cap: usize,
    num_threads: usize,
    max_matrix_cells: Option<usize>,
    cache: bool,
    star_range: StarRange,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Hyperparameters::new()
    }
}

impl Hyperparameters {
    /// Build new hyperparameters: three recommendations, single-threaded,
    /// no matrix size limit, no caching, 1 to 5 stars.
    pub fn new() -> Self {
        Hyperparameters {
            cap: 3,
            num_threads: 1,
            max_matrix_cells: None,
            cache: false,
            star_range: StarRange::default(),
        }
    }

    /// Set the maximum number of recommendations returned.
    pub fn cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    /// Set number of threads to be used.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Refuse to build rating matrices larger than `cells` cells.
    pub fn max_matrix_cells(mut self, cells: usize) -> Self {
        self.max_matrix_cells = Some(cells);
        self
    }

    /// Keep built matrices between calls while the data is unchanged.
    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Set the accepted star range used when loading ratings.
    pub fn star_range(mut self, star_range: StarRange) -> Self {
        self.star_range = star_range;
        self
    }

    /// Load hyperparameters from a JSON file. Missing fields take their
    /// default values.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, failure::Error> {
        let reader = BufReader::new(File::open(path)?);
        let hyper: Hyperparameters = serde_json::from_reader(reader)?;

        hyper.validate()?;

        Ok(hyper)
    }

    /// Check settings for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_threads == 0 {
            return Err(ConfigError::Invalid("num_threads must be at least 1".to_owned()));
        }
        if self.star_range.min() > self.star_range.max() {
            return Err(ConfigError::Invalid(format!(
                "star range {}..={} is empty",
                self.star_range.min(),
                self.star_range.max()
            )));
        }

        Ok(())
    }

    /// Maximum number of recommendations.
    pub fn get_cap(&self) -> usize {
        self.cap
    }

    /// Number of worker threads.
    pub fn get_num_threads(&self) -> usize {
        self.num_threads.max(1)
    }

    /// Matrix size limit, if any.
    pub fn get_max_matrix_cells(&self) -> Option<usize> {
        self.max_matrix_cells
    }

    /// Whether caching is enabled.
    pub fn get_cache(&self) -> bool {
        self.cache
    }

    /// Accepted star range.
    pub fn get_star_range(&self) -> StarRange {
        self.star_range
    }
}
