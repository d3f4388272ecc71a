pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod fallback;
pub mod feed;
pub mod fetch;
pub mod games;
pub mod odds;
pub mod ratings;
pub mod service;
pub mod stats;

pub use error::{FetchError, TransientKind};
pub use fetch::{Fetched, RetryPolicy, RetryingFetcher};
pub use games::{GameRecord, GameStatus, MissingOpponentPolicy};
pub use ratings::TeamRatings;
pub use service::GameService;
