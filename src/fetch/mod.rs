pub mod cache;
pub mod retry;

pub use cache::{CacheKey, CachePolicy, ResultCache};
pub use retry::{
    AttemptOutcome, FetchAttempt, FetchReport, Fetched, RetryPolicy, RetryingFetcher, Sleeper,
    ThreadSleeper,
};
