use serde_json::Value;

use crate::error::FetchError;

/// Upstream NBA data source. Every call is a single attempt; retrying is the
/// caller's job.
pub trait StatsFeed: Send + Sync {
    /// Raw live scoreboard payload for today.
    fn scoreboard(&self) -> Result<Value, FetchError>;

    /// Raw response of a stats endpoint such as `leaguegamefinder`.
    fn stats(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, FetchError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
