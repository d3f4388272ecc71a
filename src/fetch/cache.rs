//! Process-wide result cache with an explicit TTL.
//!
//! Entries are keyed by `(operation, arguments, time bucket)` where the bucket
//! is `unix_secs / ttl_secs`; a value cached in one bucket is never served in
//! the next. Only successful data is stored.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::FetchError;
use crate::fetch::retry::Fetched;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Disabled,
    Ttl(Duration),
}

impl CachePolicy {
    /// `0` disables caching.
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            CachePolicy::Disabled
        } else {
            CachePolicy::Ttl(Duration::from_secs(secs))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub operation: String,
    pub args: String,
    pub bucket: u64,
}

pub struct ResultCache<V> {
    policy: CachePolicy,
    entries: Mutex<HashMap<CacheKey, V>>,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(policy: CachePolicy) -> Self {
        ResultCache {
            policy,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn disabled() -> Self {
        ResultCache::new(CachePolicy::Disabled)
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Serve `(operation, args)` from the current bucket or run `fetch`.
    pub fn get_or_fetch<F>(
        &self,
        operation: &str,
        args: &str,
        fetch: F,
    ) -> Result<Fetched<V>, FetchError>
    where
        F: FnOnce() -> Result<Fetched<V>, FetchError>,
    {
        self.get_or_fetch_at(SystemTime::now(), operation, args, fetch)
    }

    pub fn get_or_fetch_at<F>(
        &self,
        now: SystemTime,
        operation: &str,
        args: &str,
        fetch: F,
    ) -> Result<Fetched<V>, FetchError>
    where
        F: FnOnce() -> Result<Fetched<V>, FetchError>,
    {
        let Some(key) = self.key_at(now, operation, args) else {
            return fetch();
        };

        if let Some(hit) = self.lock().get(&key).cloned() {
            debug!("Cache hit: {} {}", operation, args);
            return Ok(Fetched::Data(hit));
        }

        // The lock is not held across the fetch; concurrent misses may both
        // go upstream and the last writer wins.
        let fetched = fetch()?;
        if let Fetched::Data(value) = &fetched {
            let mut entries = self.lock();
            entries.retain(|k, _| k.bucket == key.bucket);
            entries.insert(key, value.clone());
        }
        Ok(fetched)
    }

    /// Drop every cached entry for `operation`.
    pub fn invalidate(&self, operation: &str) {
        self.lock().retain(|k, _| k.operation != operation);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key_at(&self, now: SystemTime, operation: &str, args: &str) -> Option<CacheKey> {
        let CachePolicy::Ttl(ttl) = self.policy else {
            return None;
        };
        let ttl_secs = ttl.as_secs().max(1);
        let now_secs = now.duration_since(UNIX_EPOCH).ok()?.as_secs();
        Some(CacheKey {
            operation: operation.to_string(),
            args: args.to_string(),
            bucket: now_secs / ttl_secs,
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, V>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransientKind;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_hit_within_bucket() {
        let cache = ResultCache::new(CachePolicy::Ttl(Duration::from_secs(3600)));
        let mut calls = 0;
        for t in [7200, 7300, 10_799] {
            let got = cache
                .get_or_fetch_at(at(t), "scoreboard", "", || {
                    calls += 1;
                    Ok(Fetched::Data(calls))
                })
                .unwrap();
            assert_eq!(got, Fetched::Data(1));
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_miss_after_bucket_rollover() {
        let cache = ResultCache::new(CachePolicy::Ttl(Duration::from_secs(60)));
        let first = cache
            .get_or_fetch_at(at(119), "stats:teamdetails", "TeamID=1", || Ok(Fetched::Data(1)))
            .unwrap();
        let second = cache
            .get_or_fetch_at(at(120), "stats:teamdetails", "TeamID=1", || Ok(Fetched::Data(2)))
            .unwrap();
        assert_eq!(first, Fetched::Data(1));
        assert_eq!(second, Fetched::Data(2));
        // the stale bucket was purged on insert
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_arguments_are_part_of_the_key() {
        let cache = ResultCache::new(CachePolicy::Ttl(Duration::from_secs(60)));
        cache
            .get_or_fetch_at(at(0), "stats:commonplayerinfo", "PlayerID=1", || Ok(Fetched::Data("a")))
            .unwrap();
        let other = cache
            .get_or_fetch_at(at(0), "stats:commonplayerinfo", "PlayerID=2", || Ok(Fetched::Data("b")))
            .unwrap();
        assert_eq!(other, Fetched::Data("b"));
    }

    #[test]
    fn test_disabled_always_fetches() {
        let cache = ResultCache::disabled();
        let mut calls = 0;
        for _ in 0..3 {
            cache
                .get_or_fetch("scoreboard", "", || {
                    calls += 1;
                    Ok(Fetched::Data(()))
                })
                .unwrap();
        }
        assert_eq!(calls, 3);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unavailable_and_errors_are_not_cached() {
        let cache = ResultCache::new(CachePolicy::Ttl(Duration::from_secs(60)));
        let u = cache
            .get_or_fetch_at(at(0), "scoreboard", "", || Ok(Fetched::Unavailable))
            .unwrap();
        assert!(u.is_unavailable());

        let e = cache.get_or_fetch_at(at(0), "scoreboard", "", || {
            Err(FetchError::transient(TransientKind::Timeout, "slow"))
        });
        assert!(e.is_err());
        assert!(cache.is_empty());

        let d = cache
            .get_or_fetch_at(at(1), "scoreboard", "", || Ok(Fetched::Data(5)))
            .unwrap();
        assert_eq!(d, Fetched::Data(5));
    }

    #[test]
    fn test_invalidate_forces_refetch() {
        let cache = ResultCache::new(CachePolicy::Ttl(Duration::from_secs(60)));
        cache
            .get_or_fetch_at(at(0), "scoreboard", "", || Ok(Fetched::Data(1)))
            .unwrap();
        cache
            .get_or_fetch_at(at(0), "stats:leaguegamefinder", "", || Ok(Fetched::Data(9)))
            .unwrap();
        cache.invalidate("scoreboard");

        let got = cache
            .get_or_fetch_at(at(0), "scoreboard", "", || Ok(Fetched::Data(2)))
            .unwrap();
        assert_eq!(got, Fetched::Data(2));
        let kept = cache
            .get_or_fetch_at(at(0), "stats:leaguegamefinder", "", || Ok(Fetched::Data(10)))
            .unwrap();
        assert_eq!(kept, Fetched::Data(9));
    }

    #[test]
    fn test_policy_from_secs() {
        assert_eq!(CachePolicy::from_secs(0), CachePolicy::Disabled);
        assert_eq!(
            CachePolicy::from_secs(30),
            CachePolicy::Ttl(Duration::from_secs(30))
        );
    }
}
