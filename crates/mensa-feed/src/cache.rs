use std::{sync::Arc, time::Duration};

use crate::{
    fetch::{FeedError, FeedSource},
    processed::WeeklyFeed,
    store::CacheStore,
};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

pub fn cache_key(week: u32) -> String {
    format!("mensa/info/{week}")
}

/// Weekly feeds, fetched on demand and kept in a [`CacheStore`] for `ttl`.
///
/// An unreachable cache is bypassed: lookups count as misses and failed
/// writes are only logged. Fetch failures are never cached.
#[derive(Clone)]
pub struct CachedFeed {
    source: Arc<dyn FeedSource>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl CachedFeed {
    pub fn new(source: Arc<dyn FeedSource>, cache: Arc<dyn CacheStore>) -> Self {
        Self { source, cache, ttl: DEFAULT_TTL }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn get_week(&self, week: u32) -> Result<WeeklyFeed, FeedError> {
        let key = cache_key(week);

        if let Some(feed) = self.lookup(&key).await {
            tracing::debug!("cache hit for {key}");
            return Ok(feed);
        }

        tracing::debug!("cache miss for {key}");
        self.refresh_week(week).await
    }

    /// Fetches `week` from upstream and replaces the cached copy.
    pub async fn refresh_week(&self, week: u32) -> Result<WeeklyFeed, FeedError> {
        let key = cache_key(week);
        let feed = self.source.fetch_week(week).await?;

        match serde_json::to_string(&feed) {
            Ok(json) => if let Err(err) = self.cache.put(&key, json, self.ttl).await {
                tracing::warn!("could not store {key}: {err}");
            },
            Err(err) => tracing::error!("could not serialize {key}: {err}"),
        }

        Ok(feed)
    }

    async fn lookup(&self, key: &str) -> Option<WeeklyFeed> {
        let cached = match self.cache.get(key).await {
            Ok(v) => v?,
            Err(err) => {
                tracing::warn!("cache unavailable, bypassing for {key}: {err}");
                return None;
            },
        };

        // typed, so the dates come back as dates
        match serde_json::from_str::<WeeklyFeed>(&cached) {
            Ok(feed) => Some(feed),
            Err(err) => {
                tracing::warn!("discarding unreadable cache entry {key}: {err}");
                None
            },
        }
    }
}
