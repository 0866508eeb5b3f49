use std::sync::Arc;

use mensa_feed::{CacheStore, MemoryCache, RedisCache};

use crate::config::CacheConfig;

/// Redis when configured and reachable, the in-memory store otherwise.
pub async fn connect_cache(cfg: &CacheConfig) -> Arc<dyn CacheStore> {
    if let Some(url) = &cfg.redis_url {
        tracing::info!("connecting to redis");
        match RedisCache::connect(url).await {
            Ok(v) => {
                tracing::info!("connected to redis");
                return Arc::new(v);
            },
            Err(err) => tracing::error!("could not connect to redis, using memory cache: {err}"),
        }
    } else {
        tracing::info!("no redis specified, using memory cache");
    }

    Arc::new(MemoryCache::new())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn falls_back_to_memory() {
        let cache = connect_cache(&CacheConfig {
            redis_url: Some("not a redis url".into()),
            ..Default::default()
        }).await;

        cache.put("k", "v".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
