pub mod cache;
pub mod fetch;
pub mod raw;
pub mod store;
pub mod week;
mod processed;

pub use cache::{cache_key, CachedFeed};
pub use fetch::{FeedClient, FeedError, FeedSource};
pub use processed::*;
pub use store::{CacheError, CacheStore, MemoryCache, RedisCache};
pub use week::{iso_week, iso_week_year, week_of, IsoWeek, WeekError};
