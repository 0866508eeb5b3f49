use async_trait::async_trait;

use crate::{processed::{parse_feed, FeedParseError, WeeklyFeed}, raw::decode_latin1};

pub const DEFAULT_BASE_URL: &str = "https://www.stwno.de/infomax/daten-extern/csv/UNI-P/";

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("invalid week number: {0}")]
    InvalidWeek(u32),
    #[error(transparent)]
    Fetch(#[from] reqwest::Error),
    #[error(transparent)]
    Parse(#[from] FeedParseError),
}

/// Where weekly feeds come from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_week(&self, week: u32) -> Result<WeeklyFeed, FeedError>;
}

pub fn check_week(week: u32) -> Result<u32, FeedError> {
    if (1..=53).contains(&week) { Ok(week) } else { Err(FeedError::InvalidWeek(week)) }
}

/// Downloads the weekly csv files from the studentenwerk.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for FeedClient {
    fn default() -> Self { Self::new(DEFAULT_BASE_URL) }
}

impl FeedClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') { base_url.push('/'); }

        Self { client: reqwest::Client::new(), base_url }
    }

    pub fn week_url(&self, week: u32) -> String {
        format!("{}{week}.csv", self.base_url)
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch_week(&self, week: u32) -> Result<WeeklyFeed, FeedError> {
        let url = self.week_url(check_week(week)?);
        tracing::info!("fetching {url}");

        let body = self.client.get(&url)
            .send().await?
            .error_for_status()?
        .bytes().await?;

        // the feed is published as ISO-8859-1
        let text = decode_latin1(&body);
        let entries = parse_feed(&text)?;
        tracing::info!("fetched {} entries for week {week}", entries.len());

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_week_url() {
        let client = FeedClient::default();
        assert_eq!(
            client.week_url(9),
            "https://www.stwno.de/infomax/daten-extern/csv/UNI-P/9.csv",
        );

        let client = FeedClient::new("http://localhost:1234/csv");
        assert_eq!(client.week_url(53), "http://localhost:1234/csv/53.csv");
    }

    #[tokio::test]
    async fn rejects_invalid_week() {
        let client = FeedClient::new("http://127.0.0.1:9/");
        for week in [0, 54] {
            assert!(matches!(
                client.fetch_week(week).await,
                Err(FeedError::InvalidWeek(w)) if w == week,
            ));
        }
    }
}
