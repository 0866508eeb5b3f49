
use std::{sync::Arc, time::Duration};

use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};

use chrono::NaiveDate;
use mensa_feed::{week_of, CachedFeed, FeedClient};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::{bot::Bot, config::Config, telegram::TelegramClient};

use std::time::Instant;

mod data;
mod helpers;
mod webhook;
use helpers::*;
pub use webhook::Webhook;

#[derive(Clone, FromRef)]
pub struct AppState {
    feed: CachedFeed,
    webhook: Option<Webhook>,
}

impl AppState {
    pub fn from_parts(feed: CachedFeed, webhook: Option<Webhook>) -> Self {
        Self { feed, webhook }
    }

    async fn new(config: &Config) -> Self {
        let cache = connect_cache(&config.cache).await;
        let source = Arc::new(FeedClient::new(config.feed.base_url.clone()));
        let feed = CachedFeed::new(source, cache)
            .with_ttl(Duration::from_secs(config.cache.ttl_secs));

        let webhook = config.telegram.as_ref().map(|tg| Webhook {
            bot: Bot::new(feed.clone(), tg.admin_chat_id),
            telegram: TelegramClient::new(tg),
            token: tg.token.clone(),
            secret: tg.webhook_secret.clone(),
        });

        match &config.cache.warm_schedule {
            Some(schedule) => match start_warm_job(schedule, feed.clone()).await {
                Ok(()) => tracing::info!("cache warming scheduled at '{schedule}'"),
                Err(err) => tracing::error!("could not schedule cache warming: {err}"),
            },
            None => tracing::info!("cache warming disabled"),
        }

        Self::from_parts(feed, webhook)
    }
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Runs [`warm_cache`] on a cron `schedule` (with seconds field) until the
/// process exits.
async fn start_warm_job(schedule: &str, feed: CachedFeed) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(schedule, move |uuid, _| {
        let feed = feed.clone();
        Box::pin(async move {
            tracing::info!("warming cache (job: {uuid:?})");
            let start = Instant::now();
            warm_cache(&feed, today()).await;
            tracing::info!("warmed cache (took {:?})", start.elapsed());
        })
    })?;

    let sched = JobScheduler::new().await?;
    sched.add(job).await?;
    sched.start().await
}

/// Refetches the week of `today` and the one after it.
pub async fn warm_cache(feed: &CachedFeed, today: NaiveDate) {
    let Ok(current) = week_of(today) else {
        tracing::error!("no iso week for {today}");
        return;
    };

    for week in [Some(current), current.next().ok()].into_iter().flatten() {
        match feed.refresh_week(week.week).await {
            Ok(entries) =>
                tracing::info!("refreshed week {} ({} entries)", week.week, entries.len()),
            Err(err) =>
                tracing::error!("could not refresh week {}: {err}", week.week),
        }
    }
}

pub async fn make_router(config: &Config) -> Router {
    router(AppState::new(config).await)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/mensa", get(data::current_week))
        .route("/mensa/:week", get(data::week))
        .route(webhook::UPDATE_PATH, post(webhook::update))
        .route("/webhook/register", get(webhook::register))
        .route("/webhook/unregister", get(webhook::unregister))
        .with_state(state)
}

async fn index() -> &'static str {
    "Hi!"
}
