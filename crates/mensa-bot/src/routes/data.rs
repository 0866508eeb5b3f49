use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use mensa_feed::{fetch::check_week, iso_week, CachedFeed, WeeklyFeed};

use crate::format;

use super::today;

type ApiError = (StatusCode, Json<String>);

fn error(status: StatusCode, msg: &str) -> ApiError {
    (status, Json(msg.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewFormat {
    Json,
    Jsonl,
    Pretty,
    Html,
}

impl ViewFormat {
    fn parse(s: Option<&str>) -> Option<Self> {
        Some(match s {
            None | Some("json") => Self::Json,
            Some("jsonl") => Self::Jsonl,
            Some("pretty") => Self::Pretty,
            Some("html") => Self::Html,
            Some(_) => None?,
        })
    }

    fn render(self, feed: WeeklyFeed, week: u32) -> Result<Response, ApiError> {
        Ok(match self {
            Self::Json => Json(feed).into_response(),
            Self::Jsonl => {
                let body = format::jsonl_week(&feed).map_err(|err| {
                    tracing::error!("could not serialize week {week}: {err}");
                    error(StatusCode::INTERNAL_SERVER_ERROR, "serialize_failed")
                })?;
                ([(header::CONTENT_TYPE, "application/jsonl")], body).into_response()
            },
            Self::Pretty => format::pretty_week(&feed).into_response(),
            Self::Html => Html(format::html_week(&feed, week)).into_response(),
        })
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct ViewQuery {
    format: Option<String>,
}

async fn respond(
    feed: &CachedFeed, week: u32, q: ViewQuery,
) -> Result<Response, ApiError> {
    let format = ViewFormat::parse(q.format.as_deref())
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "invalid_format"))?;

    let entries = feed.get_week(week).await.map_err(|err| {
        tracing::error!("could not get week {week}: {err}");
        error(StatusCode::BAD_GATEWAY, "feed_unavailable")
    })?;

    format.render(entries, week)
}

pub async fn current_week(
    Query(q): Query<ViewQuery>,
    State(feed): State<CachedFeed>,
) -> Result<Response, ApiError> {
    let today = today();
    let week = iso_week(today).map_err(|err| {
        tracing::error!("no iso week for {today}: {err}");
        error(StatusCode::INTERNAL_SERVER_ERROR, "invalid_date")
    })?;

    respond(&feed, week, q).await
}

pub async fn week(
    Path(week): Path<String>,
    Query(q): Query<ViewQuery>,
    State(feed): State<CachedFeed>,
) -> Result<Response, ApiError> {
    let week = week.parse::<u32>().ok()
        .and_then(|w| check_week(w).ok())
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "invalid_week"))?;

    respond(&feed, week, q).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_format() {
        assert_eq!(ViewFormat::parse(None), Some(ViewFormat::Json));
        assert_eq!(ViewFormat::parse(Some("json")), Some(ViewFormat::Json));
        assert_eq!(ViewFormat::parse(Some("jsonl")), Some(ViewFormat::Jsonl));
        assert_eq!(ViewFormat::parse(Some("pretty")), Some(ViewFormat::Pretty));
        assert_eq!(ViewFormat::parse(Some("html")), Some(ViewFormat::Html));
        assert_eq!(ViewFormat::parse(Some("JSON")), None);
        assert_eq!(ViewFormat::parse(Some("")), None);
    }
}
