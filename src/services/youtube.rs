//! Learning video search through the YouTube Data API.
//!
//! Two calls per search: `search` for ids, then `videos` for duration and
//! statistics. Results are flattened into [`Video`] with human-readable
//! duration and counts.

use std::sync::OnceLock;

use axum::http::StatusCode;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::YouTubeConfig;
use crate::models::Video;
use crate::{Error, Result};

/// Longest accepted query, in characters.
pub const MAX_QUERY_CHARS: usize = 200;
/// Videos requested per search.
pub const MAX_RESULTS: u32 = 12;

/// Suffix steering searches towards educational content.
const QUERY_SUFFIX: &str = "course tutorial";

pub fn validate_query(q: Option<&str>) -> Result<String> {
    let q = match q {
        Some(q) if !q.is_empty() => q,
        _ => return Err(Error::Validation(r#"Query parameter "q" is required"#.into())),
    };
    if q.chars().count() > MAX_QUERY_CHARS {
        return Err(Error::Validation(r#"Query parameter "q" too long"#.into()));
    }
    Ok(q.to_string())
}

fn duration_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("valid duration regex")
    })
}

/// ISO 8601 duration to `H:MM:SS` or `M:SS`.
pub fn format_duration(iso: &str) -> String {
    let Some(caps) = duration_pattern().captures(iso) else {
        return "0:00".to_string();
    };
    let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    let (hours, minutes, seconds) = (part(1), part(2).unwrap_or(0), part(3).unwrap_or(0));

    match hours {
        Some(h) => format!("{}:{:02}:{:02}", h, minutes, seconds),
        None => format!("{}:{:02}", minutes, seconds),
    }
}

/// Compact count: `1.5M`, `12.3K`, or the plain number.
pub fn format_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: Option<SearchItemId>,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    #[serde(default)]
    id: String,
    #[serde(default)]
    snippet: VideoSnippet,
    #[serde(default)]
    content_details: ContentDetails,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    maxres: Option<Thumbnail>,
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
}

fn parse_count(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(0)
}

impl From<VideoItem> for Video {
    fn from(item: VideoItem) -> Self {
        let thumbnails = item.snippet.thumbnails;
        let thumbnail = thumbnails
            .maxres
            .or(thumbnails.high)
            .or(thumbnails.default)
            .map(|t| t.url)
            .unwrap_or_default();

        Video {
            id: item.id,
            title: item.snippet.title,
            thumbnail,
            channel: item.snippet.channel_title,
            duration: format_duration(item.content_details.duration.as_deref().unwrap_or("PT0S")),
            views: format_count(parse_count(item.statistics.view_count.as_deref())),
            likes: format_count(parse_count(item.statistics.like_count.as_deref())),
            description: item.snippet.description,
            category: Some("YouTube".to_string()),
        }
    }
}

fn upstream_error(api_error: ApiError) -> Error {
    let status = api_error
        .code
        .and_then(|c| StatusCode::from_u16(c).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Error::Upstream {
        status,
        message: api_error.message,
        details: None,
    }
}

fn fetch_failed(cause: impl std::fmt::Display) -> Error {
    error!(error = %cause, "YouTube search failed");
    Error::Upstream {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: "Failed to fetch videos from YouTube".to_string(),
        details: None,
    }
}

/// YouTube Data API client.
#[derive(Clone)]
pub struct YouTubeService {
    client: Client,
    config: YouTubeConfig,
}

impl YouTubeService {
    pub fn new(client: Client, config: YouTubeConfig) -> Self {
        Self { client, config }
    }

    /// Search educational videos for an already-validated query.
    pub async fn search(&self, query: &str) -> Result<Vec<Video>> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            Error::not_configured(
                "YouTube API key is not configured in backend .env",
                "Please add YOUTUBE_API_KEY to your .env file.",
            )
        })?;
        let base = self.config.base_url.trim_end_matches('/');
        let educational_query = format!("{} {}", query, QUERY_SUFFIX);
        let max_results = MAX_RESULTS.to_string();

        debug!(query = %educational_query, "Searching YouTube");

        let search: SearchResponse = self
            .client
            .get(format!("{}/search", base))
            .query(&[
                ("part", "snippet"),
                ("maxResults", max_results.as_str()),
                ("q", educational_query.as_str()),
                ("type", "video"),
                ("order", "viewCount"),
                ("key", api_key),
            ])
            .send()
            .await
            .map_err(fetch_failed)?
            .json()
            .await
            .map_err(fetch_failed)?;

        if let Some(api_error) = search.error {
            return Err(upstream_error(api_error));
        }

        let ids: Vec<String> = search
            .items
            .into_iter()
            .filter_map(|item| item.id.and_then(|id| id.video_id))
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let details: VideosResponse = self
            .client
            .get(format!("{}/videos", base))
            .query(&[
                ("part", "snippet,contentDetails,statistics"),
                ("id", ids.join(",").as_str()),
                ("key", api_key),
            ])
            .send()
            .await
            .map_err(fetch_failed)?
            .json()
            .await
            .map_err(fetch_failed)?;

        if let Some(api_error) = details.error {
            return Err(upstream_error(api_error));
        }

        Ok(details.items.into_iter().map(Video::from).collect())
    }
}
