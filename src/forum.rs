//! Reddit API client: app-only OAuth and top-level comment listings.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::Credentials;
use crate::{Result, ScrapeError};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_API_URL: &str = "https://oauth.reddit.com";
const WEB_URL: &str = "https://www.reddit.com";

/// Upper bound the API accepts for a single comment listing
const COMMENT_LISTING_LIMIT: u32 = 500;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// A resolved thread with its top-level comments in API order
#[derive(Debug, Clone, Default)]
pub struct Thread {
    pub url: String,
    pub title: String,
    /// Empty for link posts
    pub selftext: String,
    pub comments: Vec<ThreadComment>,
}

/// A depth-1 comment as delivered by the API
#[derive(Debug, Clone, Default)]
pub struct ThreadComment {
    /// None when the account is deleted or suspended
    pub author: Option<String>,
    pub body: String,
    pub score: i64,
    /// Fully-qualified URL
    pub permalink: String,
    pub created_utc: Option<f64>,
}

/// Anything that can resolve a thread URL into a `Thread`
#[async_trait]
pub trait ThreadSource {
    async fn fetch_thread(&self, url: &str) -> Result<Thread>;
}

// ============================================================================
// API MODELS
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    kind: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SubmissionData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    author: Option<String>,
    #[serde(default)]
    body: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    permalink: String,
    created_utc: Option<f64>,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

// ============================================================================
// CLIENT
// ============================================================================

/// App-only (client credentials) Reddit API client
pub struct RedditClient {
    http: Client,
    credentials: Credentials,
    token: Mutex<Option<AccessToken>>,
}

impl RedditClient {
    pub fn new(credentials: &Credentials) -> Result<Self> {
        Self::with_timeout(credentials, None)
    }

    pub fn with_timeout(credentials: &Credentials, timeout: Option<Duration>) -> Result<Self> {
        credentials.validate()?;

        let mut builder = Client::builder().user_agent(credentials.user_agent.clone());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(RedditClient {
            http: builder.build()?,
            credentials: credentials.clone(),
            token: Mutex::new(None),
        })
    }

    /// Returns a cached bearer token, requesting a new one when absent or expired.
    async fn bearer_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;

        if let Some(current) = token.as_ref() {
            if Instant::now() < current.expires_at {
                return Ok(current.value.clone());
            }
        }

        debug!("Requesting app-only access token");
        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ScrapeError::Auth(format!("token endpoint returned {}", status)));
        }

        let body: TokenResponse = response.error_for_status()?.json().await?;
        let value = match (body.access_token, body.error) {
            (Some(value), None) => value,
            (_, Some(error)) => return Err(ScrapeError::Auth(error.to_string())),
            (None, None) => return Err(ScrapeError::Auth("no access token in response".to_string())),
        };

        // Renew a minute early
        let lifetime = body.expires_in.unwrap_or(3600).saturating_sub(60);
        *token = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });

        Ok(value)
    }
}

#[async_trait]
impl ThreadSource for RedditClient {
    async fn fetch_thread(&self, url: &str) -> Result<Thread> {
        let id = parse_thread_id(url)?;
        let token = self.bearer_token().await?;

        info!("Fetching thread {}", id);
        let endpoint = format!(
            "{}/comments/{}?depth=1&limit={}&raw_json=1",
            OAUTH_API_URL, id, COMMENT_LISTING_LIMIT
        );
        let response = self.http.get(&endpoint).bearer_auth(token).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN | StatusCode::GONE => {
                return Err(ScrapeError::ThreadUnavailable(format!(
                    "{} ({})",
                    url.trim(),
                    response.status()
                )));
            }
            _ => {}
        }

        let listings: Vec<Listing> = response.error_for_status()?.json().await?;
        thread_from_listings(url.trim(), listings)
    }
}

// ============================================================================
// LISTING CONVERSION
// ============================================================================

/// Builds a `Thread` from the `[submission, comments]` listing pair.
/// `more` placeholders are dropped, so only loaded top-level comments remain.
fn thread_from_listings(url: &str, listings: Vec<Listing>) -> Result<Thread> {
    let mut listings = listings.into_iter();

    let submission = listings
        .next()
        .and_then(|listing| listing.data.children.into_iter().find(|c| c.kind == "t3"))
        .ok_or_else(|| ScrapeError::ThreadUnavailable(format!("{} (no submission in response)", url)))?;
    let submission: SubmissionData = serde_json::from_value(submission.data)
        .map_err(|e| ScrapeError::ThreadUnavailable(format!("{} (malformed submission: {})", url, e)))?;

    let mut comments = Vec::new();
    if let Some(listing) = listings.next() {
        for child in listing.data.children {
            if child.kind != "t1" {
                continue;
            }
            match serde_json::from_value::<CommentData>(child.data) {
                Ok(data) => comments.push(ThreadComment {
                    author: data.author,
                    body: data.body,
                    score: data.score,
                    permalink: absolute_permalink(&data.permalink),
                    created_utc: data.created_utc,
                }),
                Err(e) => debug!("Skipping malformed comment in {}: {}", url, e),
            }
        }
    }

    Ok(Thread {
        url: url.to_string(),
        title: submission.title,
        selftext: submission.selftext,
        comments,
    })
}

fn absolute_permalink(path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{}{}", WEB_URL, path)
    }
}

// ============================================================================
// URL PARSING
// ============================================================================

/// Extracts the base-36 thread id from a thread URL, short link, or bare id.
pub fn parse_thread_id(url: &str) -> Result<String> {
    let trimmed = url.trim();
    let invalid = || ScrapeError::InvalidThreadUrl(trimmed.to_string());

    if trimmed.is_empty() {
        return Err(invalid());
    }

    let path = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');

    let without_scheme = path
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(path);

    let mut segments = without_scheme.split('/');
    let host = segments.next().unwrap_or_default();
    let segments: Vec<&str> = segments.collect();

    let candidate = if let Some(pos) = segments.iter().position(|s| *s == "comments") {
        segments.get(pos + 1).copied()
    } else if host.ends_with("redd.it") {
        segments.first().copied()
    } else if segments.is_empty() && !host.contains('.') {
        // Bare id
        Some(host)
    } else {
        None
    };

    match candidate {
        Some(id) if is_thread_id(id) => Ok(id.to_lowercase()),
        _ => Err(invalid()),
    }
}

fn is_thread_id(s: &str) -> bool {
    !s.is_empty() && s.len() <= 12 && s.chars().all(|c| c.is_ascii_alphanumeric())
}

// ============================================================================
// TESTS
// ============================================================================
