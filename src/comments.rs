use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::forum::{ThreadComment, ThreadSource};
use crate::Result;

/// Username recorded when the author account is gone
pub const DELETED_AUTHOR: &str = "[deleted]";

pub const DEFAULT_TOP_N: usize = 5;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// A top-level comment flattened for display and export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub thread_url: String,
    pub thread_title: String,
    pub username: String,
    pub comment_text: String,
    pub upvotes: i64,
    pub permalink: String,
    pub posted_at: Option<DateTime<Utc>>,
}

/// A thread that contributed nothing because it could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadFailure {
    pub thread_url: String,
    pub reason: String,
}

/// Which top-level comments to keep from each thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectPolicy {
    /// At most `limit` comments in API order
    First { limit: usize },
    /// The `top_n` highest-scored comments; ties keep API order
    TopByScore { top_n: usize },
}

impl Default for CollectPolicy {
    fn default() -> Self {
        CollectPolicy::TopByScore { top_n: DEFAULT_TOP_N }
    }
}

/// Result of one collection pass over a batch of thread URLs
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub comments: Vec<CommentRecord>,
    pub failures: Vec<ThreadFailure>,
    /// Titles of the threads that were fetched, in batch order
    pub thread_titles: Vec<String>,
}

impl CommentRecord {
    fn from_comment(thread_url: &str, thread_title: &str, comment: ThreadComment) -> Self {
        let username = comment
            .author
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DELETED_AUTHOR.to_string());

        CommentRecord {
            thread_url: thread_url.to_string(),
            thread_title: thread_title.to_string(),
            username,
            comment_text: comment.body.trim().to_string(),
            upvotes: comment.score,
            permalink: comment.permalink,
            posted_at: comment.created_utc.and_then(timestamp_to_utc),
        }
    }
}

fn timestamp_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    Utc.timestamp_opt(seconds.trunc() as i64, 0).single()
}

// ============================================================================
// COLLECTION
// ============================================================================

/// Collects top-level comments from each thread in turn.
/// A failing thread is recorded in `failures` and does not stop the batch;
/// every entry ends up either in `thread_titles` or in `failures`, blank
/// entries included.
pub async fn collect<S>(source: &S, thread_urls: &[String], policy: CollectPolicy) -> Collection
where
    S: ThreadSource + ?Sized,
{
    let mut collection = Collection::default();

    for url in thread_urls.iter().map(|u| u.trim()) {
        match source.fetch_thread(url).await {
            Ok(thread) => {
                let comments = select_comments(thread.comments, policy);
                info!("{}: kept {} comments from \"{}\"", url, comments.len(), thread.title);

                collection.comments.extend(
                    comments
                        .into_iter()
                        .map(|c| CommentRecord::from_comment(url, &thread.title, c)),
                );
                collection.thread_titles.push(thread.title);
            }
            Err(e) => {
                warn!("Failed to fetch from {}: {}", url, e);
                collection.failures.push(ThreadFailure {
                    thread_url: url.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    collection
}

/// Applies the policy to one thread's comments (already in API order).
pub fn select_comments(mut comments: Vec<ThreadComment>, policy: CollectPolicy) -> Vec<ThreadComment> {
    match policy {
        CollectPolicy::First { limit } => {
            comments.truncate(limit);
        }
        CollectPolicy::TopByScore { top_n } => {
            // sort_by is stable, so equal scores stay in API order
            comments.sort_by(|a, b| b.score.cmp(&a.score));
            comments.truncate(top_n);
        }
    }
    comments
}

// ============================================================================
// GAME CONTEXT
// ============================================================================

/// Returns a thread's self-text, or an empty string if it cannot be fetched.
pub async fn fetch_context<S>(source: &S, thread_url: &str) -> String
where
    S: ThreadSource + ?Sized,
{
    match try_fetch_context(source, thread_url).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to fetch game thread {}: {}", thread_url.trim(), e);
            String::new()
        }
    }
}

/// Returns a thread's self-text, surfacing fetch errors.
pub async fn try_fetch_context<S>(source: &S, thread_url: &str) -> Result<String>
where
    S: ThreadSource + ?Sized,
{
    let thread = source.fetch_thread(thread_url.trim()).await?;
    Ok(thread.selftext)
}

// ============================================================================
// TESTS
// ============================================================================
