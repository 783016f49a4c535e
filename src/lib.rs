pub mod box_score;
pub mod comments;
pub mod config;
pub mod forum;
pub mod output;
pub mod prompt;
mod utils;

use thiserror::Error;
use tracing::debug;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not a thread URL: {0}")]
    InvalidThreadUrl(String),

    #[error("Thread unavailable: {0}")]
    ThreadUnavailable(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

// ============================================================================
// UTILITIES
// ============================================================================

/// Fetch HTML content from a URL
pub async fn fetch_html(client: &reqwest::Client, url: &str) -> Result<String> {
    debug!("GET {}", url);
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================
pub use box_score::{extract, parse_box_score, try_extract, BoxScore, PlayerStatRow, TeamLineScore};
pub use comments::{collect, fetch_context, try_fetch_context, Collection, CollectPolicy, CommentRecord, ThreadFailure};
pub use config::{Config, Credentials, HttpConfig};
pub use forum::{parse_thread_id, RedditClient, Thread, ThreadComment, ThreadSource};
pub use output::{print_comments, print_line_score, print_players, write_comments_csv, write_line_score_csv, write_players_csv};
pub use prompt::{render_prompt, PromptSources, DEFAULT_TEMPLATE};
