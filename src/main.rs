use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gameday_scraper::{
    box_score, collect, fetch_context, print_comments, print_line_score, print_players, render_prompt,
    write_comments_csv, write_line_score_csv, write_players_csv, CollectPolicy, Config, PromptSources,
    RedditClient, DEFAULT_TEMPLATE,
};

#[derive(Parser)]
#[command(name = "gameday_scraper")]
#[command(version, about = "Collect fan comments, game context and box scores for a game write-up")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML file with client_id / client_secret / user_agent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Collect top-level comments from one or more threads
    Comments {
        #[command(flatten)]
        threads: ThreadArgs,

        #[command(flatten)]
        selection: SelectionArgs,

        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },

    /// Print a game thread's body text
    Context {
        url: String,
    },

    /// Scrape the line score and player box scores from a box-score page
    BoxScore {
        url: String,

        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },

    /// Build prompt text from comments, game context and an optional box score
    Prompt {
        #[command(flatten)]
        threads: ThreadArgs,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Game thread whose body is used as context
        #[arg(long)]
        game_thread: Option<String>,

        /// Box-score page to include
        #[arg(long)]
        box_score: Option<String>,

        /// Template with {fan_quotes}, {game_context}, {line_score}, {box_score}
        #[arg(short, long)]
        template: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ThreadArgs {
    /// Thread URLs
    urls: Vec<String>,

    /// File with one thread URL per line
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct SelectionArgs {
    /// Keep the first N comments in API order
    #[arg(long, conflicts_with = "top")]
    limit: Option<usize>,

    /// Keep the N highest-scored comments (default 5)
    #[arg(long)]
    top: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Csv,
}

impl ThreadArgs {
    fn urls(&self) -> Result<Vec<String>> {
        let mut urls = self.urls.clone();
        if let Some(path) = &self.file {
            let content = fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            urls.extend(content.lines().map(str::to_string));
        }
        // Blank lines are input formatting, not thread identifiers
        urls.retain(|u| !u.trim().is_empty());
        Ok(urls)
    }
}

impl SelectionArgs {
    fn policy(&self) -> CollectPolicy {
        match (self.limit, self.top) {
            (Some(limit), _) => CollectPolicy::First { limit },
            (None, Some(top_n)) => CollectPolicy::TopByScore { top_n },
            (None, None) => CollectPolicy::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr so stdout stays clean for CSV
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Comments { threads, selection, format } => {
            let reddit = reddit_client(&config)?;
            let collection = collect(&reddit, &threads.urls()?, selection.policy()).await;

            match format {
                Format::Table => print_comments(&collection),
                Format::Csv => {
                    write_comments_csv(&collection.comments, io::stdout().lock())?;
                    for failure in &collection.failures {
                        eprintln!("Failed to fetch from {}: {}", failure.thread_url, failure.reason);
                    }
                }
            }
        }
        Command::Context { url } => {
            let reddit = reddit_client(&config)?;
            let context = fetch_context(&reddit, &url).await;
            println!("{}", context);
        }
        Command::BoxScore { url, format } => {
            let client = http_client(&config)?;
            let scraped = box_score::extract(&client, &url).await;

            match format {
                Format::Table => {
                    print_line_score(&scraped.line_score);
                    print_players(&scraped);
                }
                Format::Csv => {
                    write_line_score_csv(&scraped.line_score, io::stdout().lock())?;
                    println!();
                    write_players_csv(&scraped, io::stdout().lock())?;
                }
            }
        }
        Command::Prompt { threads, selection, game_thread, box_score: box_score_url, template } => {
            let template = match template {
                Some(path) => fs::read_to_string(&path)
                    .with_context(|| format!("cannot read template {}", path.display()))?,
                None => DEFAULT_TEMPLATE.to_string(),
            };

            let reddit = reddit_client(&config)?;
            let collection = collect(&reddit, &threads.urls()?, selection.policy()).await;
            for failure in &collection.failures {
                eprintln!("Failed to fetch from {}: {}", failure.thread_url, failure.reason);
            }

            let game_context = match game_thread {
                Some(url) => fetch_context(&reddit, &url).await,
                None => String::new(),
            };

            let scraped = match box_score_url {
                Some(url) => Some(box_score::extract(&http_client(&config)?, &url).await),
                None => None,
            };

            let sources = PromptSources {
                comments: &collection.comments,
                game_context: &game_context,
                box_score: scraped.as_ref(),
            };
            println!("{}", render_prompt(&template, &sources));
        }
    }

    Ok(())
}

fn reddit_client(config: &Config) -> Result<RedditClient> {
    RedditClient::with_timeout(&config.reddit, config.timeout()).context("cannot create Reddit client")
}

fn http_client(config: &Config) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(config.reddit.user_agent.clone());
    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}
