use async_trait::async_trait;
use std::collections::HashMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use gameday_scraper::{
    box_score, collect, fetch_context, parse_box_score, try_fetch_context, CollectPolicy, Result,
    ScrapeError, Thread, ThreadComment, ThreadSource,
};

// ============================================================================
// FIXTURES
// ============================================================================

const GOOD_THREAD: &str = "https://www.reddit.com/r/nba/comments/aaa111/post_game_thread/";
const OTHER_THREAD: &str = "https://www.reddit.com/r/bostonceltics/comments/bbb222/reactions/";
const MISSING_THREAD: &str = "https://www.reddit.com/r/nba/comments/zzz999/removed/";
const NOT_A_THREAD: &str = "https://example.com/not-a-thread";

/// In-memory thread source keyed by URL
struct FakeForum {
    threads: HashMap<String, Thread>,
}

#[async_trait]
impl ThreadSource for FakeForum {
    async fn fetch_thread(&self, url: &str) -> Result<Thread> {
        if !url.contains("/comments/") {
            return Err(ScrapeError::InvalidThreadUrl(url.to_string()));
        }
        self.threads
            .get(url)
            .cloned()
            .ok_or_else(|| ScrapeError::ThreadUnavailable(url.to_string()))
    }
}

fn comment(author: Option<&str>, body: &str, score: i64) -> ThreadComment {
    ThreadComment {
        author: author.map(String::from),
        body: body.to_string(),
        score,
        permalink: format!("https://www.reddit.com/r/nba/comments/aaa111/x/{}/", body.len()),
        created_utc: None,
    }
}

fn forum() -> FakeForum {
    let mut threads = HashMap::new();
    threads.insert(
        GOOD_THREAD.to_string(),
        Thread {
            url: GOOD_THREAD.to_string(),
            title: "Post Game Thread: Celtics def. Heat 110-98".to_string(),
            selftext: "Celtics 110, Heat 98. Tatum 31/11.".to_string(),
            comments: vec![
                comment(Some("green_runs_deep"), "Defense won this one", 120),
                comment(None, "[deleted]", 4),
                comment(Some("heatcheck"), "Refs were awful", 250),
                comment(Some("lurker"), "Good game", -8),
                comment(Some("stats_guy"), "31 and 11 on 60% TS", 120),
                comment(Some("late"), "Who else is here after the game?", 1),
            ],
        },
    );
    threads.insert(
        OTHER_THREAD.to_string(),
        Thread {
            url: OTHER_THREAD.to_string(),
            title: "Reactions".to_string(),
            selftext: String::new(),
            comments: vec![comment(Some("banner18"), "Banner 18 incoming", 30)],
        },
    );
    FakeForum { threads }
}

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|u| u.to_string()).collect()
}

fn box_table(id: &str, rows: &[(&str, [&str; 3])]) -> String {
    let body: String = rows
        .iter()
        .map(|(player, cells)| {
            let cells: String = cells.iter().map(|c| format!("<td>{}</td>", c)).collect();
            format!("<tr><th>{}</th>{}</tr>", player, cells)
        })
        .collect();
    format!(
        r#"<table id="{}"><thead><tr><th>Starters</th><th>PTS</th><th>REB</th><th>AST</th></tr></thead><tbody>{}</tbody></table>"#,
        id, body
    )
}

fn line_score_table() -> &'static str {
    r#"<table id="line_score">
        <thead><tr><th></th><th>1</th><th>2</th><th>3</th><th>4</th><th>T</th></tr></thead>
        <tbody>
          <tr><th><a href="/teams/BOS/2024.html">BOS</a></th><td>30</td><td>25</td><td>28</td><td>27</td><td>110</td></tr>
          <tr><th><a href="/teams/MIA/2024.html">MIA</a></th><td>22</td><td>31</td><td>20</td><td>25</td><td>98</td></tr>
        </tbody>
    </table>"#
}

// ============================================================================
// COMMENT COLLECTOR
// ============================================================================

#[tokio::test]
async fn test_failures_do_not_affect_other_threads() {
    let forum = forum();
    let batch = urls(&[GOOD_THREAD, MISSING_THREAD, NOT_A_THREAD, OTHER_THREAD]);

    let alone = collect(&forum, &urls(&[OTHER_THREAD]), CollectPolicy::First { limit: 10 }).await;
    let mixed = collect(&forum, &batch, CollectPolicy::First { limit: 10 }).await;

    assert_eq!(mixed.failures.len() + mixed.thread_titles.len(), batch.len());
    assert_eq!(mixed.failures.len(), 2);
    assert_eq!(mixed.failures[0].thread_url, MISSING_THREAD);
    assert_eq!(mixed.failures[1].thread_url, NOT_A_THREAD);

    let from_other = mixed.comments.iter().filter(|c| c.thread_url == OTHER_THREAD).count();
    assert_eq!(from_other, alone.comments.len());
    assert_eq!(mixed.comments.len(), 7);
}

#[tokio::test]
async fn test_limit_caps_each_thread_in_api_order() {
    let forum = forum();
    let collection = collect(&forum, &urls(&[GOOD_THREAD, OTHER_THREAD]), CollectPolicy::First { limit: 2 }).await;

    let good: Vec<&str> = collection
        .comments
        .iter()
        .filter(|c| c.thread_url == GOOD_THREAD)
        .map(|c| c.comment_text.as_str())
        .collect();
    assert_eq!(good, vec!["Defense won this one", "[deleted]"]);
    assert_eq!(collection.comments.iter().filter(|c| c.thread_url == OTHER_THREAD).count(), 1);
}

#[tokio::test]
async fn test_top_by_score_sorted_descending() {
    let forum = forum();
    let collection = collect(&forum, &urls(&[GOOD_THREAD]), CollectPolicy::TopByScore { top_n: 3 }).await;

    let scores: Vec<i64> = collection.comments.iter().map(|c| c.upvotes).collect();
    assert_eq!(scores, vec![250, 120, 120]);
    // Tied scores keep API order
    assert_eq!(collection.comments[1].username, "green_runs_deep");
    assert_eq!(collection.comments[2].username, "stats_guy");
    assert_eq!(collection.comments[0].thread_title, "Post Game Thread: Celtics def. Heat 110-98");
}

#[tokio::test]
async fn test_top_by_score_with_fewer_comments() {
    let forum = forum();
    let collection = collect(&forum, &urls(&[OTHER_THREAD]), CollectPolicy::default()).await;
    assert_eq!(collection.comments.len(), 1);
}

#[tokio::test]
async fn test_deleted_author_sentinel() {
    let forum = forum();
    let collection = collect(&forum, &urls(&[GOOD_THREAD]), CollectPolicy::First { limit: 100 }).await;

    assert_eq!(collection.comments[1].username, "[deleted]");
    assert_eq!(collection.comments[0].username, "green_runs_deep");
    assert_eq!(collection.comments[3].upvotes, -8);
}

#[tokio::test]
async fn test_blank_entries_are_failures() {
    let forum = forum();
    let batch = vec!["".to_string(), format!("  {}  ", OTHER_THREAD), "   ".to_string()];
    let collection = collect(&forum, &batch, CollectPolicy::default()).await;

    assert_eq!(collection.failures.len() + collection.thread_titles.len(), batch.len());
    assert_eq!(collection.failures.len(), 2);
    assert_eq!(collection.failures[0].thread_url, "");
    assert!(collection.failures[0].reason.starts_with("Not a thread URL"));
    // Surrounding whitespace is trimmed before the fetch
    assert_eq!(collection.comments[0].thread_url, OTHER_THREAD);
}

#[tokio::test]
async fn test_game_context() {
    let forum = forum();
    assert_eq!(fetch_context(&forum, GOOD_THREAD).await, "Celtics 110, Heat 98. Tatum 31/11.");
    assert_eq!(fetch_context(&forum, OTHER_THREAD).await, "");
    assert_eq!(fetch_context(&forum, MISSING_THREAD).await, "");
    assert!(try_fetch_context(&forum, NOT_A_THREAD).await.is_err());
}

// ============================================================================
// BOX-SCORE EXTRACTOR
// ============================================================================

#[test]
fn test_two_team_box_scores() {
    let html = format!(
        "<html><body>{}{}{}</body></html>",
        line_score_table(),
        box_table(
            "box-BOS-game-basic",
            &[("Jayson Tatum", ["31", "11", "5"]), ("Jaylen Brown", ["22", "6", "4"])]
        ),
        box_table("box-MIA-game-basic", &[("Bam Adebayo", ["20", "12", "3"])]),
    );

    let parsed = parse_box_score(&html);

    assert_eq!(parsed.line_score.len(), 2);
    assert_eq!(parsed.line_score[1].quarters, ["22", "31", "20", "25"].map(String::from));

    assert_eq!(parsed.players.len(), 3);
    let tatum = &parsed.players[0];
    assert_eq!(tatum.team, "BOS");
    assert_eq!(tatum.player, "Jayson Tatum");
    assert_eq!(
        tatum.stats,
        vec![
            ("PTS".to_string(), "31".to_string()),
            ("REB".to_string(), "11".to_string()),
            ("AST".to_string(), "5".to_string()),
        ]
    );
    assert_eq!(parsed.players[2].team, "MIA");
    assert_eq!(parsed.players[2].stat("REB"), Some("12"));
}

#[test]
fn test_advanced_tables_are_ignored() {
    let html = format!(
        "{}{}",
        box_table("box-BOS-game-basic", &[("Jayson Tatum", ["31", "11", "5"])]),
        box_table("box-BOS-game-advanced", &[("Jayson Tatum", ["61.2", "18.0", "22.1"])]),
    );
    assert_eq!(parse_box_score(&html).players.len(), 1);
}

#[test]
fn test_tables_inside_comments_are_found() {
    let html = format!(
        r#"<html><body>
            <div id="all_line_score"><!-- {} --></div>
            <div id="all_box-MIA-game-basic">
            <!--
               {}
            -->
            </div>
        </body></html>"#,
        line_score_table(),
        box_table("box-MIA-game-basic", &[("Tyler Herro", ["24", "5", "7"])]),
    );

    let parsed = parse_box_score(&html);
    assert_eq!(parsed.line_score.len(), 2);
    assert_eq!(parsed.line_score[0].team, "BOS");
    assert_eq!(parsed.players.len(), 1);
    assert_eq!(parsed.players[0].team, "MIA");
    assert_eq!(parsed.players[0].player, "Tyler Herro");
}

#[test]
fn test_player_in_two_tables_is_not_deduplicated() {
    let html = format!(
        "{}<!-- {} -->",
        box_table("box-BOS-game-basic", &[("Jayson Tatum", ["31", "11", "5"])]),
        box_table("box-BOS-q1-basic", &[("Jayson Tatum", ["9", "3", "1"])]),
    );
    let players = parse_box_score(&html).players;
    assert_eq!(players.len(), 2);
    assert_eq!(players[1].stat("PTS"), Some("9"));
}

#[test]
fn test_parse_is_idempotent() {
    let html = format!(
        "{}<!-- {} -->",
        line_score_table(),
        box_table("box-BOS-game-basic", &[("Jayson Tatum", ["31", "11", "5"])]),
    );
    assert_eq!(parse_box_score(&html), parse_box_score(&html));
}

/// Serves the same HTML body to every connection; returns the page URL.
async fn serve_static_page(body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}/boxscores/202405010BOS.html", addr)
}

#[tokio::test]
async fn test_extract_twice_gives_same_result() {
    let html = format!(
        "<html><body><!-- {} -->{}</body></html>",
        line_score_table(),
        box_table("box-BOS-game-basic", &[("Jayson Tatum", ["31", "11", "5"])]),
    );
    let url = serve_static_page(html).await;
    let client = reqwest::Client::new();

    let first = box_score::extract(&client, &url).await;
    let second = box_score::extract(&client, &url).await;

    assert_eq!(first.line_score.len(), 2);
    assert_eq!(first.players.len(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unreachable_page_yields_empty() {
    let client = reqwest::Client::new();

    let parsed = box_score::extract(&client, "not a url").await;
    assert!(parsed.line_score.is_empty());
    assert!(parsed.players.is_empty());

    assert!(box_score::try_extract(&client, "not a url").await.is_err());
}
