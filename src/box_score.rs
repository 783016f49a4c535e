use scraper::{ElementRef, Html, Node};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::utils::{element_text, has_class, parse_stat_number, selector};
use crate::{fetch_html, Result};

/// Id of the quarter-by-quarter scoring table
const LINE_SCORE_TABLE_ID: &str = "line_score";

/// Minimum data cells for a line-score row: four quarters and a total
const LINE_SCORE_MIN_CELLS: usize = 5;

const UNKNOWN_TEAM: &str = "Unknown";

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// One team's scoring by quarter, kept as page text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamLineScore {
    pub team: String,
    pub quarters: [String; 4],
    pub total: String,
}

/// One player's line from a basic box-score table.
/// `stats` keeps the page's column order; columns the row lacks are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerStatRow {
    pub team: String,
    pub player: String,
    pub stats: Vec<(String, String)>,
}

/// Everything recovered from a box-score page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoxScore {
    pub line_score: Vec<TeamLineScore>,
    pub players: Vec<PlayerStatRow>,
}

impl TeamLineScore {
    /// Final score as a number, if the cell holds one.
    pub fn total_points(&self) -> Option<u32> {
        parse_stat_number(&self.total)
            .filter(|v| *v >= 0.0 && v.fract() == 0.0)
            .map(|v| v as u32)
    }
}

impl PlayerStatRow {
    /// Raw text of a stat column
    pub fn stat(&self, column: &str) -> Option<&str> {
        self.stats
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Explicit numeric view of a stat column
    pub fn stat_as_f64(&self, column: &str) -> Option<f64> {
        self.stat(column).and_then(parse_stat_number)
    }
}

impl BoxScore {
    pub fn is_empty(&self) -> bool {
        self.line_score.is_empty() && self.players.is_empty()
    }

    /// Union of stat columns over all player rows, in first-seen order.
    pub fn stat_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for row in &self.players {
            for (name, _) in &row.stats {
                if !columns.contains(&name.as_str()) {
                    columns.push(name);
                }
            }
        }
        columns
    }

    /// Player rows belonging to one team code
    pub fn team_players<'a>(&'a self, team: &'a str) -> impl Iterator<Item = &'a PlayerStatRow> + 'a {
        self.players.iter().filter(move |row| row.team.eq_ignore_ascii_case(team))
    }
}

// ============================================================================
// PAGE EXTRACTION
// ============================================================================

/// Fetches a box-score page and parses it.
/// Failures are logged and produce an empty `BoxScore`.
pub async fn extract(client: &reqwest::Client, page_url: &str) -> BoxScore {
    match try_extract(client, page_url).await {
        Ok(box_score) => box_score,
        Err(e) => {
            warn!("Failed to scrape box score from {}: {}", page_url.trim(), e);
            BoxScore::default()
        }
    }
}

/// Fetches a box-score page and parses it, surfacing fetch errors.
pub async fn try_extract(client: &reqwest::Client, page_url: &str) -> Result<BoxScore> {
    let html = fetch_html(client, page_url.trim()).await?;
    let box_score = parse_box_score(&html);

    if box_score.is_empty() {
        warn!("No line score or box-score tables found at {}", page_url.trim());
    } else {
        info!(
            "Parsed {} line-score rows and {} player rows from {}",
            box_score.line_score.len(),
            box_score.players.len(),
            page_url.trim()
        );
    }

    Ok(box_score)
}

/// Parses box-score HTML, including tables hidden inside comments.
pub fn parse_box_score(html: &str) -> BoxScore {
    let documents = scan_documents(html);

    BoxScore {
        line_score: parse_line_score(&documents),
        players: parse_player_tables(&documents),
    }
}

// ============================================================================
// COMMENT-WRAPPED MARKUP
// ============================================================================

/// Returns the page itself followed by every comment that carries a table,
/// re-parsed as its own fragment, in document order.
fn scan_documents(html: &str) -> Vec<Html> {
    let document = Html::parse_document(html);

    let fragments: Vec<Html> = document
        .tree
        .values()
        .filter_map(|node| match node {
            Node::Comment(comment) => {
                let text: &str = &comment.comment;
                text.contains("<table").then(|| Html::parse_fragment(text))
            }
            _ => None,
        })
        .collect();

    debug!("Found {} comment-wrapped fragments with tables", fragments.len());

    let mut documents = Vec::with_capacity(fragments.len() + 1);
    documents.push(document);
    documents.extend(fragments);
    documents
}

// ============================================================================
// LINE SCORE
// ============================================================================

/// Uses the first `line_score` table in scan order that yields any rows.
fn parse_line_score(documents: &[Html]) -> Vec<TeamLineScore> {
    let table_selector = selector("table#line_score");

    for (index, document) in documents.iter().enumerate() {
        for table in document.select(&table_selector) {
            let rows = parse_line_score_table(table);
            if !rows.is_empty() {
                if index > 0 {
                    debug!("Line score recovered from comment-wrapped markup");
                }
                return rows;
            }
        }
    }

    debug!("No usable {} table", LINE_SCORE_TABLE_ID);
    Vec::new()
}

fn parse_line_score_table(table: ElementRef) -> Vec<TeamLineScore> {
    let row_selector = selector("tr");
    let cell_selector = selector("td");
    let link_selector = selector("a");

    let mut rows = Vec::new();

    for row in table.select(&row_selector).skip(1) { // Skip header row
        let cells: Vec<String> = row.select(&cell_selector).map(element_text).collect();
        if cells.len() < LINE_SCORE_MIN_CELLS {
            continue;
        }

        let team = row
            .select(&link_selector)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNKNOWN_TEAM.to_string());

        // Overtime columns beyond the fourth quarter are not kept
        let mut cells = cells.into_iter();
        let quarters = [
            cells.next().unwrap_or_default(),
            cells.next().unwrap_or_default(),
            cells.next().unwrap_or_default(),
            cells.next().unwrap_or_default(),
        ];
        let total = cells.next().unwrap_or_default();

        rows.push(TeamLineScore { team, quarters, total });
    }

    rows
}

// ============================================================================
// PLAYER BOX SCORES
// ============================================================================

/// Collects rows from every basic box-score table across the scan set.
fn parse_player_tables(documents: &[Html]) -> Vec<PlayerStatRow> {
    let table_selector = selector("table[id]");
    let mut players = Vec::new();

    for document in documents {
        for table in document.select(&table_selector) {
            let id = table.value().id().unwrap_or_default();
            if !is_basic_box_table(id) {
                continue;
            }
            let rows = parse_player_table(table, &team_code(id));
            debug!("Table {}: {} player rows", id, rows.len());
            players.extend(rows);
        }
    }

    players
}

/// Matches `box-BOS-game-basic` but not `box-BOS-game-advanced`
fn is_basic_box_table(id: &str) -> bool {
    id.contains("box") && id.contains("basic")
}

/// Team code is the id segment after the first '-'
fn team_code(table_id: &str) -> String {
    table_id
        .split('-')
        .nth(1)
        .filter(|code| !code.is_empty())
        .map(str::to_uppercase)
        .unwrap_or_else(|| UNKNOWN_TEAM.to_uppercase())
}

fn parse_player_table(table: ElementRef, team: &str) -> Vec<PlayerStatRow> {
    let header_selector = selector("thead > tr");
    let row_selector = selector("tr");
    let body_row_selector = selector("tbody > tr");
    let th_selector = selector("th");
    let td_selector = selector("td");

    let header = match table
        .select(&header_selector)
        .last()
        .or_else(|| table.select(&row_selector).next())
    {
        Some(header) => header,
        None => return Vec::new(),
    };

    // First header cell labels the player column
    let columns: Vec<String> = header.select(&th_selector).skip(1).map(element_text).collect();

    let mut rows = Vec::new();

    for row in table.select(&body_row_selector) {
        if row.id() == header.id() || is_secondary_header(row) {
            continue;
        }

        let values: Vec<String> = row.select(&td_selector).map(element_text).collect();
        if values.is_empty() {
            continue;
        }

        let player = row
            .select(&th_selector)
            .next()
            .map(element_text)
            .unwrap_or_default();

        let stats = columns.iter().cloned().zip(values).collect();

        rows.push(PlayerStatRow {
            team: team.to_string(),
            player,
            stats,
        });
    }

    rows
}

/// Repeated header rows such as "Reserves"
fn is_secondary_header(row: ElementRef) -> bool {
    has_class(row, "thead") || has_class(row, "over_header")
}

// ============================================================================
// TESTS
// ============================================================================
