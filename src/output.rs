use std::io::Write;

use crate::box_score::{BoxScore, TeamLineScore};
use crate::comments::{Collection, CommentRecord};
use crate::Result;

/// Longest comment excerpt shown in the stdout table
const PREVIEW_CHARS: usize = 60;

// ============================================================================
// COMMENT OUTPUT
// ============================================================================

/// Prints collected comments to stdout, followed by per-thread failures
pub fn print_comments(collection: &Collection) {
    println!("\nFan Comments ({} from {} threads)", collection.comments.len(), collection.thread_titles.len());
    println!("{:-<100}", "");

    for record in &collection.comments {
        println!(
            "{:>6}  {:20} {}",
            record.upvotes,
            truncate(&record.username, 20),
            truncate(&one_line(&record.comment_text), PREVIEW_CHARS)
        );
        println!("        {}", record.permalink);
    }

    if !collection.failures.is_empty() {
        println!("\nFailed threads:");
        for failure in &collection.failures {
            println!("  {}: {}", failure.thread_url, failure.reason);
        }
    }
}

/// Writes comment records as CSV
pub fn write_comments_csv<W: Write>(records: &[CommentRecord], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    writer.write_record([
        "thread_url", "thread_title", "username", "comment_text", "upvotes", "permalink", "posted_at",
    ])?;

    for record in records {
        let upvotes = record.upvotes.to_string();
        let posted_at = record.posted_at.map(|t| t.to_rfc3339()).unwrap_or_default();
        writer.write_record([
            record.thread_url.as_str(),
            record.thread_title.as_str(),
            record.username.as_str(),
            record.comment_text.as_str(),
            upvotes.as_str(),
            record.permalink.as_str(),
            posted_at.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

// ============================================================================
// BOX SCORE OUTPUT
// ============================================================================

/// Prints the line score to stdout
pub fn print_line_score(rows: &[TeamLineScore]) {
    println!("\nLine Score");
    println!("{:-<44}", "");
    println!("{:10} {:>5} {:>5} {:>5} {:>5} {:>7}", "Team", "Q1", "Q2", "Q3", "Q4", "Total");

    for row in rows {
        println!(
            "{:10} {:>5} {:>5} {:>5} {:>5} {:>7}",
            row.team, row.quarters[0], row.quarters[1], row.quarters[2], row.quarters[3], row.total
        );
    }
}

/// Prints player rows grouped in page order, one line per player
pub fn print_players(box_score: &BoxScore) {
    let columns = box_score.stat_columns();

    println!("\nBox Score");
    println!("{:-<100}", "");

    let mut current_team: Option<&str> = None;
    for row in &box_score.players {
        if current_team != Some(row.team.as_str()) {
            println!("\n{}", row.team);
            current_team = Some(row.team.as_str());
        }

        let stats: Vec<String> = columns
            .iter()
            .filter_map(|column| row.stat(column).map(|value| format!("{}={}", column, value)))
            .collect();
        println!("  {:25} {}", truncate(&row.player, 25), stats.join(" "));
    }
}

/// Writes line-score rows as CSV
pub fn write_line_score_csv<W: Write>(rows: &[TeamLineScore], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    writer.write_record(["team", "Q1", "Q2", "Q3", "Q4", "Total"])?;
    for row in rows {
        writer.write_record([
            row.team.as_str(),
            row.quarters[0].as_str(),
            row.quarters[1].as_str(),
            row.quarters[2].as_str(),
            row.quarters[3].as_str(),
            row.total.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes player rows as CSV; columns are the union across all tables,
/// and a stat missing from a row is written as an empty cell.
pub fn write_players_csv<W: Write>(box_score: &BoxScore, out: W) -> Result<()> {
    let columns = box_score.stat_columns();
    let mut writer = csv::Writer::from_writer(out);

    let mut header: Vec<&str> = vec!["team", "player"];
    header.extend(columns.iter().copied());
    writer.write_record(&header)?;

    for row in &box_score.players {
        let mut record: Vec<&str> = vec![row.team.as_str(), row.player.as_str()];
        record.extend(columns.iter().map(|column| row.stat(column).unwrap_or("")));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

// ============================================================================
// TESTS
// ============================================================================
