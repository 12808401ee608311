//! Plain-text rendering of results and transcripts.

use crate::chat::{Conversation, TurnOutcome, NO_ROWS_RESPONSE};
use crate::db::{QueryResult, RowSet};

/// Maximum width for any column.
const MAX_COLUMN_WIDTH: usize = 40;

/// Printed in place of the result when a turn fails.
pub const FAILURE_BANNER: &str = "An error occurred while processing the query.";

/// Truncates a string to `max_width` characters, adding an ellipsis if needed.
fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let kept: String = s.chars().take(max_width - 3).collect();
        format!("{kept}...")
    }
}

/// Formats a row set as an aligned text table.
pub fn format_table(rows: &RowSet) -> String {
    if rows.columns.is_empty() {
        return String::new();
    }

    let cells: Vec<Vec<String>> = rows
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|value| truncate(&value.to_display_string(), MAX_COLUMN_WIDTH))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = rows
        .columns
        .iter()
        .map(|name| name.chars().count().min(MAX_COLUMN_WIDTH))
        .collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let line = |values: Vec<String>| -> String {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{:width$}", v, width = widths.get(i).copied().unwrap_or(0)))
            .collect::<Vec<_>>()
            .join(" │ ")
            .trim_end()
            .to_string()
    };

    let mut output = String::new();
    output.push_str(&line(
        rows.columns
            .iter()
            .map(|c| truncate(c, MAX_COLUMN_WIDTH))
            .collect(),
    ));
    output.push('\n');

    let separator: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    output.push_str(&separator.join("─┼─"));

    for row in cells {
        output.push('\n');
        output.push_str(&line(row));
    }

    output
}

/// Renders a statement result for the terminal.
pub fn format_result(result: &QueryResult) -> String {
    match result {
        QueryResult::Rows(rows) if rows.is_empty() => NO_ROWS_RESPONSE.to_string(),
        QueryResult::Rows(rows) => {
            let mut text = format_table(rows);
            if let Some(warning) = rows.truncation_warning() {
                text.push_str(&format!("\n({warning})"));
            }
            text
        }
        QueryResult::Affected(count) => format!("{count} rows affected."),
    }
}

/// Renders what the user sees after a turn. Empty for ignored input.
pub fn format_outcome(outcome: &TurnOutcome) -> String {
    match outcome {
        TurnOutcome::Ignored => String::new(),
        TurnOutcome::Blocked { notice } => notice.clone(),
        TurnOutcome::Answered {
            sql,
            result,
            explanation,
        } => format!(
            "{}\n\nSQL Query: {}\n\n{}",
            format_result(result),
            sql,
            explanation
        ),
        TurnOutcome::Failed { explanation, .. } => format!("{FAILURE_BANNER}\n\n{explanation}"),
    }
}

/// Renders the whole transcript, one message per paragraph.
pub fn format_transcript(conversation: &Conversation) -> String {
    conversation
        .all()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n\n")
}
