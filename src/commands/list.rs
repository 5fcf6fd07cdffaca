//! List command - Show collected entries

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use serde_json::Value;
use std::path::Path;

use super::utils;

/// Width of the summary column before truncation
const SUMMARY_CHARS: usize = 60;

/// List options
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Show newest entries first
    pub reverse: bool,
    /// Limit number of results
    pub limit: Option<usize>,
}

/// Execute the list command
pub fn execute(db_path: &Path, options: ListOptions) -> Result<String> {
    let items = utils::read_collection(db_path)?;
    Ok(render(&items, &options))
}

/// Render entries as a table, keeping their original positions
pub fn render(items: &[Value], options: &ListOptions) -> String {
    if items.is_empty() {
        return "No collected data found.".to_string();
    }

    let mut rows: Vec<(usize, &Value)> = items.iter().enumerate().collect();
    if options.reverse {
        rows.reverse();
    }

    let total_count = rows.len();
    if let Some(n) = options.limit {
        rows.truncate(n);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![Cell::new("#"), Cell::new("Entry"), Cell::new("Size")]);

    for (index, payload) in &rows {
        let size = crate::capture::event::payload_size(payload) as u64;
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(utils::summarize(payload, SUMMARY_CHARS)),
            Cell::new(utils::format_size(size)),
        ]);
    }

    let mut output = table.to_string();
    if rows.len() < total_count {
        output.push_str(&format!(
            "\n\nShowing {} of {} entries",
            rows.len(),
            total_count
        ));
    } else {
        output.push_str(&format!("\n\n{} entries found", total_count));
    }

    output
}
