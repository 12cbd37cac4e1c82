//! Windowing of literal-row insert dumps.
//!
//! A dump is a header line (`INSERT INTO ... VALUES`) followed by one row per
//! line, every row but the last ending in `,`. The windower re-cuts it into
//! independent statements of at most `width` rows each.

use crate::config::{DEFAULT_IMPORT_BATCH_SIZE, MAX_IMPORT_BATCH_SIZE, MIN_IMPORT_BATCH_SIZE};

/// Row separator at the end of every row line except the last.
const ROW_SEPARATOR: char = ',';

/// Clamp a requested width to the accepted range, falling back to the default.
pub fn effective_window_width(width: usize) -> usize {
    if (MIN_IMPORT_BATCH_SIZE..=MAX_IMPORT_BATCH_SIZE).contains(&width) {
        width
    } else {
        DEFAULT_IMPORT_BATCH_SIZE
    }
}

/// Cut a data dump into executable windows of at most `width` rows.
///
/// Blank lines are not rows. A dump with a header and no rows yields no
/// windows.
pub fn window_data_dump(sql: &str, width: usize) -> Vec<String> {
    let width = effective_window_width(width);

    let mut lines = sql.lines().map(str::trim_end);
    let header = match lines.find(|line| !line.trim().is_empty()) {
        Some(header) => header,
        None => return Vec::new(),
    };
    let rows: Vec<&str> = lines.filter(|line| !line.trim().is_empty()).collect();

    rows.chunks(width)
        .map(|window| {
            let mut statement = String::from(header);
            for (i, row) in window.iter().enumerate() {
                statement.push('\n');
                if i + 1 == window.len() {
                    statement.push_str(row.strip_suffix(ROW_SEPARATOR).unwrap_or(row));
                } else {
                    statement.push_str(row);
                }
            }
            statement
        })
        .collect()
}
