//! Column merge between live metadata and a persisted document.

use super::document::ColumnDocument;
use crate::error::{KodbError, Result};
use std::collections::VecDeque;
use tracing::warn;

/// Constraint-name prefix marking primary keys.
const PRIMARY_KEY_PREFIX: &str = "PK_";

/// Constraint-name prefix marking unique constraints.
const UNIQUE_PREFIX: &str = "UQ_";

/// Lengths above this are the engine's "unbounded" marker.
const MAX_BOUNDED_LENGTH: i64 = 8000;

/// A column as the live database describes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveColumn {
    pub name: String,
    pub ordinal_position: i64,
    pub default_value: Option<String>,
    pub is_nullable: bool,
    pub data_type: String,
    pub max_length: Option<i64>,
    pub collation_name: Option<String>,
    pub character_set: Option<String>,
    /// Names of constraints this column participates in.
    pub constraints: Vec<String>,
}

impl LiveColumn {
    pub fn is_primary_key(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| c.starts_with(PRIMARY_KEY_PREFIX))
    }

    pub fn unique_index_name(&self) -> Option<&str> {
        self.constraints
            .iter()
            .find(|c| c.starts_with(UNIQUE_PREFIX))
            .map(String::as_str)
    }
}

/// Merge `live` into `persisted`, returning the new column list.
///
/// Persisted columns missing from the live table are dropped with a warning.
/// Live order wins: a live column that does not line up with the next
/// persisted one gets a placeholder entry. Persisted columns left unmatched
/// after that (a reordered table) make the table inconsistent.
pub fn reconcile_columns(
    table: &str,
    persisted: Vec<ColumnDocument>,
    live: &[LiveColumn],
) -> Result<Vec<ColumnDocument>> {
    let mut remaining: VecDeque<ColumnDocument> = persisted
        .into_iter()
        .filter(|doc| {
            let exists = live.iter().any(|col| col.name.eq_ignore_ascii_case(&doc.name));
            if !exists {
                warn!(
                    "Removing column {} from {} schema document, it is not part of the table definition",
                    doc.name, table
                );
            }
            exists
        })
        .collect();

    let mut merged = Vec::with_capacity(live.len());
    for col in live {
        let aligned = remaining
            .front()
            .is_some_and(|doc| doc.name.eq_ignore_ascii_case(&col.name));
        let matched = if aligned { remaining.pop_front() } else { None };
        let mut doc = matched.unwrap_or_else(ColumnDocument::placeholder);

        apply_derived(&mut doc, col);
        merged.push(doc);
    }

    if !remaining.is_empty() {
        let names: Vec<&str> = remaining.iter().map(|d| d.name.as_str()).collect();
        return Err(KodbError::consistency(
            table,
            format!(
                "document columns out of order with the table: {}",
                names.join(", ")
            ),
        ));
    }

    check_aligned(table, &merged, live)?;
    Ok(merged)
}

/// Column counts match and names line up position by position.
pub fn check_aligned(table: &str, columns: &[ColumnDocument], live: &[LiveColumn]) -> Result<()> {
    if columns.len() != live.len() {
        return Err(KodbError::consistency(
            table,
            format!(
                "document has {} columns, table has {}",
                columns.len(),
                live.len()
            ),
        ));
    }
    for (i, (doc, col)) in columns.iter().zip(live).enumerate() {
        if !doc.name.eq_ignore_ascii_case(&col.name) {
            return Err(KodbError::consistency(
                table,
                format!("column {} is {} in the document, {} in the table", i, doc.name, col.name),
            ));
        }
    }
    Ok(())
}

fn apply_derived(doc: &mut ColumnDocument, col: &LiveColumn) {
    doc.name = col.name.clone();
    doc.data_type = col.data_type.clone();
    doc.allow_null = col.is_nullable;
    doc.length = normalize_length(col.max_length);
    doc.default_value = unwrap_default(col.default_value.as_deref());
    doc.collation_name = col.collation_name.clone();
    doc.character_set = col.character_set.clone();
    doc.is_primary_key = col.is_primary_key();
    doc.unique_index_name = col.unique_index_name().unwrap_or_default().to_string();
}

/// `max` (-1), over-8000 and absent lengths all become 0.
pub fn normalize_length(length: Option<i64>) -> i64 {
    match length {
        Some(len) if (0..=MAX_BOUNDED_LENGTH).contains(&len) => len,
        _ => 0,
    }
}

/// Strip the parentheses SQL Server wraps around stored defaults.
///
/// Removes every leading `(` and the same number of trailing characters.
/// If that would consume more than the whole value the input is returned
/// unchanged.
pub fn unwrap_default(default: Option<&str>) -> String {
    let Some(raw) = default.filter(|d| !d.is_empty()) else {
        return String::new();
    };

    let inner = raw.trim_start_matches('(');
    let stripped = raw.len() - inner.len();
    let keep = inner.chars().count().checked_sub(stripped);
    match keep {
        Some(keep) => inner.chars().take(keep).collect(),
        None => {
            warn!("Unable to unwrap default value {}", raw);
            raw.to_string()
        }
    }
}
