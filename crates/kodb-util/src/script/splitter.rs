//! Batch splitting on the `GO` terminator.
//!
//! Matching is purely textual: a `GO` that starts a line inside a string
//! literal or a block comment also ends the batch.

/// Separator between batches in exported and hand-written scripts.
/// Interpreted by client tools only and never sent to the server.
pub const BATCH_TERMINATOR: &str = "\nGO";

/// Split `sql` into trimmed, non-empty batches in source order.
pub fn split_batches(sql: &str) -> Vec<String> {
    sql.split(BATCH_TERMINATOR)
        .map(str::trim)
        .filter(|batch| !batch.is_empty())
        .map(String::from)
        .collect()
}
