//! Script model and execution.
//!
//! A [`Script`] is split into batches ([`split_batches`]) or, for data dumps,
//! into row windows ([`window_data_dump`]). The [`ScriptRunner`] executes the
//! batches against the database chosen by an [`ExecutionContext`].

mod runner;
mod splitter;
mod window;

pub use runner::{execute_script, Fence, ScriptRunner};
pub use splitter::{split_batches, BATCH_TERMINATOR};
pub use window::{effective_window_width, window_data_dump};

/// How a script's text is cut into executable units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// DDL or procedural text separated by `GO`.
    Batch,
    /// Header line plus one literal row per line.
    DataDump,
}

/// SQL text loaded from disk or generated, consumed once per run.
#[derive(Debug, Clone)]
pub struct Script {
    pub name: String,
    pub sql: String,
    pub kind: ScriptKind,
}

impl Script {
    pub fn batch(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            kind: ScriptKind::Batch,
        }
    }

    pub fn data_dump(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            kind: ScriptKind::DataDump,
        }
    }

    /// Executable units of this script. `window_width` only applies to data dumps.
    pub fn batches(&self, context: &ExecutionContext, window_width: usize) -> Vec<String> {
        if context.is_data_dump || self.kind == ScriptKind::DataDump {
            window_data_dump(&self.sql, window_width)
        } else {
            split_batches(&self.sql)
        }
    }
}

/// Which logical connection a group of scripts runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetDatabase {
    /// The server's system database (`master`).
    System,
    /// The configured application database.
    Configured,
}

/// Connection and fencing choice for a group of scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    pub target: TargetDatabase,
    pub use_transaction_fence: bool,
    pub is_data_dump: bool,
}

impl ExecutionContext {
    /// Fenced, against the system database.
    pub fn system() -> Self {
        Self {
            target: TargetDatabase::System,
            use_transaction_fence: true,
            is_data_dump: false,
        }
    }

    /// Fenced, against the configured database.
    pub fn configured() -> Self {
        Self {
            target: TargetDatabase::Configured,
            use_transaction_fence: true,
            is_data_dump: false,
        }
    }

    pub fn unfenced(mut self) -> Self {
        self.use_transaction_fence = false;
        self
    }

    pub fn data_dump(mut self) -> Self {
        self.is_data_dump = true;
        self
    }
}
