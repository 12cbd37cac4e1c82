//! Error types for the database utilities.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use thiserror::Error;

/// Main error type for kodb-util operations.
#[derive(Error, Debug)]
pub enum KodbError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid combination of command-line actions
    #[error("Invalid arguments: {0}")]
    Validation(String),

    /// Error reported by SQL Server while executing a statement
    #[error("SQL Server error {code}: {message}")]
    Database { code: u32, message: String },

    /// Driver-level failure (network, TLS, protocol)
    #[error("Driver error: {0}")]
    Driver(tiberius::error::Error),

    /// A batch inside a script failed fatally
    #[error("Script {script} failed at batch {batch}/{total}: {source}")]
    Script {
        script: String,
        batch: usize,
        total: usize,
        #[source]
        source: Box<KodbError>,
    },

    /// Reconciled schema document is out of sync with the live table
    #[error("Consistency error for table {table}: {message}")]
    Consistency { table: String, message: String },

    /// Live metadata query returned nothing usable
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Unexpected fault (panic) caught at a unit-of-work boundary
    #[error("Internal fault: {0}")]
    Fault(String),

    /// One or more independent units of work failed
    #[error("{failed} of {total} {what} failed")]
    Partial {
        what: &'static str,
        failed: usize,
        total: usize,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tiberius::error::Error> for KodbError {
    fn from(err: tiberius::error::Error) -> Self {
        match err {
            tiberius::error::Error::Server(token) => KodbError::Database {
                code: token.code(),
                message: token.message().to_string(),
            },
            other => KodbError::Driver(other),
        }
    }
}

impl KodbError {
    /// Create a Database error from a server error number and message
    pub fn database(code: u32, message: impl Into<String>) -> Self {
        KodbError::Database {
            code,
            message: message.into(),
        }
    }

    /// Create a Consistency error
    pub fn consistency(table: impl Into<String>, message: impl Into<String>) -> Self {
        KodbError::Consistency {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            KodbError::Config(_) | KodbError::Validation(_) | KodbError::Yaml(_) => 2,
            KodbError::Fault(_) => 3,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for kodb-util operations.
pub type Result<T> = std::result::Result<T, KodbError>;

/// Await `fut`, turning a panic inside it into [`KodbError::Fault`].
///
/// Callers holding a transaction or connection use this so their cleanup
/// still runs before the failure propagates.
pub async fn catch_fault<T, F>(fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(KodbError::Fault(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catch_fault_converts_panic() {
        let err = catch_fault(async {
            if true {
                panic!("state corrupted");
            }
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, KodbError::Fault(ref m) if m == "state corrupted"));
        assert_eq!(err.exit_code(), 3);

        assert_eq!(catch_fault(async { Ok(7) }).await.unwrap(), 7);
    }

    #[test]
    fn test_format_detailed_includes_cause() {
        let err = KodbError::Script {
            script: "5_CreateTable_ITEM.sql".into(),
            batch: 2,
            total: 3,
            source: Box::new(KodbError::database(2714, "There is already an object named 'ITEM'")),
        };
        let detailed = err.format_detailed();
        assert!(detailed.contains("batch 2/3"));
        assert!(detailed.contains("Caused by"));
        assert!(detailed.contains("2714"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(KodbError::Validation("x".into()).exit_code(), 2);
        assert_eq!(KodbError::Fault("boom".into()).exit_code(), 3);
        assert_eq!(KodbError::database(1, "x").exit_code(), 1);
    }
}
