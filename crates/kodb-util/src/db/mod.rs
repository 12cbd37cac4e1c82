//! Database session abstraction.
//!
//! Everything above this module talks to SQL Server through [`SqlSession`]
//! and [`SessionFactory`]. The production implementation lives in
//! [`mssql`]; tests substitute in-memory fakes.

mod classify;
pub mod mssql;
mod value;

pub use classify::{classify, MissingObject};
pub use mssql::MssqlSessionFactory;
pub use value::SqlValue;

use crate::error::Result;
use async_trait::async_trait;

/// System database used for server-scoped statements (database, login DDL).
pub const SYSTEM_DATABASE: &str = "master";

/// An open connection bound to one database.
#[async_trait]
pub trait SqlSession: Send {
    /// Name of the database this session was opened against.
    fn database(&self) -> &str;

    /// Execute one batch, discarding any result sets.
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Run a parameterized query (`@P1`, `@P2`, ...) and collect the first result set.
    async fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Vec<SqlValue>>>;

    async fn begin_transaction(&mut self) -> Result<()> {
        self.execute("BEGIN TRANSACTION").await
    }

    async fn commit_transaction(&mut self) -> Result<()> {
        self.execute("COMMIT TRANSACTION").await
    }

    async fn rollback_transaction(&mut self) -> Result<()> {
        self.execute("ROLLBACK TRANSACTION").await
    }

    /// Close the connection.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens sessions against a named database.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, database: &str) -> Result<Box<dyn SqlSession>>;
}

/// Close a session after a unit of work, keeping the work's error if both fail.
pub async fn release<T>(session: Box<dyn SqlSession>, result: Result<T>) -> Result<T> {
    let database = session.database().to_string();
    tracing::debug!("Closing connection to {}", database);
    match (result, session.close().await) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            tracing::warn!("Failed to close connection to {}: {}", database, close_err);
            Err(err)
        }
    }
}

/// Quote an identifier with brackets.
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}
