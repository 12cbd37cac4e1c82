//! # kodb-util
//!
//! Database utilities for the OpenKO SQL Server schema.
//!
//! This library administers the application databases described by an
//! OpenKO-db artifact tree:
//!
//! - **Clean** drops a database with its users and logins
//! - **Import** recreates it from templates, table DDL, data dumps, views
//!   and stored procedures, under per-script transaction fences
//! - **Export** writes structure, data, views and procedures back into
//!   `ManualSetup`
//! - **Schema documents** reconcile `jsonSchema/*.json` with the live
//!   tables without losing hand-written fields
//!
//! ## Example
//!
//! ```rust,no_run
//! use kodb_util::{Actions, Config, DirectoryModelCatalog, JobRunner, Layout, MssqlSessionFactory};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> kodb_util::Result<()> {
//!     let config = Config::load("kodb-util-config.yaml")?;
//!     let factory = MssqlSessionFactory::new(config.database_config.clone());
//!     let models = DirectoryModelCatalog::new(&Layout::new(&config.gen_config.schema_dir));
//!     let actions = Actions { import: true, ..Default::default() };
//!     JobRunner::new(&config, &factory, &models).run(&actions).await
//! }
//! ```

pub mod artifacts;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod models;
pub mod reconcile;
pub mod script;

// Re-exports for convenient access
pub use artifacts::Layout;
pub use config::{Config, DatabaseConfig, DatabaseKind, GenConfig, GenDbConfig, Overrides};
pub use db::{MssqlSessionFactory, SessionFactory, SqlSession, SqlValue};
pub use error::{KodbError, Result};
pub use jobs::{Actions, JobRunner};
pub use models::{DirectoryModelCatalog, ModelCatalog};
pub use reconcile::{SchemaCatalog, SchemaDocumentExporter};
pub use script::{Script, ScriptRunner};
