//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt;
use std::path::PathBuf;

/// Default width of a data-dump window, in rows.
pub const DEFAULT_IMPORT_BATCH_SIZE: usize = 16;

/// Smallest accepted data-dump window width.
pub const MIN_IMPORT_BATCH_SIZE: usize = 2;

/// Largest accepted data-dump window width.
pub const MAX_IMPORT_BATCH_SIZE: usize = 999;

/// Root configuration structure, bound to `kodb-util-config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// SQL Server connection settings.
    pub database_config: DatabaseConfig,

    /// Artifact generation settings and the managed databases.
    pub gen_config: GenConfig,
}

/// Connection configuration for a SQL Server instance.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// Server host.
    pub host: String,

    /// Server port (default: 1433).
    #[serde(default = "default_mssql_port")]
    pub port: u16,

    /// Named instance, resolved through SQL Browser when set.
    #[serde(default)]
    pub instance: String,

    /// Login user. Empty means Windows authentication.
    #[serde(default)]
    pub user: String,

    /// Login password.
    #[serde(default)]
    pub password: String,

    /// Encrypt the connection (default: false).
    #[serde(default)]
    pub encrypt: bool,

    /// Trust the server certificate (default: true).
    #[serde(default = "default_true")]
    pub trust_server_cert: bool,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("instance", &self.instance)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .finish()
    }
}

impl DatabaseConfig {
    /// Whether Windows (integrated) authentication should be used.
    pub fn uses_windows_auth(&self) -> bool {
        self.user.is_empty()
    }
}

/// Configuration used to generate/export the application databases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenConfig {
    /// Root of the OpenKO-db artifact tree.
    pub schema_dir: PathBuf,

    /// Rows per data-dump window during import. Valid range 2-999.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_batch_size: Option<usize>,

    /// Managed databases, processed in order.
    #[serde(default)]
    pub databases: Vec<GenDbConfig>,
}

impl GenConfig {
    /// Effective data-dump window width.
    ///
    /// Values outside [2, 999] fall back to [`DEFAULT_IMPORT_BATCH_SIZE`].
    pub fn effective_batch_size(&self) -> usize {
        match self.import_batch_size {
            Some(size) if (MIN_IMPORT_BATCH_SIZE..=MAX_IMPORT_BATCH_SIZE).contains(&size) => size,
            _ => DEFAULT_IMPORT_BATCH_SIZE,
        }
    }
}

/// Configuration for an individual application database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenDbConfig {
    /// Database name.
    pub name: String,

    /// Role of the database in the application (`game`, `account` or `log`).
    #[serde(default, with = "kind_name")]
    pub kind: DatabaseKind,

    /// Schemas created inside the database.
    #[serde(default)]
    pub schemas: Vec<String>,

    /// Server logins owned by this database.
    #[serde(default)]
    pub logins: Vec<LoginConfig>,

    /// Database users.
    #[serde(default)]
    pub users: Vec<UserConfig>,

    /// Forbid any clean operations on this database.
    #[serde(default)]
    pub is_forbid_clean: bool,

    /// Forbid any import operations on this database.
    #[serde(default)]
    pub is_forbid_import: bool,

    /// Forbid any export operations for this database.
    #[serde(default)]
    pub is_forbid_export: bool,
}

/// Role of an application database.
///
/// Schema documents carry it as its number; the config file names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum DatabaseKind {
    #[default]
    Game = 0,
    Account = 1,
    Log = 2,
}

impl DatabaseKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "game" => Some(DatabaseKind::Game),
            "account" => Some(DatabaseKind::Account),
            "log" => Some(DatabaseKind::Log),
            _ => None,
        }
    }
}

mod kind_name {
    use super::DatabaseKind;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(kind: &DatabaseKind, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(kind)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DatabaseKind, D::Error> {
        let name = String::deserialize(deserializer)?;
        DatabaseKind::from_name(&name).ok_or_else(|| {
            de::Error::unknown_variant(&name, &["game", "account", "log"])
        })
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DatabaseKind::Game => "game",
            DatabaseKind::Account => "account",
            DatabaseKind::Log => "log",
        };
        f.write_str(s)
    }
}

/// A single server login credential.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginConfig {
    pub name: String,
    pub pass: String,
}

impl fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginConfig")
            .field("name", &self.name)
            .field("pass", &"[REDACTED]")
            .finish()
    }
}

/// A single database user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub name: String,
    pub schema: String,
}

fn default_mssql_port() -> u16 {
    1433
}

fn default_true() -> bool {
    true
}
