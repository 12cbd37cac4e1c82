//! Table model service: CREATE TABLE text and literal-row insert dumps.

use crate::artifacts::Layout;
use crate::db::{quote_ident, SqlSession, SqlValue};
use crate::error::{KodbError, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Schema all application tables live in.
pub const TABLE_SCHEMA: &str = "dbo";

/// Prefix of a dump header for tables with an identity column.
pub const IDENTITY_INSERT_PREFIX: &str = "SET IDENTITY_INSERT ";

const INSERTABLE_COLUMNS_SQL: &str = r#"
    SELECT c.name, c.is_identity
    FROM sys.columns c
    WHERE c.object_id = OBJECT_ID(QUOTENAME(@P1) + '.' + QUOTENAME(@P2))
      AND c.is_computed = 0
      AND TYPE_NAME(c.system_type_id) <> 'timestamp'
    ORDER BY c.column_id
"#;

/// One application table known to the model service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableModel {
    pub name: String,
    pub create_sql: String,
}

/// Source of table definitions and their data.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Tables of `database`, in creation order.
    fn tables(&self, database: &str) -> Result<Vec<TableModel>>;

    /// Insert dump of every row in `table`, or `None` when the table is empty.
    async fn insert_dump(&self, session: &mut dyn SqlSession, table: &str)
        -> Result<Option<String>>;
}

/// Model catalog backed by the `Tables/` directory.
///
/// Uses `Tables/<database>/*.sql` when that directory exists and falls back
/// to `Tables/*.sql`. The table name is the file stem.
pub struct DirectoryModelCatalog {
    tables_dir: PathBuf,
}

impl DirectoryModelCatalog {
    pub fn new(layout: &Layout) -> Self {
        Self {
            tables_dir: layout.tables_dir(),
        }
    }

    fn dir_for(&self, database: &str) -> PathBuf {
        let per_database = self.tables_dir.join(database);
        if per_database.is_dir() {
            per_database
        } else {
            self.tables_dir.clone()
        }
    }
}

#[async_trait]
impl ModelCatalog for DirectoryModelCatalog {
    fn tables(&self, database: &str) -> Result<Vec<TableModel>> {
        let dir = self.dir_for(database);
        if !dir.is_dir() {
            return Err(KodbError::Validation(format!(
                "directory {} does not exist",
                dir.display()
            )));
        }
        read_table_models(&dir)
    }

    async fn insert_dump(
        &self,
        session: &mut dyn SqlSession,
        table: &str,
    ) -> Result<Option<String>> {
        let columns = session
            .query(INSERTABLE_COLUMNS_SQL, &[TABLE_SCHEMA, table])
            .await?;
        if columns.is_empty() {
            return Err(KodbError::Metadata(format!(
                "no insertable columns found for {}.{}",
                TABLE_SCHEMA, table
            )));
        }

        let mut names = Vec::with_capacity(columns.len());
        let mut has_identity = false;
        for row in &columns {
            let name = row.first().and_then(SqlValue::as_str).ok_or_else(|| {
                KodbError::Metadata(format!("unreadable column name in {}", table))
            })?;
            names.push(name.to_string());
            has_identity |= row.get(1).and_then(SqlValue::as_bool).unwrap_or(false);
        }

        let column_list = names
            .iter()
            .map(|n| quote_ident(n))
            .collect::<Vec<_>>()
            .join(", ");
        let select = format!(
            "SELECT {} FROM {}.{}",
            column_list,
            quote_ident(TABLE_SCHEMA),
            quote_ident(table)
        );
        let rows = session.query(&select, &[]).await?;
        debug!("Read {} rows from {}", rows.len(), table);

        if rows.is_empty() {
            return Ok(None);
        }

        let header = insert_header(table, &names, has_identity);
        Ok(Some(render_insert_dump(&header, &rows)))
    }
}

fn read_table_models(dir: &Path) -> Result<Vec<TableModel>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut models = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        models.push(TableModel {
            name: name.to_string(),
            create_sql: fs::read_to_string(&path)?,
        });
    }
    Ok(models)
}

/// `INSERT INTO [dbo].[T] ([a], [b]) VALUES`, with identity insert enabled when needed.
pub fn insert_header(table: &str, columns: &[String], has_identity: bool) -> String {
    let target = format!("{}.{}", quote_ident(TABLE_SCHEMA), quote_ident(table));
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let insert = format!("INSERT INTO {} ({}) VALUES", target, column_list);
    if has_identity {
        format!("{}{} ON; {}", IDENTITY_INSERT_PREFIX, target, insert)
    } else {
        insert
    }
}

/// Statement turning identity insert back off after a dump for `table`.
pub fn identity_insert_off(table: &str) -> String {
    format!(
        "{}{}.{} OFF",
        IDENTITY_INSERT_PREFIX,
        quote_ident(TABLE_SCHEMA),
        quote_ident(table)
    )
}

/// Header, one literal row per line (comma-separated), trailing newline.
pub fn render_insert_dump(header: &str, rows: &[Vec<SqlValue>]) -> String {
    let mut out = String::from(header);
    out.push('\n');
    let body = rows
        .iter()
        .map(|row| {
            let values = row
                .iter()
                .map(SqlValue::to_literal)
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", values)
        })
        .collect::<Vec<_>>()
        .join(",\n");
    out.push_str(&body);
    out.push('\n');
    out
}
