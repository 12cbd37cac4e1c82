//! Live table metadata for reconciliation.

use super::document::IndexDocument;
use super::merge::LiveColumn;
use crate::db::{SqlSession, SqlValue};
use crate::error::{KodbError, Result};
use crate::models::TABLE_SCHEMA;
use async_trait::async_trait;
use std::collections::HashMap;

const TABLE_NAMES_SQL: &str = r#"
    SELECT TABLE_NAME
    FROM INFORMATION_SCHEMA.TABLES
    WHERE TABLE_SCHEMA = @P1 AND TABLE_TYPE = 'BASE TABLE'
    ORDER BY TABLE_NAME
"#;

const COLUMNS_SQL: &str = r#"
    SELECT
        COLUMN_NAME,
        ORDINAL_POSITION,
        COLUMN_DEFAULT,
        IS_NULLABLE,
        DATA_TYPE,
        CHARACTER_MAXIMUM_LENGTH,
        COLLATION_NAME,
        CHARACTER_SET_NAME
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2
    ORDER BY ORDINAL_POSITION
"#;

const CONSTRAINTS_SQL: &str = r#"
    SELECT COLUMN_NAME, CONSTRAINT_NAME
    FROM INFORMATION_SCHEMA.CONSTRAINT_COLUMN_USAGE
    WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2
    ORDER BY CONSTRAINT_NAME
"#;

const INDEXES_SQL: &str = r#"
    SELECT i.name, i.type_desc, i.is_unique, i.is_primary_key
    FROM sys.indexes i
    WHERE i.type_desc <> 'HEAP'
      AND i.object_id = OBJECT_ID(QUOTENAME(@P1) + '.' + QUOTENAME(@P2))
    ORDER BY i.index_id
"#;

const INDEX_COLUMNS_SQL: &str = r#"
    SELECT c.name
    FROM sys.index_columns ic
    INNER JOIN sys.indexes i ON i.object_id = ic.object_id AND i.index_id = ic.index_id
    INNER JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
    WHERE i.object_id = OBJECT_ID(QUOTENAME(@P1) + '.' + QUOTENAME(@P2))
      AND i.name = @P3
      AND ic.is_included_column = 0
    ORDER BY ic.key_ordinal
"#;

/// Read-only view of the live schema.
#[async_trait]
pub trait SchemaCatalog: Send {
    /// Base tables in the application schema.
    async fn tables(&mut self) -> Result<Vec<String>>;

    /// Columns of `table` in ordinal order, with their constraint names.
    async fn columns(&mut self, table: &str) -> Result<Vec<LiveColumn>>;

    /// Non-heap indexes of `table` with their key columns.
    async fn indexes(&mut self, table: &str) -> Result<Vec<IndexDocument>>;
}

/// Schema catalog reading `INFORMATION_SCHEMA` and `sys` views over a session.
pub struct SessionCatalog<'s> {
    session: &'s mut dyn SqlSession,
}

impl<'s> SessionCatalog<'s> {
    pub fn new(session: &'s mut dyn SqlSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl SchemaCatalog for SessionCatalog<'_> {
    async fn tables(&mut self) -> Result<Vec<String>> {
        let rows = self.session.query(TABLE_NAMES_SQL, &[TABLE_SCHEMA]).await?;
        rows.iter()
            .map(|row| text(row, 0, "TABLE_NAME"))
            .collect()
    }

    async fn columns(&mut self, table: &str) -> Result<Vec<LiveColumn>> {
        let constraint_rows = self
            .session
            .query(CONSTRAINTS_SQL, &[TABLE_SCHEMA, table])
            .await?;
        let mut constraints: HashMap<String, Vec<String>> = HashMap::new();
        for row in &constraint_rows {
            constraints
                .entry(text(row, 0, "COLUMN_NAME")?.to_lowercase())
                .or_default()
                .push(text(row, 1, "CONSTRAINT_NAME")?);
        }

        let rows = self
            .session
            .query(COLUMNS_SQL, &[TABLE_SCHEMA, table])
            .await?;
        rows.iter()
            .map(|row| {
                let name = text(row, 0, "COLUMN_NAME")?;
                Ok(LiveColumn {
                    constraints: constraints
                        .get(&name.to_lowercase())
                        .cloned()
                        .unwrap_or_default(),
                    ordinal_position: cell(row, 1).as_i64().unwrap_or_default(),
                    default_value: optional_text(row, 2),
                    is_nullable: optional_text(row, 3).is_some_and(|v| v.eq_ignore_ascii_case("YES")),
                    data_type: text(row, 4, "DATA_TYPE")?,
                    max_length: cell(row, 5).as_i64(),
                    collation_name: optional_text(row, 6),
                    character_set: optional_text(row, 7),
                    name,
                })
            })
            .collect()
    }

    async fn indexes(&mut self, table: &str) -> Result<Vec<IndexDocument>> {
        let rows = self
            .session
            .query(INDEXES_SQL, &[TABLE_SCHEMA, table])
            .await?;

        let mut indexes = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = text(row, 0, "name")?;
            let column_rows = self
                .session
                .query(INDEX_COLUMNS_SQL, &[TABLE_SCHEMA, table, name.as_str()])
                .await?;
            let columns = column_rows
                .iter()
                .map(|r| text(r, 0, "name"))
                .collect::<Result<Vec<_>>>()?;

            indexes.push(IndexDocument {
                index_type: text(row, 1, "type_desc")?,
                is_unique: cell(row, 2).as_bool().unwrap_or(false),
                is_primary_key: cell(row, 3).as_bool().unwrap_or(false),
                columns,
                name,
            });
        }
        Ok(indexes)
    }
}

static NULL: SqlValue = SqlValue::Null;

fn cell(row: &[SqlValue], index: usize) -> &SqlValue {
    row.get(index).unwrap_or(&NULL)
}

fn optional_text(row: &[SqlValue], index: usize) -> Option<String> {
    cell(row, index).as_str().map(String::from)
}

fn text(row: &[SqlValue], index: usize, column: &str) -> Result<String> {
    optional_text(row, index)
        .ok_or_else(|| KodbError::Metadata(format!("missing {} in metadata row", column)))
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory schema catalog.

    use super::*;

    #[derive(Default)]
    pub struct FakeCatalog {
        pub tables: Vec<(String, Vec<LiveColumn>, Vec<IndexDocument>)>,
        pub failing_table: Option<String>,
    }

    impl FakeCatalog {
        pub fn with_table(mut self, name: &str, columns: Vec<LiveColumn>) -> Self {
            self.tables.push((name.to_string(), columns, Vec::new()));
            self
        }

        pub fn with_index(mut self, index: IndexDocument) -> Self {
            if let Some(last) = self.tables.last_mut() {
                last.2.push(index);
            }
            self
        }

        fn find(&self, table: &str) -> Result<&(String, Vec<LiveColumn>, Vec<IndexDocument>)> {
            if self.failing_table.as_deref() == Some(table) {
                return Err(KodbError::database(208, format!("Invalid object name '{}'.", table)));
            }
            self.tables
                .iter()
                .find(|t| t.0 == table)
                .ok_or_else(|| KodbError::Metadata(format!("unknown table {}", table)))
        }
    }

    #[async_trait]
    impl SchemaCatalog for FakeCatalog {
        async fn tables(&mut self) -> Result<Vec<String>> {
            Ok(self.tables.iter().map(|t| t.0.clone()).collect())
        }

        async fn columns(&mut self, table: &str) -> Result<Vec<LiveColumn>> {
            Ok(self.find(table)?.1.clone())
        }

        async fn indexes(&mut self, table: &str) -> Result<Vec<IndexDocument>> {
            Ok(self.find(table)?.2.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fake::FakeFactory;
    use crate::db::SessionFactory;

    fn s(v: &str) -> SqlValue {
        SqlValue::String(v.to_string())
    }

    #[tokio::test]
    async fn test_columns_joined_with_constraints() {
        let factory = FakeFactory::default()
            .returning(
                "CONSTRAINT_COLUMN_USAGE",
                vec![
                    vec![s("Num"), s("PK_ITEM")],
                    vec![s("strName"), s("UQ_ITEM_strName")],
                ],
            )
            .returning(
                "INFORMATION_SCHEMA.COLUMNS",
                vec![
                    vec![
                        s("Num"),
                        SqlValue::Int(1),
                        SqlValue::Null,
                        s("NO"),
                        s("int"),
                        SqlValue::Null,
                        SqlValue::Null,
                        SqlValue::Null,
                    ],
                    vec![
                        s("strName"),
                        SqlValue::Int(2),
                        s("('')"),
                        s("YES"),
                        s("varchar"),
                        SqlValue::Int(50),
                        s("Korean_Wansung_CI_AS"),
                        s("cp949"),
                    ],
                ],
            );
        let mut session = factory.open("KN_online").await.unwrap();
        let mut catalog = SessionCatalog::new(session.as_mut());

        let columns = catalog.columns("ITEM").await.unwrap();
        assert_eq!(columns.len(), 2);
        assert!(columns[0].is_primary_key());
        assert!(!columns[0].is_nullable);
        assert_eq!(columns[1].unique_index_name(), Some("UQ_ITEM_strName"));
        assert_eq!(columns[1].max_length, Some(50));
        assert_eq!(columns[1].default_value.as_deref(), Some("('')"));
    }

    #[tokio::test]
    async fn test_indexes_with_columns() {
        let factory = FakeFactory::default()
            .returning("sys.index_columns", vec![vec![s("Num")]])
            .returning(
                "FROM sys.indexes",
                vec![vec![
                    s("PK_ITEM"),
                    s("CLUSTERED"),
                    SqlValue::Bit(true),
                    SqlValue::Bit(true),
                ]],
            );
        let mut session = factory.open("KN_online").await.unwrap();
        let mut catalog = SessionCatalog::new(session.as_mut());

        let indexes = catalog.indexes("ITEM").await.unwrap();
        assert_eq!(
            indexes,
            vec![IndexDocument {
                name: "PK_ITEM".into(),
                index_type: "CLUSTERED".into(),
                is_unique: true,
                is_primary_key: true,
                columns: vec!["Num".into()],
            }]
        );
    }
}
