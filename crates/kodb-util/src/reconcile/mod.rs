//! Schema document reconciliation.
//!
//! For every base table, the live column and index metadata is merged into
//! `jsonSchema/<table>.json`. Derived fields follow the database. Manual
//! fields (`className`, `description`, `propertyName`) survive every run and
//! are stubbed with [`TODO_MARKER`] only when an entry is first created.

mod catalog;
mod document;
mod merge;

pub use catalog::{SchemaCatalog, SessionCatalog};
pub use document::{ColumnDocument, IndexDocument, TableDocument, TODO_MARKER};
pub use merge::{check_aligned, normalize_length, reconcile_columns, unwrap_default, LiveColumn};

use crate::artifacts::Layout;
use crate::config::DatabaseKind;
use crate::error::{KodbError, Result};
use tracing::{error, info};

/// Writes reconciled schema documents for one database.
pub struct SchemaDocumentExporter<'a> {
    layout: &'a Layout,
    kind: DatabaseKind,
    include_indexes: bool,
}

impl<'a> SchemaDocumentExporter<'a> {
    pub fn new(layout: &'a Layout, kind: DatabaseKind) -> Self {
        Self {
            layout,
            kind,
            include_indexes: true,
        }
    }

    /// Leave each document's index list as it is.
    pub fn without_indexes(mut self) -> Self {
        self.include_indexes = false;
        self
    }

    /// Reconcile every table. A failing table is logged and skipped; the
    /// run then ends in [`KodbError::Partial`].
    pub async fn export(&self, catalog: &mut dyn SchemaCatalog) -> Result<usize> {
        info!("-- Exporting schema documents --");
        let tables = catalog.tables().await?;
        if tables.is_empty() {
            return Err(KodbError::Metadata(
                "no base tables found in INFORMATION_SCHEMA.TABLES".into(),
            ));
        }

        let mut failed = 0;
        for table in &tables {
            if let Err(e) = self.reconcile_table(catalog, table).await {
                error!("Failed to reconcile schema document for {}: {}", table, e);
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(KodbError::Partial {
                what: "schema documents",
                failed,
                total: tables.len(),
            });
        }
        Ok(tables.len())
    }

    /// Reconcile and write one table's document.
    pub async fn reconcile_table(
        &self,
        catalog: &mut dyn SchemaCatalog,
        table: &str,
    ) -> Result<TableDocument> {
        let path = self.layout.schema_document_path(table);
        info!("Exporting {} to {}", table, path.display());

        let mut doc = match TableDocument::load(&path)? {
            Some(doc) => doc,
            None => TableDocument::stub(table, self.kind),
        };
        doc.name = table.to_string();
        doc.database = self.kind;

        if self.include_indexes {
            doc.indexes = catalog.indexes(table).await?;
        }

        let live = catalog.columns(table).await?;
        if live.is_empty() {
            return Err(KodbError::Metadata(format!(
                "no columns found for table {}",
                table
            )));
        }

        let persisted = std::mem::take(&mut doc.columns);
        doc.columns = reconcile_columns(table, persisted, &live)?;

        doc.save(&path)?;
        Ok(doc)
    }
}
