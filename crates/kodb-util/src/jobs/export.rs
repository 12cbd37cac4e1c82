//! Export jobs writing into `ManualSetup` and `jsonSchema`.

use super::generate;
use crate::artifacts::{ArtifactStep, Layout};
use crate::config::GenDbConfig;
use crate::db::{release, SessionFactory, SqlSession, SqlValue};
use crate::error::Result;
use crate::models::ModelCatalog;
use crate::reconcile::{SchemaDocumentExporter, SessionCatalog};
use tracing::{info, warn};

const VIEWS_SQL: &str = "SELECT [name], OBJECT_DEFINITION([object_id]) FROM [sys].[views] WHERE [is_ms_shipped] = 0 ORDER BY [name]";

const PROCEDURES_SQL: &str = "SELECT [name], OBJECT_DEFINITION([object_id]) FROM [sys].[procedures] WHERE [is_ms_shipped] = 0 ORDER BY [name]";

/// Export jobs for one database.
///
/// Old artifacts are cleared once per run by the caller, before the first
/// database is exported.
pub struct ExportJob<'a> {
    factory: &'a dyn SessionFactory,
    layout: &'a Layout,
    models: &'a dyn ModelCatalog,
    db: &'a GenDbConfig,
}

impl<'a> ExportJob<'a> {
    pub fn new(
        factory: &'a dyn SessionFactory,
        layout: &'a Layout,
        models: &'a dyn ModelCatalog,
        db: &'a GenDbConfig,
    ) -> Self {
        Self {
            factory,
            layout,
            models,
            db,
        }
    }

    /// Steps 1-5: database, schemas, users, logins and table DDL.
    pub async fn structure(&self) -> Result<()> {
        info!("-- Exporting structure of {} --", self.db.name);
        for script in generate::structure_scripts(self.layout, self.models, self.db)? {
            self.layout.write_script(&script)?;
        }
        Ok(())
    }

    /// Step 6: one insert dump per non-empty table.
    pub async fn data(&self) -> Result<()> {
        info!("-- Exporting table data of {} --", self.db.name);
        let mut session = self.factory.open(&self.db.name).await?;
        let result = self.data_on(session.as_mut()).await;
        release(session, result).await
    }

    async fn data_on(&self, session: &mut dyn SqlSession) -> Result<()> {
        for table in self.models.tables(&self.db.name)? {
            match self.models.insert_dump(&mut *session, &table.name).await? {
                Some(dump) => {
                    self.layout
                        .write_artifact(ArtifactStep::InsertData, &table.name, &dump)?;
                }
                None => info!("{} has no rows, skipping", table.name),
            }
        }
        Ok(())
    }

    /// Step 7: definitions of user views.
    pub async fn views(&self) -> Result<()> {
        info!("-- Exporting views of {} --", self.db.name);
        self.definitions(VIEWS_SQL, ArtifactStep::CreateView).await
    }

    /// Step 8: definitions of user stored procedures.
    pub async fn procs(&self) -> Result<()> {
        info!("-- Exporting stored procedures of {} --", self.db.name);
        self.definitions(PROCEDURES_SQL, ArtifactStep::CreateStoredProc)
            .await
    }

    async fn definitions(&self, sql: &str, step: ArtifactStep) -> Result<()> {
        let mut session = self.factory.open(&self.db.name).await?;
        let result = session.query(sql, &[]).await;
        let rows = release(session, result).await?;

        for row in rows {
            let (Some(name), definition) = (
                row.first().and_then(SqlValue::as_str),
                row.get(1).and_then(SqlValue::as_str),
            ) else {
                continue;
            };
            let Some(definition) = definition else {
                warn!("No definition available for {} (encrypted?), skipping", name);
                continue;
            };
            self.layout
                .write_artifact(step, name, &format!("{}\n", definition))?;
        }
        Ok(())
    }

    /// Reconcile `jsonSchema` documents against the live tables.
    pub async fn schema_document(&self, include_indexes: bool) -> Result<usize> {
        let mut session = self.factory.open(&self.db.name).await?;
        let result = self.schema_document_on(session.as_mut(), include_indexes).await;
        release(session, result).await
    }

    async fn schema_document_on(
        &self,
        session: &mut dyn SqlSession,
        include_indexes: bool,
    ) -> Result<usize> {
        let mut exporter = SchemaDocumentExporter::new(self.layout, self.db.kind);
        if !include_indexes {
            exporter = exporter.without_indexes();
        }
        let mut catalog = SessionCatalog::new(session);
        exporter.export(&mut catalog).await
    }
}
