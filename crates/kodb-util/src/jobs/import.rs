//! Import pipeline: create the database and load every artifact into it.

use super::generate;
use crate::artifacts::{read_sql_scripts, ArtifactStep, Layout};
use crate::config::GenDbConfig;
use crate::db::{release, SqlSession};
use crate::error::{catch_fault, Result};
use crate::models::{identity_insert_off, ModelCatalog, IDENTITY_INSERT_PREFIX};
use crate::script::{execute_script, ExecutionContext, Fence, Script, ScriptRunner};
use std::fmt;
use tracing::info;

/// Import phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    CreateDatabase,
    CreateSchemas,
    CreateUsers,
    CreateLogins,
    CreateTables,
    CreateViews,
    CreateStoredProcedures,
}

impl ImportPhase {
    pub const ALL: [ImportPhase; 7] = [
        ImportPhase::CreateDatabase,
        ImportPhase::CreateSchemas,
        ImportPhase::CreateUsers,
        ImportPhase::CreateLogins,
        ImportPhase::CreateTables,
        ImportPhase::CreateViews,
        ImportPhase::CreateStoredProcedures,
    ];

    /// Connection and fencing for the phase.
    pub fn context(self) -> ExecutionContext {
        match self {
            // CREATE DATABASE is rejected inside a user transaction
            ImportPhase::CreateDatabase => ExecutionContext::system().unfenced(),
            ImportPhase::CreateLogins => ExecutionContext::system(),
            ImportPhase::CreateStoredProcedures => ExecutionContext::configured().unfenced(),
            _ => ExecutionContext::configured(),
        }
    }
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportPhase::CreateDatabase => "Importing databases",
            ImportPhase::CreateSchemas => "Importing schemas",
            ImportPhase::CreateUsers => "Importing users",
            ImportPhase::CreateLogins => "Importing logins",
            ImportPhase::CreateTables => "Importing tables",
            ImportPhase::CreateViews => "Importing views",
            ImportPhase::CreateStoredProcedures => "Importing stored procedures",
        };
        f.write_str(s)
    }
}

/// Runs the import phases for one database.
pub struct ImportJob<'a> {
    runner: ScriptRunner<'a>,
    layout: &'a Layout,
    models: &'a dyn ModelCatalog,
    db: &'a GenDbConfig,
    manual_artifacts: bool,
}

impl<'a> ImportJob<'a> {
    pub fn new(
        runner: ScriptRunner<'a>,
        layout: &'a Layout,
        models: &'a dyn ModelCatalog,
        db: &'a GenDbConfig,
    ) -> Self {
        Self {
            runner,
            layout,
            models,
            db,
            manual_artifacts: false,
        }
    }

    /// Also write every generated script to `ManualSetup`.
    pub fn with_manual_artifacts(mut self, enabled: bool) -> Self {
        self.manual_artifacts = enabled;
        self
    }

    /// Run every phase; the first failure stops the import.
    pub async fn run(&self) -> Result<()> {
        info!("-- Import {} --", self.db.name);
        for phase in ImportPhase::ALL {
            info!("-- {} --", phase);
            self.run_phase(phase).await?;
        }
        Ok(())
    }

    pub async fn run_phase(&self, phase: ImportPhase) -> Result<()> {
        let scripts = self.scripts_for(phase)?;
        if phase == ImportPhase::CreateTables {
            return self.create_tables(&scripts).await;
        }
        self.runner.run_scripts(phase.context(), &scripts).await
    }

    fn scripts_for(&self, phase: ImportPhase) -> Result<Vec<Script>> {
        let scripts = match phase {
            ImportPhase::CreateDatabase => generate::database_scripts(self.layout, self.db)?,
            ImportPhase::CreateSchemas => generate::schema_scripts(self.layout, self.db)?,
            ImportPhase::CreateUsers => generate::user_scripts(self.layout, self.db)?,
            ImportPhase::CreateLogins => generate::login_scripts(self.layout, self.db)?,
            ImportPhase::CreateTables => generate::table_scripts(self.models, self.db)?,
            ImportPhase::CreateViews => return read_sql_scripts(&self.layout.views_dir()),
            ImportPhase::CreateStoredProcedures => {
                return read_sql_scripts(&self.layout.stored_procs_dir())
            }
        };

        if self.manual_artifacts {
            for script in &scripts {
                self.layout.write_script(script)?;
            }
        }
        Ok(scripts)
    }

    /// Table DDL and the exported data dumps share one transaction.
    async fn create_tables(&self, ddl: &[Script]) -> Result<()> {
        let context = ImportPhase::CreateTables.context();
        let mut session = self.runner.open(context.target).await?;
        let result = catch_fault(self.create_tables_on(session.as_mut(), ddl)).await;
        release(session, result).await
    }

    async fn create_tables_on(&self, session: &mut dyn SqlSession, ddl: &[Script]) -> Result<()> {
        let mut fence = Fence::begin(session).await?;
        let result = catch_fault(self.create_and_load(fence.session(), ddl)).await;
        fence.finish(result).await
    }

    async fn create_and_load(&self, session: &mut dyn SqlSession, ddl: &[Script]) -> Result<()> {
        let context = ImportPhase::CreateTables.context();
        let width = self.runner.window_width();

        for script in ddl {
            execute_script(&mut *session, &context, script, width).await?;
        }

        let data_context = context.data_dump();
        for table in self.models.tables(&self.db.name)? {
            let Some(sql) = self.layout.read_artifact(ArtifactStep::InsertData, &table.name)? else {
                continue;
            };
            let dump = Script::data_dump(ArtifactStep::InsertData.file_name(&table.name), sql);
            execute_script(&mut *session, &data_context, &dump, width).await?;

            if dump.sql.starts_with(IDENTITY_INSERT_PREFIX) {
                session.execute(&identity_insert_off(&table.name)).await?;
            }
        }
        Ok(())
    }
}
