//! Top-level jobs and the per-database run loop.

mod clean;
mod export;
mod generate;
mod import;

pub use clean::clean_database;
pub use export::ExportJob;
pub use import::{ImportJob, ImportPhase};

use crate::artifacts::{ArtifactStep, Layout};
use crate::config::{Config, GenDbConfig};
use crate::db::SessionFactory;
use crate::error::{catch_fault, KodbError, Result};
use crate::models::ModelCatalog;
use crate::script::ScriptRunner;
use tracing::{error, info, warn};

/// Actions requested for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actions {
    pub clean: bool,
    pub import: bool,
    pub export_structure: bool,
    pub export_data: bool,
    pub export_views: bool,
    pub export_procs: bool,
    pub export_all: bool,
    pub export_schema_document: bool,
    /// Write template-generated import scripts to `ManualSetup`.
    pub create_manual_artifacts: bool,
    /// Refresh index lists in schema documents.
    pub include_indexes: bool,
}

impl Actions {
    pub fn has_export(&self) -> bool {
        self.export_all
            || self.export_structure
            || self.export_data
            || self.export_views
            || self.export_procs
            || self.export_schema_document
    }

    pub fn has_action(&self) -> bool {
        self.clean || self.import || self.has_export()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.has_action() {
            return Err(KodbError::Validation(
                "no actionable arguments provided".into(),
            ));
        }
        if self.clean && self.has_export() {
            return Err(KodbError::Validation(
                "cannot perform both clean and export actions".into(),
            ));
        }
        if self.import && self.has_export() {
            return Err(KodbError::Validation(
                "running import and export together is redundant".into(),
            ));
        }
        Ok(())
    }

    /// `ManualSetup` steps this run rewrites.
    fn cleared_steps(&self) -> Vec<ArtifactStep> {
        let mut steps = Vec::new();
        if self.export_all || self.export_structure || (self.import && self.create_manual_artifacts) {
            steps.extend(ArtifactStep::STRUCTURE);
        }
        if self.export_all || self.export_data {
            steps.push(ArtifactStep::InsertData);
        }
        if self.export_all || self.export_views {
            steps.push(ArtifactStep::CreateView);
        }
        if self.export_all || self.export_procs {
            steps.push(ArtifactStep::CreateStoredProc);
        }
        steps
    }
}

/// Runs the requested actions against every configured database in turn.
pub struct JobRunner<'a> {
    config: &'a Config,
    factory: &'a dyn SessionFactory,
    models: &'a dyn ModelCatalog,
    layout: Layout,
}

impl<'a> JobRunner<'a> {
    pub fn new(
        config: &'a Config,
        factory: &'a dyn SessionFactory,
        models: &'a dyn ModelCatalog,
    ) -> Self {
        Self {
            config,
            factory,
            models,
            layout: Layout::new(&config.gen_config.schema_dir),
        }
    }

    /// Databases are processed sequentially. A failure (or panic) in one is
    /// logged and the next still runs; the run then ends in
    /// [`KodbError::Partial`].
    pub async fn run(&self, actions: &Actions) -> Result<()> {
        actions.validate()?;
        if !self.layout.root().is_dir() {
            return Err(KodbError::Validation(format!(
                "schema directory {} does not exist",
                self.layout.root().display()
            )));
        }

        let steps = actions.cleared_steps();
        if !steps.is_empty() {
            self.layout.clear_steps(&steps)?;
        }

        let databases = &self.config.gen_config.databases;
        let mut failed = 0;
        for db in databases {
            let result = catch_fault(self.run_database(db, actions)).await;

            match result {
                Ok(()) => info!("Finished {}", db.name),
                Err(e) => {
                    error!("{} failed: {}", db.name, e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(KodbError::Partial {
                what: "databases",
                failed,
                total: databases.len(),
            });
        }
        Ok(())
    }

    async fn run_database(&self, db: &GenDbConfig, actions: &Actions) -> Result<()> {
        info!("-- Processing {} ({}) --", db.name, db.kind);

        if actions.import {
            if db.is_forbid_import || db.is_forbid_clean {
                warn!("Import is forbidden for {}, skipping", db.name);
            } else {
                clean_database(self.factory, db).await?;
                self.import_job(db, actions.create_manual_artifacts)
                    .run()
                    .await?;
            }
        } else if actions.clean {
            if db.is_forbid_clean {
                warn!("Clean is forbidden for {}, skipping", db.name);
            } else {
                clean_database(self.factory, db).await?;
            }
        }

        if actions.has_export() {
            if db.is_forbid_export {
                warn!("Export is forbidden for {}, skipping", db.name);
            } else {
                self.export(db, actions).await?;
            }
        }
        Ok(())
    }

    fn import_job<'b>(&'b self, db: &'b GenDbConfig, manual_artifacts: bool) -> ImportJob<'b> {
        let runner = ScriptRunner::new(
            self.factory,
            &db.name,
            self.config.gen_config.effective_batch_size(),
        );
        ImportJob::new(runner, &self.layout, self.models, db).with_manual_artifacts(manual_artifacts)
    }

    async fn export(&self, db: &GenDbConfig, actions: &Actions) -> Result<()> {
        let job = ExportJob::new(self.factory, &self.layout, self.models, db);
        if actions.export_all || actions.export_structure {
            job.structure().await?;
        }
        if actions.export_all || actions.export_data {
            job.data().await?;
        }
        if actions.export_all || actions.export_views {
            job.views().await?;
        }
        if actions.export_all || actions.export_procs {
            job.procs().await?;
        }
        if actions.export_schema_document {
            job.schema_document(actions.include_indexes).await?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fixture::Fixture;
    use super::*;
    use crate::db::fake::FakeFactory;
    use crate::db::SqlSession;
    use crate::models::DirectoryModelCatalog;
    use async_trait::async_trait;

    fn actions() -> Actions {
        Actions {
            include_indexes: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_actions_validation() {
        assert!(matches!(actions().validate(), Err(KodbError::Validation(_))));

        let clean_and_export = Actions {
            clean: true,
            export_views: true,
            ..actions()
        };
        assert!(clean_and_export.validate().is_err());

        let import_and_export = Actions {
            import: true,
            export_schema_document: true,
            ..actions()
        };
        assert!(import_and_export.validate().is_err());

        let clean_and_import = Actions {
            clean: true,
            import: true,
            ..actions()
        };
        assert!(clean_and_import.validate().is_ok());

        let export_all = Actions {
            export_all: true,
            ..actions()
        };
        assert!(export_all.validate().is_ok());
    }

    #[test]
    fn test_cleared_steps() {
        let all = Actions {
            export_all: true,
            ..actions()
        };
        assert_eq!(all.cleared_steps().len(), 8);

        let schema_only = Actions {
            export_schema_document: true,
            ..actions()
        };
        assert!(schema_only.cleared_steps().is_empty());

        let import = Actions {
            import: true,
            ..actions()
        };
        assert!(import.cleared_steps().is_empty());
    }

    #[tokio::test]
    async fn test_missing_schema_dir_touches_no_database() {
        let fixture = Fixture::new();
        let mut config = fixture.config(vec![fixture.game_db()]);
        config.gen_config.schema_dir = fixture.layout.root().join("missing");
        let factory = FakeFactory::default();
        let models = DirectoryModelCatalog::new(&fixture.layout);

        let clean = Actions {
            clean: true,
            ..actions()
        };
        let err = JobRunner::new(&config, &factory, &models)
            .run(&clean)
            .await
            .unwrap_err();
        assert!(matches!(err, KodbError::Validation(_)));
        assert!(factory.journal.entries().is_empty());
    }

    #[tokio::test]
    async fn test_forbidden_database_is_skipped() {
        let fixture = Fixture::new();
        let mut db = fixture.game_db();
        db.is_forbid_clean = true;
        let config = fixture.config(vec![db]);
        let factory = FakeFactory::default();
        let models = DirectoryModelCatalog::new(&fixture.layout);

        let clean = Actions {
            clean: true,
            ..actions()
        };
        JobRunner::new(&config, &factory, &models)
            .run(&clean)
            .await
            .unwrap();
        assert!(factory.journal.statements().is_empty());
    }

    #[tokio::test]
    async fn test_failed_database_does_not_stop_next() {
        let fixture = Fixture::new();
        let mut log_db = fixture.game_db();
        log_db.name = "KN_log".into();
        let config = fixture.config(vec![fixture.game_db(), log_db]);
        let factory = FakeFactory::default().failing(
            "DROP DATABASE IF EXISTS [KN_online]",
            3702,
            "Cannot drop database \"KN_online\" because it is currently in use.",
        );
        let models = DirectoryModelCatalog::new(&fixture.layout);

        let clean = Actions {
            clean: true,
            ..actions()
        };
        let err = JobRunner::new(&config, &factory, &models)
            .run(&clean)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            KodbError::Partial {
                failed: 1,
                total: 2,
                ..
            }
        ));
        assert!(factory
            .journal
            .statements()
            .contains(&"DROP DATABASE IF EXISTS [KN_log]".to_string()));
    }

    struct PanickingFactory {
        inner: FakeFactory,
        panic_on: &'static str,
    }

    #[async_trait]
    impl SessionFactory for PanickingFactory {
        async fn open(&self, database: &str) -> Result<Box<dyn SqlSession>> {
            let session = self.inner.open(database).await?;
            if session.database() == self.panic_on {
                panic!("connection state corrupted");
            }
            Ok(session)
        }
    }

    #[tokio::test]
    async fn test_panic_is_contained_per_database() {
        let fixture = Fixture::new();
        let mut account_db = fixture.game_db();
        account_db.name = "KN_account".into();
        let config = fixture.config(vec![fixture.game_db(), account_db]);
        let factory = PanickingFactory {
            inner: FakeFactory::default(),
            panic_on: "KN_online",
        };
        let models = DirectoryModelCatalog::new(&fixture.layout);

        let views = Actions {
            export_views: true,
            ..actions()
        };
        let err = JobRunner::new(&config, &factory, &models)
            .run(&views)
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 1);
        assert!(matches!(err, KodbError::Partial { failed: 1, .. }));
        assert!(factory
            .inner
            .journal
            .entries()
            .iter()
            .any(|(db, sql)| db == "KN_account" && sql.contains("[sys].[views]")));
    }

    #[tokio::test]
    async fn test_import_cleans_first() {
        let fixture = Fixture::new();
        let config = fixture.config(vec![fixture.game_db()]);
        let factory = FakeFactory::default();
        let models = DirectoryModelCatalog::new(&fixture.layout);

        let import = Actions {
            import: true,
            ..actions()
        };
        JobRunner::new(&config, &factory, &models)
            .run(&import)
            .await
            .unwrap();

        let statements = factory.journal.statements();
        let drop = statements
            .iter()
            .position(|s| s.starts_with("DROP DATABASE"))
            .unwrap();
        let create = statements
            .iter()
            .position(|s| s.starts_with("CREATE DATABASE"))
            .unwrap();
        assert!(drop < create);
        // batch size 2 over three rows
        assert_eq!(
            statements.iter().filter(|s| s.contains("INSERT INTO")).count(),
            2
        );
    }
}
