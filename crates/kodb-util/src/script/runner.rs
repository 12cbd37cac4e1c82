//! Script execution with transaction fences.

use super::{ExecutionContext, Script, TargetDatabase};
use crate::db::{classify, release, SessionFactory, SqlSession, SYSTEM_DATABASE};
use crate::error::{catch_fault, KodbError, Result};
use tracing::{debug, error, info, warn};

/// Runs groups of scripts for one configured database.
pub struct ScriptRunner<'a> {
    factory: &'a dyn SessionFactory,
    database: &'a str,
    window_width: usize,
}

impl<'a> ScriptRunner<'a> {
    pub fn new(factory: &'a dyn SessionFactory, database: &'a str, window_width: usize) -> Self {
        Self {
            factory,
            database,
            window_width,
        }
    }

    /// Database name a context resolves to.
    pub fn database_for(&self, target: TargetDatabase) -> &'a str {
        match target {
            TargetDatabase::System => SYSTEM_DATABASE,
            TargetDatabase::Configured => self.database,
        }
    }

    /// Open a session for `target`.
    pub async fn open(&self, target: TargetDatabase) -> Result<Box<dyn SqlSession>> {
        self.factory.open(self.database_for(target)).await
    }

    pub fn window_width(&self) -> usize {
        self.window_width
    }

    /// Run `scripts` in order on one connection.
    ///
    /// With a fence, each script is its own transaction: a fatal batch rolls
    /// back that script and stops the group. Without one, batches apply as
    /// they go. A panic while executing is rolled back and the connection
    /// closed before it is returned as [`KodbError::Fault`].
    pub async fn run_scripts(&self, context: ExecutionContext, scripts: &[Script]) -> Result<()> {
        if scripts.is_empty() {
            warn!("No scripts to execute");
            return Ok(());
        }

        let mut session = self.open(context.target).await?;
        let result = catch_fault(self.run_on(session.as_mut(), context, scripts)).await;
        release(session, result).await
    }

    async fn run_on(
        &self,
        session: &mut dyn SqlSession,
        context: ExecutionContext,
        scripts: &[Script],
    ) -> Result<()> {
        for script in scripts {
            let batches = script.batches(&context, self.window_width);
            debug!("{} contains {} batches", script.name, batches.len());
            if batches.is_empty() {
                // nothing to run, so no transaction is opened
                continue;
            }

            if context.use_transaction_fence {
                let mut fence = Fence::begin(&mut *session).await?;
                let result = catch_fault(execute_batches(fence.session(), script, &batches)).await;
                fence.finish(result).await?;
            } else {
                execute_batches(&mut *session, script, &batches).await?;
            }
        }
        Ok(())
    }
}

/// An open transaction on a borrowed session.
///
/// [`Fence::finish`] commits on success and rolls back on error. Work run
/// inside a fence goes through [`catch_fault`] so a panic still reaches
/// `finish`; a fence dropped while open leaves the rollback to the server.
pub struct Fence<'s> {
    session: &'s mut dyn SqlSession,
    open: bool,
}

impl<'s> Fence<'s> {
    pub async fn begin(session: &'s mut dyn SqlSession) -> Result<Fence<'s>> {
        debug!("Beginning transaction on {}", session.database());
        session.begin_transaction().await?;
        Ok(Self {
            session,
            open: true,
        })
    }

    pub fn session(&mut self) -> &mut dyn SqlSession {
        &mut *self.session
    }

    /// Close the fence according to `result`, returning it unchanged on success.
    pub async fn finish<T>(mut self, result: Result<T>) -> Result<T> {
        self.open = false;
        match result {
            Ok(value) => {
                debug!("Committing transaction on {}", self.session.database());
                self.session.commit_transaction().await?;
                Ok(value)
            }
            Err(err) => {
                warn!("Rolling back transaction on {}", self.session.database());
                if let Err(rollback_err) = self.session.rollback_transaction().await {
                    warn!("Rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}

impl Drop for Fence<'_> {
    fn drop(&mut self) {
        if self.open {
            warn!(
                "Transaction on {} abandoned; it is rolled back when the connection closes",
                self.session.database()
            );
        }
    }
}

/// Split and execute one script on `session` without opening a fence.
pub async fn execute_script(
    session: &mut dyn SqlSession,
    context: &ExecutionContext,
    script: &Script,
    window_width: usize,
) -> Result<()> {
    let batches = script.batches(context, window_width);
    if batches.is_empty() {
        debug!("{} has no batches, skipping", script.name);
        return Ok(());
    }
    execute_batches(session, script, &batches).await
}

async fn execute_batches(
    session: &mut dyn SqlSession,
    script: &Script,
    batches: &[String],
) -> Result<()> {
    let total = batches.len();
    info!("Executing {} ({} batches)", script.name, total);

    for (i, batch) in batches.iter().enumerate() {
        let Err(err) = session.execute(batch).await else {
            continue;
        };
        match classify(&err) {
            Some(missing) => {
                warn!("{} batch {}/{}: {}, ignoring", script.name, i + 1, total, missing);
            }
            None => {
                error!("Error executing {} batch [{}/{}]: {}", script.name, i + 1, total, err);
                return Err(KodbError::Script {
                    script: script.name.clone(),
                    batch: i + 1,
                    total,
                    source: Box::new(err),
                });
            }
        }
    }
    Ok(())
}
