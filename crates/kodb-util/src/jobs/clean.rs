//! Clean: drop the database and its logins.

use crate::config::GenDbConfig;
use crate::db::{classify, quote_ident, release, SessionFactory, SqlSession, SYSTEM_DATABASE};
use crate::error::Result;
use tracing::{info, warn};

/// Drop `db` and its configured logins from the system database.
///
/// Missing logins are reported as warnings, so a clean on a
/// fresh server succeeds. Runs outside a transaction since the server
/// refuses `DROP DATABASE` inside one.
pub async fn clean_database(factory: &dyn SessionFactory, db: &GenDbConfig) -> Result<()> {
    info!("-- Clean {} --", db.name);
    let mut session = factory.open(SYSTEM_DATABASE).await?;
    let result = drop_all(session.as_mut(), db).await;
    release(session, result).await
}

async fn drop_all(session: &mut dyn SqlSession, db: &GenDbConfig) -> Result<()> {
    drop_object(
        session,
        "database",
        &db.name,
        &format!("DROP DATABASE IF EXISTS {}", quote_ident(&db.name)),
    )
    .await?;

    // Database users live inside the dropped database; only server-level
    // logins outlive it.
    for login in &db.logins {
        drop_object(
            session,
            "login",
            &login.name,
            &format!("DROP LOGIN {}", quote_ident(&login.name)),
        )
        .await?;
    }
    Ok(())
}

async fn drop_object(session: &mut dyn SqlSession, kind: &str, name: &str, sql: &str) -> Result<()> {
    info!("Dropping {} {}", kind, name);
    match session.execute(sql).await {
        Ok(()) => Ok(()),
        Err(err) => match classify(&err) {
            Some(missing) => {
                warn!("Dropping {} {}: {}", kind, name, missing);
                Ok(())
            }
            None => Err(err),
        },
    }
}
