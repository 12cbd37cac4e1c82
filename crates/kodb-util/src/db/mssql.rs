//! SQL Server sessions over tiberius.

use super::{SessionFactory, SqlSession, SqlValue};
use crate::config::DatabaseConfig;
use crate::error::Result;
use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Query, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

/// Opens one tiberius connection per requested database.
pub struct MssqlSessionFactory {
    config: DatabaseConfig,
}

impl MssqlSessionFactory {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    fn build_config(&self, database: &str) -> Result<Config> {
        let mut config = Config::new();
        config.host(&self.config.host);
        config.port(self.config.port);
        if !self.config.instance.is_empty() {
            config.instance_name(&self.config.instance);
        }
        config.database(database);
        config.application_name("kodb-util");
        config.authentication(self.auth_method()?);

        if self.config.encrypt {
            config.encryption(EncryptionLevel::Required);
        } else {
            config.encryption(EncryptionLevel::NotSupported);
        }
        if self.config.trust_server_cert {
            config.trust_cert();
        }

        Ok(config)
    }

    #[cfg(windows)]
    fn auth_method(&self) -> Result<AuthMethod> {
        if self.config.uses_windows_auth() {
            Ok(AuthMethod::Integrated)
        } else {
            Ok(AuthMethod::sql_server(&self.config.user, &self.config.password))
        }
    }

    #[cfg(not(windows))]
    fn auth_method(&self) -> Result<AuthMethod> {
        if self.config.uses_windows_auth() {
            return Err(crate::error::KodbError::Config(
                "databaseConfig.user is empty but Windows authentication is only available on Windows".into(),
            ));
        }
        Ok(AuthMethod::sql_server(&self.config.user, &self.config.password))
    }
}

#[async_trait]
impl SessionFactory for MssqlSessionFactory {
    async fn open(&self, database: &str) -> Result<Box<dyn SqlSession>> {
        let config = self.build_config(database)?;
        debug!("Connecting to {} ({})", config.get_addr(), database);

        let tcp = if self.config.instance.is_empty() {
            TcpStream::connect(config.get_addr()).await?
        } else {
            TcpStream::connect_named(&config).await?
        };
        tcp.set_nodelay(true).ok();

        let client = Client::connect(config, tcp.compat_write()).await?;
        Ok(Box::new(MssqlSession {
            client,
            database: database.to_string(),
        }))
    }
}

/// One open tiberius client bound to a database.
pub struct MssqlSession {
    client: Client<Compat<TcpStream>>,
    database: String,
}

#[async_trait]
impl SqlSession for MssqlSession {
    fn database(&self) -> &str {
        &self.database
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        // simple_query keeps BEGIN/COMMIT on the session instead of an RPC scope
        self.client.simple_query(sql).await?.into_results().await?;
        Ok(())
    }

    async fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Vec<SqlValue>>> {
        let mut query = Query::new(sql);
        for param in params {
            query.bind(*param);
        }

        let stream = query.query(&mut self.client).await?;
        let rows = stream.into_first_result().await?;

        rows.into_iter()
            .map(|row| row.into_iter().map(SqlValue::try_from).collect())
            .collect()
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let session = *self;
        session.client.close().await?;
        Ok(())
    }
}
