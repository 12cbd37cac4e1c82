//! Configuration validation.

use super::Config;
use crate::error::{KodbError, Result};
use std::collections::HashSet;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.database_config.host.is_empty() {
        return Err(KodbError::Config("databaseConfig.host is required".into()));
    }
    if config.gen_config.schema_dir.as_os_str().is_empty() {
        return Err(KodbError::Config("genConfig.schemaDir is required".into()));
    }
    if config.gen_config.databases.is_empty() {
        return Err(KodbError::Config(
            "genConfig.databases must list at least one database".into(),
        ));
    }

    let mut seen = HashSet::new();
    for db in &config.gen_config.databases {
        if db.name.trim().is_empty() {
            return Err(KodbError::Config("database name cannot be empty".into()));
        }
        if !seen.insert(db.name.to_lowercase()) {
            return Err(KodbError::Config(format!(
                "database {} is configured more than once",
                db.name
            )));
        }
        if let Some(user) = db.users.iter().find(|u| u.name.is_empty() || u.schema.is_empty()) {
            return Err(KodbError::Config(format!(
                "database {}: user entries need both name and schema (got '{}')",
                db.name, user.name
            )));
        }
        if db.logins.iter().any(|l| l.name.is_empty()) {
            return Err(KodbError::Config(format!(
                "database {}: login name cannot be empty",
                db.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        DatabaseConfig, DatabaseKind, GenConfig, GenDbConfig, LoginConfig, UserConfig,
    };
    use std::path::PathBuf;

    fn valid_config() -> Config {
        Config {
            database_config: DatabaseConfig {
                host: "localhost".to_string(),
                port: 1433,
                instance: String::new(),
                user: "sa".to_string(),
                password: "password".to_string(),
                encrypt: false,
                trust_server_cert: true,
            },
            gen_config: GenConfig {
                schema_dir: PathBuf::from("./OpenKO-db"),
                import_batch_size: None,
                databases: vec![GenDbConfig {
                    name: "KN_online".to_string(),
                    kind: DatabaseKind::Game,
                    schemas: vec!["knight".to_string()],
                    logins: vec![LoginConfig {
                        name: "knight".to_string(),
                        pass: "knight".to_string(),
                    }],
                    users: vec![UserConfig {
                        name: "knight".to_string(),
                        schema: "knight".to_string(),
                    }],
                    is_forbid_clean: false,
                    is_forbid_import: false,
                    is_forbid_export: false,
                }],
            },
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_host() {
        let mut config = valid_config();
        config.database_config.host = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_no_databases() {
        let mut config = valid_config();
        config.gen_config.databases.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_duplicate_database_names() {
        let mut config = valid_config();
        let mut dup = config.gen_config.databases[0].clone();
        dup.name = "kn_ONLINE".to_string();
        config.gen_config.databases.push(dup);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_user_without_schema() {
        let mut config = valid_config();
        config.gen_config.databases[0].users[0].schema = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_batch_size_range() {
        let mut config = valid_config();
        assert_eq!(config.gen_config.effective_batch_size(), 16);
        config.gen_config.import_batch_size = Some(2);
        assert_eq!(config.gen_config.effective_batch_size(), 2);
        config.gen_config.import_batch_size = Some(999);
        assert_eq!(config.gen_config.effective_batch_size(), 999);
        config.gen_config.import_batch_size = Some(1);
        assert_eq!(config.gen_config.effective_batch_size(), 16);
        config.gen_config.import_batch_size = Some(1000);
        assert_eq!(config.gen_config.effective_batch_size(), 16);
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let mut config = valid_config();
        config.database_config.password = "super_secret_password_123".to_string();
        config.gen_config.databases[0].logins[0].pass = "login_secret_456".to_string();
        let debug_output = format!("{:?}", config);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password_123"));
        assert!(!debug_output.contains("login_secret_456"));
    }

    #[test]
    fn test_kind_is_named_in_yaml() {
        let yaml = "databaseConfig:\n  host: localhost\ngenConfig:\n  schemaDir: ./OpenKO-db\n  databases:\n    - name: KN_log\n      kind: log\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.gen_config.databases[0].kind, DatabaseKind::Log);

        let bad = yaml.replace("kind: log", "kind: archive");
        assert!(Config::from_yaml(&bad).is_err());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
databaseConfig:
  host: localhost
  user: sa
  password: pw
genConfig:
  schemaDir: ./OpenKO-db
  importBatchSize: 32
  databases:
    - name: KN_online
      schemas: [knight]
      logins:
        - name: knight
          pass: knight
      users:
        - name: knight
          schema: knight
      isForbidExport: true
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.database_config.port, 1433);
        assert!(config.database_config.trust_server_cert);
        assert_eq!(config.gen_config.effective_batch_size(), 32);
        let db = &config.gen_config.databases[0];
        assert_eq!(db.kind, DatabaseKind::Game);
        assert!(db.is_forbid_export);
        assert!(!db.is_forbid_clean);
    }
}
