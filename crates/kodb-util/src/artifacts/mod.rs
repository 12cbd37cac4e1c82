//! On-disk layout of the OpenKO-db artifact tree.
//!
//! ```text
//! <schemaDir>/
//!   Templates/         CreateDatabase.sqltemplate, CreateSchema..., CreateUser..., CreateLogin...
//!   Tables/            table DDL, optionally grouped per database
//!   Views/             *.sql
//!   StoredProcedures/  *.sql
//!   ManualSetup/       <step>_<Action>_<name>.sql
//!   jsonSchema/        <lowercase table>.json
//! ```

mod template;

pub use template::{Template, TemplateVars};

use crate::error::{KodbError, Result};
use crate::script::Script;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const TEMPLATES_DIR: &str = "Templates";
pub const TABLES_DIR: &str = "Tables";
pub const VIEWS_DIR: &str = "Views";
pub const STORED_PROCS_DIR: &str = "StoredProcedures";
pub const MANUAL_SETUP_DIR: &str = "ManualSetup";
pub const JSON_SCHEMA_DIR: &str = "jsonSchema";

const SQL_EXTENSION: &str = "sql";

/// Numbered steps of the `ManualSetup` directory, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ArtifactStep {
    CreateDatabase = 1,
    CreateSchema = 2,
    CreateUser = 3,
    CreateLogin = 4,
    CreateTable = 5,
    InsertData = 6,
    CreateView = 7,
    CreateStoredProc = 8,
}

impl ArtifactStep {
    /// Steps written by a structure export.
    pub const STRUCTURE: [ArtifactStep; 5] = [
        ArtifactStep::CreateDatabase,
        ArtifactStep::CreateSchema,
        ArtifactStep::CreateUser,
        ArtifactStep::CreateLogin,
        ArtifactStep::CreateTable,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn action(self) -> &'static str {
        match self {
            ArtifactStep::CreateDatabase => "CreateDatabase",
            ArtifactStep::CreateSchema => "CreateSchema",
            ArtifactStep::CreateUser => "CreateUser",
            ArtifactStep::CreateLogin => "CreateLogin",
            ArtifactStep::CreateTable => "CreateTable",
            ArtifactStep::InsertData => "InsertData",
            ArtifactStep::CreateView => "CreateView",
            ArtifactStep::CreateStoredProc => "CreateStoredProc",
        }
    }

    /// `<step>_<Action>_<name>.sql`
    pub fn file_name(self, name: &str) -> String {
        format!("{}_{}_{}.{}", self.number(), self.action(), name, SQL_EXTENSION)
    }

    fn owns(self, file_name: &str) -> bool {
        let prefix = format!("{}_", self.number());
        file_name.starts_with(&prefix) && file_name.ends_with(".sql")
    }
}

impl fmt::Display for ArtifactStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.number(), self.action())
    }
}

/// Paths inside a schema directory.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(TEMPLATES_DIR)
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.root.join(TABLES_DIR)
    }

    pub fn views_dir(&self) -> PathBuf {
        self.root.join(VIEWS_DIR)
    }

    pub fn stored_procs_dir(&self) -> PathBuf {
        self.root.join(STORED_PROCS_DIR)
    }

    pub fn manual_setup_dir(&self) -> PathBuf {
        self.root.join(MANUAL_SETUP_DIR)
    }

    pub fn json_schema_dir(&self) -> PathBuf {
        self.root.join(JSON_SCHEMA_DIR)
    }

    /// Persisted schema document for a table.
    pub fn schema_document_path(&self, table: &str) -> PathBuf {
        self.json_schema_dir()
            .join(format!("{}.json", table.to_lowercase()))
    }

    /// Load a template and substitute its placeholders.
    pub fn render(&self, template: Template, vars: &TemplateVars<'_>) -> Result<String> {
        let path = self.templates_dir().join(template.file_name());
        let text = fs::read_to_string(&path).map_err(|e| {
            KodbError::Config(format!("Failed to read template {}: {}", path.display(), e))
        })?;
        template.render(&text, vars)
    }

    /// Remove previously exported files of `steps`, creating the directory if needed.
    pub fn clear_steps(&self, steps: &[ArtifactStep]) -> Result<usize> {
        let dir = self.manual_setup_dir();
        fs::create_dir_all(&dir)?;

        let mut removed = 0;
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if entry.file_type()?.is_file() && steps.iter().any(|step| step.owns(name)) {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        debug!("Removed {} old artifacts from {}", removed, dir.display());
        Ok(removed)
    }

    /// Write one `ManualSetup` artifact.
    pub fn write_artifact(&self, step: ArtifactStep, name: &str, sql: &str) -> Result<PathBuf> {
        let dir = self.manual_setup_dir();
        fs::create_dir_all(&dir)?;
        let path = dir.join(step.file_name(name));
        info!("Exporting {}", path.display());
        fs::write(&path, sql)?;
        Ok(path)
    }

    /// Write a generated script under its own (already numbered) name.
    pub fn write_script(&self, script: &Script) -> Result<PathBuf> {
        let dir = self.manual_setup_dir();
        fs::create_dir_all(&dir)?;
        let path = dir.join(&script.name);
        info!("Exporting {}", path.display());
        fs::write(&path, &script.sql)?;
        Ok(path)
    }

    /// A previously exported artifact, if present.
    pub fn read_artifact(&self, step: ArtifactStep, name: &str) -> Result<Option<String>> {
        let path = self.manual_setup_dir().join(step.file_name(name));
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }
}

/// Every `*.sql` file directly inside `dir`, sorted by file name.
pub fn read_sql_scripts(dir: &Path) -> Result<Vec<Script>> {
    if !dir.is_dir() {
        return Err(KodbError::Validation(format!(
            "directory {} does not exist",
            dir.display()
        )));
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == SQL_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            debug!("Reading {}", path.display());
            let sql = fs::read_to_string(&path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(Script::batch(name, sql))
        })
        .collect()
}
