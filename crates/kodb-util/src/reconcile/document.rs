//! Persisted schema documents (`jsonSchema/<table>.json`).

use crate::config::DatabaseKind;
use crate::error::{KodbError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Marker stubbed into manual fields that still need a human.
pub const TODO_MARKER: &str = "MANUAL_TODO";

/// One table's document. Unknown keys are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDocument {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub class_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub database: DatabaseKind,

    #[serde(default)]
    pub indexes: Vec<IndexDocument>,

    #[serde(default)]
    pub columns: Vec<ColumnDocument>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TableDocument {
    /// New document with manual fields stubbed.
    pub fn stub(name: &str, database: DatabaseKind) -> Self {
        Self {
            name: name.to_string(),
            class_name: TODO_MARKER.to_string(),
            description: TODO_MARKER.to_string(),
            database,
            indexes: Vec::new(),
            columns: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Load the document at `path`, or `None` if it does not exist yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        let doc = serde_json::from_str(&text).map_err(|e| {
            KodbError::Metadata(format!("failed to parse {}: {}", path.display(), e))
        })?;
        Ok(Some(doc))
    }

    /// Two-space indented JSON with CRLF line endings.
    pub fn to_crlf_json(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(json.replace('\n', "\r\n"))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_crlf_json()?)?;
        Ok(())
    }
}

/// One column. Derived fields are rewritten from the live table on every
/// run; `propertyName` and `description` belong to people.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDocument {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub property_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, rename = "type")]
    pub data_type: String,

    #[serde(default)]
    pub allow_null: bool,

    #[serde(default)]
    pub is_primary_key: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unique_index_name: String,

    #[serde(default)]
    pub default_value: String,

    #[serde(default)]
    pub length: i64,

    #[serde(default)]
    pub collation_name: Option<String>,

    #[serde(default)]
    pub character_set: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ColumnDocument {
    /// Placeholder for a column the document has not seen before.
    pub fn placeholder() -> Self {
        Self {
            name: String::new(),
            property_name: TODO_MARKER.to_string(),
            description: TODO_MARKER.to_string(),
            data_type: String::new(),
            allow_null: false,
            is_primary_key: false,
            unique_index_name: String::new(),
            default_value: String::new(),
            length: 0,
            collation_name: None,
            character_set: None,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    pub name: String,

    #[serde(rename = "type")]
    pub index_type: String,

    #[serde(default)]
    pub is_unique: bool,

    #[serde(default)]
    pub is_primary_key: bool,

    #[serde(default)]
    pub columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stub_has_todo_markers() {
        let doc = TableDocument::stub("ITEM", DatabaseKind::Game);
        assert_eq!(doc.class_name, TODO_MARKER);
        assert_eq!(doc.description, TODO_MARKER);
        let col = ColumnDocument::placeholder();
        assert_eq!(col.property_name, TODO_MARKER);
    }

    #[test]
    fn test_crlf_and_indent() {
        let doc = TableDocument::stub("ITEM", DatabaseKind::Game);
        let json = doc.to_crlf_json().unwrap();
        assert!(json.starts_with("{\r\n  \"name\": \"ITEM\",\r\n  \"className\""));
        assert!(!json.replace("\r\n", "").contains('\n'));
        assert!(!json.ends_with("\r\n"));
    }

    #[test]
    fn test_database_kind_is_numeric() {
        let text = r#"{"name": "ACCOUNT_CHAR", "className": "AccountChar", "description": "", "database": 1, "columns": []}"#;
        let doc: TableDocument = serde_json::from_str(text).unwrap();
        assert_eq!(doc.database, DatabaseKind::Account);

        let written = TableDocument::stub("ITEM", DatabaseKind::Game).to_crlf_json().unwrap();
        assert!(written.contains("\"database\": 0,"));
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let text = r#"{
  "name": "ITEM",
  "className": "Item",
  "description": "Items",
  "database": 0,
  "indexes": [],
  "columns": [
    {
      "name": "Num",
      "propertyName": "ItemId",
      "description": "Item number",
      "type": "int",
      "allowNull": false,
      "isPrimaryKey": true,
      "defaultValue": "",
      "length": 0,
      "collationName": null,
      "characterSet": null,
      "enumName": "ItemKind"
    }
  ],
  "generatorHints": {"skipModel": true}
}"#;
        let doc: TableDocument = serde_json::from_str(text).unwrap();
        assert_eq!(doc.columns[0].extra["enumName"], Value::from("ItemKind"));
        assert!(doc.extra.contains_key("generatorHints"));

        let written = doc.to_crlf_json().unwrap();
        assert!(written.contains("\"enumName\": \"ItemKind\""));
        assert!(written.contains("\"generatorHints\""));
    }

    #[test]
    fn test_load_missing_and_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jsonSchema").join("item.json");
        assert!(TableDocument::load(&path).unwrap().is_none());

        let doc = TableDocument::stub("ITEM", DatabaseKind::Game);
        doc.save(&path).unwrap();
        assert_eq!(TableDocument::load(&path).unwrap(), Some(doc));
    }

    #[test]
    fn test_load_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            TableDocument::load(&path),
            Err(KodbError::Metadata(_))
        ));
    }
}
