//! Classification of "object already absent" failures.
//!
//! A small closed set of SQL Server errors is harmless when a script drops an
//! object that was never created, or alters a table before its CREATE. Those
//! are recognised first by server error number. Errors that carry no number
//! (driver strings, the legacy `mssql: ` prefixed form) fall back to matching
//! the message prefix.

use crate::error::KodbError;
use std::fmt;

/// `Cannot drop the login|user '%s', because it does not exist or you do not have permission.`
const ERR_CANNOT_DROP_PRINCIPAL: u32 = 15151;

/// `Cannot drop the schema|index|view|procedure '%s', because it does not exist ...`
const ERR_CANNOT_DROP_OBJECT: u32 = 3701;

/// `Cannot find the object "%s" because it does not exist or you do not have permissions.`
const ERR_CANNOT_FIND_OBJECT: u32 = 4902;

/// Same message, raised by ALTER on a missing table.
const ERR_CANNOT_FIND_OBJECT_ALTER: u32 = 1088;

const DROP_PREFIX: &str = "Cannot drop the ";
const FIND_PREFIX: &str = "Cannot find the object";
const LEGACY_DRIVER_PREFIX: &str = "mssql: ";

/// Kind of object a harmless failure referred to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingObject {
    Login,
    User,
    Schema,
    Index,
    View,
    Procedure,
    /// ALTER issued before the object's CREATE.
    Object,
}

impl fmt::Display for MissingObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MissingObject::Login => "login not found",
            MissingObject::User => "user not found",
            MissingObject::Schema => "schema not found",
            MissingObject::Index => "index not found",
            MissingObject::View => "view not found",
            MissingObject::Procedure => "procedure not found",
            MissingObject::Object => "object not found",
        };
        f.write_str(s)
    }
}

/// Returns the kind of missing object when `err` is ignorable, `None` when fatal.
pub fn classify(err: &KodbError) -> Option<MissingObject> {
    match err {
        KodbError::Database { code, message } => classify_parts(Some(*code), message),
        KodbError::Driver(inner) => classify_parts(None, &inner.to_string()),
        _ => None,
    }
}

fn classify_parts(code: Option<u32>, message: &str) -> Option<MissingObject> {
    match code {
        Some(ERR_CANNOT_DROP_PRINCIPAL) | Some(ERR_CANNOT_DROP_OBJECT) => dropped_kind(message),
        Some(ERR_CANNOT_FIND_OBJECT) | Some(ERR_CANNOT_FIND_OBJECT_ALTER) => {
            Some(MissingObject::Object)
        }
        Some(_) => None,
        None => legacy_prefix(message),
    }
}

/// Object kind named by a `Cannot drop the <kind> ...` message.
fn dropped_kind(message: &str) -> Option<MissingObject> {
    let rest = message.strip_prefix(DROP_PREFIX)?;
    let kind = rest.split_whitespace().next()?;
    match kind.to_ascii_lowercase().as_str() {
        "login" => Some(MissingObject::Login),
        "user" => Some(MissingObject::User),
        "schema" => Some(MissingObject::Schema),
        "index" => Some(MissingObject::Index),
        "view" => Some(MissingObject::View),
        "procedure" => Some(MissingObject::Procedure),
        _ => None,
    }
}

// Compatibility shim for errors that reach us as plain text.
fn legacy_prefix(message: &str) -> Option<MissingObject> {
    let message = message.trim_start();
    let message = message.strip_prefix(LEGACY_DRIVER_PREFIX).unwrap_or(message);
    if message.starts_with(FIND_PREFIX) {
        return Some(MissingObject::Object);
    }
    dropped_kind(message)
}
