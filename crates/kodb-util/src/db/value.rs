//! Driver-independent cell values.

use crate::error::{KodbError, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tiberius::{ColumnData, FromSql};

/// A single value read from a result set.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bit(bool),
    Int(i64),
    Float(f64),
    /// Exact numeric, kept in its textual form.
    Numeric(String),
    String(String),
    Binary(Vec<u8>),
    Guid(String),
    /// Date/time value already formatted as an ISO 8601 literal body.
    Temporal(String),
}

impl SqlValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(i) => Some(*i),
            SqlValue::Bit(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bit(b) => Some(*b),
            SqlValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Render the value as a T-SQL literal that fits on a single line.
    pub fn to_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bit(b) => if *b { "1" } else { "0" }.to_string(),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Float(f) if f.is_finite() => f.to_string(),
            SqlValue::Float(_) => "NULL".to_string(),
            SqlValue::Numeric(n) => n.clone(),
            SqlValue::String(s) => nstring_literal(s),
            SqlValue::Binary(bytes) => {
                let mut out = String::with_capacity(2 + bytes.len() * 2);
                out.push_str("0x");
                for b in bytes {
                    out.push_str(&format!("{:02X}", b));
                }
                out
            }
            SqlValue::Guid(g) => format!("'{}'", g),
            SqlValue::Temporal(t) => format!("'{}'", t),
        }
    }
}

/// `N'...'` literal; line breaks become `CHAR(n)` so a row stays on one line.
fn nstring_literal(s: &str) -> String {
    if !s.contains(|c| c == '\r' || c == '\n') {
        return format!("N'{}'", s.replace('\'', "''"));
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    for ch in s.chars() {
        match ch {
            '\r' | '\n' => {
                if !current.is_empty() {
                    parts.push(format!("N'{}'", current.replace('\'', "''")));
                    current.clear();
                }
                parts.push(format!("CHAR({})", ch as u32));
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        parts.push(format!("N'{}'", current.replace('\'', "''")));
    }
    parts.join(" + ")
}

impl TryFrom<ColumnData<'static>> for SqlValue {
    type Error = KodbError;

    fn try_from(data: ColumnData<'static>) -> Result<Self> {
        let value = match &data {
            ColumnData::U8(v) => v.map(|v| SqlValue::Int(v as i64)),
            ColumnData::I16(v) => v.map(|v| SqlValue::Int(v as i64)),
            ColumnData::I32(v) => v.map(|v| SqlValue::Int(v as i64)),
            ColumnData::I64(v) => v.map(SqlValue::Int),
            ColumnData::F32(v) => v.map(|v| SqlValue::Float(v as f64)),
            ColumnData::F64(v) => v.map(SqlValue::Float),
            ColumnData::Bit(v) => v.map(SqlValue::Bit),
            ColumnData::String(v) => v.as_ref().map(|s| SqlValue::String(s.to_string())),
            ColumnData::Guid(v) => v.map(|g| SqlValue::Guid(g.to_string())),
            ColumnData::Binary(v) => v.as_ref().map(|b| SqlValue::Binary(b.to_vec())),
            ColumnData::Numeric(v) => v.map(|n| SqlValue::Numeric(n.to_string())),
            ColumnData::Xml(v) => v
                .as_ref()
                .map(|x| SqlValue::String(x.clone().into_owned().into_string())),
            // datetime keeps 1/300s ticks; three digits is the widest literal it accepts
            ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) => {
                NaiveDateTime::from_sql(&data)?
                    .map(|dt| SqlValue::Temporal(dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()))
            }
            ColumnData::DateTime2(_) => NaiveDateTime::from_sql(&data)?.map(|dt| {
                SqlValue::Temporal(format!(
                    "{}{}",
                    dt.format("%Y-%m-%dT%H:%M:%S"),
                    ticks(dt.nanosecond())
                ))
            }),
            ColumnData::Date(_) => NaiveDate::from_sql(&data)?
                .map(|d| SqlValue::Temporal(d.format("%Y-%m-%d").to_string())),
            ColumnData::Time(_) => NaiveTime::from_sql(&data)?.map(|t| {
                SqlValue::Temporal(format!("{}{}", t.format("%H:%M:%S"), ticks(t.nanosecond())))
            }),
            ColumnData::DateTimeOffset(_) => DateTime::<FixedOffset>::from_sql(&data)?.map(|dt| {
                SqlValue::Temporal(format!(
                    "{}{}{}",
                    dt.format("%Y-%m-%dT%H:%M:%S"),
                    ticks(dt.nanosecond()),
                    dt.format("%:z")
                ))
            }),
        };
        Ok(value.unwrap_or(SqlValue::Null))
    }
}

/// Fractional seconds at the 100ns resolution of datetime2(7), time(7) and datetimeoffset(7).
fn ticks(nanos: u32) -> String {
    format!(".{:07}", nanos / 100)
}
