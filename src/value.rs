use std::fmt::Write;

use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum Value {
    NULL,
    I64(i64),
    Text(String),
}

impl Value {
    /// Appends the value as an SQL literal. Text is single-quoted with embedded quotes doubled.
    pub fn write_sql_literal(&self, buf: &mut String) {
        match self {
            Self::NULL => buf.push_str("NULL"),
            Self::I64(v) => {
                let _ = write!(buf, "{v}");
            }
            Self::Text(v) => {
                buf.push('\'');
                for c in v.chars() {
                    if c == '\'' {
                        buf.push('\'');
                    }
                    buf.push(c);
                }
                buf.push('\'');
            }
        };
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<sqlite::Value> for Value {
    fn from(value: sqlite::Value) -> Self {
        match value {
            sqlite::Value::Null => Self::NULL,
            sqlite::Value::Integer(v) => Self::I64(v),
            sqlite::Value::String(v) => Self::Text(v),
            sqlite::Value::Float(v) => Self::Text(v.to_string()),
            sqlite::Value::Binary(v) => Self::Text(String::from_utf8_lossy(&v).to_string()),
        }
    }
}
