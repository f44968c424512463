//! Boundary to the third-party driver.
//!
//! The lifecycle code only needs two capabilities from a driver: open a
//! connection for a [`ConnectRequest`], and on that connection execute SQL
//! and close. Everything network-facing lives behind these traits.

use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::target::{ConnectionProperties, TargetDescriptor};
use std::fmt;
use std::path::{Path, PathBuf};

/// Arguments of a driver connect call.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub driver_class: String,
    pub target: TargetDescriptor,
    pub properties: ConnectionProperties,
    pub driver_artifact: PathBuf,
}

impl ConnectRequest {
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            driver_class: config.driver_class.clone(),
            target: TargetDescriptor::from_config(config),
            properties: ConnectionProperties::from_config(config),
            driver_artifact: config.driver_artifact.clone(),
        }
    }

    pub fn driver_artifact(&self) -> &Path {
        &self.driver_artifact
    }
}

pub trait Driver: Send + Sync {
    fn name(&self) -> &str;

    /// Blocks until the session is established or the connect timeout in
    /// the request's target elapses.
    fn connect(&self, request: &ConnectRequest) -> Result<Box<dyn DriverConnection>>;
}

pub trait DriverConnection: Send {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet>;

    fn close(self: Box<Self>) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Text form used for driver parameter binding. `None` is SQL NULL.
    pub fn to_param_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::Text(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

pub type Row = Vec<Value>;

/// Materialized result of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Statements that produce no result set (DDL, DML).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_request_from_config() {
        let config = ConnectionConfig::new("h", 1, "d").with_driver_artifact("/drivers/pg.so");
        let request = ConnectRequest::from_config(&config);
        assert_eq!(request.driver_class, "org.postgresql.Driver");
        assert_eq!(request.driver_artifact(), Path::new("/drivers/pg.so"));
        assert_eq!(request.target.host, "h");
        assert_eq!(request.properties.len(), 2);
    }

    #[test]
    fn test_value_param_text() {
        assert_eq!(Value::Null.to_param_text(), None);
        assert_eq!(Value::Int(42).to_param_text().as_deref(), Some("42"));
        assert_eq!(Value::Bool(true).to_param_text().as_deref(), Some("true"));
        assert_eq!(Value::from("public").to_param_text().as_deref(), Some("public"));
    }

    #[test]
    fn test_value_accessors_and_display() {
        assert_eq!(Value::Int(1).as_i64(), Some(1));
        assert_eq!(Value::Text("x".into()).as_str(), Some("x"));
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
    }

    #[test]
    fn test_result_set_helpers() {
        let rs = ResultSet::new(vec!["?column?".into()], vec![vec![Value::Int(1)]]);
        assert_eq!(rs.row_count(), 1);
        assert_eq!(ResultSet::empty().row_count(), 0);
    }
}
