//! Scoped acquisition of one authenticated connection.
//!
//! [`Connector::open`] runs precheck -> runtime start -> driver connect and
//! hands back a [`ScopedConnection`] that closes itself when dropped.
//! [`Connector::with_connection`] wraps a body around that guard so the
//! connection is closed on success, on error, and during panic unwinding.

use crate::config::{ConnectionConfig, CredentialPolicy};
use crate::credential::{CredentialChecker, FileCredentialChecker};
use crate::driver::{ConnectRequest, Driver, DriverConnection, ResultSet, Row, Value};
use crate::error::{ConnectError, Result};
use crate::observability::ConnectionLogger;
use crate::runtime::RuntimeInitializer;
use log::Level;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub struct Connector {
    config: Arc<ConnectionConfig>,
    runtime: Arc<RuntimeInitializer>,
    driver: Arc<dyn Driver>,
    checker: Arc<dyn CredentialChecker>,
    logger: Arc<ConnectionLogger>,
}

impl Connector {
    pub fn new(
        config: ConnectionConfig,
        runtime: Arc<RuntimeInitializer>,
        driver: Arc<dyn Driver>,
    ) -> Self {
        let checker = match config.credential_max_age_secs {
            Some(secs) => FileCredentialChecker::with_max_age(Duration::from_secs(secs)),
            None => FileCredentialChecker::new(),
        };
        Self {
            config: Arc::new(config),
            runtime,
            driver,
            checker: Arc::new(checker),
            logger: Arc::new(ConnectionLogger::default()),
        }
    }

    pub fn with_credential_checker(mut self, checker: Arc<dyn CredentialChecker>) -> Self {
        self.checker = checker;
        self
    }

    pub fn with_logger(mut self, logger: ConnectionLogger) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn runtime(&self) -> &RuntimeInitializer {
        &self.runtime
    }

    /// Opens one authenticated connection. Every failure is logged before it
    /// is returned; nothing is retried.
    pub fn open(&self) -> Result<ScopedConnection> {
        self.acquire().inspect_err(|e| self.log_failure(e))
    }

    fn acquire(&self) -> Result<ScopedConnection> {
        self.config.validate()?;
        self.precheck_credential()?;
        self.runtime.ensure_started(&self.config)?;

        let request = ConnectRequest::from_config(&self.config);
        let endpoint = request.target.endpoint();
        self.logger.log_connecting(&endpoint);
        log::debug!(
            "Driver {} ({}) target {}",
            self.driver.name(),
            request.driver_class,
            request.target
        );

        let connection = self.driver.connect(&request)?;
        self.logger
            .log_connection(Level::Info, &endpoint, "established");

        Ok(ScopedConnection {
            inner: Some(connection),
            endpoint,
            logger: self.logger.clone(),
        })
    }

    fn precheck_credential(&self) -> Result<()> {
        let strict = self.config.credential_policy == CredentialPolicy::Strict;
        match self.config.resolve_credential_cache() {
            Some(path) => {
                if self.checker.check(&path) || !strict {
                    return Ok(());
                }
                Err(ConnectError::MissingCredential { path })
            }
            None if strict => Err(ConnectError::InvalidConfig(
                "strict credential policy needs a file ticket cache path".to_string(),
            )),
            None => {
                log::warn!("No file-based Kerberos ticket cache to precheck; connecting anyway");
                Ok(())
            }
        }
    }

    fn log_failure(&self, error: &ConnectError) {
        let mut metadata = HashMap::new();
        metadata.insert("kind".to_string(), format!("{:?}", error.kind()));
        if let Some(sqlstate) = error.sqlstate() {
            metadata.insert("sqlstate".to_string(), sqlstate.to_string());
        }
        self.logger.log_error(&error.to_string(), &metadata);
    }

    /// Runs `body` against a freshly opened connection and closes it after.
    ///
    /// A body error is logged and returned after the close; if the close
    /// also fails, that failure is only logged. When the body succeeds, a
    /// close failure is returned.
    pub fn with_connection<F, T>(&self, body: F) -> Result<T>
    where
        F: FnOnce(&mut ScopedConnection) -> Result<T>,
    {
        let mut conn = self.open()?;
        match body(&mut conn) {
            Ok(value) => {
                conn.close()?;
                Ok(value)
            }
            Err(e) => {
                self.log_failure(&e);
                if let Err(close_err) = conn.close() {
                    log::error!("Error closing connection after failure: {}", close_err);
                }
                Err(e)
            }
        }
    }

    /// One query in its own connection scope: `(columns, rows)`.
    pub fn run_query(&self, sql: &str, params: &[Value]) -> Result<(Vec<String>, Vec<Row>)> {
        self.with_connection(|conn| {
            let mut cursor = conn.cursor();
            cursor.execute(sql, params)?;
            let rows = cursor.fetch_all()?;
            let columns = cursor.description().map(<[String]>::to_vec).unwrap_or_default();
            cursor.close();
            Ok((columns, rows))
        })
    }
}

/// Exclusively owned live connection. Closed exactly once: by
/// [`ScopedConnection::close`] or, failing that, on drop.
pub struct ScopedConnection {
    inner: Option<Box<dyn DriverConnection>>,
    endpoint: String,
    logger: Arc<ConnectionLogger>,
}

impl ScopedConnection {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn execute_query(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        let conn = self
            .inner
            .as_mut()
            .ok_or_else(|| ConnectError::Internal("Connection already closed".to_string()))?;
        let result = conn.execute(sql, params)?;
        self.logger.log_query(sql, result.row_count());
        Ok(result)
    }

    pub fn cursor(&mut self) -> Cursor<'_> {
        Cursor {
            conn: self,
            result: None,
            position: 0,
        }
    }

    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        let Some(conn) = self.inner.take() else {
            return Ok(());
        };
        let result = conn.close();
        self.logger
            .log_connection(Level::Info, &self.endpoint, "closed");
        result
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        if self.inner.is_some() {
            if let Err(e) = self.release() {
                log::error!("Error closing connection to {}: {}", self.endpoint, e);
            }
        }
    }
}

/// Client-side cursor over one statement's materialized result.
pub struct Cursor<'c> {
    conn: &'c mut ScopedConnection,
    result: Option<ResultSet>,
    position: usize,
}

impl Cursor<'_> {
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<()> {
        self.result = None;
        self.position = 0;
        self.result = Some(self.conn.execute_query(sql, params)?);
        Ok(())
    }

    /// Column names of the last result, `None` before any execute.
    pub fn description(&self) -> Option<&[String]> {
        self.result.as_ref().map(|r| r.columns.as_slice())
    }

    pub fn row_count(&self) -> Option<usize> {
        self.result.as_ref().map(ResultSet::row_count)
    }

    pub fn fetch_one(&mut self) -> Result<Option<Row>> {
        let position = self.position;
        let result = self.result_mut()?;
        let Some(row) = result.rows.get_mut(position) else {
            return Ok(None);
        };
        let row = std::mem::take(row);
        self.position = position + 1;
        Ok(Some(row))
    }

    pub fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let position = self.position;
        let result = self.result_mut()?;
        let start = position.min(result.rows.len());
        let rows = result.rows.split_off(start);
        self.position = start;
        Ok(rows)
    }

    pub fn close(self) {}

    fn result_mut(&mut self) -> Result<&mut ResultSet> {
        self.result
            .as_mut()
            .ok_or_else(|| ConnectError::driver("No query has been executed on this cursor"))
    }
}
