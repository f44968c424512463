//! ODBC bridge: psqlODBC (libpq + GSSAPI) driven through the system ODBC
//! driver manager.
//!
//! The process-wide ODBC environment plays the part of the embedded
//! runtime. Connection-string rendering and cell decoding are plain
//! functions and build without the `odbc` feature.

pub mod column;
pub mod connection_string;
pub mod disconnect;

#[cfg(feature = "odbc")]
mod bridge;
#[cfg(feature = "odbc")]
mod driver;

pub use column::ColumnKind;
pub use connection_string::build_connection_string;

#[cfg(feature = "odbc")]
pub use bridge::{environment, OdbcBridge};
#[cfg(feature = "odbc")]
pub use driver::{OdbcConnection, OdbcDriver};

#[cfg(feature = "odbc")]
mod global {
    use super::{OdbcBridge, OdbcDriver};
    use crate::config::ConnectionConfig;
    use crate::driver::{Row, Value};
    use crate::error::Result;
    use crate::runtime::RuntimeInitializer;
    use crate::scope::{Connector, ScopedConnection};
    use std::sync::{Arc, OnceLock};

    static GLOBAL_RUNTIME: OnceLock<Arc<RuntimeInitializer>> = OnceLock::new();

    /// The one bridge runtime for this process.
    pub fn global_runtime() -> Arc<RuntimeInitializer> {
        GLOBAL_RUNTIME
            .get_or_init(|| Arc::new(RuntimeInitializer::new(Arc::new(OdbcBridge))))
            .clone()
    }

    pub fn ensure_runtime_started(config: &ConnectionConfig) -> Result<()> {
        global_runtime().ensure_started(config)
    }

    pub fn connector(config: ConnectionConfig) -> Connector {
        Connector::new(config, global_runtime(), Arc::new(OdbcDriver::new()))
    }

    pub fn with_connection<F, T>(config: &ConnectionConfig, body: F) -> Result<T>
    where
        F: FnOnce(&mut ScopedConnection) -> Result<T>,
    {
        connector(config.clone()).with_connection(body)
    }

    pub fn run_query(
        config: &ConnectionConfig,
        sql: &str,
        params: &[Value],
    ) -> Result<(Vec<String>, Vec<Row>)> {
        connector(config.clone()).run_query(sql, params)
    }
}

#[cfg(feature = "odbc")]
pub use global::{connector, ensure_runtime_started, global_runtime, run_query, with_connection};
