//! Kerberos-authenticated CockroachDB connections over a bridged driver.
//!
//! One connection at a time: the ticket cache is prechecked, the
//! process-wide bridge runtime is started (once), the driver connects, and
//! the caller gets a scoped handle that is closed on every exit path.

pub mod config;
pub mod credential;
pub mod driver;
mod error;
pub mod observability;
pub mod odbc;
pub mod runtime;
pub mod scope;
pub mod target;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use config::{ConnectionConfig, CredentialPolicy};
pub use credential::{check_credential, CredentialChecker, FileCredentialChecker};
pub use driver::{ConnectRequest, Driver, DriverConnection, ResultSet, Row, Value};
pub use error::{classify_diagnostic, ConnectError, ErrorKind, Result};
pub use runtime::{BridgeRuntime, RuntimeInitializer, RuntimeOptions};
pub use scope::{Connector, Cursor, ScopedConnection};
pub use target::{ConnectionProperties, TargetDescriptor};

#[cfg(feature = "odbc")]
pub use odbc::{connector, ensure_runtime_started, run_query, with_connection};
