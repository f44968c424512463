use std::path::PathBuf;
use thiserror::Error;

/// Error kind surfaced to callers. Every kind is terminal for the current
/// connection attempt; nothing is retried internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Ticket cache artifact absent (strict credential policy only)
    MissingCredential,
    /// Bridge runtime could not be started; sticky for the process
    RuntimeStartError,
    /// Driver reported that the server rejected our identity
    AuthenticationFailure,
    /// Connect or socket timeout elapsed
    NetworkTimeout,
    /// Any other driver failure, wrapped opaquely
    DriverError,
    /// Config rejected before any I/O
    InvalidConfig,
    /// Lock poisoning and similar internal faults
    Internal,
}

#[derive(Error, Debug, Clone)]
pub enum ConnectError {
    #[error("No valid Kerberos ticket found at {}", path.display())]
    MissingCredential { path: PathBuf },

    #[error("Runtime start failed: {0}")]
    RuntimeStart(String),

    #[error("Authentication failed [{sqlstate}]: {message}")]
    AuthenticationFailure { sqlstate: String, message: String },

    #[error("Network timeout: {0}")]
    NetworkTimeout(String),

    #[error("Driver error: {message}")]
    Driver {
        sqlstate: Option<String>,
        native_code: i32,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ConnectError>;

#[cfg(feature = "odbc")]
impl From<odbc_api::Error> for ConnectError {
    fn from(err: odbc_api::Error) -> Self {
        use odbc_api::Error as OdbcErr;
        let record = match &err {
            OdbcErr::Diagnostics { record, .. } => record,
            OdbcErr::UnsupportedOdbcApiVersion(record) => record,
            OdbcErr::InvalidRowArraySize { record, .. } => record,
            OdbcErr::UnableToRepresentNull(record) => record,
            OdbcErr::OracleOdbcDriverDoesNotSupport64Bit(record) => record,
            _ => return ConnectError::driver(err.to_string()),
        };
        let sqlstate = String::from_utf8_lossy(&record.state.0).into_owned();
        ConnectError::from_diagnostic(&sqlstate, record.native_error, &record.to_string())
    }
}

impl ConnectError {
    pub fn driver(message: impl Into<String>) -> Self {
        ConnectError::Driver {
            sqlstate: None,
            native_code: 0,
            message: message.into(),
        }
    }

    /// Builds the error for a driver diagnostic record, classifying it by
    /// SQLSTATE class and, for connection-class states, by message.
    pub fn from_diagnostic(sqlstate: &str, native_code: i32, message: &str) -> Self {
        match classify_diagnostic(sqlstate, message) {
            ErrorKind::AuthenticationFailure => ConnectError::AuthenticationFailure {
                sqlstate: sqlstate.to_string(),
                message: message.to_string(),
            },
            ErrorKind::NetworkTimeout => {
                ConnectError::NetworkTimeout(format!("[{}] {}", sqlstate, message))
            }
            _ => ConnectError::Driver {
                sqlstate: Some(sqlstate.to_string()),
                native_code,
                message: message.to_string(),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectError::MissingCredential { .. } => ErrorKind::MissingCredential,
            ConnectError::RuntimeStart(_) => ErrorKind::RuntimeStartError,
            ConnectError::AuthenticationFailure { .. } => ErrorKind::AuthenticationFailure,
            ConnectError::NetworkTimeout(_) => ErrorKind::NetworkTimeout,
            ConnectError::Driver { .. } => ErrorKind::DriverError,
            ConnectError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            ConnectError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            ConnectError::AuthenticationFailure { sqlstate, .. } => Some(sqlstate),
            ConnectError::Driver { sqlstate, .. } => sqlstate.as_deref(),
            _ => None,
        }
    }
}

/// Maps a SQLSTATE plus diagnostic text onto an [`ErrorKind`].
///
/// psqlODBC reports GSSAPI failures as `08001` with the libpq message, so the
/// connection-exception class needs a look at the text as well.
pub fn classify_diagnostic(sqlstate: &str, message: &str) -> ErrorKind {
    let upper = sqlstate.to_ascii_uppercase();
    if upper.starts_with("28") {
        return ErrorKind::AuthenticationFailure;
    }
    if upper == "HYT00" || upper == "HYT01" {
        return ErrorKind::NetworkTimeout;
    }
    if upper.starts_with("08") {
        let msg = message.to_ascii_lowercase();
        if msg.contains("timeout") || msg.contains("timed out") {
            return ErrorKind::NetworkTimeout;
        }
        if msg.contains("gss")
            || msg.contains("kerberos")
            || msg.contains("authentication")
            || msg.contains("credential")
        {
            return ErrorKind::AuthenticationFailure;
        }
    }
    ErrorKind::DriverError
}
