use crate::error::{ConnectError, Result};
use crate::runtime::{BridgeRuntime, RuntimeOptions};
use odbc_api::Environment;
use std::sync::OnceLock;

// Connections borrow the environment, so it lives for the whole process.
static ODBC_ENV: OnceLock<Environment> = OnceLock::new();

/// Starts the ODBC side of the bridge: exports the Kerberos and timezone
/// settings to the process environment (libpq and the GSSAPI library read
/// them from there) and allocates the single ODBC environment.
pub struct OdbcBridge;

impl BridgeRuntime for OdbcBridge {
    fn name(&self) -> &str {
        "ODBC"
    }

    fn start(&self, options: &RuntimeOptions) -> Result<()> {
        for (label, path) in [
            ("Trust config", &options.trust_config),
            ("Login config", &options.login_config),
        ] {
            if !path.is_file() {
                return Err(ConnectError::RuntimeStart(format!(
                    "{} not found: {}",
                    label,
                    path.display()
                )));
            }
        }

        if ODBC_ENV.get().is_some() {
            return Err(ConnectError::RuntimeStart(
                "ODBC environment already allocated in this process".to_string(),
            ));
        }

        std::env::set_var("KRB5_CONFIG", &options.trust_config);
        std::env::set_var("TZ", &options.timezone);
        std::env::set_var("PGTZ", &options.timezone);

        let env = Environment::new().map_err(|e| {
            ConnectError::RuntimeStart(format!("Failed to allocate ODBC environment: {}", e))
        })?;
        ODBC_ENV.set(env).map_err(|_| {
            ConnectError::RuntimeStart(
                "ODBC environment already allocated in this process".to_string(),
            )
        })?;

        log::info!(
            "ODBC environment ready (KRB5_CONFIG={}, TZ={})",
            options.trust_config.display(),
            options.timezone
        );
        Ok(())
    }
}

/// The process ODBC environment, once the bridge has started.
pub fn environment() -> Result<&'static Environment> {
    ODBC_ENV
        .get()
        .ok_or_else(|| ConnectError::RuntimeStart("ODBC runtime not started".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_start_rejects_missing_trust_config() {
        let options = RuntimeOptions {
            driver_artifact: PathBuf::from("/nonexistent/psqlodbcw.so"),
            trust_config: PathBuf::from("/nonexistent/krb5.conf"),
            login_config: PathBuf::from("/nonexistent/jaas.conf"),
            use_subject_creds_only: false,
            timezone: "UTC".to_string(),
        };
        let err = OdbcBridge.start(&options).unwrap_err();
        assert!(matches!(err, ConnectError::RuntimeStart(ref m) if m.contains("Trust config")));
    }
}
