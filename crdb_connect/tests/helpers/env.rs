//! Helpers for building test configurations.

use crdb_connect::test_helpers::load_dotenv;
use crdb_connect::ConnectionConfig;
use std::fs::File;
use std::path::PathBuf;
use tempfile::TempDir;

/// Config for a real cluster, read from `CRDB_*` variables (after `.env`).
/// Returns None when the required variables are missing.
#[allow(dead_code)]
pub fn get_test_config() -> Option<ConnectionConfig> {
    load_dotenv();
    ConnectionConfig::from_env().ok()
}

/// Temp directory holding a driver artifact, krb5.conf, jaas.conf and a
/// ticket cache path (not created until `kinit`).
#[allow(dead_code)]
pub struct TestWorkspace {
    dir: TempDir,
    pub driver_artifact: PathBuf,
    pub trust_config: PathBuf,
    pub login_config: PathBuf,
    pub ticket_cache: PathBuf,
}

#[allow(dead_code)]
impl TestWorkspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let driver_artifact = dir.path().join("psqlodbcw.so");
        let trust_config = dir.path().join("krb5.conf");
        let login_config = dir.path().join("jaas.conf");
        for path in [&driver_artifact, &trust_config, &login_config] {
            File::create(path).expect("create fixture file");
        }
        let ticket_cache = dir.path().join("krb5cc_test");
        Self {
            dir,
            driver_artifact,
            trust_config,
            login_config,
            ticket_cache,
        }
    }

    /// Creates the ticket cache, as `kinit` would.
    pub fn kinit(&self) {
        File::create(&self.ticket_cache).expect("create ticket cache");
    }

    /// Removes the ticket cache, as `kdestroy` or expiry would.
    pub fn kdestroy(&self) {
        let _ = std::fs::remove_file(&self.ticket_cache);
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn config(&self, host: &str, port: u16, database: &str) -> ConnectionConfig {
        ConnectionConfig::new(host, port, database)
            .with_driver_artifact(&self.driver_artifact)
            .with_security_configs(&self.trust_config, &self.login_config)
            .with_credential_cache(&self.ticket_cache)
    }
}
