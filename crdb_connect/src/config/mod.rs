//! Connection configuration.
//!
//! A [`ConnectionConfig`] is built once at startup (in code, from the
//! environment, or from a JSON file) and then only ever shared by reference.

use crate::error::{ConnectError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 26257;
pub const DEFAULT_DATABASE: &str = "defaultdb";
pub const DEFAULT_PRINCIPAL: &str = "cockroachdb";
pub const DEFAULT_PROTOCOL: &str = "jdbc:postgresql";
pub const DEFAULT_DRIVER_CLASS: &str = "org.postgresql.Driver";
/// Must match the stanza name in the login (JAAS) config.
pub const DEFAULT_JAAS_APPLICATION_NAME: &str = "pgjdbc";
pub const DEFAULT_APPLICATION_NAME: &str = "crdb-connect";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_SOCKET_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_TIMEZONE: &str = "UTC";
/// Names a JSON config file that replaces the `CRDB_*` variables.
pub const CONFIG_FILE_VAR: &str = "CRDB_CONFIG_FILE";

/// What to do when the ticket cache is absent before connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialPolicy {
    /// Warn and attempt the connect anyway.
    #[default]
    Advisory,
    /// Fail with `MissingCredential` before any network I/O.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    /// Kerberos service name the server authenticates as.
    pub principal: String,
    pub protocol: String,
    pub driver_class: String,
    pub driver_artifact: PathBuf,
    /// krb5.conf
    pub trust_config: PathBuf,
    /// JAAS login configuration file
    pub login_config: PathBuf,
    pub jaas_application_name: String,
    pub application_name: String,
    pub credential_cache: Option<PathBuf>,
    pub credential_policy: CredentialPolicy,
    pub credential_max_age_secs: Option<u64>,
    pub connect_timeout_secs: u64,
    pub socket_timeout_secs: u64,
    pub timezone: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            principal: DEFAULT_PRINCIPAL.to_string(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            driver_class: DEFAULT_DRIVER_CLASS.to_string(),
            driver_artifact: PathBuf::new(),
            trust_config: PathBuf::new(),
            login_config: PathBuf::new(),
            jaas_application_name: DEFAULT_JAAS_APPLICATION_NAME.to_string(),
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            credential_cache: None,
            credential_policy: CredentialPolicy::default(),
            credential_max_age_secs: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            socket_timeout_secs: DEFAULT_SOCKET_TIMEOUT_SECS,
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = principal.into();
        self
    }

    pub fn with_driver_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.driver_artifact = path.into();
        self
    }

    pub fn with_security_configs(
        mut self,
        trust_config: impl Into<PathBuf>,
        login_config: impl Into<PathBuf>,
    ) -> Self {
        self.trust_config = trust_config.into();
        self.login_config = login_config.into();
        self
    }

    pub fn with_application_names(
        mut self,
        jaas_application_name: impl Into<String>,
        application_name: impl Into<String>,
    ) -> Self {
        self.jaas_application_name = jaas_application_name.into();
        self.application_name = application_name.into();
        self
    }

    pub fn with_credential_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.credential_cache = Some(path.into());
        self
    }

    pub fn with_credential_policy(mut self, policy: CredentialPolicy) -> Self {
        self.credential_policy = policy;
        self
    }

    pub fn with_timeouts(mut self, connect_secs: u64, socket_secs: u64) -> Self {
        self.connect_timeout_secs = connect_secs;
        self.socket_timeout_secs = socket_secs;
        self
    }

    /// Loads `.env` (if any), then reads the JSON file named by
    /// `CRDB_CONFIG_FILE` or, when that is unset, the `CRDB_*` variables.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::load_with(|key| std::env::var(key).ok())
    }

    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(CONFIG_FILE_VAR).filter(|v| !v.trim().is_empty()) {
            Some(path) => Self::from_json_file(Path::new(path.trim())),
            None => Self::from_lookup(lookup),
        }
    }

    /// Loads `.env` (if any) and reads the `CRDB_*` variables.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| ConnectError::InvalidConfig(format!("{} is not set", key)))
        };

        let mut config = Self {
            host: require("CRDB_HOST")?,
            driver_artifact: PathBuf::from(require("CRDB_DRIVER_PATH")?),
            trust_config: PathBuf::from(require("CRDB_KRB5_CONF")?),
            login_config: PathBuf::from(require("CRDB_JAAS_CONF")?),
            ..Self::default()
        };

        if let Some(port) = get("CRDB_PORT") {
            config.port = parse_number("CRDB_PORT", &port)?;
        }
        if let Some(database) = get("CRDB_DATABASE") {
            config.database = database;
        }
        if let Some(principal) = get("CRDB_PRINCIPAL") {
            config.principal = principal;
        }
        if let Some(name) = get("CRDB_JAAS_APP_NAME") {
            config.jaas_application_name = name;
        }
        if let Some(name) = get("CRDB_APPLICATION_NAME") {
            config.application_name = name;
        }
        config.credential_cache = get("CRDB_CREDENTIAL_CACHE").map(PathBuf::from);
        if let Some(secs) = get("CRDB_CONNECT_TIMEOUT") {
            config.connect_timeout_secs = parse_number("CRDB_CONNECT_TIMEOUT", &secs)?;
        }
        if let Some(secs) = get("CRDB_SOCKET_TIMEOUT") {
            config.socket_timeout_secs = parse_number("CRDB_SOCKET_TIMEOUT", &secs)?;
        }
        if let Some(flag) = get("CRDB_REQUIRE_TICKET") {
            config.credential_policy = match parse_bool_flag(&flag) {
                Some(true) => CredentialPolicy::Strict,
                Some(false) => CredentialPolicy::Advisory,
                None => {
                    return Err(ConnectError::InvalidConfig(format!(
                        "CRDB_REQUIRE_TICKET: not a boolean: {}",
                        flag
                    )))
                }
            };
        }
        if let Some(secs) = get("CRDB_TICKET_MAX_AGE") {
            config.credential_max_age_secs = Some(parse_number("CRDB_TICKET_MAX_AGE", &secs)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ConnectError::InvalidConfig(format!("Malformed config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConnectError::InvalidConfig(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Checks the shape of the config. Paths are not checked for existence
    /// here; the runtime and driver report bad paths themselves.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ConnectError::InvalidConfig("host is empty".to_string()));
        }
        if self.port == 0 {
            return Err(ConnectError::InvalidConfig("port must be non-zero".to_string()));
        }
        if self.database.trim().is_empty() {
            return Err(ConnectError::InvalidConfig("database is empty".to_string()));
        }
        if self.connect_timeout_secs == 0 || self.socket_timeout_secs == 0 {
            return Err(ConnectError::InvalidConfig(
                "timeouts must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    /// Ticket cache path to precheck: explicit config, then `KRB5CCNAME`,
    /// then `/tmp/krb5cc_<euid>` (`%USERPROFILE%` on Windows).
    pub fn resolve_credential_cache(&self) -> Option<PathBuf> {
        if let Some(path) = &self.credential_cache {
            return Some(path.clone());
        }
        default_credential_cache(|key| std::env::var(key).ok())
    }
}

pub(crate) fn default_credential_cache<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(ccname) = lookup("KRB5CCNAME").filter(|v| !v.is_empty()) {
        // Only file caches can be prechecked; KEYRING:/KCM:/API: yield None.
        if let Some(path) = ccname.strip_prefix("FILE:") {
            return Some(PathBuf::from(path));
        }
        if !ccname.contains(':') || Path::new(&ccname).is_absolute() {
            return Some(PathBuf::from(ccname));
        }
        return None;
    }

    per_user_credential_cache(lookup)
}

/// MIT Kerberos default: `/tmp/krb5cc_<euid>`.
#[cfg(unix)]
fn per_user_credential_cache<F>(_lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let uid = unsafe { libc::geteuid() };
    Some(PathBuf::from(format!("/tmp/krb5cc_{}", uid)))
}

#[cfg(not(unix))]
fn per_user_credential_cache<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let home = lookup("USERPROFILE").filter(|v| !v.is_empty())?;
    let user = lookup("USERNAME").filter(|v| !v.is_empty())?;
    Some(PathBuf::from(home).join(format!("krb5cc_{}", user)))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConnectError::InvalidConfig(format!("{}: not a number: {}", key, value)))
}

fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
