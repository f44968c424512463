use crate::config::ConnectionConfig;
use std::fmt;

pub const JAAS_APPLICATION_NAME: &str = "jaasApplicationName";
pub const APPLICATION_NAME: &str = "ApplicationName";

/// Where and how to reach the server. Its URL form is what the server-side
/// tooling expects byte for byte, so the query string order is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub principal: String,
    pub connect_timeout_secs: u64,
    pub socket_timeout_secs: u64,
}

impl TargetDescriptor {
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            protocol: config.protocol.clone(),
            host: config.host.clone(),
            port: config.port,
            database: config.database.clone(),
            principal: config.principal.clone(),
            connect_timeout_secs: config.connect_timeout_secs,
            socket_timeout_secs: config.socket_timeout_secs,
        }
    }

    pub fn url(&self) -> String {
        format!(
            "{}://{}:{}/{}?sslmode=require&kerberosServerName={}&gssEncMode=disable&connectTimeout={}&socketTimeout={}",
            self.protocol,
            self.host,
            self.port,
            self.database,
            self.principal,
            self.connect_timeout_secs,
            self.socket_timeout_secs
        )
    }

    /// `host:port/database`, for log lines.
    pub fn endpoint(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Secondary driver properties, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionProperties {
    entries: Vec<(String, String)>,
}

impl ConnectionProperties {
    pub fn from_config(config: &ConnectionConfig) -> Self {
        let mut props = Self::default();
        props.insert(JAAS_APPLICATION_NAME, &config.jaas_application_name);
        props.insert(APPLICATION_NAME, &config.application_name);
        props
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
