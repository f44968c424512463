//! Injectable doubles for the credential, bridge and driver seams, plus
//! `.env` loading for integration tests.

use crate::credential::CredentialChecker;
use crate::driver::{ConnectRequest, Driver, DriverConnection, ResultSet, Value};
use crate::error::{ConnectError, Result};
use crate::runtime::{BridgeRuntime, RuntimeOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

/// Loads `.env` once per test process.
pub fn load_dotenv() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = dotenvy::dotenv();
    });
}

/// Credential checker with a settable answer; never touches the filesystem.
pub struct FixedCredential {
    present: AtomicBool,
    checks: AtomicUsize,
}

impl FixedCredential {
    pub fn present() -> Self {
        Self {
            present: AtomicBool::new(true),
            checks: AtomicUsize::new(0),
        }
    }

    pub fn absent() -> Self {
        Self {
            present: AtomicBool::new(false),
            checks: AtomicUsize::new(0),
        }
    }

    /// Simulates `kinit` (true) or ticket expiry (false).
    pub fn set_present(&self, present: bool) {
        self.present.store(present, Ordering::SeqCst);
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl CredentialChecker for FixedCredential {
    fn check(&self, path: &Path) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        let present = self.present.load(Ordering::SeqCst);
        if !present {
            log::warn!("Kerberos ticket cache not found at {}", path.display());
        }
        present
    }
}

/// Bridge that counts start calls and records the options it saw.
pub struct CountingBridge {
    starts: AtomicUsize,
    failure: Option<String>,
    started_with: Mutex<Vec<RuntimeOptions>>,
}

impl CountingBridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            starts: AtomicUsize::new(0),
            failure: None,
            started_with: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            starts: AtomicUsize::new(0),
            failure: Some(reason.to_string()),
            started_with: Mutex::new(Vec::new()),
        })
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn started_with(&self) -> Vec<RuntimeOptions> {
        self.started_with
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

impl BridgeRuntime for CountingBridge {
    fn name(&self) -> &str {
        "counting"
    }

    fn start(&self, options: &RuntimeOptions) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.started_with.lock() {
            seen.push(options.clone());
        }
        match &self.failure {
            Some(reason) => Err(ConnectError::RuntimeStart(reason.clone())),
            None => Ok(()),
        }
    }
}

/// Open/close counters shared by a driver and its connections.
#[derive(Debug, Default)]
pub struct ConnectionLedger {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl ConnectionLedger {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

/// In-memory driver.
///
/// Connect mimics the real bridge: a driver artifact that is not a file
/// fails with a driver-manager load error, and when a ticket cache is
/// required but missing the server rejects the GSSAPI handshake.
/// `SELECT 1` and any registered statement return canned results.
pub struct RecordingDriver {
    ledger: Arc<ConnectionLedger>,
    responses: Arc<Mutex<HashMap<String, ResultSet>>>,
    required_ticket: Mutex<Option<PathBuf>>,
    connect_failure: Mutex<Option<ConnectError>>,
    fail_close: Arc<AtomicBool>,
    requests: Mutex<Vec<ConnectRequest>>,
}

impl RecordingDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ledger: Arc::new(ConnectionLedger::default()),
            responses: Arc::new(Mutex::new(HashMap::new())),
            required_ticket: Mutex::new(None),
            connect_failure: Mutex::new(None),
            fail_close: Arc::new(AtomicBool::new(false)),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn ledger(&self) -> &ConnectionLedger {
        &self.ledger
    }

    pub fn respond(&self, sql: &str, result: ResultSet) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(sql.to_string(), result);
        }
    }

    /// Server side of Kerberos: connect succeeds only while `path` exists.
    pub fn require_ticket(&self, path: impl Into<PathBuf>) {
        if let Ok(mut required) = self.required_ticket.lock() {
            *required = Some(path.into());
        }
    }

    pub fn fail_connect(&self, error: ConnectError) {
        if let Ok(mut failure) = self.connect_failure.lock() {
            *failure = Some(error);
        }
    }

    pub fn fail_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<ConnectRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Driver for RecordingDriver {
    fn name(&self) -> &str {
        "recording"
    }

    fn connect(&self, request: &ConnectRequest) -> Result<Box<dyn DriverConnection>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if let Some(err) = self.connect_failure.lock().ok().and_then(|f| f.clone()) {
            return Err(err);
        }

        if !request.driver_artifact.is_file() {
            return Err(ConnectError::from_diagnostic(
                "01000",
                0,
                &format!(
                    "[Driver Manager]Can't open lib '{}' : file not found",
                    request.driver_artifact.display()
                ),
            ));
        }

        let required = self.required_ticket.lock().ok().and_then(|r| r.clone());
        if let Some(ticket) = required {
            if !ticket.exists() {
                return Err(ConnectError::from_diagnostic(
                    "28000",
                    0,
                    "GSSAPI authentication failed: no Kerberos credentials available",
                ));
            }
        }

        self.ledger.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingConnection {
            ledger: self.ledger.clone(),
            responses: self.responses.clone(),
            fail_close: self.fail_close.clone(),
        }))
    }
}

struct RecordingConnection {
    ledger: Arc<ConnectionLedger>,
    responses: Arc<Mutex<HashMap<String, ResultSet>>>,
    fail_close: Arc<AtomicBool>,
}

impl DriverConnection for RecordingConnection {
    fn execute(&mut self, sql: &str, _params: &[Value]) -> Result<ResultSet> {
        if let Some(result) = self
            .responses
            .lock()
            .ok()
            .and_then(|r| r.get(sql.trim()).cloned())
        {
            return Ok(result);
        }
        if sql.trim().eq_ignore_ascii_case("SELECT 1") {
            return Ok(ResultSet::new(
                vec!["?column?".to_string()],
                vec![vec![Value::Int(1)]],
            ));
        }
        Err(ConnectError::from_diagnostic(
            "42P01",
            1,
            &format!("relation does not exist: {}", sql),
        ))
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.ledger.closed.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(ConnectError::from_diagnostic(
                "08003",
                0,
                "connection does not exist",
            ));
        }
        Ok(())
    }
}
