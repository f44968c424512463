//! Process-wide bridge runtime.
//!
//! The runtime hosting the driver can only be started once per process and
//! cannot be shut down or restarted. [`RuntimeInitializer`] guards the
//! uninitialized -> started transition: the first caller's options are used
//! for the rest of the process, later callers get a no-op, and a failed
//! start is remembered and reported to every later caller.

use crate::config::ConnectionConfig;
use crate::error::{ConnectError, Result};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Options the bridge is started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeOptions {
    pub driver_artifact: PathBuf,
    pub trust_config: PathBuf,
    pub login_config: PathBuf,
    /// `false` lets the driver use native ticket-cache credentials instead
    /// of only those attached to the current login subject.
    pub use_subject_creds_only: bool,
    pub timezone: String,
}

impl RuntimeOptions {
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            driver_artifact: config.driver_artifact.clone(),
            trust_config: config.trust_config.clone(),
            login_config: config.login_config.clone(),
            use_subject_creds_only: false,
            timezone: config.timezone.clone(),
        }
    }

    /// Startup properties in the order the bridge receives them.
    pub fn properties(&self) -> Vec<(&'static str, String)> {
        vec![
            ("java.class.path", self.driver_artifact.display().to_string()),
            (
                "java.security.krb5.conf",
                self.trust_config.display().to_string(),
            ),
            (
                "java.security.auth.login.config",
                self.login_config.display().to_string(),
            ),
            (
                "javax.security.auth.useSubjectCredsOnly",
                self.use_subject_creds_only.to_string(),
            ),
            ("user.timezone", self.timezone.clone()),
        ]
    }

    /// Properties as `-Dkey=value` startup arguments.
    pub fn startup_args(&self) -> Vec<String> {
        self.properties()
            .into_iter()
            .map(|(k, v)| format!("-D{}={}", k, v))
            .collect()
    }
}

/// The embedded environment hosting the driver.
pub trait BridgeRuntime: Send + Sync {
    fn name(&self) -> &str;

    /// Starts the environment. Called at most once per initializer.
    fn start(&self, options: &RuntimeOptions) -> Result<()>;
}

#[derive(Debug)]
enum RuntimeState {
    Uninitialized,
    Started(RuntimeOptions),
    Failed(String),
}

pub struct RuntimeInitializer {
    bridge: Arc<dyn BridgeRuntime>,
    state: Mutex<RuntimeState>,
}

impl RuntimeInitializer {
    pub fn new(bridge: Arc<dyn BridgeRuntime>) -> Self {
        Self {
            bridge,
            state: Mutex::new(RuntimeState::Uninitialized),
        }
    }

    /// Starts the bridge on first call; later calls return immediately.
    ///
    /// A later call with different options does not restart anything: the
    /// options of the first successful start stay in effect and the mismatch
    /// is logged. If the first start failed, every later call fails with the
    /// same `RuntimeStart` error without trying again.
    pub fn ensure_started(&self, config: &ConnectionConfig) -> Result<()> {
        let requested = RuntimeOptions::from_config(config);

        // The lock is held across start() so concurrent first callers wait
        // for the one start instead of racing it.
        let mut state = self
            .state
            .lock()
            .map_err(|_| ConnectError::Internal("Runtime state lock poisoned".to_string()))?;

        match &*state {
            RuntimeState::Started(active) => {
                if *active != requested {
                    log::warn!(
                        "{} runtime already started; ignoring different options ({}), first configuration stays in effect",
                        self.bridge.name(),
                        requested.startup_args().join(" ")
                    );
                }
                return Ok(());
            }
            RuntimeState::Failed(reason) => return Err(ConnectError::RuntimeStart(reason.clone())),
            RuntimeState::Uninitialized => {}
        }

        log::info!(
            "Starting {} runtime with Kerberos configuration",
            self.bridge.name()
        );
        log::debug!("Runtime options: {}", requested.startup_args().join(" "));
        match self.bridge.start(&requested) {
            Ok(()) => {
                *state = RuntimeState::Started(requested);
                Ok(())
            }
            Err(e) => {
                let reason = match e {
                    ConnectError::RuntimeStart(reason) => reason,
                    other => other.to_string(),
                };
                log::error!("{} runtime failed to start: {}", self.bridge.name(), reason);
                *state = RuntimeState::Failed(reason.clone());
                Err(ConnectError::RuntimeStart(reason))
            }
        }
    }

    pub fn is_started(&self) -> bool {
        match self.state.lock() {
            Ok(state) => matches!(*state, RuntimeState::Started(_)),
            Err(_) => false,
        }
    }

    /// Options of the running bridge, if it started.
    pub fn active_options(&self) -> Option<RuntimeOptions> {
        match self.state.lock() {
            Ok(state) => match &*state {
                RuntimeState::Started(options) => Some(options.clone()),
                _ => None,
            },
            Err(_) => None,
        }
    }

    pub fn bridge_name(&self) -> &str {
        self.bridge.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    struct CountingBridge {
        starts: AtomicUsize,
        fail: bool,
    }

    impl CountingBridge {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                starts: AtomicUsize::new(0),
                fail,
            })
        }
    }

    impl BridgeRuntime for CountingBridge {
        fn name(&self) -> &str {
            "counting"
        }

        fn start(&self, _options: &RuntimeOptions) -> Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ConnectError::RuntimeStart("krb5.conf not found".to_string()));
            }
            Ok(())
        }
    }

    fn config(artifact: &str) -> ConnectionConfig {
        ConnectionConfig::new("h", 1, "d")
            .with_driver_artifact(artifact)
            .with_security_configs("/etc/krb5.conf", "/etc/jaas.conf")
    }

    #[test]
    fn test_properties_order_and_values() {
        let options = RuntimeOptions::from_config(&config("/drivers/pg.jar"));
        let keys: Vec<&str> = options.properties().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec![
                "java.class.path",
                "java.security.krb5.conf",
                "java.security.auth.login.config",
                "javax.security.auth.useSubjectCredsOnly",
                "user.timezone",
            ]
        );
        let args = options.startup_args();
        assert_eq!(args[0], "-Djava.class.path=/drivers/pg.jar");
        assert_eq!(args[3], "-Djavax.security.auth.useSubjectCredsOnly=false");
        assert_eq!(args[4], "-Duser.timezone=UTC");
    }

    #[test]
    fn test_sequential_calls_start_once() {
        let bridge = CountingBridge::new(false);
        let init = RuntimeInitializer::new(bridge.clone());
        assert!(!init.is_started());
        for _ in 0..5 {
            init.ensure_started(&config("/a.jar")).unwrap();
        }
        assert!(init.is_started());
        assert_eq!(bridge.starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_calls_start_once() {
        let bridge = CountingBridge::new(false);
        let init = Arc::new(RuntimeInitializer::new(bridge.clone()));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let init = init.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    init.ensure_started(&config("/a.jar"))
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(bridge.starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_first_config_wins() {
        let bridge = CountingBridge::new(false);
        let init = RuntimeInitializer::new(bridge.clone());
        init.ensure_started(&config("/first.jar")).unwrap();
        init.ensure_started(&config("/second.jar")).unwrap();

        let active = init.active_options().unwrap();
        assert_eq!(active.driver_artifact, PathBuf::from("/first.jar"));
        assert_eq!(bridge.starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_start_is_sticky() {
        let bridge = CountingBridge::new(true);
        let init = RuntimeInitializer::new(bridge.clone());

        let first = init.ensure_started(&config("/a.jar")).unwrap_err();
        let second = init.ensure_started(&config("/a.jar")).unwrap_err();

        assert!(matches!(first, ConnectError::RuntimeStart(ref r) if r == "krb5.conf not found"));
        assert!(matches!(second, ConnectError::RuntimeStart(ref r) if r == "krb5.conf not found"));
        assert_eq!(bridge.starts.load(Ordering::SeqCst), 1);
        assert!(!init.is_started());
        assert!(init.active_options().is_none());
    }

    #[test]
    fn test_non_runtime_error_from_bridge_is_wrapped() {
        struct BrokenBridge;
        impl BridgeRuntime for BrokenBridge {
            fn name(&self) -> &str {
                "broken"
            }
            fn start(&self, _options: &RuntimeOptions) -> Result<()> {
                Err(ConnectError::driver("environment conflict"))
            }
        }

        let init = RuntimeInitializer::new(Arc::new(BrokenBridge));
        let err = init.ensure_started(&config("/a.jar")).unwrap_err();
        assert!(matches!(err, ConnectError::RuntimeStart(_)));
        assert!(err.to_string().contains("environment conflict"));
        assert_eq!(init.bridge_name(), "broken");
    }
}
