use std::path::Path;
use std::time::{Duration, SystemTime};

/// Observes the external Kerberos ticket cache. Implementations only report;
/// they never create, refresh, or delete the artifact.
pub trait CredentialChecker: Send + Sync {
    /// `true` if a usable ticket cache is present at `path` right now.
    fn check(&self, path: &Path) -> bool;
}

/// Filesystem-backed checker. With `max_age` set, a cache file whose mtime
/// is older than that is reported as absent (the ticket has most likely
/// expired).
#[derive(Debug, Clone, Default)]
pub struct FileCredentialChecker {
    max_age: Option<Duration>,
}

impl FileCredentialChecker {
    pub fn new() -> Self {
        Self { max_age: None }
    }

    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            max_age: Some(max_age),
        }
    }
}

impl CredentialChecker for FileCredentialChecker {
    fn check(&self, path: &Path) -> bool {
        if !check_credential(path) {
            return false;
        }

        let Some(max_age) = self.max_age else {
            return true;
        };
        let age = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|mtime| SystemTime::now().duration_since(mtime).ok());
        match age {
            Some(age) if age > max_age => {
                log::warn!(
                    "Kerberos ticket cache at {} is {}s old (limit {}s); the ticket has likely expired",
                    path.display(),
                    age.as_secs(),
                    max_age.as_secs()
                );
                log::warn!("Run 'kinit' to authenticate");
                false
            }
            _ => true,
        }
    }
}

/// Quick existence check for the ticket cache. Advisory: the artifact may
/// appear or vanish between this check and the connect.
pub fn check_credential(path: &Path) -> bool {
    if path.exists() {
        return true;
    }
    log::warn!("Kerberos ticket cache not found at {}", path.display());
    log::warn!("Run 'kinit' to authenticate");
    false
}
