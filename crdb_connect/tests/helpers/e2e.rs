//! Gate for tests that need a real Kerberized cluster.

use crdb_connect::test_helpers::load_dotenv;

/// E2E tests run only with `CRDB_E2E=1` (or true/yes) and a complete
/// `CRDB_*` configuration.
#[allow(dead_code)]
pub fn should_run_e2e_tests() -> bool {
    load_dotenv();

    let enabled = std::env::var("CRDB_E2E").ok().and_then(|val| {
        match val.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "y" => Some(true),
            "0" | "false" | "no" | "n" => Some(false),
            _ => None,
        }
    }) == Some(true);

    enabled && super::env::get_test_config().is_some()
}
