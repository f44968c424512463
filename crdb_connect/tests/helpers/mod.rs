pub mod e2e;
pub mod env;

#[allow(unused_imports)]
pub use e2e::should_run_e2e_tests;
#[allow(unused_imports)]
pub use env::{get_test_config, TestWorkspace};
