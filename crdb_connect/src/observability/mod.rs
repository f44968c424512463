pub mod logging;

pub use logging::{init_logging, render_failure, ConnectionLogger};
