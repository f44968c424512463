//! `odbc_api::Connection` disconnects in `Drop` and panics if the driver
//! reports a failure there. [`release`] turns that panic into an error so a
//! failed close reaches the caller like any other driver error.

use crate::error::{ConnectError, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Drops `handle`, reporting a panicking destructor as a driver error.
pub fn release<T>(handle: T) -> Result<()> {
    panic::catch_unwind(AssertUnwindSafe(move || drop(handle))).map_err(|payload| {
        ConnectError::driver(format!("Disconnect failed: {}", panic_text(&*payload)))
    })
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    "unknown driver failure".to_string()
}
