//! Process-wide container
//!
//! Subsystems that register themselves before any explicit container exists
//! can share this instance. Register during startup, resolve the root once,
//! then run its teardown at shutdown. Tests reset it with [`reset_global`].

use std::sync::Mutex;

use lazy_static::lazy_static;

use crate::container::Container;
use crate::errors::CoreError;

lazy_static! {
    static ref GLOBAL: Mutex<Container> = Mutex::new(Container::new());
}

/// Run `f` with exclusive access to the process-wide container
pub fn with_global<R>(f: impl FnOnce(&mut Container) -> R) -> Result<R, CoreError> {
    let mut container = GLOBAL.lock().map_err(|_| CoreError::LockError {
        resource: "global_container".to_string(),
    })?;
    Ok(f(&mut container))
}

/// Replace the process-wide container with an empty one
pub fn reset_global() -> Result<(), CoreError> {
    with_global(|container| *container = Container::new())
}
