//! Exit codes for the CLI

use localdev_core::Error as CoreError;
use localdev_tasks::ExecError;

use crate::cli::commands::{Interrupted, RunFailed};

/// Success
pub const SUCCESS: i32 = 0;

/// General error, including failed commands and bad selections
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// A command could not be parsed or spawned
pub const SPAWN_ERROR: i32 = 3;

/// User interrupted the run
pub const CANCELLED: i32 = 130;

/// Pick the exit code for an error returned by a command
pub fn for_error(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<Interrupted>().is_some() {
        return CANCELLED;
    }
    if err.downcast_ref::<RunFailed>().is_some() {
        return ERROR;
    }
    if err.downcast_ref::<ExecError>().is_some() {
        return SPAWN_ERROR;
    }
    match err.downcast_ref::<CoreError>() {
        Some(core) if core.is_config() => CONFIG_ERROR,
        _ => ERROR,
    }
}
