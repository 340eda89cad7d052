//! Process supervisor for `serve`.
//!
//! The supervisor re-runs the current command line as a worker process
//! (marked with [`WORKER_ENV`]). A worker exiting with [`RELOAD_EXIT_CODE`]
//! is started again, which picks up config, template and data changes; any
//! other exit ends supervision with the worker's code.
//!
//! Ctrl+C reaches both processes. The supervisor ignores it and lets the
//! worker decide between reload and exit.

use crate::{log, serve::RELOAD_EXIT_CODE};
use anyhow::{Context, Result};
use std::{env, ffi::OsString, process::Command};

/// Environment variable set on worker processes.
pub const WORKER_ENV: &str = "VIZBUILDER_WORKER";

/// Exit code reported when the worker was killed by a signal.
const SIGNALED_EXIT_CODE: i32 = 130;

/// Whether this process is a worker started by the supervisor.
pub fn is_worker() -> bool {
    env::var_os(WORKER_ENV).is_some()
}

/// What to do after a worker exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    Restart,
    Exit(i32),
}

fn next_step(code: Option<i32>) -> Next {
    match code {
        Some(RELOAD_EXIT_CODE) => Next::Restart,
        Some(code) => Next::Exit(code),
        None => Next::Exit(SIGNALED_EXIT_CODE),
    }
}

/// Run workers until one exits without asking for a restart.
///
/// Returns the exit code of the last worker.
pub fn supervise() -> Result<i32> {
    let exe = env::current_exe().context("Failed to locate the current executable")?;
    let args: Vec<OsString> = env::args_os().skip(1).collect();

    ctrlc::set_handler(|| {}).context("Failed to set Ctrl+C handler")?;

    loop {
        let status = Command::new(&exe)
            .args(&args)
            .env(WORKER_ENV, "1")
            .status()
            .with_context(|| format!("Failed to start worker {}", exe.display()))?;

        match next_step(status.code()) {
            Next::Restart => log!("serve"; "restarting..."),
            Next::Exit(code) => return Ok(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_step() {
        assert_eq!(next_step(Some(RELOAD_EXIT_CODE)), Next::Restart);
        assert_eq!(next_step(Some(0)), Next::Exit(0));
        assert_eq!(next_step(Some(1)), Next::Exit(1));
        assert_eq!(next_step(None), Next::Exit(SIGNALED_EXIT_CODE));
    }
}
