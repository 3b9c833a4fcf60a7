#![deny(missing_docs)]
//! Shared logging utilities for the enhancement client workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! a thread-local "current job" marker that log lines can carry, and a minimal
//! test initializer for the global logger.

use std::cell::Cell;

thread_local! {
    /// Job id most recently started on this thread; 0 when none.
    static CURRENT_JOB: Cell<u64> = const { Cell::new(0) };
}

/// Records the job id that subsequent log lines on this thread belong to.
/// The message loop calls this whenever a new enhancement attempt starts.
pub fn set_current_job(job_id: u64) {
    CURRENT_JOB.with(|v| v.set(job_id));
}

/// Returns the job id recorded for the current thread, or 0 if none was set.
pub fn current_job() -> u64 {
    CURRENT_JOB.with(|v| v.get())
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Logs an info-level message prefixed with the current thread's job id.
#[macro_export]
macro_rules! job_info {
    ($($arg:tt)*) => {{
        log::info!("[job {}] {}", $crate::current_job(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::{current_job, set_current_job};

    #[test]
    fn job_context_is_per_thread() {
        set_current_job(7);
        assert_eq!(current_job(), 7);
        let other = std::thread::spawn(current_job).join().unwrap();
        assert_eq!(other, 0);
    }
}
