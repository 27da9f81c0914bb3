//! Injected logging.
//!
//! The snapshotter never calls a global logger directly for request-level
//! events. It reports through an [`EventLog`] collaborator, which defaults to
//! [`LogFacade`] (forwarding to the [`log`](https://crates.io/crates/log)
//! crate). Hosts that bridge to a platform log, or tests that want to
//! inspect what happened, supply their own implementation.

use std::error::Error;

/// Tag used for request-level events.
pub const LOG_TAG: &str = "snapshot";

/// Receiver for request-level log events.
///
/// Implementations must be [`Send`] and [`Sync`]: requests run on worker
/// threads and may share one logger.
pub trait EventLog: Send + Sync {
    /// An informational event.
    fn info(&self, tag: &str, message: &str);

    /// A failure, with the error that caused it.
    fn error(&self, tag: &str, message: &str, cause: &dyn Error);
}

/// Forwards events to the `log` facade, using the tag as the log target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFacade;

impl EventLog for LogFacade {
    fn info(&self, tag: &str, message: &str) {
        log::info!(target: tag, "{message}");
    }

    fn error(&self, tag: &str, message: &str, cause: &dyn Error) {
        log::error!(target: tag, "{message}: {cause}");
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLog;

impl EventLog for NoOpLog {
    fn info(&self, _tag: &str, _message: &str) {}

    fn error(&self, _tag: &str, _message: &str, _cause: &dyn Error) {}
}
