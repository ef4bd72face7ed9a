//! Diagnostic logging hook for schema compilation and validation.
//!
//! Mirrors the other collaborator seams in this crate ([`crate::retriever::DefaultRetriever`],
//! `Format`, `KeywordFactory`): a trait object stored on [`crate::ValidationOptions`], defaulting
//! to a no-op implementation, so callers can observe what the compiler and orchestrator are doing
//! without this crate committing to a particular logging framework.
use std::fmt;

/// Receives diagnostic messages emitted while compiling and validating schemas.
///
/// Implement this to forward messages to `log`, `tracing`, or any other sink. The default
/// [`NoopLogger`] discards everything.
pub trait Logger: Send + Sync {
    /// A routine diagnostic message, e.g. "resolved $ref to ...".
    fn log(&self, message: &str) {
        let _ = message;
    }
    /// A message about a recoverable but noteworthy condition, e.g. a schema that declares an
    /// unknown format which is being ignored.
    fn warn(&self, message: &str) {
        let _ = message;
    }
    /// A message about a failure, e.g. a failed attempt to retrieve an external schema.
    fn error(&self, message: &str) {
        let _ = message;
    }
}

/// A [`Logger`] that discards every message. Used as the default when no logger is configured.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct NoopLogger;

impl Logger for NoopLogger {}

impl fmt::Debug for dyn Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<logger>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingLogger {
        messages: Mutex<Vec<String>>,
    }

    impl Logger for RecordingLogger {
        fn log(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn noop_logger_accepts_everything() {
        let logger = NoopLogger;
        logger.log("hello");
        logger.warn("hello");
        logger.error("hello");
    }

    #[test]
    fn custom_logger_records_messages() {
        let logger = Arc::new(RecordingLogger::default());
        logger.log("compiling schema");
        assert_eq!(logger.messages.lock().unwrap().as_slice(), ["compiling schema"]);
    }
}
