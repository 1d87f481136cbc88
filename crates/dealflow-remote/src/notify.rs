//! User-facing notification seam
//!
//! Routine saves stay silent. The engine only notifies on persist failure
//! and on explicitly-awaited successes (attachment uploads).

/// Sink for user-visible notices (toasts, banners)
pub trait NotificationSink: Send + Sync {
    /// Surface a failure to the user
    fn notify_error(&self, message: &str);

    /// Surface an explicit success to the user
    fn notify_success(&self, message: &str);
}

/// Sink that routes notices to the tracing log
///
/// Useful as a default in headless contexts and demos.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify_error(&self, message: &str) {
        tracing::warn!("notification (error): {message}");
    }

    fn notify_success(&self, message: &str) {
        tracing::info!("notification (success): {message}");
    }
}
