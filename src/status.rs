/// Receives human-readable progress messages from the session controller
///
/// Implemented for any `Fn(&str)` closure, so a UI can pass a callback
/// directly.
pub trait StatusSink: Send + Sync {
    fn status(&self, message: &str);
}

impl<F> StatusSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn status(&self, message: &str) {
        self(message)
    }
}

/// Sink that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn status(&self, message: &str) {
        tracing::info!("{}", message);
    }
}
