/// Sink for the short user-visible status messages this core emits:
/// persistence failures, palette rebuilds, automap progress.
pub trait Announcer: Send + Sync {
    fn announce(&self, message: &str);
}

/// Default sink: info-level log lines.
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn announce(&self, message: &str) {
        log::info!("{message}");
    }
}
