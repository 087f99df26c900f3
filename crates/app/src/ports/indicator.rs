//! Indicator port — one-line status flags shared with external tooling.

use std::io;

/// Named single-line flags that gates compare against.
///
/// External tooling (a web UI, a phone integration, a cron job) writes the
/// flags; condition gates read them on every firing. Content is the first
/// line of the flag, trimmed.
pub trait IndicatorStore: Send + Sync {
    /// Current content of the named indicator.
    ///
    /// # Errors
    ///
    /// Propagates IO failures, including a missing indicator.
    fn read(&self, name: &str) -> io::Result<String>;

    /// Replace the named indicator with a single line.
    ///
    /// # Errors
    ///
    /// Propagates IO failures.
    fn write(&self, name: &str, line: &str) -> io::Result<()>;
}
