//! # porter-adapter-indicator-file
//!
//! Indicator store backed by plain text files, one file per indicator,
//! living in a single directory. Shell scripts, cron jobs and other
//! processes read and write the same files, which is the whole point:
//! the hub's gates observe state the rest of the machine maintains.
//!
//! The first line of a file is the indicator's content; everything after
//! it is ignored, so scripts may append history or comments.
//!
//! ## Dependency rule
//!
//! Depends on `porter-app` (the `IndicatorStore` port) only.

use std::fs;
use std::io;
use std::path::PathBuf;

use porter_app::ports::IndicatorStore;
use tracing::debug;

/// Indicator files under one directory, named after the indicator.
pub struct FileIndicatorStore {
    directory: PathBuf,
}

impl FileIndicatorStore {
    /// Open a store rooted at `directory`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Directory creation failures.
    pub fn new(directory: impl Into<PathBuf>) -> io::Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        debug!(directory = %directory.display(), "indicator store opened");
        Ok(Self { directory })
    }

    /// Indicator names are plain file names; anything that could escape
    /// the directory is refused.
    fn path_for(&self, name: &str) -> io::Result<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("indicator name {name:?} is not a plain file name"),
            ));
        }
        Ok(self.directory.join(name))
    }
}

impl IndicatorStore for FileIndicatorStore {
    fn read(&self, name: &str) -> io::Result<String> {
        let path = self.path_for(name)?;
        let content = fs::read_to_string(path)?;
        Ok(content.lines().next().unwrap_or_default().trim().to_string())
    }

    fn write(&self, name: &str, line: &str) -> io::Result<()> {
        let path = self.path_for(name)?;
        fs::write(path, format!("{line}\n"))
    }
}
