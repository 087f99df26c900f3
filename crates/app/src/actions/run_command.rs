//! Run a shell command when an event fires.

use std::fmt;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use porter_domain::action::ActionOutcome;
use porter_domain::error::PorterError;
use porter_domain::event::Event;
use tokio::process::Command;
use tracing::{debug, info};

use super::Action;

/// Executes a command line through the shell.
///
/// Output streams are discarded; the exit status is only logged. With
/// `restricted` set, a firing that arrives while the previous command
/// still runs is dropped instead of starting a second copy.
pub struct RunCommand {
    command: String,
    restricted: bool,
    running: AtomicBool,
}

impl RunCommand {
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            restricted: false,
            running: AtomicBool::new(false),
        }
    }

    /// Refuse overlapping runs of this command.
    #[must_use]
    pub fn restricted(mut self) -> Self {
        self.restricted = true;
        self
    }
}

#[async_trait]
impl Action for RunCommand {
    async fn call(&self, event: &Event) -> Result<ActionOutcome, PorterError> {
        if self.restricted && self.running.swap(true, Ordering::SeqCst) {
            debug!(event = %event.name, command = %self.command, "command still running, run skipped");
            return Ok(ActionOutcome::Continue);
        }
        debug!(event = %event.name, command = %self.command, "executing shell command");
        let result = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        if self.restricted {
            self.running.store(false, Ordering::SeqCst);
        }
        let status = result?;
        if status.success() {
            debug!(event = %event.name, "command returned successfully");
        } else {
            info!(event = %event.name, code = status.code(), "command returned a nonzero status");
        }
        Ok(ActionOutcome::Continue)
    }

    fn spec(&self) -> String {
        format!("os_execute:{}", self.command)
    }
}

impl fmt::Display for RunCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run shell command {:?}", self.command)
    }
}
