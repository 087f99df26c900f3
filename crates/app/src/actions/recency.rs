//! Drop firings that repeat too quickly.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use porter_domain::action::ActionOutcome;
use porter_domain::error::PorterError;
use porter_domain::event::Event;
use tracing::debug;

use super::Action;

/// Aborts the chain when the same event fired less than `within` ago.
///
/// The comparison uses the timestamps stamped by the dispatch engine, so
/// the gate needs no state of its own. The first firing of an event has
/// no predecessor and always passes.
pub struct RecencyGate {
    within: Duration,
}

impl RecencyGate {
    #[must_use]
    pub fn new(within: Duration) -> Self {
        Self { within }
    }
}

#[async_trait]
impl Action for RecencyGate {
    async fn call(&self, event: &Event) -> Result<ActionOutcome, PorterError> {
        let Some(previous) = event.previous_fired_at else {
            return Ok(ActionOutcome::Continue);
        };
        let gap = (event.fired_at - previous).to_std().unwrap_or(Duration::ZERO);
        if gap < self.within {
            debug!(
                event = %event.name,
                gap_seconds = gap.as_secs_f64(),
                "fired too recently, aborting chain",
            );
            Ok(ActionOutcome::AbortChain)
        } else {
            Ok(ActionOutcome::Continue)
        }
    }

    fn spec(&self) -> String {
        format!("skip:{}", self.within.as_secs_f64())
    }
}

impl fmt::Display for RecencyGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "skip firings within {}s of the previous one",
            self.within.as_secs_f64()
        )
    }
}
