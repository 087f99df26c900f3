//! Gate a chain on daylight.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Local;
use porter_domain::action::ActionOutcome;
use porter_domain::error::PorterError;
use porter_domain::event::Event;
use thiserror::Error;
use tracing::debug;

use crate::solar::SolarCalendar;

use super::Action;

/// Where the current moment falls relative to the sun.
pub trait DayNightSource: Send + Sync {
    fn currently_day(&self) -> bool;
}

impl DayNightSource for SolarCalendar {
    fn currently_day(&self) -> bool {
        self.is_day(&Local::now())
    }
}

/// Phase of the day a [`SolarGate`] requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Day,
    Night,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown phase {0:?}, expected \"day\" or \"night\"")]
pub struct UnknownPhase(String);

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "night" => Ok(Self::Night),
            _ => Err(UnknownPhase(raw.to_string())),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => f.write_str("day"),
            Self::Night => f.write_str("night"),
        }
    }
}

/// Skips the next `skip` actions unless the sky is in the wanted phase.
///
/// With `once` the gate only passes when the phase flipped since it last
/// looked, so a chain fires at dawn or dusk rather than on every event
/// of a long afternoon.
pub struct SolarGate {
    sky: Arc<dyn DayNightSource>,
    phase: Phase,
    skip: usize,
    once: bool,
    last_state: Mutex<Option<bool>>,
}

impl SolarGate {
    pub fn new(sky: Arc<dyn DayNightSource>, phase: Phase, skip: usize, once: bool) -> Self {
        Self {
            sky,
            phase,
            skip,
            once,
            last_state: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Action for SolarGate {
    async fn call(&self, event: &Event) -> Result<ActionOutcome, PorterError> {
        let is_day = self.sky.currently_day();
        let matched = (self.phase == Phase::Day) == is_day;
        let changed = {
            let mut last_state = self
                .last_state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let changed = *last_state != Some(is_day);
            *last_state = Some(is_day);
            changed
        };

        if matched && (!self.once || changed) {
            Ok(ActionOutcome::Continue)
        } else {
            debug!(
                event = %event.name,
                wanted = %self.phase,
                is_day,
                changed,
                skipped = self.skip,
                "solar gate skipping",
            );
            Ok(ActionOutcome::SkipNext(self.skip))
        }
    }

    fn spec(&self) -> String {
        format!(
            "suntime:{},{}{}",
            self.phase,
            if self.once { "#" } else { "" },
            self.skip,
        )
    }
}

impl fmt::Display for SolarGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "skip {} action(s) unless it is {}",
            self.skip, self.phase
        )
    }
}
