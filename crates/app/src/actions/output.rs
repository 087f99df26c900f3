//! Drive output pins: constant levels and interruptible hold loops.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use porter_domain::action::ActionOutcome;
use porter_domain::error::PorterError;
use porter_domain::event::Event;
use tracing::{debug, warn};

use crate::engine::EventEngine;
use crate::ports::PinDriver;
use crate::signal::{Signal, Subscription};
use crate::tasks::TaskGroup;

use super::{Action, CallbackAction};

/// Sets one output pin to a fixed level.
pub struct ConstantOutput {
    driver: Arc<dyn PinDriver>,
    pin: String,
    level: bool,
}

impl ConstantOutput {
    pub fn new(driver: Arc<dyn PinDriver>, pin: impl Into<String>, level: bool) -> Self {
        Self {
            driver,
            pin: pin.into(),
            level,
        }
    }
}

#[async_trait]
impl Action for ConstantOutput {
    async fn call(&self, _event: &Event) -> Result<ActionOutcome, PorterError> {
        self.driver.set_output(&self.pin, self.level)?;
        Ok(ActionOutcome::Continue)
    }

    fn spec(&self) -> String {
        format!("out:{},{}", self.pin, self.level)
    }
}

impl fmt::Display for ConstantOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "set pin {} to {}", self.pin, self.level)
    }
}

/// Timing and levels of one hold loop.
#[derive(Debug, Clone, Copy)]
pub struct HoldPattern {
    pub on_level: bool,
    pub off_level: bool,
    /// How long the pin stays at `on_level` per cycle.
    pub hold: Duration,
    /// Rest between cycles.
    pub pause: Duration,
    /// Number of cycles; negative loops until interrupted.
    pub loops: i64,
}

/// Holds a pin at a level, optionally looping, until done or interrupted.
///
/// Each trigger spawns the loop on the engine's task group, so the firing
/// chain moves on immediately while shutdown drains still cover the loop.
/// A trigger while the loop is running is rejected; the interrupt event,
/// `OnKeyDown_<pin>` of the configured interrupt pin, stops the running
/// loop at its next suspension point. Raising the interrupt while no loop
/// runs does nothing.
pub struct TriggeredOutput {
    tasks: TaskGroup,
    driver: Arc<dyn PinDriver>,
    pin: String,
    pattern: HoldPattern,
    interrupt: Signal,
    interrupt_pin: Option<String>,
    running: Arc<AtomicBool>,
}

impl TriggeredOutput {
    /// Wire a new hold loop against `engine`. With an interrupt pin, the
    /// stop callback is registered under `source` at the front of the
    /// pin's key-down chain.
    pub fn new(
        engine: &EventEngine,
        driver: Arc<dyn PinDriver>,
        source: &str,
        pin: impl Into<String>,
        pattern: HoldPattern,
        interrupt_pin: Option<String>,
    ) -> Self {
        let pin = pin.into();
        let interrupt = Signal::new();
        let running = Arc::new(AtomicBool::new(false));
        if let Some(int_pin) = &interrupt_pin {
            let raiser = {
                let interrupt = interrupt.clone();
                let running = Arc::clone(&running);
                let pin = pin.clone();
                CallbackAction::new(format!("interrupt:{pin}"), move |event: &Event| {
                    if running.load(Ordering::SeqCst) {
                        debug!(event = %event.name, pin = %pin, "interrupting output loop");
                    } else {
                        debug!(event = %event.name, pin = %pin, "no output loop running, interrupt ignored");
                    }
                    interrupt.raise();
                })
            };
            engine.register_action_at_front(&format!("OnKeyDown_{int_pin}"), source, Arc::new(raiser));
        }
        Self {
            tasks: engine.tasks(),
            driver,
            pin,
            pattern,
            interrupt,
            interrupt_pin,
            running,
        }
    }
}

#[async_trait]
impl Action for TriggeredOutput {
    async fn call(&self, event: &Event) -> Result<ActionOutcome, PorterError> {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!(event = %event.name, pin = %self.pin, "output loop already running, trigger ignored");
            return Ok(ActionOutcome::Continue);
        }
        let subscription = self.interrupt.subscribe();
        let driver = Arc::clone(&self.driver);
        let pin = self.pin.clone();
        let pattern = self.pattern;
        let running = Arc::clone(&self.running);
        self.tasks.spawn(async move {
            run_hold_loop(driver.as_ref(), &pin, pattern, subscription).await;
            running.store(false, Ordering::SeqCst);
        });
        Ok(ActionOutcome::Continue)
    }

    fn spec(&self) -> String {
        let mut spec = format!(
            "out:{},{},{},{},{},{}",
            self.pin,
            self.pattern.on_level,
            self.pattern.off_level,
            self.pattern.hold.as_millis(),
            self.pattern.pause.as_millis(),
            self.pattern.loops,
        );
        if let Some(int_pin) = &self.interrupt_pin {
            spec.push(',');
            spec.push_str(int_pin);
        }
        spec
    }
}

impl fmt::Display for TriggeredOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pattern.loops < 0 {
            write!(f, "pulse pin {} until interrupted", self.pin)
        } else {
            write!(f, "pulse pin {} for {} cycle(s)", self.pin, self.pattern.loops)
        }
    }
}

/// One hold loop: on, hold, off, pause, repeat. The off write always
/// lands, interrupt or not. An exhausted loop stops without the trailing
/// pause. A pin write failure ends the loop.
async fn run_hold_loop(
    driver: &dyn PinDriver,
    pin: &str,
    pattern: HoldPattern,
    mut interrupt: Subscription,
) {
    let mut remaining = pattern.loops;
    if remaining == 0 {
        return;
    }
    loop {
        if let Err(err) = driver.set_output(pin, pattern.on_level) {
            warn!(pin = %pin, error = %err, "output loop stopping on write failure");
            break;
        }
        let interrupted = interrupt.wait(pattern.hold).await;
        if let Err(err) = driver.set_output(pin, pattern.off_level) {
            warn!(pin = %pin, error = %err, "output loop stopping on write failure");
            break;
        }
        if interrupted {
            debug!(pin = %pin, "output loop interrupted");
            break;
        }
        if remaining > 0 {
            remaining -= 1;
            if remaining == 0 {
                break;
            }
        }
        if interrupt.wait(pattern.pause).await {
            debug!(pin = %pin, "output loop interrupted");
            break;
        }
    }
}
