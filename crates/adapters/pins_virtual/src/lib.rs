//! # porter-adapter-pins-virtual
//!
//! Virtual pin board — a simulated keyboard of input and output pins for
//! testing and demonstration. Pressing or releasing an input fires the
//! same events a hardware board would, so chains can be exercised end to
//! end without GPIO access.
//!
//! ## Fired events
//!
//! | Stimulus | Events, in order |
//! |----------|------------------|
//! | `press("11")` | `OnKeyDown`, `OnKeyDown_11` |
//! | `release("11")` | `OnKeyUp`, `OnKeyUp_11` |
//!
//! ## Dependency rule
//!
//! Depends on `porter-app` (port traits, engine) and `porter-domain` only.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use porter_app::engine::EventEngine;
use porter_app::ports::PinDriver;
use porter_domain::error::HardwareError;
use tracing::debug;

/// Simulated pin board wired to the dispatch engine.
///
/// Input pins carry a pressed/released level that [`press`](Self::press)
/// and [`release`](Self::release) flip; output pins record the level the
/// hub last drove them to. Only configured pins exist, everything else is
/// [`HardwareError::UnknownPin`].
pub struct VirtualPinBoard {
    name: String,
    engine: EventEngine,
    inputs: Mutex<HashMap<String, bool>>,
    outputs: Mutex<HashMap<String, bool>>,
}

impl VirtualPinBoard {
    #[must_use]
    pub fn new(
        engine: EventEngine,
        name: impl Into<String>,
        input_pins: &[String],
        output_pins: &[String],
    ) -> Self {
        Self {
            name: name.into(),
            engine,
            inputs: Mutex::new(input_pins.iter().map(|pin| (pin.clone(), false)).collect()),
            outputs: Mutex::new(output_pins.iter().map(|pin| (pin.clone(), false)).collect()),
        }
    }

    /// Board label, used as the source of the events it fires.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Simulate a key press: the input goes high and the key-down events
    /// fire. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// [`HardwareError::UnknownPin`] for a pin the board does not have.
    pub fn press(&self, pin: &str) -> Result<(), HardwareError> {
        self.set_input(pin, true)?;
        debug!(board = %self.name, pin, "key pressed");
        self.fire_key_events("OnKeyDown", pin);
        Ok(())
    }

    /// Simulate a key release: the input goes low and the key-up events
    /// fire. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// [`HardwareError::UnknownPin`] for a pin the board does not have.
    pub fn release(&self, pin: &str) -> Result<(), HardwareError> {
        self.set_input(pin, false)?;
        debug!(board = %self.name, pin, "key released");
        self.fire_key_events("OnKeyUp", pin);
        Ok(())
    }

    /// The level the hub last drove an output pin to.
    #[must_use]
    pub fn output_level(&self, pin: &str) -> Option<bool> {
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pin)
            .copied()
    }

    fn set_input(&self, pin: &str, level: bool) -> Result<(), HardwareError> {
        let mut inputs = self.inputs.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = inputs.get_mut(pin).ok_or_else(|| HardwareError::UnknownPin {
            pin: pin.to_string(),
        })?;
        *slot = level;
        Ok(())
    }

    /// The generic event first, then the pin-specific one.
    fn fire_key_events(&self, kind: &str, pin: &str) {
        let data = serde_json::json!({ "pin": pin });
        self.engine.fire(kind, &self.name, data.clone());
        self.engine.fire(&format!("{kind}_{pin}"), &self.name, data);
    }
}

impl PinDriver for VirtualPinBoard {
    fn set_output(&self, pin: &str, level: bool) -> Result<(), HardwareError> {
        let mut outputs = self.outputs.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = outputs.get_mut(pin).ok_or_else(|| HardwareError::UnknownPin {
            pin: pin.to_string(),
        })?;
        *slot = level;
        debug!(board = %self.name, pin, level, "output driven");
        Ok(())
    }

    fn read_input(&self, pin: &str) -> Result<bool, HardwareError> {
        self.inputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pin)
            .copied()
            .ok_or_else(|| HardwareError::UnknownPin {
                pin: pin.to_string(),
            })
    }
}
