//! Pin driver port — digital IO towards the intercom hardware.

use porter_domain::error::HardwareError;

/// Drives and samples the digital pins the hub knows about.
///
/// Which pin names exist is fixed at construction time by the adapter;
/// addressing any other name is an error. Output levels latch until driven
/// again. Calls are synchronous and expected to return promptly.
pub trait PinDriver: Send + Sync {
    /// Drive an output pin to a level.
    ///
    /// # Errors
    ///
    /// Fails when the pin is not a configured output or the write does not
    /// reach the hardware.
    fn set_output(&self, pin: &str, level: bool) -> Result<(), HardwareError>;

    /// Sample the current level of an input pin.
    ///
    /// # Errors
    ///
    /// Fails when the pin is not a configured input or the read fails.
    fn read_input(&self, pin: &str) -> Result<bool, HardwareError>;
}
