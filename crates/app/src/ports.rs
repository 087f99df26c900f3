//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the action layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod indicator;
pub mod pin_driver;

pub use indicator::IndicatorStore;
pub use pin_driver::PinDriver;
