//! Action primitives executed by the dispatch engine.
//!
//! Actions are configured as `kind:arg1,arg2,…` strings, parsed by the
//! [`ActionFactory`] into trait objects the engine calls in chain order.
//! Each call reports an [`ActionOutcome`] steering the remainder of its
//! chain: continue, abort, or skip a number of following actions.

use std::fmt;

use async_trait::async_trait;
use porter_domain::action::ActionOutcome;
use porter_domain::error::PorterError;
use porter_domain::event::Event;

pub mod callback;
pub mod factory;
pub mod indicator_gate;
pub mod output;
pub mod recency;
pub mod run_command;
pub mod sleep;
pub mod solar_gate;
pub mod wait_event;

pub use callback::CallbackAction;
pub use factory::{ActionFactory, ActionServices};
pub use indicator_gate::IndicatorGate;
pub use output::{ConstantOutput, HoldPattern, TriggeredOutput};
pub use recency::RecencyGate;
pub use run_command::RunCommand;
pub use sleep::Sleep;
pub use solar_gate::SolarGate;
pub use wait_event::{TimeoutPolicy, WaitForEvent};

/// A single step in an event's action chain.
///
/// `Display` is the human description used in logs; [`spec`](Action::spec)
/// reproduces the canonical configuration string.
#[async_trait]
pub trait Action: fmt::Display + Send + Sync {
    /// Execute the action for one firing.
    ///
    /// # Errors
    ///
    /// Failures are isolated by the engine: the error is logged against the
    /// firing and the chain continues with the next action.
    async fn call(&self, event: &Event) -> Result<ActionOutcome, PorterError>;

    /// Canonical `kind:arg,…` form of this action.
    fn spec(&self) -> String;
}
