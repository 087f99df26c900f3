//! Wrap a plain closure as a chain action.

use std::fmt;

use async_trait::async_trait;
use porter_domain::action::ActionOutcome;
use porter_domain::error::PorterError;
use porter_domain::event::Event;

use super::Action;

/// Runs a synchronous closure against the firing event.
///
/// Used for in-process hooks that need no parsing or IO of their own,
/// such as the raiser a [`WaitForEvent`](super::WaitForEvent) registers
/// on its target event.
pub struct CallbackAction<F>
where
    F: Fn(&Event) + Send + Sync,
{
    label: String,
    callback: F,
}

impl<F> CallbackAction<F>
where
    F: Fn(&Event) + Send + Sync,
{
    pub fn new(label: impl Into<String>, callback: F) -> Self {
        Self {
            label: label.into(),
            callback,
        }
    }
}

#[async_trait]
impl<F> Action for CallbackAction<F>
where
    F: Fn(&Event) + Send + Sync,
{
    async fn call(&self, event: &Event) -> Result<ActionOutcome, PorterError> {
        (self.callback)(event);
        Ok(ActionOutcome::Continue)
    }

    fn spec(&self) -> String {
        format!("callback:{}", self.label)
    }
}

impl<F> fmt::Display for CallbackAction<F>
where
    F: Fn(&Event) + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run callback {}", self.label)
    }
}
