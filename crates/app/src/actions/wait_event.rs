//! Block the chain until another event fires, or a timeout passes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use porter_domain::action::ActionOutcome;
use porter_domain::error::PorterError;
use porter_domain::event::Event;
use thiserror::Error;
use tracing::debug;

use crate::engine::EventEngine;
use crate::signal::Signal;

use super::{Action, CallbackAction};

/// How a wait that runs out of time resolves the chain.
///
/// The policy names the *timeout* outcome; a firing of the target event
/// within the window resolves to the opposite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Timing out aborts the chain; the target firing lets it continue.
    Abort,
    /// Timing out continues the chain; the target firing aborts it.
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown timeout policy {0:?}, expected \"abort\" or \"continue\"")]
pub struct UnknownPolicy(String);

impl FromStr for TimeoutPolicy {
    type Err = UnknownPolicy;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "continue" => Ok(Self::Continue),
            _ => Err(UnknownPolicy(raw.to_string())),
        }
    }
}

impl fmt::Display for TimeoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::Continue => f.write_str("continue"),
        }
    }
}

/// Suspends its chain until `target` fires anywhere in the hub.
///
/// Construction registers a callback at the front of the target's chain
/// that raises the wait signal, so a firing is observed even when the
/// target's own chain aborts early. Only firings that happen while a
/// wait is actually pending count; earlier ones are not replayed.
pub struct WaitForEvent {
    target: String,
    timeout: Duration,
    on_timeout: TimeoutPolicy,
    signal: Signal,
}

impl WaitForEvent {
    /// Wire a new wait against `engine`, registering its raise callback
    /// under `source` so the owner's unregistration removes it.
    pub fn new(
        engine: &EventEngine,
        source: &str,
        target: impl Into<String>,
        timeout: Duration,
        on_timeout: TimeoutPolicy,
    ) -> Self {
        let target = target.into();
        let signal = Signal::new();
        let raiser = {
            let signal = signal.clone();
            CallbackAction::new(format!("notify:{target}"), move |_: &Event| signal.raise())
        };
        engine.register_action_at_front(&target, source, Arc::new(raiser));
        Self {
            target,
            timeout,
            on_timeout,
            signal,
        }
    }
}

#[async_trait]
impl Action for WaitForEvent {
    async fn call(&self, event: &Event) -> Result<ActionOutcome, PorterError> {
        let mut subscription = self.signal.subscribe();
        let occurred = subscription.wait(self.timeout).await;
        let abort = match self.on_timeout {
            TimeoutPolicy::Abort => !occurred,
            TimeoutPolicy::Continue => occurred,
        };
        debug!(
            event = %event.name,
            target = %self.target,
            occurred,
            abort,
            "wait resolved",
        );
        if abort {
            Ok(ActionOutcome::AbortChain)
        } else {
            Ok(ActionOutcome::Continue)
        }
    }

    fn spec(&self) -> String {
        format!(
            "waitevent:{},{},{}",
            self.target,
            self.timeout.as_secs_f64(),
            self.on_timeout,
        )
    }
}

impl fmt::Display for WaitForEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "wait up to {}s for {}, {} on timeout",
            self.timeout.as_secs_f64(),
            self.target,
            self.on_timeout,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AbortAction;

    #[async_trait]
    impl Action for AbortAction {
        async fn call(&self, _event: &Event) -> Result<ActionOutcome, PorterError> {
            Ok(ActionOutcome::AbortChain)
        }

        fn spec(&self) -> String {
            "abort".to_string()
        }
    }

    impl fmt::Display for AbortAction {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("always abort")
        }
    }

    fn fire() -> Event {
        Event::new("OnCallStateChange", "test", serde_json::json!({}))
    }

    fn engine_with_wait(policy: TimeoutPolicy) -> (EventEngine, Arc<WaitForEvent>) {
        let engine = EventEngine::new();
        let wait = Arc::new(WaitForEvent::new(
            &engine,
            "waiter",
            "OnDoorbell",
            Duration::from_secs(10),
            policy,
        ));
        (engine, wait)
    }

    #[tokio::test(start_paused = true)]
    async fn should_continue_when_target_fires_under_abort_policy() {
        let (engine, wait) = engine_with_wait(TimeoutPolicy::Abort);

        let task = {
            let wait = Arc::clone(&wait);
            tokio::spawn(async move { wait.call(&fire()).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        engine.fire("OnDoorbell", "test", serde_json::json!({}));

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, ActionOutcome::Continue);
    }

    #[tokio::test(start_paused = true)]
    async fn should_abort_on_timeout_under_abort_policy() {
        let (_engine, wait) = engine_with_wait(TimeoutPolicy::Abort);

        let outcome = wait.call(&fire()).await.unwrap();
        assert_eq!(outcome, ActionOutcome::AbortChain);
    }

    #[tokio::test(start_paused = true)]
    async fn should_abort_when_target_fires_under_continue_policy() {
        let (engine, wait) = engine_with_wait(TimeoutPolicy::Continue);

        let task = {
            let wait = Arc::clone(&wait);
            tokio::spawn(async move { wait.call(&fire()).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        engine.fire("OnDoorbell", "test", serde_json::json!({}));

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, ActionOutcome::AbortChain);
    }

    #[tokio::test(start_paused = true)]
    async fn should_continue_on_timeout_under_continue_policy() {
        let (_engine, wait) = engine_with_wait(TimeoutPolicy::Continue);

        let outcome = wait.call(&fire()).await.unwrap();
        assert_eq!(outcome, ActionOutcome::Continue);
    }

    #[tokio::test(start_paused = true)]
    async fn should_ignore_target_firings_before_the_wait_starts() {
        let (engine, wait) = engine_with_wait(TimeoutPolicy::Abort);

        engine
            .fire_and_wait("OnDoorbell", "test", serde_json::json!({}))
            .await;

        // The earlier firing is not replayed into the later wait.
        let outcome = wait.call(&fire()).await.unwrap();
        assert_eq!(outcome, ActionOutcome::AbortChain);
    }

    #[tokio::test(start_paused = true)]
    async fn should_observe_the_firing_even_when_the_target_chain_aborts() {
        let engine = EventEngine::new();
        engine.register_action("OnDoorbell", "config", Arc::new(AbortAction));
        let wait = Arc::new(WaitForEvent::new(
            &engine,
            "waiter",
            "OnDoorbell",
            Duration::from_secs(10),
            TimeoutPolicy::Abort,
        ));

        // The raise callback sits in front of the aborting chain.
        let specs = engine.chain_specs("OnDoorbell");
        assert_eq!(specs[0], "callback:notify:OnDoorbell");

        let task = {
            let wait = Arc::clone(&wait);
            tokio::spawn(async move { wait.call(&fire()).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        engine.fire("OnDoorbell", "test", serde_json::json!({}));

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, ActionOutcome::Continue);
    }

    #[tokio::test]
    async fn should_leave_with_the_owning_source() {
        let (engine, _wait) = engine_with_wait(TimeoutPolicy::Abort);
        assert_eq!(engine.chain_specs("OnDoorbell").len(), 1);

        engine.unregister_source("waiter", false).unwrap();
        assert!(engine.chain_specs("OnDoorbell").is_empty());
    }

    #[test]
    fn should_parse_policy_names() {
        assert_eq!("abort".parse::<TimeoutPolicy>(), Ok(TimeoutPolicy::Abort));
        assert_eq!(
            "Continue".parse::<TimeoutPolicy>(),
            Ok(TimeoutPolicy::Continue)
        );
        assert!("maybe".parse::<TimeoutPolicy>().is_err());
    }

    #[tokio::test]
    async fn should_describe_itself() {
        let (_engine, wait) = engine_with_wait(TimeoutPolicy::Abort);
        assert_eq!(wait.spec(), "waitevent:OnDoorbell,10,abort");
        assert_eq!(
            wait.to_string(),
            "wait up to 10s for OnDoorbell, abort on timeout"
        );
    }
}
