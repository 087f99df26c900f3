//! Pause the chain for a fixed duration.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use porter_domain::action::ActionOutcome;
use porter_domain::error::PorterError;
use porter_domain::event::Event;

use super::Action;

/// Suspends the firing task without blocking other firings.
pub struct Sleep {
    duration: Duration,
}

impl Sleep {
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[async_trait]
impl Action for Sleep {
    async fn call(&self, _event: &Event) -> Result<ActionOutcome, PorterError> {
        tokio::time::sleep(self.duration).await;
        Ok(ActionOutcome::Continue)
    }

    fn spec(&self) -> String {
        format!("sleep:{}", self.duration.as_secs_f64())
    }
}

impl fmt::Display for Sleep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sleep for {}s", self.duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;

    fn fire() -> Event {
        Event::new("OnDoorbell", "test", serde_json::json!({}))
    }

    #[tokio::test(start_paused = true)]
    async fn should_suspend_for_the_configured_duration() {
        let action = Sleep::new(Duration::from_millis(1500));
        let started = Instant::now();

        let outcome = action.call(&fire()).await.unwrap();

        assert_eq!(outcome, ActionOutcome::Continue);
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn should_describe_seconds_fractionally() {
        let action = Sleep::new(Duration::from_millis(2500));
        assert_eq!(action.spec(), "sleep:2.5");
        assert_eq!(action.to_string(), "sleep for 2.5s");
    }
}
