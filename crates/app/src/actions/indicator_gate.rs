//! Gate a chain on the content of a status indicator.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use porter_domain::action::ActionOutcome;
use porter_domain::error::PorterError;
use porter_domain::event::Event;
use tracing::{debug, warn};

use crate::ports::IndicatorStore;
use crate::throttle::LogThrottle;

use super::Action;

const UNREADABLE_WARN_INTERVAL: Duration = Duration::from_secs(60);

/// Skips the next `skip` actions unless an indicator matches.
///
/// The gate reads the indicator on every firing. With `negate` the match
/// is inverted; with `once` a match only passes when the content changed
/// since the last time this gate observed it, so a chain does not re-act
/// on a level that merely stays put. An unreadable indicator counts as
/// not matched.
pub struct IndicatorGate {
    store: Arc<dyn IndicatorStore>,
    name: String,
    match_text: String,
    negate: bool,
    skip: usize,
    once: bool,
    last_seen: Mutex<Option<String>>,
    unreadable: LogThrottle,
}

impl IndicatorGate {
    pub fn new(
        store: Arc<dyn IndicatorStore>,
        name: impl Into<String>,
        match_text: impl Into<String>,
        negate: bool,
        skip: usize,
        once: bool,
    ) -> Self {
        Self {
            store,
            name: name.into(),
            match_text: match_text.into(),
            negate,
            skip,
            once,
            last_seen: Mutex::new(None),
            unreadable: LogThrottle::new(UNREADABLE_WARN_INTERVAL),
        }
    }
}

#[async_trait]
impl Action for IndicatorGate {
    async fn call(&self, event: &Event) -> Result<ActionOutcome, PorterError> {
        let content = match self.store.read(&self.name) {
            Ok(content) => content,
            Err(err) => {
                if self.unreadable.permit() {
                    warn!(
                        event = %event.name,
                        indicator = %self.name,
                        error = %err,
                        "indicator unreadable, skipping guarded actions",
                    );
                }
                return Ok(ActionOutcome::SkipNext(self.skip));
            }
        };

        let matched = self.negate != (content == self.match_text);
        let changed = {
            let mut last_seen = self
                .last_seen
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let changed = last_seen.as_deref() != Some(content.as_str());
            *last_seen = Some(content.clone());
            changed
        };

        if matched && (!self.once || changed) {
            Ok(ActionOutcome::Continue)
        } else {
            debug!(
                event = %event.name,
                indicator = %self.name,
                content = %content,
                matched,
                changed,
                skipped = self.skip,
                "indicator gate skipping",
            );
            Ok(ActionOutcome::SkipNext(self.skip))
        }
    }

    fn spec(&self) -> String {
        format!(
            "cond:{}{},{}{},{}",
            if self.negate { "!" } else { "" },
            self.match_text,
            if self.once { "#" } else { "" },
            self.skip,
            self.name,
        )
    }
}

impl fmt::Display for IndicatorGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "skip {} action(s) unless indicator {} {} {:?}",
            self.skip,
            self.name,
            if self.negate { "differs from" } else { "reads" },
            self.match_text,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;

    use super::*;

    // ── Fake indicator store ───────────────────────────────────────

    #[derive(Default)]
    struct FakeIndicators {
        lines: Mutex<HashMap<String, String>>,
    }

    impl FakeIndicators {
        fn set(&self, name: &str, line: &str) {
            self.lines
                .lock()
                .unwrap()
                .insert(name.to_string(), line.to_string());
        }
    }

    impl IndicatorStore for FakeIndicators {
        fn read(&self, name: &str) -> io::Result<String> {
            self.lines
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such indicator"))
        }

        fn write(&self, name: &str, line: &str) -> io::Result<()> {
            self.set(name, line);
            Ok(())
        }
    }

    fn fire() -> Event {
        Event::new("OnKeyDown_11", "test", serde_json::json!({}))
    }

    // ── Tests ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_pass_when_indicator_matches() {
        let store = Arc::new(FakeIndicators::default());
        store.set("door", "open");
        let gate = IndicatorGate::new(store, "door", "open", false, 2, false);

        assert_eq!(gate.call(&fire()).await.unwrap(), ActionOutcome::Continue);
    }

    #[tokio::test]
    async fn should_skip_when_indicator_differs() {
        let store = Arc::new(FakeIndicators::default());
        store.set("door", "closed");
        let gate = IndicatorGate::new(store, "door", "open", false, 2, false);

        assert_eq!(
            gate.call(&fire()).await.unwrap(),
            ActionOutcome::SkipNext(2)
        );
    }

    #[tokio::test]
    async fn should_invert_the_match_when_negated() {
        let store = Arc::new(FakeIndicators::default());
        store.set("door", "closed");
        let gate = IndicatorGate::new(store, "door", "open", true, 1, false);

        assert_eq!(gate.call(&fire()).await.unwrap(), ActionOutcome::Continue);
    }

    #[tokio::test]
    async fn should_skip_when_indicator_is_unreadable() {
        let store = Arc::new(FakeIndicators::default());
        let gate = IndicatorGate::new(store, "missing", "open", false, 3, false);

        assert_eq!(
            gate.call(&fire()).await.unwrap(),
            ActionOutcome::SkipNext(3)
        );
    }

    #[tokio::test]
    async fn should_pass_once_mode_only_while_content_changes() {
        let store = Arc::new(FakeIndicators::default());
        store.set("door", "open");
        let gate = IndicatorGate::new(Arc::<FakeIndicators>::clone(&store), "door", "open", false, 1, true);

        // First observation of "open" passes.
        assert_eq!(gate.call(&fire()).await.unwrap(), ActionOutcome::Continue);
        // Unchanged content is suppressed.
        assert_eq!(
            gate.call(&fire()).await.unwrap(),
            ActionOutcome::SkipNext(1)
        );

        // A bounce through another value re-arms the gate.
        store.set("door", "closed");
        assert_eq!(
            gate.call(&fire()).await.unwrap(),
            ActionOutcome::SkipNext(1)
        );
        store.set("door", "open");
        assert_eq!(gate.call(&fire()).await.unwrap(), ActionOutcome::Continue);
    }

    #[test]
    fn should_describe_itself_in_spec_form() {
        let store = Arc::new(FakeIndicators::default());
        let plain = IndicatorGate::new(Arc::<FakeIndicators>::clone(&store), "door", "open", false, 2, false);
        assert_eq!(plain.spec(), "cond:open,2,door");

        let fancy = IndicatorGate::new(store, "door", "open", true, 1, true);
        assert_eq!(fancy.spec(), "cond:!open,#1,door");
        assert_eq!(
            fancy.to_string(),
            "skip 1 action(s) unless indicator door differs from \"open\""
        );
    }
}
