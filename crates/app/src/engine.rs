//! Event dispatch engine — runs ordered action chains per event name.
//!
//! Every named event owns an ordered chain of actions. Firing an event
//! stamps it against the per-event firing record, snapshots the chain and
//! runs it on a background task, so concurrent firings of any events (the
//! same name included) never block one another. Flow control is carried by
//! the [`ActionOutcome`] each action returns; an action failure is logged
//! and the chain continues.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use porter_domain::action::ActionOutcome;
use porter_domain::error::EngineError;
use porter_domain::event::Event;
use porter_domain::id::EventId;
use porter_domain::time::{self, Timestamp};
use tracing::{debug, trace, warn};

use crate::actions::Action;
use crate::tasks::TaskGroup;

/// One registered chain step plus the label of who registered it.
struct ChainEntry {
    action: Arc<dyn Action>,
    source: String,
}

/// Timestamps of the two most recent firings of one event name.
#[derive(Default, Clone, Copy)]
struct FiringRecord {
    last_fired_at: Option<Timestamp>,
    previous_fired_at: Option<Timestamp>,
}

/// Dispatches fired events to their ordered action chains.
///
/// Cloning is cheap; every clone shares the chains, the firing records and
/// the task group that counts in-flight work.
#[derive(Clone, Default)]
pub struct EventEngine {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    chains: RwLock<HashMap<String, Vec<ChainEntry>>>,
    records: RwLock<HashMap<String, FiringRecord>>,
    tasks: TaskGroup,
}

impl EventEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action to the chain of `event`.
    pub fn register_action(&self, event: &str, source: &str, action: Arc<dyn Action>) {
        self.register(event, source, action, false);
    }

    /// Insert an action at the front of the chain of `event`.
    ///
    /// Reserved for helper callbacks (wait signals, output interrupts) that
    /// must observe a firing before the configured chain consumes it.
    pub fn register_action_at_front(&self, event: &str, source: &str, action: Arc<dyn Action>) {
        self.register(event, source, action, true);
    }

    fn register(&self, event: &str, source: &str, action: Arc<dyn Action>, front: bool) {
        debug!(event, source, action = %action, "registering action");
        let mut chains = self
            .inner
            .chains
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let chain = chains.entry(event.to_string()).or_default();
        let entry = ChainEntry {
            action,
            source: source.to_string(),
        };
        if front {
            chain.insert(0, entry);
        } else {
            chain.push(entry);
        }
    }

    /// Remove every action that `source` registered, from every chain.
    ///
    /// With `force == false` the call is refused while firings are in
    /// flight; callers drain first. `force == true` removes immediately —
    /// in-flight runs keep executing their snapshot.
    ///
    /// # Errors
    ///
    /// [`EngineError::Busy`] when `force` is not set and work is in flight.
    pub fn unregister_source(&self, source: &str, force: bool) -> Result<(), EngineError> {
        let in_flight = self.inner.tasks.active();
        if !force && in_flight > 0 {
            return Err(EngineError::Busy { in_flight });
        }
        let mut chains = self
            .inner
            .chains
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut removed = 0;
        for chain in chains.values_mut() {
            let before = chain.len();
            chain.retain(|entry| entry.source != source);
            removed += before - chain.len();
        }
        chains.retain(|_, chain| !chain.is_empty());
        debug!(source, removed, "unregistered actions");
        Ok(())
    }

    /// Fire an event: record its timestamps, then run its chain detached.
    ///
    /// Returns the id of the firing. Must be called from within a Tokio
    /// runtime.
    pub fn fire(&self, name: &str, source: &str, data: serde_json::Value) -> EventId {
        let event = self.stamp(name, source, data);
        let chain = self.snapshot(name);
        let id = event.id;
        debug!(event = %event.name, %id, source = %event.source, actions = chain.len(), "firing event");
        self.inner.tasks.spawn(run_chain(event, chain));
        id
    }

    /// Fire an event and wait for its chain to complete.
    pub async fn fire_and_wait(&self, name: &str, source: &str, data: serde_json::Value) -> EventId {
        let event = self.stamp(name, source, data);
        let chain = self.snapshot(name);
        let id = event.id;
        debug!(event = %event.name, %id, source = %event.source, actions = chain.len(), "firing event");
        let guard = self.inner.tasks.guard();
        run_chain(event, chain).await;
        drop(guard);
        id
    }

    /// Wait until every in-flight firing and output loop has completed, up
    /// to `timeout`. Returns `true` when everything drained in time.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.inner.tasks.drain(timeout).await
    }

    /// The task group in-flight work is counted on. Detached helpers
    /// (output loops) spawn here so [`drain`](EventEngine::drain) covers
    /// them.
    #[must_use]
    pub fn tasks(&self) -> TaskGroup {
        self.inner.tasks.clone()
    }

    /// Canonical spec strings of the chain registered for `event`.
    #[must_use]
    pub fn chain_specs(&self, event: &str) -> Vec<String> {
        let chains = self
            .inner
            .chains
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        chains
            .get(event)
            .map(|chain| chain.iter().map(|entry| entry.action.spec()).collect())
            .unwrap_or_default()
    }

    /// Update the firing record for `name` and build the stamped event.
    /// Records move before the chain runs, so gates inside the chain see
    /// the current firing as `fired_at` and the one before it as
    /// `previous_fired_at`.
    fn stamp(&self, name: &str, source: &str, data: serde_json::Value) -> Event {
        let mut records = self
            .inner
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let record = records.entry(name.to_string()).or_default();
        record.previous_fired_at = record.last_fired_at;
        let fired_at = time::now();
        record.last_fired_at = Some(fired_at);
        Event::new(name, source, data).with_timing(fired_at, record.previous_fired_at)
    }

    fn snapshot(&self, name: &str) -> Vec<Arc<dyn Action>> {
        let chains = self
            .inner
            .chains
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        chains
            .get(name)
            .map(|chain| chain.iter().map(|entry| Arc::clone(&entry.action)).collect())
            .unwrap_or_default()
    }
}

/// Run one snapshotted chain with an explicit cursor.
async fn run_chain(event: Event, chain: Vec<Arc<dyn Action>>) {
    let mut index = 0;
    while let Some(action) = chain.get(index) {
        trace!(event = %event.name, id = %event.id, position = index, action = %action, "running action");
        match action.call(&event).await {
            Ok(ActionOutcome::Continue) => index += 1,
            Ok(ActionOutcome::AbortChain) => {
                debug!(event = %event.name, id = %event.id, position = index, "chain aborted");
                return;
            }
            Ok(ActionOutcome::SkipNext(count)) => {
                debug!(event = %event.name, id = %event.id, position = index, skipped = count, "skipping actions");
                index += count + 1;
            }
            Err(err) => {
                warn!(
                    event = %event.name,
                    id = %event.id,
                    action = %action,
                    error = %err,
                    "action failed, continuing chain",
                );
                index += 1;
            }
        }
    }
    trace!(event = %event.name, id = %event.id, "chain finished");
}
