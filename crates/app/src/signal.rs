//! Raise/wait signalling between actions.
//!
//! A [`Signal`] connects an action waiting inside one chain to callbacks
//! firing from other chains: cross-event waits and output-loop interrupts.
//! Subscribing pins the waiter to the current state, so only raises that
//! happen *after* the subscription are observed — a raise with nobody
//! subscribed is absorbed.

use std::time::Duration;

use tokio::sync::watch;

/// Cloneable raise side of the signal.
#[derive(Clone)]
pub struct Signal {
    tx: watch::Sender<u64>,
}

impl Signal {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx }
    }

    /// Wake every current subscriber.
    pub fn raise(&self) {
        self.tx.send_modify(|generation| *generation += 1);
    }

    /// Start observing raises that happen after this call.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait side of the signal, bound to one observer.
pub struct Subscription {
    rx: watch::Receiver<u64>,
}

impl Subscription {
    /// Wait for the next raise, up to `timeout`.
    ///
    /// Returns `true` when the signal was raised, `false` on timeout. A
    /// subscription is reusable: each wait consumes the raises seen so far
    /// and waits for the next one.
    pub async fn wait(&mut self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.rx.changed())
            .await
            .is_ok_and(|changed| changed.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Signal;

    #[tokio::test(start_paused = true)]
    async fn should_observe_raise_after_subscribe() {
        let signal = Signal::new();
        let mut sub = signal.subscribe();

        let raiser = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            raiser.raise();
        });

        assert!(sub.wait(Duration::from_secs(5)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn should_ignore_raise_before_subscribe() {
        let signal = Signal::new();
        signal.raise();

        let mut sub = signal.subscribe();
        assert!(!sub.wait(Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn should_time_out_without_raise() {
        let signal = Signal::new();
        let mut sub = signal.subscribe();
        assert!(!sub.wait(Duration::from_secs(3)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn should_wake_every_subscriber() {
        let signal = Signal::new();
        let mut first = signal.subscribe();
        let mut second = signal.subscribe();

        let raiser = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            raiser.raise();
        });

        let (first, second) = tokio::join!(
            first.wait(Duration::from_secs(5)),
            second.wait(Duration::from_secs(5)),
        );
        assert!(first);
        assert!(second);
    }

    #[tokio::test(start_paused = true)]
    async fn should_catch_raise_between_waits() {
        let signal = Signal::new();
        let mut sub = signal.subscribe();

        signal.raise();
        assert!(sub.wait(Duration::from_secs(1)).await);
        // The raise was consumed; the next wait needs a fresh one.
        assert!(!sub.wait(Duration::from_secs(1)).await);
    }
}
