//! Flow-control outcome of a single action invocation.

use serde::{Deserialize, Serialize};

/// What the dispatch engine should do after an action returns.
///
/// This is a regular return value, not an error: a gate that decides to
/// stop the chain has *succeeded* at its job. Action failures travel
/// separately as `Err(PorterError)` and are isolated per action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// Proceed with the next action in the chain.
    Continue,
    /// Stop the current firing; no further actions run.
    AbortChain,
    /// Skip the next `n` actions, then resume.
    SkipNext(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_roundtrip_through_serde_json() {
        for outcome in [
            ActionOutcome::Continue,
            ActionOutcome::AbortChain,
            ActionOutcome::SkipNext(3),
        ] {
            let json = serde_json::to_string(&outcome).unwrap();
            let parsed: ActionOutcome = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, outcome);
        }
    }
}
