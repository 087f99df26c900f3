//! Common error types used across the workspace.
//!
//! Each concern defines its own typed error enum; [`PorterError`] joins
//! them via `#[from]` so any layer can bubble a concrete error up through
//! a single type. Flow-control signals (abort, skip) are *not* errors —
//! they live in [`ActionOutcome`](crate::action::ActionOutcome).

use thiserror::Error;

/// Failure to cast a raw value into a configuration key's declared type.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("expected {expected}, got {got}")]
pub struct CastError {
    /// Description of the declared type, e.g. `integer in 1..=100`.
    pub expected: String,
    /// Human rendering of the rejected input.
    pub got: String,
}

impl CastError {
    #[must_use]
    pub fn new(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            got: got.into(),
        }
    }
}

/// Errors raised by the typed configuration store.
///
/// All of these surface synchronously to the caller; the store never
/// silently defaults outside the documented default-fallback on `get`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// No definition matches the path, not even through a wildcard segment.
    #[error("undefined key {path:?}")]
    UndefinedKey { path: String },

    /// The path continues past a leaf definition.
    #[error("key path {path:?} is too long")]
    PathTooLong { path: String },

    /// The path ends on a namespace instead of a leaf definition.
    #[error("key path {path:?} is too short")]
    PathTooShort { path: String },

    /// The raw input cannot be cast into the leaf's declared type.
    #[error("invalid value for key {path:?}: {cause}")]
    InvalidValue { path: String, cause: CastError },

    /// `get` found neither a stored value nor a default.
    #[error("no value set for key {path:?} and it has no default")]
    NoValueSet { path: String },

    /// `delete` would leave a mandatory key (one without a default) unset.
    #[error("cannot delete required key {path:?}")]
    RequiredKeyMissing { path: String },

    /// A child listing was requested on a leaf definition.
    #[error("key {path:?} is not a namespace")]
    NotANamespace { path: String },

    /// Attaching definitions would redefine an existing key or turn a
    /// namespace into a leaf (or vice versa).
    #[error("conflicting definition for key {path:?}")]
    DefinitionConflict { path: String },
}

/// Errors raised while constructing an action from its textual form.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionParseError {
    /// The `kind` prefix names no registered constructor.
    #[error("unknown action kind {kind:?}")]
    UnknownKind { kind: String },

    /// The argument list does not fit the kind's signature.
    #[error("invalid arguments for action {kind:?}: {detail}")]
    InvalidArguments { kind: String, detail: String },
}

/// Errors raised by pin I/O drivers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HardwareError {
    /// The driver knows no pin under this name.
    #[error("unknown pin {pin:?}")]
    UnknownPin { pin: String },

    /// The driver failed to drive an output to the requested level.
    #[error("failed to drive pin {pin:?} to {value}")]
    PinWrite { pin: String, value: bool },

    /// The driver failed to sample an input.
    #[error("failed to read pin {pin:?}")]
    PinRead { pin: String },
}

/// Errors raised by the dispatch engine's registration surface.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A non-forced removal was requested while firings are in flight.
    #[error("{in_flight} firing(s) still in flight")]
    Busy { in_flight: usize },
}

/// Top-level error for the porter workspace.
#[derive(Debug, Error)]
pub enum PorterError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    ActionParse(#[from] ActionParseError),

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_config_error_into_porter_error() {
        let err = ConfigError::UndefinedKey {
            path: "a.b".to_string(),
        };
        let top: PorterError = err.into();
        assert!(matches!(top, PorterError::Config(_)));
    }

    #[test]
    fn should_render_cast_error_in_invalid_value_message() {
        let err = ConfigError::InvalidValue {
            path: "pins.12.hold".to_string(),
            cause: CastError::new("duration in seconds", "\"fast\""),
        };
        let text = err.to_string();
        assert!(text.contains("pins.12.hold"));
        assert!(text.contains("duration in seconds"));
    }

    #[test]
    fn should_keep_inner_message_through_transparent_wrapper() {
        let top = PorterError::from(HardwareError::UnknownPin {
            pin: "13".to_string(),
        });
        assert_eq!(top.to_string(), "unknown pin \"13\"");
    }
}
