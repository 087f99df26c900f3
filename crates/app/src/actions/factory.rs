//! Construct actions from their textual configuration form.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use porter_domain::error::ActionParseError;

use crate::engine::EventEngine;
use crate::ports::{IndicatorStore, PinDriver};
use crate::solar::SolarCalendar;

use super::solar_gate::{DayNightSource, Phase};
use super::wait_event::TimeoutPolicy;
use super::{
    Action, ConstantOutput, HoldPattern, IndicatorGate, RecencyGate, RunCommand, Sleep, SolarGate,
    TriggeredOutput, WaitForEvent,
};

/// Collaborators handed to every constructed action.
#[derive(Clone)]
pub struct ActionServices {
    pub engine: EventEngine,
    pub pins: Arc<dyn PinDriver>,
    pub indicators: Arc<dyn IndicatorStore>,
    pub solar: Arc<SolarCalendar>,
}

/// Builds one action kind from `(services, args, source)`.
pub type Constructor =
    fn(&ActionServices, &str, &str) -> Result<Arc<dyn Action>, ActionParseError>;

/// Registry of action kinds, keyed by the prefix of the spec string.
///
/// The built-in kinds cover the configured vocabulary; collaborators may
/// add their own through [`register_kind`](ActionFactory::register_kind).
pub struct ActionFactory {
    services: ActionServices,
    kinds: HashMap<&'static str, Constructor>,
}

impl ActionFactory {
    #[must_use]
    pub fn new(services: ActionServices) -> Self {
        let mut factory = Self {
            services,
            kinds: HashMap::new(),
        };
        factory.register_kind("sleep", build_sleep);
        factory.register_kind("waitevent", build_wait_event);
        factory.register_kind("skip", build_recency_gate);
        factory.register_kind("cond", build_indicator_gate);
        factory.register_kind("suntime", build_solar_gate);
        factory.register_kind("out", build_output);
        factory.register_kind("os_execute", build_run_command);
        factory
    }

    /// Add or replace the constructor for a spec kind.
    pub fn register_kind(&mut self, kind: &'static str, constructor: Constructor) {
        self.kinds.insert(kind, constructor);
    }

    /// Parse `kind:args` into a constructed action.
    ///
    /// `source` labels every registration the constructed action makes on
    /// the engine (wait notifiers, output interrupts), so it disappears
    /// together with its owner.
    ///
    /// # Errors
    ///
    /// Unknown kind, or arguments the kind cannot digest.
    pub fn parse(&self, spec: &str, source: &str) -> Result<Arc<dyn Action>, ActionParseError> {
        let (kind, args) = spec.split_once(':').unwrap_or((spec, ""));
        let kind = kind.trim();
        let constructor = self
            .kinds
            .get(kind)
            .ok_or_else(|| ActionParseError::UnknownKind {
                kind: kind.to_string(),
            })?;
        constructor(&self.services, args, source)
    }
}

// ── Builders ───────────────────────────────────────────────────────

fn build_sleep(
    _services: &ActionServices,
    args: &str,
    _source: &str,
) -> Result<Arc<dyn Action>, ActionParseError> {
    Ok(Arc::new(Sleep::new(parse_seconds("sleep", args)?)))
}

fn build_wait_event(
    services: &ActionServices,
    args: &str,
    source: &str,
) -> Result<Arc<dyn Action>, ActionParseError> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let [target, seconds, policy] = parts.as_slice() else {
        return Err(invalid("waitevent", "expected EVENT,SECONDS,POLICY"));
    };
    let timeout = parse_seconds("waitevent", seconds)?;
    let policy = policy
        .parse::<TimeoutPolicy>()
        .map_err(|err| invalid("waitevent", err.to_string()))?;
    Ok(Arc::new(WaitForEvent::new(
        &services.engine,
        source,
        *target,
        timeout,
        policy,
    )))
}

fn build_recency_gate(
    _services: &ActionServices,
    args: &str,
    _source: &str,
) -> Result<Arc<dyn Action>, ActionParseError> {
    Ok(Arc::new(RecencyGate::new(parse_seconds("skip", args)?)))
}

fn build_indicator_gate(
    services: &ActionServices,
    args: &str,
    _source: &str,
) -> Result<Arc<dyn Action>, ActionParseError> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let [match_raw, skip_raw, name] = parts.as_slice() else {
        return Err(invalid("cond", "expected MATCH,SKIP,INDICATOR"));
    };
    let (negate, match_text) = match match_raw.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, *match_raw),
    };
    let (skip, once) = parse_skip_count("cond", skip_raw)?;
    Ok(Arc::new(IndicatorGate::new(
        Arc::clone(&services.indicators),
        *name,
        match_text,
        negate,
        skip,
        once,
    )))
}

fn build_solar_gate(
    services: &ActionServices,
    args: &str,
    _source: &str,
) -> Result<Arc<dyn Action>, ActionParseError> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let [phase, skip_raw] = parts.as_slice() else {
        return Err(invalid("suntime", "expected PHASE,SKIP"));
    };
    let phase = phase
        .parse::<Phase>()
        .map_err(|err| invalid("suntime", err.to_string()))?;
    let (skip, once) = parse_skip_count("suntime", skip_raw)?;
    let sky: Arc<dyn DayNightSource> = Arc::<SolarCalendar>::clone(&services.solar);
    Ok(Arc::new(SolarGate::new(sky, phase, skip, once)))
}

fn build_output(
    services: &ActionServices,
    args: &str,
    source: &str,
) -> Result<Arc<dyn Action>, ActionParseError> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [pin, level] => {
            let level = parse_level("out", level)?;
            Ok(Arc::new(ConstantOutput::new(
                Arc::clone(&services.pins),
                *pin,
                level,
            )))
        }
        [pin, on, off, hold, rest @ ..] if rest.len() <= 3 => {
            let pattern = HoldPattern {
                on_level: parse_level("out", on)?,
                off_level: parse_level("out", off)?,
                hold: parse_millis("out", hold)?,
                pause: match rest.first() {
                    Some(raw) => parse_millis("out", raw)?,
                    None => Duration::ZERO,
                },
                loops: match rest.get(1) {
                    Some(raw) => raw
                        .parse()
                        .map_err(|_| invalid("out", format!("{raw:?} is not a loop count")))?,
                    None => 1,
                },
            };
            let interrupt_pin = rest
                .get(2)
                .map(|raw| (*raw).to_string())
                .filter(|pin| !pin.is_empty());
            Ok(Arc::new(TriggeredOutput::new(
                &services.engine,
                Arc::clone(&services.pins),
                source,
                *pin,
                pattern,
                interrupt_pin,
            )))
        }
        _ => Err(invalid(
            "out",
            "expected PIN,LEVEL or PIN,ON,OFF,HOLDMS[,PAUSEMS[,LOOPS[,INTERRUPTPIN]]]",
        )),
    }
}

fn build_run_command(
    _services: &ActionServices,
    args: &str,
    _source: &str,
) -> Result<Arc<dyn Action>, ActionParseError> {
    let command = args.trim();
    if command.is_empty() {
        return Err(invalid("os_execute", "expected a shell command"));
    }
    Ok(Arc::new(RunCommand::new(command)))
}

// ── Argument helpers ───────────────────────────────────────────────

fn invalid(kind: &str, detail: impl Into<String>) -> ActionParseError {
    ActionParseError::InvalidArguments {
        kind: kind.to_string(),
        detail: detail.into(),
    }
}

fn parse_seconds(kind: &str, raw: &str) -> Result<Duration, ActionParseError> {
    let raw = raw.trim();
    let seconds: f64 = raw
        .parse()
        .map_err(|_| invalid(kind, format!("{raw:?} is not a number of seconds")))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(invalid(kind, format!("{raw:?} is not a number of seconds")));
    }
    Ok(Duration::from_secs_f64(seconds))
}

fn parse_millis(kind: &str, raw: &str) -> Result<Duration, ActionParseError> {
    let millis: u64 = raw
        .trim()
        .parse()
        .map_err(|_| invalid(kind, format!("{raw:?} is not a number of milliseconds")))?;
    Ok(Duration::from_millis(millis))
}

fn parse_level(kind: &str, raw: &str) -> Result<bool, ActionParseError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "high" => Ok(true),
        "0" | "false" | "off" | "low" => Ok(false),
        _ => Err(invalid(kind, format!("{raw:?} is not a pin level"))),
    }
}

/// `N` or `#N`: the skip width, and whether the gate passes only on a
/// change of the observed state.
fn parse_skip_count(kind: &str, raw: &str) -> Result<(usize, bool), ActionParseError> {
    let raw = raw.trim();
    let (once, digits) = match raw.strip_prefix('#') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let count = digits
        .parse()
        .map_err(|_| invalid(kind, format!("{raw:?} is not a skip count")))?;
    Ok((count, once))
}

#[cfg(test)]
mod tests {
    use std::io;

    use porter_domain::error::HardwareError;

    use super::*;
    use crate::solar::Twilight;

    // ── Null collaborators ─────────────────────────────────────────

    struct NullBoard;

    impl PinDriver for NullBoard {
        fn set_output(&self, _pin: &str, _level: bool) -> Result<(), HardwareError> {
            Ok(())
        }

        fn read_input(&self, _pin: &str) -> Result<bool, HardwareError> {
            Ok(false)
        }
    }

    struct NullIndicators;

    impl IndicatorStore for NullIndicators {
        fn read(&self, _name: &str) -> io::Result<String> {
            Err(io::Error::new(io::ErrorKind::NotFound, "no indicators"))
        }

        fn write(&self, _name: &str, _line: &str) -> io::Result<()> {
            Ok(())
        }
    }

    fn factory() -> ActionFactory {
        ActionFactory::new(ActionServices {
            engine: EventEngine::new(),
            pins: Arc::new(NullBoard),
            indicators: Arc::new(NullIndicators),
            solar: Arc::new(SolarCalendar::new(52.52, 13.405, Twilight::Official)),
        })
    }

    // ── Tests ──────────────────────────────────────────────────────

    #[test]
    fn should_reproduce_canonical_specs_through_round_trips() {
        let factory = factory();
        for spec in [
            "sleep:2.5",
            "waitevent:OnDoorbell,10,abort",
            "waitevent:OnCallStateChange,3.5,continue",
            "skip:5",
            "cond:open,2,door",
            "cond:!open,#2,door",
            "suntime:day,2",
            "suntime:night,#1",
            "out:11,true",
            "out:2,true,false,1000,500,3,9",
            "os_execute:echo hello, world",
        ] {
            let action = factory.parse(spec, "config").unwrap();
            assert_eq!(action.spec(), spec, "spec {spec:?} did not round-trip");
        }
    }

    #[test]
    fn should_fill_output_defaults() {
        let factory = factory();
        let action = factory.parse("out:2,true,false,1000", "config").unwrap();
        assert_eq!(action.spec(), "out:2,true,false,1000,0,1");
    }

    #[test]
    fn should_accept_level_synonyms() {
        let factory = factory();
        assert_eq!(
            factory.parse("out:11,on", "config").unwrap().spec(),
            "out:11,true"
        );
        assert_eq!(
            factory.parse("out:11,0", "config").unwrap().spec(),
            "out:11,false"
        );
    }

    #[test]
    fn should_reject_unknown_kinds() {
        let factory = factory();
        let err = factory.parse("teleport:home", "config").err().unwrap();
        assert_eq!(
            err,
            ActionParseError::UnknownKind {
                kind: "teleport".to_string()
            }
        );
    }

    #[test]
    fn should_reject_malformed_arguments() {
        let factory = factory();
        for spec in [
            "sleep",
            "sleep:fast",
            "sleep:-1",
            "waitevent:OnDoorbell",
            "waitevent:OnDoorbell,5,maybe",
            "skip:",
            "cond:open,2",
            "cond:open,x,door",
            "suntime:noon,1",
            "suntime:day,x",
            "out:11",
            "out:11,bright",
            "out:11,true,false,soon",
            "out:11,true,false,100,0,1,9,extra",
            "os_execute:",
        ] {
            let err = factory.parse(spec, "config").err().unwrap();
            assert!(
                matches!(err, ActionParseError::InvalidArguments { .. }),
                "spec {spec:?} produced {err:?}",
            );
        }
    }

    #[test]
    fn should_allow_registering_custom_kinds() {
        let mut factory = factory();
        factory.register_kind("nap", build_sleep);

        let action = factory.parse("nap:1", "config").unwrap();
        assert_eq!(action.spec(), "sleep:1");
    }

    #[test]
    fn should_label_engine_registrations_with_the_given_source() {
        let engine = EventEngine::new();
        let factory = ActionFactory::new(ActionServices {
            engine: engine.clone(),
            pins: Arc::new(NullBoard),
            indicators: Arc::new(NullIndicators),
            solar: Arc::new(SolarCalendar::new(52.52, 13.405, Twilight::Official)),
        });

        factory
            .parse("waitevent:OnDoorbell,10,abort", "config")
            .unwrap();
        assert_eq!(engine.chain_specs("OnDoorbell").len(), 1);

        engine.unregister_source("config", false).unwrap();
        assert!(engine.chain_specs("OnDoorbell").is_empty());
    }
}
