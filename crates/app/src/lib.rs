//! # porter-app
//!
//! Application layer — the dispatch engine, action primitives and **port
//! definitions** (traits).
//!
//! ## Responsibilities
//! - Run event firings through their ordered action chains (`EventEngine`),
//!   honoring abort/skip flow control and keeping per-event firing records
//! - Provide the built-in action set: sleeps, cross-event waits, recency and
//!   condition gates, constant and timed pin outputs, subprocess runs
//! - Parse textual action specs into constructed actions (`ActionFactory`)
//! - Define **port traits** that adapters must implement (driven/outbound):
//!   - `PinDriver` — drive and sample digital IO pins
//!   - `IndicatorStore` — read/write one-line status flags
//! - Provide **in-process infrastructure** (task group, raise/wait signal,
//!   sunrise calendar) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `porter-domain` only (plus `tokio` for timing, channels and
//! subprocesses). Never imports adapter crates. Adapters depend on *this*
//! crate, not the reverse.

pub mod actions;
pub mod engine;
pub mod ports;
pub mod signal;
pub mod solar;
pub mod tasks;
pub mod throttle;
