//! # porter-domain
//!
//! Pure domain model for the porter event-action automation hub.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Events** (one firing of a named event, with its payload and
//!   the timestamps of this and the previous firing)
//! - Define **ActionOutcome** (the flow-control result an action returns:
//!   continue, abort the chain, or skip the next N steps)
//! - Define the **Configuration Store** (typed key definitions in a
//!   wildcard-addressable namespace tree, concrete values in a parallel
//!   tree, default/override/cast semantics)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod action;
pub mod config;
pub mod event;
