//! Cost and rate governance for the Tutor engine.
//!
//! The [`Governor`] decides, before any pipeline work happens, whether a
//! request is admitted: fixed-window request counters per `(user, kind)`
//! plus a soft daily token-spend budget. Counters live behind the
//! [`CounterStore`] trait so the governor runs against an in-memory map in
//! tests and a persistent store in production without changing call sites.
//!
//! Denial is a value ([`Admission::Denied`]), never an error — being rate
//! limited is an expected, frequent outcome.

pub mod counters;
pub mod governor;

pub use counters::{CounterStore, InMemoryCounterStore, WindowUsage};
pub use governor::{Admission, Governor, GovernorConfig, Quota, UsageKind};
