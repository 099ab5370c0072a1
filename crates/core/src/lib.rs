//! Domain logic for the Habita notification dispatch engine.
//!
//! This crate has zero internal dependencies so it can be used by the
//! persistence layer, the dispatch engine, and the API without cycles.
//! Everything here is pure: no I/O, no database, no clocks other than the
//! timestamps callers pass in.

pub mod analytics;
pub mod channel;
pub mod error;
pub mod event;
pub mod notification;
pub mod personalize;
pub mod preferences;
pub mod schedule;
pub mod selector;
pub mod template;
pub mod types;
