//! FocusTrack event pipeline.
//!
//! The session service records focus sessions and stages a domain event in
//! the same database transaction (transactional outbox). A publisher loop
//! forwards staged events to a topic-routed broker. The reward worker consumes
//! them, keeps per-day focus totals and awards the daily goal at most once per
//! user and day.
//!
//! # Module Organization
//!
//! - `domain` - Sessions, focus minutes, the daily goal and its records
//! - `ports` - Traits for stores, the broker and the session-of-record API
//! - `application` - Command handlers, the event writer and the aggregator
//! - `adapters` - PostgreSQL, Redis streams, HTTP and in-memory implementations
//! - `config` - Environment-driven configuration
//! - `telemetry` - Tracing subscriber setup
//! - `shutdown` - Signal handling for the long-running loops

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod shutdown;
pub mod telemetry;
