//! # Engine Module
//!
//! Stateful orchestration of a materialization run.
//!
//! ## Overview
//!
//! The engine takes an ordered set of records, fans them out to a worker pool in
//! memory-bounded macro-chunks, isolates per-record failures, and hands each completed
//! macro-chunk to a sink that refuses to overwrite existing artifacts.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Pipeline parameters, builder and validation
//! - **Dispatch** ([`dispatcher`]) - Two-level balanced partitioning, the worker pool and
//!   order-preserving fan-in
//! - **Cancellation** ([`cancel`]) - Cooperative stop signal shared by all workers
//! - **Integrity Guard & Sink** ([`sink`]) - Output space reset and exactly-once artifact
//!   persistence
//! - **Run Reports** ([`report`]) - Successes, skipped records and the abort point
//! - **Progress Monitoring** ([`progress`]) - Progress events for front-ends
//! - **Error Handling** ([`error`]) - Run-level and record-level error types
//!
//! ## Failure Model
//!
//! - Record-level failures (unparseable structures, simulator errors, timeouts, shape
//!   errors, panics) are reported as skipped records; the rest of the chunk survives.
//! - A fatal simulator backend error cancels in-flight work and aborts the run.
//! - A duplicate artifact aborts the run. Chunks flushed before the abort stay on disk.

pub mod cancel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod progress;
pub mod report;
pub mod sink;
pub(crate) mod utils;
