//! # xrdcloud Core Library
//!
//! Turns a catalog of crystal structures into fixed-shape point-cloud feature tensors by
//! simulating an X-ray diffraction pattern per material and encoding its reflections.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three-layer split used across our tooling:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`MaterialRecord`, `DiffractionPattern`,
//!   `PointCloudSample`), crystal structure parsing, the diffraction simulator seam, the
//!   point-cloud feature encoder and all file formats.
//!
//! - **[`engine`]: The Logic Core.** Stateful orchestration: the batch dispatcher that fans
//!   records out to a worker pool in memory-bounded macro-chunks, the integrity guard that
//!   refuses to overwrite artifacts, configuration, progress reporting and run reports.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures (`materialize`, `compute`,
//!   `generate`) tying `core` and `engine` together.

pub mod core;
pub mod engine;
pub mod workflows;
