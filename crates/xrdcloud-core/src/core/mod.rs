//! # Core Module
//!
//! Stateless building blocks of the diffraction-to-point-cloud pipeline.
//!
//! - **Data Models** ([`models`]) - Material ids, catalog records, diffraction patterns,
//!   point-cloud samples and the tracked element table
//! - **Crystallography** ([`crystal`]) - Unit cells, reciprocal lattices and CIF parsing
//! - **Diffraction** ([`xrd`]) - Wavelength presets, the simulator adapter trait and a
//!   kinematic reference simulator
//! - **Feature Encoding** ([`encoding`]) - Reflection set to normalized channels-first tensor
//! - **File I/O** ([`io`]) - Catalog, intermediate pattern table, per-material artifacts and
//!   the dataset reader used by downstream consumers

pub mod crystal;
pub mod encoding;
pub mod io;
pub mod models;
pub mod xrd;
