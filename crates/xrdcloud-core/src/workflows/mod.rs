//! # Workflows Module
//!
//! End-to-end procedures of the pipeline:
//!
//! - [`materialize`] - catalog to per-material point-cloud artifacts, optionally keeping
//!   the intermediate pattern table
//! - [`compute`] - catalog to the intermediate pattern table only
//! - [`generate`] - intermediate pattern table to point-cloud artifacts
//!
//! Each workflow returns a [`crate::engine::report::RunReport`]. Callers own the output
//! space reset; no workflow deletes anything.

use crate::core::xrd::kinematic::KinematicSimulator;
use crate::core::xrd::simulator::{DiffractionSimulator, TimeoutSimulator};
use crate::engine::config::SimulationConfig;

pub mod compute;
pub mod generate;
pub mod materialize;

/// The built-in kinematic simulator, wrapped in a per-record timeout when one is set.
pub fn default_simulator(config: &SimulationConfig) -> Box<dyn DiffractionSimulator> {
    let simulator = KinematicSimulator::new(config.max_reflections, config.intensity_floor);
    match config.record_timeout {
        Some(timeout) => Box::new(TimeoutSimulator::new(simulator, timeout)),
        None => Box::new(simulator),
    }
}
