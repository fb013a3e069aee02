//! Diffraction simulation seam.
//!
//! The pipeline only depends on [`simulator::DiffractionSimulator`]; the
//! [`kinematic::KinematicSimulator`] is a coarse built-in adapter so the pipeline can run
//! without an external diffraction library.

pub mod form_factor;
pub mod kinematic;
pub mod simulator;
pub mod wavelength;
