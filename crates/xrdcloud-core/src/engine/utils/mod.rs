//! Helpers shared by the engine's scheduling code.

pub mod partition;
