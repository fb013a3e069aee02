//! Crystallographic primitives: unit cells, reciprocal lattices and the CIF subset
//! needed to turn catalog rows into atomic sites.

pub mod lattice;
pub mod structure;
