//! Point-cloud feature encoding: one diffraction pattern in, one fixed-shape normalized
//! channels-first tensor out.

pub mod encoder;
