//! Data models shared by every stage of the pipeline.
//!
//! A [`record::MaterialRecord`] is read from the catalog, turned into a
//! [`pattern::DiffractionPattern`] by a simulator, and encoded into a
//! [`sample::PointCloudSample`] that is persisted exactly once.

pub mod element;
pub mod ids;
pub mod pattern;
pub mod record;
pub mod sample;
