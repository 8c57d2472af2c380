//! Core data models for the media lifecycle worker.
//!
//! These entities describe objects in the bucket, the outcome of a lifecycle
//! run, and aggregate storage statistics. They serialize naturally as JSON
//! via `serde`; the persisted run records live inside the bucket itself.

pub mod object;
pub mod run;
pub mod stats;
