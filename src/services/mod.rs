//! Service layer: the object-store abstraction and the lifecycle pipeline.
//!
//! `store` defines the four-operation capability set the pipeline consumes;
//! `fs_store` is the production implementation, `memory_store` the test
//! double. `retention` is the pure classifier, `lifecycle` the runner, and
//! `stats` the read-only aggregate view.

pub mod fs_store;
pub mod lifecycle;
#[cfg(test)]
pub mod memory_store;
pub mod retention;
pub mod stats;
pub mod store;
