//! Persistence store for the Scout orchestration core.
//!
//! Durable collections for assets, jobs, findings, and metrics, behind the
//! [`Store`] trait. Job and finding mutations are observable as typed
//! [`ChangeRecord`](scout_core::ChangeRecord) streams, which is what the
//! change feed in `scout-gateway` consumes.
//!
//! [`MemoryStore`] is the reference implementation: per-document atomicity,
//! per-collection change ordering, and an optional degraded mode without
//! change streams for deployments (and tests) that cannot support them.

#![doc(html_root_url = "https://docs.rs/scout-store/0.3.0")]

mod memory;
mod store;

pub use memory::MemoryStore;
pub use store::Store;
