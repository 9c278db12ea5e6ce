//! Core types and error taxonomy for the Scout scan orchestrator.
//!
//! This crate provides the foundational types shared across the workspace:
//!
//! - **Types**: Assets, jobs, findings, metrics, providers, and change
//!   records
//! - **Errors**: The central error taxonomy with [`Error`]
//!
//! # Example
//!
//! ```rust,ignore
//! use scout_core::{Job, JobStatus, Result};
//!
//! fn check(job: &Job) -> Result<()> {
//!     if job.status.is_terminal() {
//!         println!("{} finished as {}", job.id, job.status);
//!     }
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/scout-core/0.3.0")]

mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
