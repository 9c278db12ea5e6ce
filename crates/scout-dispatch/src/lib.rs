//! Job admission and dispatch for the Scout orchestration core.
//!
//! Three cooperating pieces, in control-flow order:
//!
//! - [`AdmissionGate`] decides whether a job may exist at all: the target
//!   must be in scope, and intrusive providers require completed ownership
//!   verification.
//! - [`JobRecordManager`] is the single writer of job and finding state;
//!   it enforces the lifecycle state machine and the finding dedup
//!   contract, and is the callback surface executors report through.
//! - [`Dispatcher`] owns one [`ProviderQueue`] per provider, each with its
//!   own concurrency limit, sliding-window rate limit, retry policy, and
//!   best-effort cancellation.
//!
//! [`ScanService`] composes the three behind a single submit/cancel call.

#![doc(html_root_url = "https://docs.rs/scout-dispatch/0.3.0")]

mod config;
mod dispatcher;
mod executor;
mod gate;
mod queue;
mod records;
mod service;

pub use config::{QueueConfig, RetentionConfig, RetryConfig};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use executor::{CancelFlag, ExecutionContext, Executor};
pub use gate::AdmissionGate;
pub use queue::{CancelOutcome, ProviderQueue, QueueJobState};
pub use records::JobRecordManager;
pub use service::{JobTicket, ScanService};
