//! Real-time propagation for the Scout orchestration core.
//!
//! Two delivery channels, fed by the same storage writes:
//!
//! - **Push**: [`ChangeFeed`] tails the store's change streams and
//!   republishes each record on the typed [`EventBus`]; [`Gateway`] fans
//!   the events out to connected clients with per-event scoping (global
//!   broadcasts, job-room log lines, requester-only cancel acknowledgements
//!   and errors).
//! - **Pull**: [`progress_stream`] polls one job's latest `progress`
//!   metric sample and yields each new sample as a [`StreamFrame`],
//!   exactly once.
//!
//! Both channels read what the job record manager wrote; neither is a
//! source of truth, and a client that misses events recovers by reading
//! the job document.

#![doc(html_root_url = "https://docs.rs/scout-gateway/0.3.0")]

mod events;
mod fanout;
mod feed;
mod messages;
mod poll;

pub use events::{DomainEvent, EventBus};
pub use fanout::Gateway;
pub use feed::ChangeFeed;
pub use messages::{ServerMessage, StreamFrame};
pub use poll::{progress_stream, DEFAULT_POLL_PERIOD};
