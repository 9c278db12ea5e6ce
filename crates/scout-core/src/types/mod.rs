mod asset;
mod change;
mod finding;
mod job;
mod metric;
mod provider;

pub use asset::*;
pub use change::*;
pub use finding::*;
pub use job::*;
pub use metric::*;
pub use provider::*;

/// Free-form metadata attached to assets, jobs, and findings
pub type Metadata = serde_json::Map<String, serde_json::Value>;
