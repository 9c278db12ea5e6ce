use serde::{Deserialize, Serialize};

/// Storage-level mutation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// Document created
    Insert,
    /// Document replaced or patched
    Update,
    /// Document removed
    Delete,
}

/// A single observed mutation on a stored collection.
///
/// Derived, never persisted. `document` carries the full resulting document
/// when the store makes it available (always for insert/update in the
/// in-memory store, never for delete).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord<T> {
    /// Mutation kind
    pub op: ChangeOp,

    /// Affected document key
    pub key: String,

    /// Full resulting document, when available
    #[serde(default)]
    pub document: Option<T>,
}

impl<T> ChangeRecord<T> {
    /// A change record carrying the resulting document
    #[must_use]
    pub fn with_document(op: ChangeOp, key: impl Into<String>, document: T) -> Self {
        Self {
            op,
            key: key.into(),
            document: Some(document),
        }
    }
}
