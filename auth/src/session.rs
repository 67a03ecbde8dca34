//! Session identity types.

use serde::{Deserialize, Serialize};

/// The authenticated user, and the shape persisted as the session marker.
///
/// `id` is the opaque identifier supplied by the remote backend; local-only
/// accounts have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl User {
    /// A local-only identity, no remote id.
    pub fn local(email: &str) -> Self {
        Self {
            email: email.to_string(),
            id: None,
        }
    }

    /// An identity established by the remote backend.
    pub fn remote(email: &str, id: &str) -> Self {
        Self {
            email: email.to_string(),
            id: Some(id.to_string()),
        }
    }
}
