use serde::{Deserialize, Serialize};

/// Identifies one revision of a file (link) within a share.
///
/// The server addresses upload batches by this triple; the ids are opaque
/// server-issued strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRef {
    pub share_id: String,
    pub link_id: String,
    pub revision_id: String,
}

impl RevisionRef {
    pub fn new(
        share_id: impl Into<String>,
        link_id: impl Into<String>,
        revision_id: impl Into<String>,
    ) -> Self {
        Self {
            share_id: share_id.into(),
            link_id: link_id.into(),
            revision_id: revision_id.into(),
        }
    }
}

/// The identity an upload acts under: the user plus the sending address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub user_id: String,
    pub address_id: String,
}

impl UserRef {
    pub fn new(user_id: impl Into<String>, address_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            address_id: address_id.into(),
        }
    }
}
