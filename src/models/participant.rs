//! Participant identity: authenticated user or anonymous guest.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Who ran a tournament. Stable for the lifetime of a session.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ParticipantId {
    User(String),
    Guest(Uuid),
}

impl ParticipantId {
    /// A fresh random guest identity.
    pub fn new_guest() -> Self {
        ParticipantId::Guest(Uuid::new_v4())
    }

    /// True for authenticated users; members-only rankings keep only these.
    pub fn is_member(&self) -> bool {
        matches!(self, ParticipantId::User(_))
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipantId::User(id) => write!(f, "user:{}", id),
            ParticipantId::Guest(id) => write!(f, "guest:{}", id),
        }
    }
}
