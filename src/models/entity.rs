use serde::Serialize;

use crate::identity::{EntityID, ParseEntityIdError};

/// A registered entity row: the integer storage key paired with the
/// canonical identity it was registered under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    /// Integer primary key assigned by the store.
    pub id: i64,
    /// Canonical identity string.
    pub canonical_id: String,
}

impl Entity {
    /// Parses the canonical string back into a structured [`EntityID`].
    pub fn entity_id(&self) -> Result<EntityID, ParseEntityIdError> {
        EntityID::parse(&self.canonical_id)
    }
}
