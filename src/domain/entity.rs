//! Entity identity, versioning and lifecycle
//!
//! Every persisted entity carries an [`EntityMeta`]: a stable id, the version
//! last written to storage, and whether the entity is still active. Repositories
//! compare the carried version against the stored one on update.

use crate::{ValidationError, ValidationResult};
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityState {
    /// The entity may be read and modified
    #[default]
    Active,

    /// The entity was deleted and must no longer be modified
    Discarded,
}

impl EntityState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Converts the state to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Discarded => "discarded",
        }
    }

    /// Parses a state from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "discarded" => Some(Self::Discarded),
            _ => None,
        }
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Identity and version bookkeeping shared by all entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityMeta {
    id: Uuid,
    version: u32,
    state: EntityState,
}

impl EntityMeta {
    /// Metadata for a freshly created, never persisted entity
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            version: 0,
            state: EntityState::Active,
        }
    }

    /// Metadata for an entity loaded from storage
    pub fn restore(id: Uuid, version: u32, state: EntityState) -> Self {
        Self { id, version, state }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    /// Fails if the entity has been discarded
    pub fn ensure_active(&self, entity: &'static str) -> ValidationResult<()> {
        match self.state {
            EntityState::Active => Ok(()),
            EntityState::Discarded => Err(ValidationError::Discarded {
                entity,
                id: self.id,
            }),
        }
    }

    /// Advances the version after a successful write
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    pub fn discard(&mut self) {
        self.state = EntityState::Discarded;
    }
}

impl Default for EntityMeta {
    fn default() -> Self {
        Self::new()
    }
}
