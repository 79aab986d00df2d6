//! Subjects a gathering pass can run for.

use crate::model::provider::SubjectShape;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque, extension-supplied group identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Group {
    name: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The entity one gathering pass is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Player { uuid: Uuid, name: String },
    Group(Group),
    Server,
}

impl Subject {
    pub fn player(uuid: Uuid, name: impl Into<String>) -> Self {
        Self::Player {
            uuid,
            name: name.into(),
        }
    }

    pub fn shape(&self) -> SubjectShape {
        match self {
            Self::Player { .. } => SubjectShape::Player,
            Self::Group(_) => SubjectShape::Group,
            Self::Server => SubjectShape::Server,
        }
    }

    /// Storage identity of this subject.
    pub fn key(&self) -> SubjectKey {
        match self {
            Self::Player { uuid, .. } => SubjectKey::Player(*uuid),
            Self::Group(group) => SubjectKey::Group(group.name().to_string()),
            Self::Server => SubjectKey::Server,
        }
    }

    pub fn player_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Player { uuid, .. } => Some(*uuid),
            _ => None,
        }
    }

    pub fn player_name(&self) -> Option<&str> {
        match self {
            Self::Player { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn group(&self) -> Option<&Group> {
        match self {
            Self::Group(group) => Some(group),
            _ => None,
        }
    }
}

impl Display for Subject {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Player { uuid, name } => write!(f, "player:{name}({uuid})"),
            Self::Group(group) => write!(f, "group:{}", group.name()),
            Self::Server => write!(f, "server"),
        }
    }
}

/// Storage key of a subject; values are keyed by
/// `(extension, provider, subject key)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubjectKey {
    Player(Uuid),
    Group(String),
    Server,
}

impl SubjectKey {
    pub fn shape(&self) -> SubjectShape {
        match self {
            Self::Player(_) => SubjectShape::Player,
            Self::Group(_) => SubjectShape::Group,
            Self::Server => SubjectShape::Server,
        }
    }
}
