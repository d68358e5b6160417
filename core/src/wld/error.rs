//! Error types for fragment graph access.

use super::{FragmentId, FragmentKind};

/// Errors raised while resolving fragments of a world file.
#[derive(Debug, Clone, PartialEq)]
pub enum WldError {
    /// A reference points past the end of the fragment arena.
    MissingFragment(FragmentId),
    /// A reference points to a fragment of an unexpected kind.
    WrongKind {
        /// The referenced fragment.
        id: FragmentId,
        /// The kind the caller asked for.
        expected: FragmentKind,
        /// The kind actually stored.
        found: FragmentKind,
    },
    /// No fragment carries the given name.
    UnknownName(String),
    /// A mesh definition is internally inconsistent.
    MalformedMesh {
        /// Name of the mesh definition.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
    /// A skeleton definition is not a single rooted tree.
    MalformedSkeleton {
        /// Name of the skeleton definition.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl std::fmt::Display for WldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFragment(id) => write!(f, "fragment {id} does not exist"),
            Self::WrongKind {
                id,
                expected,
                found,
            } => write!(f, "fragment {id} is a {found:?}, expected a {expected:?}"),
            Self::UnknownName(name) => write!(f, "no fragment named '{name}'"),
            Self::MalformedMesh { name, reason } => {
                write!(f, "malformed mesh definition '{name}': {reason}")
            }
            Self::MalformedSkeleton { name, reason } => {
                write!(f, "malformed skeleton '{name}': {reason}")
            }
        }
    }
}

impl std::error::Error for WldError {}
