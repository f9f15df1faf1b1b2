// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy shared by every store operation.

use std::path::PathBuf;

use thiserror::Error;

use crate::ids::NoteId;

/// Coarse classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any mutation happened.
    Validation,
    /// The addressed note, collection, binding or file does not exist.
    NotFound,
    /// The filesystem refused a read/write, or a document is malformed.
    Storage,
}

/// Error type for every store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A metainfo value is outside the allow-list declared for its field.
    #[error("value {value} is not allowed for field `{field}`")]
    RuleViolation {
        /// Field name.
        field: String,
        /// Rendered offending value.
        value: String,
    },
    /// The manifest does not grant the requested capability.
    #[error("capability denied: {0}")]
    CapabilityDenied(String),
    /// Reindex target is taken and no reindex mode was given.
    #[error("target id {0} is occupied")]
    TargetOccupied(NoteId),
    /// A collection, module declaration or attachment of that name exists already.
    #[error("`{0}` already exists")]
    AlreadyExists(String),
    /// Slot already holds a file and overwrite was not requested.
    #[error("slot `{0}` is occupied")]
    SlotOccupied(String),
    /// Name is unusable as a collection or module name.
    #[error("invalid name `{0}`")]
    InvalidName(String),
    /// Record ids are positive; the transient id cannot be addressed.
    #[error("invalid note id {0}")]
    InvalidId(NoteId),
    /// Manifest carries a type tag with no registered schema.
    #[error("unknown type `{0}`")]
    UnknownType(String),
    /// No note with that id in the collection.
    #[error("note {0} not found")]
    NoteNotFound(NoteId),
    /// No collection at that location.
    #[error("collection not found: {}", .0.display())]
    CollectionNotFound(PathBuf),
    /// A binding target does not resolve to a live note.
    #[error("bind target `{0}` not found")]
    BindTargetNotFound(String),
    /// Attachment file is not attached to the note.
    #[error("attachment `{0}` not found")]
    AttachmentNotFound(String),
    /// Slot is not declared by the manifest.
    #[error("slot `{0}` not declared")]
    SlotNotFound(String),
    /// Filesystem failure.
    #[error("storage failure at {}: {source}", .path.display())]
    Io {
        /// Path the operation touched.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Document could not be encoded or decoded.
    #[error("malformed document {}: {source}", .path.display())]
    Malformed {
        /// Path of the document.
        path: PathBuf,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RuleViolation { .. }
            | Self::CapabilityDenied(_)
            | Self::TargetOccupied(_)
            | Self::AlreadyExists(_)
            | Self::SlotOccupied(_)
            | Self::InvalidName(_)
            | Self::InvalidId(_)
            | Self::UnknownType(_) => ErrorKind::Validation,
            Self::NoteNotFound(_)
            | Self::CollectionNotFound(_)
            | Self::BindTargetNotFound(_)
            | Self::AttachmentNotFound(_)
            | Self::SlotNotFound(_) => ErrorKind::NotFound,
            Self::Io { .. } | Self::Malformed { .. } => ErrorKind::Storage,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Shorthand result alias for store operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(
            StoreError::TargetOccupied(NoteId(3)).kind(),
            ErrorKind::Validation
        );
        assert_eq!(StoreError::NoteNotFound(NoteId(3)).kind(), ErrorKind::NotFound);
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(StoreError::io("/x", io).kind(), ErrorKind::Storage);
    }

    #[test]
    fn io_errors_name_the_path() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let msg = StoreError::io("/data/t/1.json", io).to_string();
        assert!(msg.contains("/data/t/1.json"));
        assert!(msg.contains("disk full"));
    }
}
