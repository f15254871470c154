//! Error types for hemesh.
//!
//! This module defines all error types used throughout the library. Topology
//! operations that can legitimately be "not applicable" (a collapse that would
//! pinch a boundary, a split on a halfedge that is not in the mesh) return
//! `Option` or `bool` instead; the variants here cover inconsistent state,
//! malformed input and I/O.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during mesh operations.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has fewer than three distinct corners.
    #[error("face {face} is degenerate (fewer than three distinct vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// The mesh has non-manifold topology.
    #[error("mesh has non-manifold topology: {details}")]
    NonManifold {
        /// Description of the non-manifold condition.
        details: String,
    },

    /// Invalid mesh state for the requested operation.
    #[error("invalid mesh state: {0}")]
    InvalidState(String),

    /// An element id does not refer to a registered element of this mesh.
    #[error("{kind} with key {key} is not part of the mesh")]
    ElementNotInMesh {
        /// Element kind ("vertex", "halfedge", "face").
        kind: &'static str,
        /// Key of the offending element.
        key: u64,
    },

    /// Attempt to pair a halfedge that already has a different pair.
    #[error("halfedge {he} is already paired with halfedge {pair}")]
    AlreadyPaired {
        /// Key of the halfedge being paired.
        he: u64,
        /// Key of its current pair.
        pair: u64,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create an invalid state error from anything printable.
    pub fn invalid_state<T: std::fmt::Display>(details: T) -> Self {
        MeshError::InvalidState(details.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = MeshError::invalid_param("epsilon", -1.0, "must be non-negative");
        assert_eq!(
            e.to_string(),
            "invalid parameter: epsilon = -1 (must be non-negative)"
        );

        let e = MeshError::AlreadyPaired { he: 3, pair: 7 };
        assert_eq!(e.to_string(), "halfedge 3 is already paired with halfedge 7");
    }
}
