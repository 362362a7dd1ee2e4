//! Error types for building and validating BVHs.

use thiserror::Error;

/// Errors reported while preparing input geometry or building a [`Bvh`].
///
/// Structural defects found while flattening are not reported through this type:
/// they indicate a builder bug and panic instead.
///
/// [`Bvh`]: crate::bvh::Bvh
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BvhError {
    /// The triangle's vertices are (nearly) collinear, so its normal is undefined.
    #[error("Triangle {index} is degenerate: its vertices are collinear")]
    DegenerateTriangle { index: usize },

    /// No usable triangle was supplied for a mesh.
    #[error("Mesh {name:?} contains no non-degenerate triangles")]
    EmptyMesh { name: Option<String> },

    /// A triangle index buffer whose length is not a multiple of three.
    #[error("Index buffer length {len} is not a multiple of 3")]
    MalformedIndices { len: usize },

    /// A triangle index pointing past the end of the vertex buffer.
    #[error("Vertex index {index} out of bounds (vertex count: {vertex_count})")]
    IndexOutOfRange { index: usize, vertex_count: usize },

    /// A build parameter outside of its valid range.
    #[error("Invalid build configuration: {0}")]
    InvalidConfig(String),

    /// A built tree that breaks one of the structural invariants.
    #[error("Invariant violated at node {node}: {reason}")]
    InvariantViolation { node: usize, reason: String },
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, BvhError>;
