//! A crate which builds bounding volume hierarchies over triangle meshes and flattens
//! them into index-addressed arrays for ray traversal.
//!
//! ## About
//!
//! Ray tracing a mesh naively means testing every ray against every triangle. A BVH
//! groups triangles into nested axis-aligned boxes so that a traversal can reject a
//! whole group with a single box test. This crate builds such a tree by recursively
//! splitting a [`MeshChunk`] at sampled candidate planes, ranked by a surface area
//! heuristic, and flattens the tree into two parallel arrays ([`NodeRecord`]s and
//! [`TriangleRecord`]s) whose layout is fixed so they can be uploaded to a GPU buffer
//! as-is.
//!
//! A CPU reference intersector is included to validate the tree independently of any
//! GPU traversal.
//!
//! ## Example
//!
//! ```
//! use meshbvh::bvh::Bvh;
//! use meshbvh::config::BuildConfig;
//! use meshbvh::mesh_chunk::MeshChunk;
//! use meshbvh::ray::Ray;
//! use meshbvh::triangle::Triangle;
//! use meshbvh::{Point3, Vector3};
//!
//! let mut triangles = Vec::new();
//! for i in 0..100 {
//!     let x = i as f32;
//!     triangles.push(Triangle::new(
//!         Point3::new(x, 0.0, 0.0),
//!         Point3::new(x + 1.0, 0.0, 0.0),
//!         Point3::new(x, 1.0, 0.0),
//!     ).unwrap());
//! }
//!
//! let chunk = MeshChunk::new(Some("strip".to_string()), triangles).unwrap();
//! let bvh = Bvh::build(chunk, &BuildConfig::default()).unwrap();
//!
//! let ray = Ray::new(Point3::new(10.25, 0.25, 5.0), Vector3::new(0.0, 0.0, -1.0));
//! assert_eq!(bvh.hit_triangles(&ray).len(), 1);
//!
//! let flat = bvh.flatten(0, 0);
//! assert_eq!(flat.traverse(&ray).len(), 1);
//! ```
//!
//! ## Features
//!
//! - `rayon` (default **enabled**) - builds large subtrees in parallel
//! - `cli` (default **enabled**) - the `meshbvh` command line tool
//! - `serde` (default **disabled**) - adds `Serialize` and `Deserialize` implementations
//!   for the configuration types
//!
//! [`MeshChunk`]: mesh_chunk::MeshChunk
//! [`NodeRecord`]: flat_bvh::NodeRecord
//! [`TriangleRecord`]: flat_bvh::TriangleRecord

pub use nalgebra;

/// Float type used by this crate.
pub type Real = f32;

/// Point math type used by this crate. Type alias for [`nalgebra::Point3`].
pub type Point3 = nalgebra::Point3<Real>;

/// Vector math type used by this crate. Type alias for [`nalgebra::Vector3`].
pub type Vector3 = nalgebra::Vector3<Real>;

/// A minimal floating value used as a lower bound.
pub const EPSILON: Real = 0.00001;

pub mod aabb;
pub mod axis;
pub mod bvh;
pub mod config;
pub mod error;
pub mod flat_bvh;
pub mod mesh_chunk;
pub mod ray;
pub mod scene;
pub mod triangle;
mod utils;

#[cfg(test)]
mod testbase;

pub use error::{BvhError, Result};
