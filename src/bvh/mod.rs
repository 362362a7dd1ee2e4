//! This module defines a [`Bvh`] over the triangles of one mesh.
//!

mod bvh_impl;
mod bvh_node;
mod iter;
mod split;
mod stats;

pub use self::bvh_impl::*;
pub use self::bvh_node::*;
pub use self::iter::*;
pub use self::stats::*;
