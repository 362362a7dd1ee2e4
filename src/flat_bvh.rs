//! This module exports methods to flatten the [`Bvh`] into index-addressed records and
//! traverse them iteratively.
//!
//! The record layouts are fixed: a traversal routine that memory-maps the buffers
//! (e.g. a GPU shader) depends on the exact field order and widths, so any change to
//! them is a breaking change.
//!
//! [`Bvh`]: crate::bvh::Bvh

use std::fmt;

use bytemuck::{Pod, Zeroable};

use crate::aabb::Bounded;
use crate::bvh::{Bvh, BvhNode};
use crate::ray::{intersect_box, intersect_triangle, Ray};
use crate::triangle::{PrecomputedTriangle, Triangle};
use crate::utils::to_record_index;
use crate::{Point3, Real, Vector3};

/// Child index of a leaf record.
pub const NO_CHILD: i32 = -1;

/// One node of a flattened BVH. 44 bytes, no padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct NodeRecord {
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],

    /// Absolute index of the first child, or [`NO_CHILD`] for a leaf.
    pub child_a_index: i32,

    /// Absolute index of the second child, or [`NO_CHILD`] for a leaf.
    pub child_b_index: i32,

    /// Absolute index of the first triangle of this node's subtree.
    pub triangle_start_index: i32,

    /// Number of triangles held by a leaf. Always 0 for interior nodes.
    pub num_triangles: i32,

    pub depth: i32,
}

impl NodeRecord {
    pub fn is_leaf(&self) -> bool {
        self.child_a_index == NO_CHILD
    }
}

/// The precomputed intersection data of one triangle. 76 bytes, no padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TriangleRecord {
    pub q: [f32; 3],
    pub u: [f32; 3],
    pub v: [f32; 3],
    /// Unnormalized normal `u × v`.
    pub n: [f32; 3],
    pub plane_offset: f32,
    pub w: [f32; 3],
    pub normal: [f32; 3],
}

impl From<&Triangle> for TriangleRecord {
    fn from(triangle: &Triangle) -> TriangleRecord {
        TriangleRecord {
            q: triangle.q().coords.into(),
            u: triangle.u().into(),
            v: triangle.v().into(),
            n: triangle.cross().into(),
            plane_offset: triangle.plane_offset(),
            w: triangle.w().into(),
            normal: triangle.normal().into(),
        }
    }
}

impl PrecomputedTriangle for TriangleRecord {
    fn q(&self) -> Point3 {
        Point3::from(self.q)
    }

    fn u(&self) -> Vector3 {
        Vector3::from(self.u)
    }

    fn v(&self) -> Vector3 {
        Vector3::from(self.v)
    }

    fn normal(&self) -> Vector3 {
        Vector3::from(self.normal)
    }

    fn plane_offset(&self) -> Real {
        self.plane_offset
    }

    fn w(&self) -> Vector3 {
        Vector3::from(self.w)
    }
}

/// The flattened records of one mesh, addressed by absolute index: node `i` of the
/// shared buffer is `nodes[i - node_start_index]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatBvh {
    pub nodes: Vec<NodeRecord>,
    pub triangles: Vec<TriangleRecord>,
    pub node_start_index: usize,
    pub triangle_start_index: usize,
}

impl FlatBvh {
    /// Absolute index of the root record.
    pub fn root_index(&self) -> usize {
        self.node_start_index
    }

    /// The node records as raw bytes, ready to be uploaded.
    pub fn nodes_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// The triangle records as raw bytes, ready to be uploaded.
    pub fn triangles_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }

    /// Returns the absolute indices of all triangles hit by `ray`.
    ///
    /// # Examples
    /// ```
    /// use meshbvh::bvh::Bvh;
    /// use meshbvh::config::BuildConfig;
    /// use meshbvh::mesh_chunk::MeshChunk;
    /// use meshbvh::ray::Ray;
    /// use meshbvh::{Point3, Vector3};
    ///
    /// let corners = [[
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// ]];
    /// let chunk = MeshChunk::from_vertices(None, &corners).unwrap();
    /// let bvh = Bvh::build(chunk, &BuildConfig::default()).unwrap();
    ///
    /// // This mesh starts at triangle 40 of a shared buffer.
    /// let flat = bvh.flatten(7, 40);
    /// let ray = Ray::new(Point3::new(0.25, 0.25, 1.0), Vector3::new(0.0, 0.0, -1.0));
    /// assert_eq!(flat.traverse(&ray), vec![40]);
    /// ```
    pub fn traverse(&self, ray: &Ray) -> Vec<usize> {
        walk(
            ray,
            &self.nodes,
            self.node_start_index,
            &self.triangles,
            self.triangle_start_index,
            self.node_start_index,
        )
    }
}

/// Prints one line per node record.
impl fmt::Display for FlatBvh {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            writeln!(
                f,
                "{}\tchildren ({}, {})\ttriangles {}+{}\tdepth {}",
                self.node_start_index + i,
                node.child_a_index,
                node.child_b_index,
                node.triangle_start_index,
                node.num_triangles,
                node.depth
            )?;
        }
        Ok(())
    }
}

/// Flattens `bvh` into pre-order node records starting at `node_start_index`, and the
/// leaf triangles, in visiting order, starting at `triangle_start_index`.
///
/// A first pass enumerates the nodes in pre-order and assigns their flat indices; a
/// second pass emits the records using the already assigned child indices.
///
/// # Panics
///
/// Panics on a leaf without triangles, which only a defective builder produces, or if
/// an index does not fit into an `i32` record field.
#[tracing::instrument(level = "debug", skip(bvh), fields(nodes = bvh.nodes().len()))]
pub fn flatten(bvh: &Bvh, node_start_index: usize, triangle_start_index: usize) -> FlatBvh {
    let nodes = bvh.nodes();

    let mut order = Vec::with_capacity(nodes.len());
    let mut flat_index = vec![0; nodes.len()];
    let mut stack = vec![0];
    while let Some(index) = stack.pop() {
        flat_index[index] = node_start_index + order.len();
        order.push(index);
        if let Some((child_a, child_b)) = nodes[index].children() {
            stack.push(child_b);
            stack.push(child_a);
        }
    }

    let mut node_records = Vec::with_capacity(order.len());
    let mut triangle_records = Vec::new();
    for &index in &order {
        let node = &nodes[index];
        let bounds = node.bounds();
        let triangle_start = triangle_start_index + triangle_records.len();
        let (child_a_index, child_b_index, num_triangles) = match node {
            BvhNode::Node {
                child_a_index,
                child_b_index,
                ..
            } => (
                to_record_index(flat_index[*child_a_index]),
                to_record_index(flat_index[*child_b_index]),
                0,
            ),
            BvhNode::Leaf { chunk, .. } => {
                if chunk.is_empty() {
                    panic!(
                        "Leaf {} of mesh {:?} holds no triangles.",
                        index,
                        chunk.name()
                    );
                }
                triangle_records.extend(chunk.triangles().iter().map(TriangleRecord::from));
                (NO_CHILD, NO_CHILD, to_record_index(chunk.len()))
            }
        };
        node_records.push(NodeRecord {
            bounds_min: bounds.min.coords.into(),
            bounds_max: bounds.max.coords.into(),
            child_a_index,
            child_b_index,
            triangle_start_index: to_record_index(triangle_start),
            num_triangles,
            depth: to_record_index(node.depth()),
        });
    }

    tracing::debug!(
        nodes = node_records.len(),
        triangles = triangle_records.len(),
        "flattened BVH"
    );
    FlatBvh {
        nodes: node_records,
        triangles: triangle_records,
        node_start_index,
        triangle_start_index,
    }
}

/// Traverses flat node and triangle buffers, both addressed by absolute index, from the
/// record at `root_index`. Returns the absolute indices of all triangles hit by `ray`.
///
/// This is an explicit-stack depth-first walk: a node whose box is missed is skipped with
/// its whole subtree, and triangles are only tested at leaves.
///
/// # Panics
///
/// Panics if a record refers to an index outside of the buffers.
pub fn traverse_flat_bvh(
    ray: &Ray,
    nodes: &[NodeRecord],
    triangles: &[TriangleRecord],
    root_index: usize,
) -> Vec<usize> {
    walk(ray, nodes, 0, triangles, 0, root_index)
}

fn walk(
    ray: &Ray,
    nodes: &[NodeRecord],
    node_base: usize,
    triangles: &[TriangleRecord],
    triangle_base: usize,
    root_index: usize,
) -> Vec<usize> {
    let mut hits = Vec::new();
    let mut stack = vec![root_index];
    while let Some(index) = stack.pop() {
        let node = &nodes[index - node_base];
        let (min, max) = (Point3::from(node.bounds_min), Point3::from(node.bounds_max));
        if !intersect_box(&min, &max, ray) {
            continue;
        }

        if node.is_leaf() {
            let start = node.triangle_start_index as usize;
            let end = start + node.num_triangles as usize;
            for triangle_index in start..end {
                if intersect_triangle(&triangles[triangle_index - triangle_base], ray) {
                    hits.push(triangle_index);
                }
            }
        } else {
            stack.push(node.child_b_index as usize);
            stack.push(node.child_a_index as usize);
        }
    }
    hits
}
