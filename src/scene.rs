//! This module defines [`SceneBuffers`], which packs the flattened trees of several
//! meshes into one shared pair of node and triangle buffers.

use crate::aabb::{Bounded, Bounds};
use crate::bvh::{Bvh, BvhStats};
use crate::config::BuildConfig;
use crate::error::Result;
use crate::flat_bvh::{traverse_flat_bvh, NodeRecord, TriangleRecord};
use crate::mesh_chunk::MeshChunk;
use crate::ray::Ray;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Where one mesh lives inside the shared buffers, together with its CPU-side tree.
#[derive(Debug, Clone)]
pub struct MeshEntry {
    pub name: Option<String>,

    /// Absolute index of the mesh's root node record.
    pub root_node_index: usize,
    pub node_count: usize,

    /// Absolute index of the mesh's first triangle record.
    pub triangle_start_index: usize,
    pub triangle_count: usize,

    pub bounds: Bounds,
    pub stats: BvhStats,

    /// The tree the records were flattened from, kept for debugging.
    pub bvh: Bvh,
}

/// Node and triangle records of several meshes, each mesh occupying a contiguous range
/// of both buffers.
///
/// # Examples
/// ```
/// use meshbvh::config::BuildConfig;
/// use meshbvh::mesh_chunk::MeshChunk;
/// use meshbvh::scene::SceneBuffers;
/// use meshbvh::Point3;
///
/// let triangle = |x: f32| [
///     Point3::new(x, 0.0, 0.0),
///     Point3::new(x + 1.0, 0.0, 0.0),
///     Point3::new(x, 1.0, 0.0),
/// ];
/// let meshes = vec![
///     MeshChunk::from_vertices(Some("left".to_string()), &[triangle(0.0)]).unwrap(),
///     MeshChunk::from_vertices(Some("right".to_string()), &[triangle(5.0), triangle(7.0)]).unwrap(),
/// ];
///
/// let scene = SceneBuffers::build(meshes, &BuildConfig::default()).unwrap();
/// assert_eq!(scene.meshes()[1].triangle_start_index, 1);
/// assert_eq!(scene.triangles().len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SceneBuffers {
    nodes: Vec<NodeRecord>,
    triangles: Vec<TriangleRecord>,
    meshes: Vec<MeshEntry>,
}

impl SceneBuffers {
    /// Creates empty buffers.
    pub fn new() -> SceneBuffers {
        SceneBuffers::default()
    }

    /// Builds a tree for `chunk` and appends its records behind those already present.
    pub fn add_mesh(&mut self, chunk: MeshChunk, config: &BuildConfig) -> Result<&MeshEntry> {
        let bvh = Bvh::build(chunk, config)?;
        Ok(self.push_bvh(bvh))
    }

    /// Builds the trees of all `meshes`, in parallel with the `rayon` feature, and
    /// flattens them into shared buffers in input order.
    ///
    /// Fails with the first error in input order; no buffers are returned then.
    #[tracing::instrument(level = "debug", skip_all, fields(meshes = meshes.len()))]
    pub fn build(meshes: Vec<MeshChunk>, config: &BuildConfig) -> Result<SceneBuffers> {
        #[cfg(feature = "rayon")]
        let trees: Vec<Result<Bvh>> = meshes
            .into_par_iter()
            .map(|chunk| Bvh::build(chunk, config))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let trees: Vec<Result<Bvh>> = meshes
            .into_iter()
            .map(|chunk| Bvh::build(chunk, config))
            .collect();

        let mut scene = SceneBuffers::new();
        for bvh in trees {
            scene.push_bvh(bvh?);
        }
        tracing::debug!(
            nodes = scene.nodes.len(),
            triangles = scene.triangles.len(),
            "built scene buffers"
        );
        Ok(scene)
    }

    fn push_bvh(&mut self, bvh: Bvh) -> &MeshEntry {
        let flat = bvh.flatten(self.nodes.len(), self.triangles.len());
        let entry = MeshEntry {
            name: bvh.root().name().map(str::to_owned),
            root_node_index: flat.root_index(),
            node_count: flat.nodes.len(),
            triangle_start_index: flat.triangle_start_index,
            triangle_count: flat.triangles.len(),
            bounds: bvh.root().bounds(),
            stats: bvh.stats(),
            bvh,
        };
        tracing::trace!(
            mesh = ?entry.name,
            root = entry.root_node_index,
            triangles = entry.triangle_count,
            "appended mesh"
        );

        self.nodes.extend(flat.nodes);
        self.triangles.extend(flat.triangles);
        self.meshes.push(entry);
        &self.meshes[self.meshes.len() - 1]
    }

    pub fn nodes(&self) -> &[NodeRecord] {
        &self.nodes
    }

    pub fn triangles(&self) -> &[TriangleRecord] {
        &self.triangles
    }

    pub fn meshes(&self) -> &[MeshEntry] {
        &self.meshes
    }

    /// The node records as raw bytes, ready to be uploaded.
    pub fn nodes_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// The triangle records as raw bytes, ready to be uploaded.
    pub fn triangles_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }

    /// Returns the absolute indices of all triangles hit by `ray`, over all meshes.
    pub fn hit_triangles(&self, ray: &Ray) -> Vec<usize> {
        self.meshes
            .iter()
            .flat_map(|mesh| {
                traverse_flat_bvh(ray, &self.nodes, &self.triangles, mesh.root_node_index)
            })
            .collect()
    }
}
