//! This module defines [`Bvh`], the arena holding the nodes of one mesh's tree,
//! and its builder.

use std::fmt;

use crate::aabb::Bounded;
use crate::bvh::split;
use crate::bvh::{BvhNode, BvhStats, BvhTraverseIterator};
use crate::config::{BuildConfig, StopRule};
use crate::error::{BvhError, Result};
use crate::flat_bvh::{self, FlatBvh};
use crate::mesh_chunk::MeshChunk;
use crate::ray::{Ray, TriangleHit};
use crate::triangle::Triangle;

/// The [`Bvh`] data structure. Contains the list of [`BvhNode`]s in pre-order: every
/// node is stored before its first child, and the first child's subtree is stored before
/// the second child's. The root is at index 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Bvh {
    /// The list of nodes of the [`Bvh`].
    pub(crate) nodes: Vec<BvhNode>,

    /// The depth limit the tree was built with.
    depth_limit: u32,
}

impl Bvh {
    /// Builds a [`Bvh`] by recursively splitting `chunk`.
    ///
    /// A chunk becomes a leaf when it holds a single triangle (or at most
    /// `MaxTrianglesPerLeaf` triangles), when the depth limit is reached, or when the
    /// cheapest candidate split does not lower its cost. A chunk whose best split leaves
    /// one side empty cannot be separated at all and becomes a leaf as well.
    ///
    /// Returns [`BvhError::InvalidConfig`] for an out of range `config`, and
    /// [`BvhError::InvariantViolation`] if the built tree fails [`Bvh::validate`].
    #[tracing::instrument(level = "debug", skip_all, fields(mesh = ?chunk.name(), triangles = chunk.len()))]
    pub fn build(chunk: MeshChunk, config: &BuildConfig) -> Result<Bvh> {
        config.validate()?;

        let triangle_count = chunk.len();
        let bvh = Bvh {
            nodes: build_subtree(chunk, 0, config),
            depth_limit: config.depth_limit,
        };

        let stats = bvh.stats();
        let checked = bvh.validate().and_then(|()| {
            if stats.triangle_count == triangle_count {
                Ok(())
            } else {
                Err(BvhError::InvariantViolation {
                    node: 0,
                    reason: format!(
                        "tree holds {} triangles, input had {}",
                        stats.triangle_count, triangle_count
                    ),
                })
            }
        });
        if let Err(err) = checked {
            tracing::error!(%err, "built an inconsistent BVH");
            return Err(err);
        }

        tracing::debug!(
            nodes = stats.node_count,
            leaves = stats.leaf_count,
            max_leaf_depth = stats.max_leaf_depth,
            "built BVH"
        );
        Ok(bvh)
    }

    /// Wraps already built nodes without checking them.
    #[cfg(test)]
    pub(crate) fn from_nodes(nodes: Vec<BvhNode>, depth_limit: u32) -> Bvh {
        Bvh { nodes, depth_limit }
    }

    /// All nodes in pre-order.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Returns the node at `index`, if any.
    pub fn node(&self, index: usize) -> Option<&BvhNode> {
        self.nodes.get(index)
    }

    /// The root node.
    pub fn root(&self) -> &BvhNode {
        &self.nodes[0]
    }

    /// The depth limit this tree was built with.
    pub fn depth_limit(&self) -> u32 {
        self.depth_limit
    }

    /// Creates a [`BvhTraverseIterator`] over the leaves whose bounds are hit by `ray`.
    pub fn traverse<'ray>(&self, ray: &'ray Ray) -> BvhTraverseIterator<'_, 'ray> {
        BvhTraverseIterator::new(self, ray)
    }

    /// Returns every triangle hit by `ray`, testing triangles only inside leaves whose
    /// bounds are hit.
    pub fn hit_triangles(&self, ray: &Ray) -> Vec<&Triangle> {
        self.traverse(ray)
            .flat_map(|(_, chunk)| {
                chunk
                    .triangles()
                    .iter()
                    .filter(move |triangle| ray.intersects_triangle(*triangle))
            })
            .collect()
    }

    /// Returns the triangle hit closest to the ray origin, with its hit data.
    pub fn closest_hit(&self, ray: &Ray) -> Option<(&Triangle, TriangleHit)> {
        let mut closest: Option<(&Triangle, TriangleHit)> = None;
        for (_, chunk) in self.traverse(ray) {
            for triangle in chunk.triangles() {
                if let Some(hit) = ray.triangle_hit(triangle) {
                    if closest.map_or(true, |(_, best)| hit.distance < best.distance) {
                        closest = Some((triangle, hit));
                    }
                }
            }
        }
        closest
    }

    /// Returns the indices of the ancestors of `node_index`, nearest first and ending
    /// with the root. Empty for the root or an unknown index.
    pub fn ancestors(&self, node_index: usize) -> Vec<usize> {
        let mut ancestors = Vec::new();
        let mut current = self.nodes.get(node_index).and_then(BvhNode::parent);
        while let Some(index) = current {
            ancestors.push(index);
            current = self.nodes[index].parent();
        }
        ancestors
    }

    /// Returns the indices of all nodes at `depth`, in pre-order.
    pub fn nodes_at_depth(&self, depth: u32) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.depth() == depth)
            .map(|(index, _)| index)
            .collect()
    }

    /// Flattens the tree into index-addressed records. See [`flat_bvh::flatten`].
    pub fn flatten(&self, node_start_index: usize, triangle_start_index: usize) -> FlatBvh {
        flat_bvh::flatten(self, node_start_index, triangle_start_index)
    }

    /// Collects shape statistics of the tree.
    pub fn stats(&self) -> BvhStats {
        BvhStats::of(self)
    }

    /// Checks the structural invariants of the tree: every node is reachable from the
    /// root, parent indices and depths are consistent, children follow their parent,
    /// interior bounds are exactly the union of the children's bounds, leaves are not
    /// empty and no node reaches the depth limit.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(BvhError::InvariantViolation {
                node: 0,
                reason: "tree has no nodes".to_string(),
            });
        }

        let mut node_count = 0;
        self.validate_subtree(0, None, 0, &mut node_count)?;

        // A mismatch means there is a detached subtree.
        if node_count != self.nodes.len() {
            return Err(BvhError::InvariantViolation {
                node: node_count,
                reason: format!(
                    "{} of {} nodes are reachable from the root",
                    node_count,
                    self.nodes.len()
                ),
            });
        }
        Ok(())
    }

    fn validate_subtree(
        &self,
        node_index: usize,
        expected_parent_index: Option<usize>,
        expected_depth: u32,
        node_count: &mut usize,
    ) -> Result<()> {
        let violation = |reason: String| BvhError::InvariantViolation {
            node: node_index,
            reason,
        };

        let node = self
            .nodes
            .get(node_index)
            .ok_or_else(|| violation("index out of range".to_string()))?;
        *node_count += 1;

        if node.parent() != expected_parent_index {
            return Err(violation(format!(
                "wrong parent index. Expected: {:?}; Actual: {:?}",
                expected_parent_index,
                node.parent()
            )));
        }
        if node.depth() != expected_depth {
            return Err(violation(format!(
                "wrong depth. Expected: {}; Actual: {}",
                expected_depth,
                node.depth()
            )));
        }
        if node.depth() >= self.depth_limit {
            return Err(violation(format!(
                "depth {} exceeds the depth limit {}",
                node.depth(),
                self.depth_limit
            )));
        }

        match node {
            BvhNode::Node {
                bounds,
                child_a_index,
                child_b_index,
                ..
            } => {
                let (child_a_index, child_b_index) = (*child_a_index, *child_b_index);
                if child_a_index <= node_index || child_b_index <= child_a_index {
                    return Err(violation(format!(
                        "children ({}, {}) are not in pre-order",
                        child_a_index, child_b_index
                    )));
                }
                let (child_a, child_b) =
                    match (self.nodes.get(child_a_index), self.nodes.get(child_b_index)) {
                        (Some(child_a), Some(child_b)) => (child_a, child_b),
                        _ => return Err(violation("child index out of range".to_string())),
                    };
                if child_a.bounds().join(&child_b.bounds()) != *bounds {
                    return Err(violation(format!(
                        "bounds {} are not the union of the children's bounds",
                        bounds
                    )));
                }

                self.validate_subtree(
                    child_a_index,
                    Some(node_index),
                    expected_depth + 1,
                    node_count,
                )?;
                self.validate_subtree(
                    child_b_index,
                    Some(node_index),
                    expected_depth + 1,
                    node_count,
                )
            }
            BvhNode::Leaf { chunk, .. } => {
                if chunk.is_empty() {
                    return Err(violation("leaf without triangles".to_string()));
                }
                let bounds = chunk.bounds();
                if chunk
                    .triangles()
                    .iter()
                    .any(|triangle| !bounds.contains_bounds(&triangle.bounds()))
                {
                    return Err(violation(format!(
                        "a triangle lies outside the leaf bounds {}",
                        bounds
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Prints the [`Bvh`] in a tree-like visualization, one node per line.
impl fmt::Display for Bvh {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Arena order is pre-order, so printing in sequence yields the tree.
        for (index, node) in self.nodes.iter().enumerate() {
            let padding = "  ".repeat(node.depth() as usize);
            match node {
                BvhNode::Node {
                    bounds,
                    child_a_index,
                    child_b_index,
                    ..
                } => writeln!(
                    f,
                    "{}node={} children=({}, {}) {}",
                    padding, index, child_a_index, child_b_index, bounds
                )?,
                BvhNode::Leaf { chunk, .. } => writeln!(
                    f,
                    "{}leaf={} triangles={} {}",
                    padding,
                    index,
                    chunk.len(),
                    chunk.bounds()
                )?,
            }
        }
        Ok(())
    }
}

fn leaf(chunk: MeshChunk, depth: u32) -> Vec<BvhNode> {
    vec![BvhNode::Leaf {
        parent_index: None,
        depth,
        chunk,
    }]
}

/// Builds the subtree of `chunk`, placed at tree depth `depth`.
///
/// The returned nodes are indexed relative to the subtree root at index 0, whose parent
/// is left unset. Split choice depends only on the chunk, so the result is identical
/// whether the two halves are built sequentially or in parallel.
fn build_subtree(chunk: MeshChunk, depth: u32, config: &BuildConfig) -> Vec<BvhNode> {
    let small_enough = match config.stop_rule {
        StopRule::CostImprovement => chunk.len() <= 1,
        StopRule::MaxTrianglesPerLeaf(max) => chunk.len() <= max,
    };
    if small_enough || depth + 1 >= config.depth_limit {
        return leaf(chunk, depth);
    }

    let split = match split::best_split(&chunk, config) {
        Some(split) => split,
        None => return leaf(chunk, depth),
    };

    if config.stop_rule == StopRule::CostImprovement && split.cost >= chunk.cost() {
        tracing::trace!(
            depth,
            triangles = chunk.len(),
            cost = chunk.cost(),
            best = split.cost,
            "no improving split"
        );
        return leaf(chunk, depth);
    }

    // Split choice depends only on the chunk, so retrying deeper would pick the same
    // one-sided plane again until the depth limit.
    if split.is_degenerate() {
        tracing::trace!(depth, triangles = chunk.len(), "degenerate split");
        return leaf(chunk, depth);
    }

    tracing::trace!(
        depth,
        axis = %split.plane.axis,
        position = split.plane.position,
        a = split.side_a.count,
        b = split.side_b.count,
        cost = split.cost,
        "split chunk"
    );

    let bounds = chunk.bounds();
    let name = chunk.name().map(str::to_owned);
    let parallel = chunk.len() > config.parallel_threshold;
    let (chunk_a, chunk_b) = split.partition(chunk);

    let (nodes_a, nodes_b) = join(
        parallel,
        move || build_subtree(chunk_a, depth + 1, config),
        move || build_subtree(chunk_b, depth + 1, config),
    );

    let mut nodes = Vec::with_capacity(1 + nodes_a.len() + nodes_b.len());
    nodes.push(BvhNode::Node {
        parent_index: None,
        depth,
        bounds,
        name,
        child_a_index: 1,
        child_b_index: 1 + nodes_a.len(),
    });
    append_subtree(&mut nodes, nodes_a);
    append_subtree(&mut nodes, nodes_b);
    nodes
}

/// Appends a subtree built by [`build_subtree`] behind the node at index 0.
fn append_subtree(nodes: &mut Vec<BvhNode>, subtree: Vec<BvhNode>) {
    let offset = nodes.len();
    nodes.extend(subtree.into_iter().map(|mut node| {
        node.shift_indices(offset);
        node
    }));
}

#[cfg(feature = "rayon")]
fn join<A, B, RA, RB>(parallel: bool, a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    if parallel {
        rayon::join(a, b)
    } else {
        (a(), b())
    }
}

#[cfg(not(feature = "rayon"))]
fn join<A, B, RA, RB>(_parallel: bool, a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA,
    B: FnOnce() -> RB,
{
    (a(), b())
}
