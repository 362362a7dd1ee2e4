use crate::aabb::{Bounded, Bounds};
use crate::mesh_chunk::MeshChunk;
use crate::triangle::Triangle;

/// The [`BvhNode`] enum that describes a node in a [`Bvh`].
/// It's either a leaf node which owns a non-empty [`MeshChunk`],
/// or a regular node that has exactly two child nodes.
///
/// Nodes live in an arena and refer to each other by index. The parent index is kept
/// for debug tooling only; traversals never need it.
///
/// [`Bvh`]: crate::bvh::Bvh
#[derive(Debug, Clone, PartialEq)]
pub enum BvhNode {
    /// Leaf node.
    Leaf {
        /// The node's parent, `None` for the root.
        parent_index: Option<usize>,

        /// Distance from the root, the root being at depth 0.
        depth: u32,

        /// The triangles of this leaf and their tight bounds.
        chunk: MeshChunk,
    },
    /// Inner node.
    Node {
        /// The node's parent, `None` for the root.
        parent_index: Option<usize>,

        /// Distance from the root, the root being at depth 0.
        depth: u32,

        /// Tight bounds of all triangles below this node.
        bounds: Bounds,

        /// Name of the chunk this node was split from.
        name: Option<String>,

        /// Index of the first child's subtree root.
        child_a_index: usize,

        /// Index of the second child's subtree root.
        child_b_index: usize,
    },
}

impl BvhNode {
    /// Returns true if this node has no children.
    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }

    /// Returns true if this node is the root of its tree.
    pub fn is_root(&self) -> bool {
        self.depth() == 0
    }

    /// Returns the index of the parent node.
    pub fn parent(&self) -> Option<usize> {
        match *self {
            BvhNode::Node { parent_index, .. } | BvhNode::Leaf { parent_index, .. } => {
                parent_index
            }
        }
    }

    /// Returns the depth of the node. The root has depth 0.
    pub fn depth(&self) -> u32 {
        match *self {
            BvhNode::Node { depth, .. } | BvhNode::Leaf { depth, .. } => depth,
        }
    }

    /// Returns the indices of both children, or [`None`] for a leaf.
    pub fn children(&self) -> Option<(usize, usize)> {
        match *self {
            BvhNode::Node {
                child_a_index,
                child_b_index,
                ..
            } => Some((child_a_index, child_b_index)),
            BvhNode::Leaf { .. } => None,
        }
    }

    /// Returns the diagnostic name of the chunk this node represents.
    pub fn name(&self) -> Option<&str> {
        match self {
            BvhNode::Node { name, .. } => name.as_deref(),
            BvhNode::Leaf { chunk, .. } => chunk.name(),
        }
    }

    /// Returns the [`MeshChunk`] of a leaf, or [`None`] if it is an interior node.
    pub fn chunk(&self) -> Option<&MeshChunk> {
        match self {
            BvhNode::Leaf { chunk, .. } => Some(chunk),
            BvhNode::Node { .. } => None,
        }
    }

    /// Returns the triangles of a leaf. Interior nodes hold none.
    pub fn triangles(&self) -> &[Triangle] {
        match self {
            BvhNode::Leaf { chunk, .. } => chunk.triangles(),
            BvhNode::Node { .. } => &[],
        }
    }

    /// Number of triangles held directly by this node.
    pub fn num_triangles(&self) -> usize {
        self.triangles().len()
    }

    /// Moves this node into a larger arena in which its subtree starts at `offset`.
    /// The subtree root, having no parent yet, is attached to the node at index 0.
    pub(crate) fn shift_indices(&mut self, offset: usize) {
        match self {
            BvhNode::Node {
                parent_index,
                child_a_index,
                child_b_index,
                ..
            } => {
                *parent_index = Some(parent_index.map_or(0, |parent| parent + offset));
                *child_a_index += offset;
                *child_b_index += offset;
            }
            BvhNode::Leaf { parent_index, .. } => {
                *parent_index = Some(parent_index.map_or(0, |parent| parent + offset));
            }
        }
    }
}

impl Bounded for BvhNode {
    fn bounds(&self) -> Bounds {
        match self {
            BvhNode::Node { bounds, .. } => *bounds,
            BvhNode::Leaf { chunk, .. } => chunk.bounds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::aabb::{Bounded, Bounds};
    use crate::bvh::BvhNode;
    use crate::mesh_chunk::MeshChunk;
    use crate::testbase::unit_square_strips;
    use crate::Point3;

    #[test]
    fn test_shift_indices() {
        let mut node = BvhNode::Node {
            parent_index: None,
            depth: 1,
            bounds: Bounds::with_bounds(Point3::origin(), Point3::new(1.0, 1.0, 1.0)),
            name: None,
            child_a_index: 1,
            child_b_index: 4,
        };
        node.shift_indices(3);
        assert_eq!(node.parent(), Some(0));
        assert_eq!(node.children(), Some((4, 7)));

        node.shift_indices(10);
        assert_eq!(node.parent(), Some(10));
        assert_eq!(node.children(), Some((14, 17)));
    }

    #[test]
    fn test_leaf_accessors() {
        let chunk = MeshChunk::new(Some("square".to_string()), unit_square_strips()).unwrap();
        let bounds = chunk.bounds();
        let leaf = BvhNode::Leaf {
            parent_index: None,
            depth: 0,
            chunk,
        };
        assert!(leaf.is_leaf());
        assert!(leaf.is_root());
        assert_eq!(leaf.children(), None);
        assert_eq!(leaf.num_triangles(), 4);
        assert_eq!(leaf.name(), Some("square"));
        assert_eq!(leaf.bounds(), bounds);
    }
}
