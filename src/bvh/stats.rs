use std::fmt;

use crate::bvh::{Bvh, BvhNode};
use crate::Real;

/// Shape diagnostics of a built [`Bvh`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BvhStats {
    pub node_count: usize,
    pub leaf_count: usize,
    pub triangle_count: usize,
    pub min_triangles_per_leaf: usize,
    pub max_triangles_per_leaf: usize,
    pub mean_triangles_per_leaf: Real,
    pub min_leaf_depth: u32,
    pub max_leaf_depth: u32,
    pub mean_leaf_depth: Real,
}

impl BvhStats {
    /// Collects the statistics of `bvh` in a single pass over its nodes.
    pub fn of(bvh: &Bvh) -> BvhStats {
        let mut stats = BvhStats {
            node_count: bvh.nodes.len(),
            leaf_count: 0,
            triangle_count: 0,
            min_triangles_per_leaf: usize::MAX,
            max_triangles_per_leaf: 0,
            mean_triangles_per_leaf: 0.0,
            min_leaf_depth: u32::MAX,
            max_leaf_depth: 0,
            mean_leaf_depth: 0.0,
        };
        let mut depth_sum = 0u64;

        for node in &bvh.nodes {
            if let BvhNode::Leaf { depth, chunk, .. } = node {
                stats.leaf_count += 1;
                stats.triangle_count += chunk.len();
                stats.min_triangles_per_leaf = stats.min_triangles_per_leaf.min(chunk.len());
                stats.max_triangles_per_leaf = stats.max_triangles_per_leaf.max(chunk.len());
                stats.min_leaf_depth = stats.min_leaf_depth.min(*depth);
                stats.max_leaf_depth = stats.max_leaf_depth.max(*depth);
                depth_sum += u64::from(*depth);
            }
        }

        if stats.leaf_count == 0 {
            stats.min_triangles_per_leaf = 0;
            stats.min_leaf_depth = 0;
        } else {
            stats.mean_triangles_per_leaf = stats.triangle_count as Real / stats.leaf_count as Real;
            stats.mean_leaf_depth = depth_sum as Real / stats.leaf_count as Real;
        }
        stats
    }
}

impl fmt::Display for BvhStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "nodes: {}, leaves: {}, triangles: {}",
            self.node_count, self.leaf_count, self.triangle_count
        )?;
        writeln!(
            f,
            "triangles per leaf: min {} / max {} / avg {:.2}",
            self.min_triangles_per_leaf, self.max_triangles_per_leaf, self.mean_triangles_per_leaf
        )?;
        write!(
            f,
            "leaf depth: min {} / max {} / avg {:.2}",
            self.min_leaf_depth, self.max_leaf_depth, self.mean_leaf_depth
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::bvh::{Bvh, BvhStats};
    use crate::config::BuildConfig;
    use crate::mesh_chunk::MeshChunk;
    use crate::testbase::unit_square_strips;
    use float_eq::assert_float_eq;

    #[test]
    fn test_stats_of_split_square() {
        let chunk = MeshChunk::new(None, unit_square_strips()).unwrap();
        let bvh = Bvh::build(chunk, &BuildConfig::default().with_depth_limit(4)).unwrap();
        let stats = BvhStats::of(&bvh);
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.leaf_count, 2);
        assert_eq!(stats.triangle_count, 4);
        assert_eq!(stats.min_triangles_per_leaf, 2);
        assert_eq!(stats.max_triangles_per_leaf, 2);
        assert_float_eq!(stats.mean_triangles_per_leaf, 2.0, abs <= 1e-6);
        assert_eq!(stats.min_leaf_depth, 1);
        assert_eq!(stats.max_leaf_depth, 1);
        assert_float_eq!(stats.mean_leaf_depth, 1.0, abs <= 1e-6);
        assert!(stats.to_string().contains("leaves: 2"));
    }

    #[test]
    fn test_stats_of_single_leaf() {
        let chunk = MeshChunk::new(None, unit_square_strips()).unwrap();
        let bvh = Bvh::build(chunk, &BuildConfig::default().with_depth_limit(1)).unwrap();
        let stats = bvh.stats();
        assert_eq!(stats.node_count, 1);
        assert_eq!(stats.leaf_count, 1);
        assert_eq!(stats.max_triangles_per_leaf, 4);
        assert_eq!(stats.max_leaf_depth, 0);
    }
}
