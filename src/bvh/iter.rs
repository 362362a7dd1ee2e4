use crate::aabb::Bounded;
use crate::bvh::{Bvh, BvhNode};
use crate::config::MAX_DEPTH_LIMIT;
use crate::mesh_chunk::MeshChunk;
use crate::ray::Ray;

/// Iterator over the leaves of a [`Bvh`] whose bounds, and the bounds of all their
/// ancestors, are hit by a [`Ray`].
///
/// This is an explicit-stack depth-first walk: when an interior node's box is hit, both
/// children are pushed, second child first, so leaves come out in pre-order.
pub struct BvhTraverseIterator<'bvh, 'ray> {
    /// Reference to the [`Bvh`] to traverse
    bvh: &'bvh Bvh,
    /// Reference to the input ray
    ray: &'ray Ray,
    /// Nodes still to visit
    stack: Vec<usize>,
}

impl<'bvh, 'ray> BvhTraverseIterator<'bvh, 'ray> {
    /// Creates a new [`BvhTraverseIterator`]
    pub fn new(bvh: &'bvh Bvh, ray: &'ray Ray) -> Self {
        let mut stack = Vec::with_capacity(MAX_DEPTH_LIMIT as usize + 1);
        if !bvh.nodes.is_empty() {
            stack.push(0);
        }
        BvhTraverseIterator { bvh, ray, stack }
    }
}

impl<'bvh, 'ray> Iterator for BvhTraverseIterator<'bvh, 'ray> {
    /// The arena index of the leaf and its chunk.
    type Item = (usize, &'bvh MeshChunk);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node_index) = self.stack.pop() {
            let node = &self.bvh.nodes[node_index];
            if !self.ray.intersects_bounds(&node.bounds()) {
                continue;
            }
            match node {
                BvhNode::Node {
                    child_a_index,
                    child_b_index,
                    ..
                } => {
                    self.stack.push(*child_b_index);
                    self.stack.push(*child_a_index);
                }
                BvhNode::Leaf { chunk, .. } => return Some((node_index, chunk)),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::bvh::Bvh;
    use crate::config::BuildConfig;
    use crate::mesh_chunk::MeshChunk;
    use crate::ray::Ray;
    use crate::testbase::unit_triangle_at;
    use crate::{Point3, Vector3};

    fn row_of_triangles(count: usize) -> Bvh {
        let triangles = (0..count)
            .map(|i| unit_triangle_at(Point3::new(2.0 * i as f32, 0.0, 0.0)))
            .collect();
        let chunk = MeshChunk::new(None, triangles).unwrap();
        Bvh::build(chunk, &BuildConfig::default()).unwrap()
    }

    #[test]
    fn test_iterator_visits_only_hit_leaves() {
        let bvh = row_of_triangles(32);
        let ray = Ray::new(Point3::new(20.25, 0.25, 4.0), Vector3::new(0.0, 0.0, -1.0));
        let leaves: Vec<_> = bvh.traverse(&ray).collect();
        assert!(!leaves.is_empty());
        assert!(leaves.len() < bvh.stats().leaf_count);
        assert!(leaves
            .iter()
            .any(|(_, chunk)| chunk.hit_triangles(&ray).len() == 1));
    }

    #[test]
    fn test_iterator_yields_leaves_in_preorder() {
        let bvh = row_of_triangles(16);
        // Grazes every box of the row lengthwise.
        let ray = Ray::new(Point3::new(-5.0, 0.1, 0.0), Vector3::new(1.0, 0.0, 0.0));
        let indices: Vec<usize> = bvh.traverse(&ray).map(|(index, _)| index).collect();
        assert_eq!(indices.len(), bvh.stats().leaf_count);
        assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_missing_ray_yields_nothing() {
        let bvh = row_of_triangles(8);
        let ray = Ray::new(Point3::new(0.0, 5.0, 4.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(bvh.traverse(&ray).count(), 0);
    }
}
