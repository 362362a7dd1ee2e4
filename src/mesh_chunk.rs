//! This module defines [`MeshChunk`], a named and bounded group of triangles.
//! A chunk is the unit the BVH builder recursively splits.

use crate::aabb::{Bounded, Bounds};
use crate::error::{BvhError, Result};
use crate::ray::Ray;
use crate::triangle::Triangle;
use crate::{Point3, Real};

/// An owned list of triangles together with the tightest [`Bounds`] enclosing all of
/// their vertices, and an optional name used in diagnostics.
///
/// The bounds are always derived from the triangles, never supplied by the caller:
/// the split cost heuristic depends on them being tight.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshChunk {
    name: Option<String>,
    triangles: Vec<Triangle>,
    bounds: Bounds,
}

impl MeshChunk {
    /// Creates a chunk from a list of triangles and computes its bounds.
    ///
    /// Returns [`BvhError::EmptyMesh`] if `triangles` is empty.
    pub fn new(name: Option<String>, triangles: Vec<Triangle>) -> Result<MeshChunk> {
        if triangles.is_empty() {
            return Err(BvhError::EmptyMesh { name });
        }
        let bounds = bounds_of(&triangles);
        Ok(MeshChunk {
            name,
            triangles,
            bounds,
        })
    }

    /// Builds a chunk from triangle corner triples. Degenerate triangles are
    /// skipped with a warning instead of aborting the whole mesh.
    ///
    /// # Examples
    /// ```
    /// use meshbvh::mesh_chunk::MeshChunk;
    /// use meshbvh::Point3;
    ///
    /// let corners = [
    ///     [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
    ///     // Collinear, skipped.
    ///     [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)],
    /// ];
    /// let chunk = MeshChunk::from_vertices(None, &corners).unwrap();
    /// assert_eq!(chunk.len(), 1);
    /// ```
    pub fn from_vertices(name: Option<String>, corners: &[[Point3; 3]]) -> Result<MeshChunk> {
        let triangles = collect_valid(
            &name,
            corners
                .iter()
                .enumerate()
                .map(|(index, [a, b, c])| Triangle::with_index(*a, *b, *c, index)),
        );
        MeshChunk::new(name, triangles)
    }

    /// Builds a chunk from a vertex buffer and a flat triangle index list, three
    /// indices per triangle. Degenerate triangles are skipped with a warning.
    ///
    /// Returns [`BvhError::MalformedIndices`] if the index count is not a multiple of
    /// three and [`BvhError::IndexOutOfRange`] if an index exceeds the vertex buffer.
    pub fn from_indexed(
        name: Option<String>,
        positions: &[Point3],
        indices: &[u32],
    ) -> Result<MeshChunk> {
        if indices.len() % 3 != 0 {
            return Err(BvhError::MalformedIndices { len: indices.len() });
        }
        let vertex = |index: u32| -> Result<Point3> {
            positions
                .get(index as usize)
                .copied()
                .ok_or(BvhError::IndexOutOfRange {
                    index: index as usize,
                    vertex_count: positions.len(),
                })
        };

        let mut candidates = Vec::with_capacity(indices.len() / 3);
        for (index, face) in indices.chunks_exact(3).enumerate() {
            let (a, b, c) = (vertex(face[0])?, vertex(face[1])?, vertex(face[2])?);
            candidates.push(Triangle::with_index(a, b, c, index));
        }
        let triangles = collect_valid(&name, candidates.into_iter());
        MeshChunk::new(name, triangles)
    }

    /// Creates a chunk whose bounds were already accumulated by the caller.
    /// May be empty; only the builder uses this for split halves.
    pub(crate) fn from_parts(
        name: Option<String>,
        triangles: Vec<Triangle>,
        bounds: Bounds,
    ) -> MeshChunk {
        debug_assert_eq!(bounds, bounds_of(&triangles));
        MeshChunk {
            name,
            triangles,
            bounds,
        }
    }

    /// The chunk's diagnostic name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The triangles of this chunk, in insertion order.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Number of triangles in the chunk.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Returns true if the chunk holds no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// The SAH-style cost of keeping this chunk as a single leaf:
    /// `half_surface_area(bounds) * triangle_count`.
    pub fn cost(&self) -> Real {
        cost(&self.bounds, self.triangles.len())
    }

    /// Consumes the chunk, returning its name and triangles.
    pub fn into_parts(self) -> (Option<String>, Vec<Triangle>) {
        (self.name, self.triangles)
    }

    /// Brute-force scan: returns the indices of all triangles hit by `ray`.
    /// Serves as the oracle the BVH traversals are checked against.
    pub fn hit_triangles(&self, ray: &Ray) -> Vec<usize> {
        self.triangles
            .iter()
            .enumerate()
            .filter(|(_, triangle)| ray.intersects_triangle(*triangle))
            .map(|(index, _)| index)
            .collect()
    }
}

impl Bounded for MeshChunk {
    fn bounds(&self) -> Bounds {
        self.bounds
    }
}

/// Split cost of `count` triangles inside `bounds`. Empty sides cost nothing.
pub(crate) fn cost(bounds: &Bounds, count: usize) -> Real {
    if count == 0 {
        0.0
    } else {
        bounds.half_surface_area() * count as Real
    }
}

/// Accumulates the tight bounds of `triangles` from their cached extrema.
fn bounds_of(triangles: &[Triangle]) -> Bounds {
    let mut bounds = Bounds::empty();
    for triangle in triangles {
        bounds.encapsulate_min_max(&triangle.min(), &triangle.max());
    }
    bounds
}

fn collect_valid(
    name: &Option<String>,
    candidates: impl Iterator<Item = Result<Triangle>>,
) -> Vec<Triangle> {
    let mut skipped = 0usize;
    let triangles: Vec<Triangle> = candidates
        .filter_map(|candidate| match candidate {
            Ok(triangle) => Some(triangle),
            Err(err) => {
                tracing::trace!(mesh = ?name, %err, "skipping triangle");
                skipped += 1;
                None
            }
        })
        .collect();
    if skipped > 0 {
        tracing::warn!(mesh = ?name, skipped, kept = triangles.len(), "skipped degenerate triangles");
    }
    triangles
}

#[cfg(test)]
mod tests {
    use crate::aabb::Bounded;
    use crate::error::BvhError;
    use crate::mesh_chunk::MeshChunk;
    use crate::ray::Ray;
    use crate::testbase::{unit_square_strips, unit_triangle_at};
    use crate::{Point3, Vector3};
    use float_eq::assert_float_eq;

    #[test]
    fn test_bounds_are_tight() {
        let chunk = MeshChunk::new(None, unit_square_strips()).unwrap();
        assert_eq!(chunk.bounds().min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(chunk.bounds().max, Point3::new(1.0, 1.0, 0.0));
        assert_float_eq!(chunk.cost(), 4.0, abs <= 1e-6);
    }

    #[test]
    fn test_empty_chunk_is_rejected() {
        let result = MeshChunk::new(Some("nothing".to_string()), Vec::new());
        assert_eq!(
            result,
            Err(BvhError::EmptyMesh {
                name: Some("nothing".to_string())
            })
        );
    }

    #[test]
    fn test_from_indexed() {
        let positions = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let chunk =
            MeshChunk::from_indexed(Some("quad".to_string()), &positions, &[0, 1, 2, 0, 2, 3])
                .unwrap();
        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk.name(), Some("quad"));
        assert_eq!(chunk.triangles()[1].c(), positions[3]);

        assert_eq!(
            MeshChunk::from_indexed(None, &positions, &[0, 1]),
            Err(BvhError::MalformedIndices { len: 2 })
        );
        assert_eq!(
            MeshChunk::from_indexed(None, &positions, &[0, 1, 9]),
            Err(BvhError::IndexOutOfRange {
                index: 9,
                vertex_count: 4
            })
        );
    }

    #[test]
    fn test_all_degenerate_is_empty_mesh() {
        let positions = [Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let result = MeshChunk::from_indexed(None, &positions, &[0, 1, 1]);
        assert_eq!(result, Err(BvhError::EmptyMesh { name: None }));
    }

    #[test]
    fn test_brute_force_hits() {
        let triangles = vec![
            unit_triangle_at(Point3::new(0.0, 0.0, 0.0)),
            unit_triangle_at(Point3::new(5.0, 0.0, 0.0)),
        ];
        let chunk = MeshChunk::new(None, triangles).unwrap();

        let ray = Ray::new(Point3::new(5.25, 0.25, 3.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(chunk.hit_triangles(&ray), vec![1]);

        let miss = Ray::new(Point3::new(2.5, 0.25, 3.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(chunk.hit_triangles(&miss).is_empty());
    }
}
