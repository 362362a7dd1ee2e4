//! Split plane candidates and their evaluation.
//!
//! Candidates are first evaluated "lite": only the counts and extents of both sides are
//! accumulated, without allocating triangle lists. The winning candidate alone is then
//! materialized into two [`MeshChunk`]s.

use crate::aabb::{Bounded, Bounds};
use crate::axis::Axis;
use crate::config::{BuildConfig, SplitStrategy};
use crate::mesh_chunk::{self, MeshChunk};
use crate::triangle::Triangle;
use crate::Real;

/// An axis-aligned split plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SplitPlane {
    pub axis: Axis,
    pub position: Real,
}

impl SplitPlane {
    /// Triangles whose center lies strictly below the plane go to side A, all others to B.
    #[inline]
    pub fn is_side_a(&self, triangle: &Triangle) -> bool {
        triangle.center()[self.axis] < self.position
    }
}

/// Used to accumulate the properties of one side of a split without storing its triangles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Bucket {
    /// The number of triangles in this `Bucket`.
    pub count: usize,

    /// The joint [`Bounds`] of the triangles in this `Bucket`.
    pub bounds: Bounds,
}

impl Bucket {
    pub fn empty() -> Bucket {
        Bucket {
            count: 0,
            bounds: Bounds::empty(),
        }
    }

    /// Extend this `Bucket` by a triangle, using its cached extrema.
    pub fn add_triangle(&mut self, triangle: &Triangle) {
        self.count += 1;
        self.bounds
            .encapsulate_min_max(&triangle.min(), &triangle.max());
    }

    pub fn cost(&self) -> Real {
        mesh_chunk::cost(&self.bounds, self.count)
    }
}

/// The outcome of evaluating one [`SplitPlane`] against a chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SplitEvaluation {
    pub plane: SplitPlane,
    pub side_a: Bucket,
    pub side_b: Bucket,
    pub cost: Real,
}

impl SplitEvaluation {
    /// Returns true if every triangle landed on the same side.
    pub fn is_degenerate(&self) -> bool {
        self.side_a.count == 0 || self.side_b.count == 0
    }

    /// Partitions `chunk` along the evaluated plane. Both halves keep the chunk's name
    /// and the triangle order of the input.
    pub fn partition(&self, chunk: MeshChunk) -> (MeshChunk, MeshChunk) {
        let (name, triangles) = chunk.into_parts();
        let mut triangles_a = Vec::with_capacity(self.side_a.count);
        let mut triangles_b = Vec::with_capacity(self.side_b.count);
        for triangle in triangles {
            if self.plane.is_side_a(&triangle) {
                triangles_a.push(triangle);
            } else {
                triangles_b.push(triangle);
            }
        }
        (
            MeshChunk::from_parts(name.clone(), triangles_a, self.side_a.bounds),
            MeshChunk::from_parts(name, triangles_b, self.side_b.bounds),
        )
    }
}

/// Generates the split planes to test for `bounds`, in evaluation order.
pub(crate) fn candidate_planes(bounds: &Bounds, config: &BuildConfig) -> Vec<SplitPlane> {
    match config.split_strategy {
        SplitStrategy::SampledPlanes => {
            let count = config.candidate_splits_per_axis;
            let size = bounds.size();
            let mut planes = Vec::with_capacity(Axis::ALL.len() * count);
            for axis in Axis::ALL {
                for i in 1..=count {
                    let percentage = i as Real / (count + 1) as Real;
                    planes.push(SplitPlane {
                        axis,
                        position: bounds.min[axis] + size[axis] * percentage,
                    });
                }
            }
            planes
        }
        SplitStrategy::LongestAxisMidpoint => {
            let axis = bounds.largest_axis();
            vec![SplitPlane {
                axis,
                position: bounds.center()[axis],
            }]
        }
    }
}

/// Evaluates a single plane without moving any triangle.
pub(crate) fn evaluate(triangles: &[Triangle], plane: SplitPlane) -> SplitEvaluation {
    let mut side_a = Bucket::empty();
    let mut side_b = Bucket::empty();
    for triangle in triangles {
        if plane.is_side_a(triangle) {
            side_a.add_triangle(triangle);
        } else {
            side_b.add_triangle(triangle);
        }
    }
    SplitEvaluation {
        plane,
        side_a,
        side_b,
        cost: side_a.cost() + side_b.cost(),
    }
}

#[cfg(test)]
thread_local! {
    /// Number of [`best_split`] calls made on this thread.
    pub(crate) static SPLIT_SEARCHES: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Evaluates every candidate plane of `chunk` and returns the cheapest one.
/// The first candidate wins ties, so the choice only depends on the chunk.
pub(crate) fn best_split(chunk: &MeshChunk, config: &BuildConfig) -> Option<SplitEvaluation> {
    #[cfg(test)]
    SPLIT_SEARCHES.with(|searches| searches.set(searches.get() + 1));

    let mut best: Option<SplitEvaluation> = None;
    for plane in candidate_planes(&chunk.bounds(), config) {
        let evaluation = evaluate(chunk.triangles(), plane);
        let improves = match &best {
            Some(current) => evaluation.cost < current.cost,
            None => true,
        };
        if improves {
            best = Some(evaluation);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use crate::aabb::{Bounded, Bounds};
    use crate::axis::Axis;
    use crate::bvh::split::{best_split, candidate_planes, evaluate, SplitPlane};
    use crate::config::{BuildConfig, SplitStrategy};
    use crate::mesh_chunk::MeshChunk;
    use crate::testbase::{unit_square_strips, unit_triangle_at};
    use crate::Point3;
    use float_eq::assert_float_eq;

    #[test]
    fn test_sampled_planes_are_evenly_spaced() {
        let bounds = Bounds::with_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(6.0, 12.0, 0.0));
        let planes = candidate_planes(&bounds, &BuildConfig::default());
        assert_eq!(planes.len(), 15);
        let xs: Vec<f32> = planes
            .iter()
            .filter(|plane| plane.axis == Axis::X)
            .map(|plane| plane.position)
            .collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(planes[5].axis, Axis::Y);
        assert_float_eq!(planes[5].position, 2.0, abs <= 1e-6);
        assert!(planes[10..].iter().all(|plane| plane.position == 0.0));
    }

    #[test]
    fn test_longest_axis_midpoint() {
        let bounds = Bounds::with_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 4.0, 2.0));
        let config = BuildConfig::default().with_split_strategy(SplitStrategy::LongestAxisMidpoint);
        assert_eq!(
            candidate_planes(&bounds, &config),
            vec![SplitPlane {
                axis: Axis::Y,
                position: 2.0
            }]
        );
    }

    #[test]
    fn test_lite_evaluation_matches_partition() {
        let chunk = MeshChunk::new(None, unit_square_strips()).unwrap();
        let plane = SplitPlane {
            axis: Axis::X,
            position: 0.5,
        };
        let evaluation = evaluate(chunk.triangles(), plane);
        assert_eq!(evaluation.side_a.count, 2);
        assert_eq!(evaluation.side_b.count, 2);
        assert_float_eq!(evaluation.cost, 2.0, abs <= 1e-6);

        let (a, b) = evaluation.partition(chunk);
        assert_eq!(a.bounds(), evaluation.side_a.bounds);
        assert_eq!(b.bounds(), evaluation.side_b.bounds);
        assert_eq!(a.bounds().max, Point3::new(0.5, 1.0, 0.0));
        assert_eq!(b.bounds().min, Point3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_best_split_of_square_is_along_x() {
        let chunk = MeshChunk::new(None, unit_square_strips()).unwrap();
        let best = best_split(&chunk, &BuildConfig::default()).unwrap();
        assert_eq!(best.plane.axis, Axis::X);
        assert_float_eq!(best.cost, 2.0, abs <= 1e-6);
        assert!(!best.is_degenerate());
    }

    #[test]
    fn test_stacked_triangles_split_degenerately() {
        let triangles = vec![
            unit_triangle_at(Point3::new(0.0, 0.0, 0.0)),
            unit_triangle_at(Point3::new(0.0, 0.0, 0.0)),
            unit_triangle_at(Point3::new(0.0, 0.0, 0.0)),
        ];
        let chunk = MeshChunk::new(None, triangles).unwrap();
        let best = best_split(&chunk, &BuildConfig::default()).unwrap();
        assert!(best.is_degenerate());
        assert_float_eq!(best.cost, chunk.cost(), abs <= 1e-6);
    }
}
