//! Axis Aligned Bounding Boxes.

use crate::axis::Axis;
use crate::utils::{fast_max, fast_min};
use crate::{Point3, Real, Vector3};
use std::fmt;

/// A mutable axis-aligned box, grown incrementally by encapsulating points,
/// triangles or other boxes.
///
/// An empty box has `min = +inf` and `max = -inf` on every axis, so that
/// encapsulating anything into it yields exactly the encapsulated extent.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    /// Minimum coordinates
    pub min: Point3,

    /// Maximum coordinates
    pub max: Point3,
}

/// A trait implemented by things which can be bounded by [`Bounds`].
pub trait Bounded {
    /// Returns the tightest [`Bounds`] containing `self`.
    fn bounds(&self) -> Bounds;
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Min bound: ({}, {}, {}); Max bound: ({}, {}, {})",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}

impl Default for Bounds {
    fn default() -> Bounds {
        Bounds::empty()
    }
}

impl Bounds {
    /// Creates new [`Bounds`] with the given `min` and `max`.
    ///
    /// # Examples
    /// ```
    /// use meshbvh::aabb::Bounds;
    /// use meshbvh::Point3;
    ///
    /// let bounds = Bounds::with_bounds(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
    /// assert_eq!(bounds.min.x, -1.0);
    /// assert_eq!(bounds.max.z, 1.0);
    /// ```
    pub fn with_bounds(min: Point3, max: Point3) -> Bounds {
        Bounds { min, max }
    }

    /// Creates new empty [`Bounds`].
    ///
    /// # Examples
    /// ```
    /// use meshbvh::aabb::Bounds;
    ///
    /// let bounds = Bounds::empty();
    /// assert!(bounds.is_empty());
    /// ```
    pub fn empty() -> Bounds {
        Bounds {
            min: Point3::new(Real::INFINITY, Real::INFINITY, Real::INFINITY),
            max: Point3::new(Real::NEG_INFINITY, Real::NEG_INFINITY, Real::NEG_INFINITY),
        }
    }

    /// Returns true if nothing was ever encapsulated, i.e. `min > max` on some axis.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grows the box to contain `point`.
    pub fn encapsulate_point(&mut self, point: &Point3) {
        self.encapsulate_min_max(point, point);
    }

    /// Grows the box to contain the box spanned by `min` and `max`.
    pub fn encapsulate_min_max(&mut self, min: &Point3, max: &Point3) {
        self.min = Point3::new(
            fast_min(min.x, self.min.x),
            fast_min(min.y, self.min.y),
            fast_min(min.z, self.min.z),
        );
        self.max = Point3::new(
            fast_max(max.x, self.max.x),
            fast_max(max.y, self.max.y),
            fast_max(max.z, self.max.z),
        );
    }

    /// Grows the box to contain `other`.
    pub fn encapsulate(&mut self, other: &Bounds) {
        self.encapsulate_min_max(&other.min, &other.max);
    }

    /// Grows the box to contain everything bounded by `shape`.
    pub fn encapsulate_bounded<T: Bounded>(&mut self, shape: &T) {
        self.encapsulate(&shape.bounds());
    }

    /// Returns a copy of this box grown to contain `point`.
    ///
    /// # Examples
    /// ```
    /// use meshbvh::aabb::Bounds;
    /// use meshbvh::Point3;
    ///
    /// let bounds = Bounds::empty()
    ///     .grow(&Point3::new(1.0, 2.0, 3.0))
    ///     .grow(&Point3::new(-1.0, 0.0, 5.0));
    /// assert_eq!(bounds.min, Point3::new(-1.0, 0.0, 3.0));
    /// assert_eq!(bounds.max, Point3::new(1.0, 2.0, 5.0));
    /// ```
    pub fn grow(mut self, point: &Point3) -> Bounds {
        self.encapsulate_point(point);
        self
    }

    /// Returns the smallest box containing both `self` and `other`.
    pub fn join(&self, other: &Bounds) -> Bounds {
        let mut joint = *self;
        joint.encapsulate(other);
        joint
    }

    /// Returns the size of this box in all three dimensions.
    pub fn size(&self) -> Vector3 {
        self.max - self.min
    }

    /// Returns the center point of the box.
    pub fn center(&self) -> Point3 {
        Point3::from((self.min.coords + self.max.coords) / 2.0)
    }

    /// Returns half of the total surface area of the box: `xy + yz + zx`.
    /// Used as the traversal cost proxy when ranking split candidates.
    ///
    /// # Examples
    /// ```
    /// use meshbvh::aabb::Bounds;
    /// use meshbvh::Point3;
    ///
    /// let bounds = Bounds::with_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0));
    /// assert_eq!(bounds.half_surface_area(), 2.0 + 6.0 + 3.0);
    /// ```
    pub fn half_surface_area(&self) -> Real {
        let size = self.size();
        size.x * size.y + size.y * size.z + size.z * size.x
    }

    /// Returns the total surface area of the box.
    pub fn surface_area(&self) -> Real {
        2.0 * self.half_surface_area()
    }

    /// Returns the axis along which the box is stretched the most.
    /// Ties resolve towards the lower axis.
    pub fn largest_axis(&self) -> Axis {
        let size = self.size();
        if size.x >= size.y && size.x >= size.z {
            Axis::X
        } else if size.y >= size.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Returns true if `point` is inside the box, faces included.
    pub fn contains(&self, point: &Point3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Returns true if `point` is inside the box with respect to some `epsilon`.
    pub fn approx_contains_eps(&self, point: &Point3, epsilon: Real) -> bool {
        (point.x - self.min.x) > -epsilon
            && (point.x - self.max.x) < epsilon
            && (point.y - self.min.y) > -epsilon
            && (point.y - self.max.y) < epsilon
            && (point.z - self.min.z) > -epsilon
            && (point.z - self.max.z) < epsilon
    }

    /// Returns true if `other` lies completely inside this box.
    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        self.contains(&other.min) && self.contains(&other.max)
    }

    /// Returns true if `other` lies inside this box and is smaller on at least one axis.
    pub fn strictly_contains_bounds(&self, other: &Bounds) -> bool {
        self.contains_bounds(other) && other != self
    }
}

/// Implementation of [`Bounded`] for [`Bounds`].
impl Bounded for Bounds {
    fn bounds(&self) -> Bounds {
        *self
    }
}

/// Implementation of [`Bounded`] for single points.
impl Bounded for Point3 {
    fn bounds(&self) -> Bounds {
        Bounds::with_bounds(*self, *self)
    }
}

#[cfg(test)]
mod tests {
    use crate::aabb::{Bounded, Bounds};
    use crate::axis::Axis;
    use crate::testbase::{tuple_to_point, tuplevec_small_strategy, TupleVec};
    use crate::Point3;
    use float_eq::assert_float_eq;
    use proptest::prelude::*;

    #[test]
    fn test_empty_bounds_is_identity_for_encapsulation() {
        let mut bounds = Bounds::empty();
        bounds.encapsulate(&Bounds::with_bounds(
            Point3::new(-1.0, 2.0, 3.0),
            Point3::new(4.0, 5.0, 6.0),
        ));
        assert_eq!(bounds.min, Point3::new(-1.0, 2.0, 3.0));
        assert_eq!(bounds.max, Point3::new(4.0, 5.0, 6.0));
        assert!(!bounds.is_empty());
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_bounds_serialize_as_corner_arrays() {
        let bounds = Bounds::with_bounds(Point3::new(-1.0, 2.0, 3.0), Point3::new(4.0, 5.0, 6.0));
        let json = serde_json::to_string(&bounds).unwrap();
        assert_eq!(json, r#"{"min":[-1.0,2.0,3.0],"max":[4.0,5.0,6.0]}"#);
        let parsed: Bounds = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, bounds);
    }

    #[test]
    fn test_center_and_size() {
        let bounds = Bounds::with_bounds(Point3::new(-2.0, 0.0, 1.0), Point3::new(2.0, 4.0, 1.0));
        assert_eq!(bounds.center(), Point3::new(0.0, 2.0, 1.0));
        assert_float_eq!(bounds.size().x, 4.0, abs <= 0.0);
        assert_float_eq!(bounds.size().z, 0.0, abs <= 0.0);
        assert_float_eq!(bounds.half_surface_area(), 16.0, abs <= 0.0);
        assert_float_eq!(bounds.surface_area(), 32.0, abs <= 0.0);
    }

    #[test]
    fn test_largest_axis() {
        let x = Bounds::with_bounds(Point3::origin(), Point3::new(3.0, 1.0, 1.0));
        let y = Bounds::with_bounds(Point3::origin(), Point3::new(1.0, 3.0, 1.0));
        let z = Bounds::with_bounds(Point3::origin(), Point3::new(1.0, 1.0, 3.0));
        let tie = Bounds::with_bounds(Point3::origin(), Point3::new(1.0, 1.0, 0.0));
        assert_eq!(x.largest_axis(), Axis::X);
        assert_eq!(y.largest_axis(), Axis::Y);
        assert_eq!(z.largest_axis(), Axis::Z);
        assert_eq!(tie.largest_axis(), Axis::X);
    }

    #[test]
    fn test_strict_containment() {
        let outer = Bounds::with_bounds(Point3::origin(), Point3::new(1.0, 1.0, 0.0));
        let inner = Bounds::with_bounds(Point3::origin(), Point3::new(0.5, 1.0, 0.0));
        assert!(outer.strictly_contains_bounds(&inner));
        assert!(!outer.strictly_contains_bounds(&outer));
        assert!(!inner.contains_bounds(&outer));
    }

    proptest! {
        // Test whether empty bounds do not contain anything.
        #[test]
        fn test_empty_contains_nothing(tpl: TupleVec) {
            let p = tuple_to_point(&tpl);
            prop_assert!(!Bounds::empty().contains(&p));
        }

        // Test whether bounds always contain their center.
        #[test]
        fn test_bounds_contains_center(a in tuplevec_small_strategy(),
                                       b in tuplevec_small_strategy()) {
            let bounds = Bounds::empty()
                .grow(&tuple_to_point(&a))
                .grow(&tuple_to_point(&b));
            prop_assert!(bounds.contains(&bounds.center()));
        }

        // Test whether the join of two point-sets contains all the points.
        #[test]
        fn test_join_two_bounds(a in prop::collection::vec(tuplevec_small_strategy(), 1..6),
                                b in prop::collection::vec(tuplevec_small_strategy(), 1..6)) {
            let points_a: Vec<Point3> = a.iter().map(tuple_to_point).collect();
            let points_b: Vec<Point3> = b.iter().map(tuple_to_point).collect();

            let mut bounds_a = Bounds::empty();
            points_a.iter().for_each(|p| bounds_a.encapsulate_point(p));
            let mut bounds_b = Bounds::empty();
            points_b.iter().for_each(|p| bounds_b.encapsulate_bounded(p));

            let joint = bounds_a.join(&bounds_b);
            prop_assert!(points_a.iter().all(|p| bounds_a.contains(p)));
            prop_assert!(points_b.iter().all(|p| bounds_b.contains(p)));
            prop_assert!(points_a.iter().chain(points_b.iter()).all(|p| joint.contains(p)));
            prop_assert!(joint.contains_bounds(&bounds_a.bounds()));
            prop_assert!(joint.contains_bounds(&bounds_b));
        }

        // Test that min <= max on every axis after at least one encapsulation.
        #[test]
        fn test_min_le_max_after_encapsulation(points in prop::collection::vec(tuplevec_small_strategy(), 1..10)) {
            let mut bounds = Bounds::empty();
            for p in &points {
                bounds.encapsulate_point(&tuple_to_point(p));
            }
            for axis in Axis::ALL {
                prop_assert!(bounds.min[axis] <= bounds.max[axis]);
            }
        }
    }
}
