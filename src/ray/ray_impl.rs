//! This module defines a Ray structure and intersection algorithms
//! for axis aligned bounding boxes and triangles.

use crate::aabb::Bounds;
use crate::triangle::PrecomputedTriangle;
use crate::{Point3, Real, Vector3, EPSILON};

/// Hits closer to the ray origin than this are discarded, so that rays spawned on a
/// surface do not immediately re-hit it.
pub const MIN_HIT_DISTANCE: Real = 0.001;

/// A struct which defines a ray and some of its cached values.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The ray origin.
    pub origin: Point3,

    /// The ray direction, normalized.
    pub direction: Vector3,

    /// Inverse (1/x) ray direction. Cached for use in [`Bounds`] intersections.
    pub inv_direction: Vector3,
}

/// A struct which is returned by [`Ray::triangle_hit()`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Distance from the ray origin to the intersection point.
    pub distance: Real,

    /// Barycentric coordinate along the `u` edge.
    pub alpha: Real,

    /// Barycentric coordinate along the `v` edge.
    pub beta: Real,
}

impl Ray {
    /// Creates a new [`Ray`] from an `origin` and a `direction`.
    /// `direction` will be normalized, so it must not be the zero vector: the
    /// normalized direction would be NaN and every box test would report a hit.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `direction` is zero or not finite.
    ///
    /// # Examples
    /// ```
    /// use meshbvh::ray::Ray;
    /// use meshbvh::{Point3, Vector3};
    ///
    /// let origin = Point3::new(0.0, 0.0, 0.0);
    /// let direction = Vector3::new(2.0, 0.0, 0.0);
    /// let ray = Ray::new(origin, direction);
    ///
    /// assert_eq!(ray.origin, origin);
    /// assert_eq!(ray.direction, Vector3::new(1.0, 0.0, 0.0));
    /// ```
    pub fn new(origin: Point3, direction: Vector3) -> Ray {
        debug_assert!(
            direction.norm() > 0.0 && direction.norm().is_finite(),
            "Ray direction {:?} cannot be normalized.",
            direction
        );
        let direction = direction.normalize();
        Ray {
            origin,
            direction,
            inv_direction: direction.map(|x| 1.0 / x),
        }
    }

    /// Returns the point at distance `t` along the ray.
    pub fn at(&self, t: Real) -> Point3 {
        self.origin + self.direction * t
    }

    /// Tests the intersection of a [`Ray`] with [`Bounds`] using the slab method.
    ///
    /// Boxes with zero extent on some axis (e.g. around a planar mesh) can be hit, and a
    /// ray starting inside a box always hits it. Empty bounds are never hit.
    ///
    /// # Examples
    /// ```
    /// use meshbvh::aabb::Bounds;
    /// use meshbvh::ray::Ray;
    /// use meshbvh::{Point3, Vector3};
    ///
    /// let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
    ///
    /// let bounds = Bounds::with_bounds(Point3::new(99.9, -1.0, -1.0), Point3::new(100.1, 1.0, 1.0));
    /// assert!(ray.intersects_bounds(&bounds));
    /// ```
    pub fn intersects_bounds(&self, bounds: &Bounds) -> bool {
        if bounds.is_empty() {
            return false;
        }

        let mut t_enter: Real = 0.0;
        let mut t_exit = Real::INFINITY;
        for i in 0..3 {
            // A ray parallel to a slab never enters or leaves it, so the slab only
            // decides whether the origin lies between its planes (faces included).
            if self.direction[i] == 0.0 {
                if self.origin[i] < bounds.min[i] || self.origin[i] > bounds.max[i] {
                    return false;
                }
                continue;
            }

            let t1 = (bounds.min[i] - self.origin[i]) * self.inv_direction[i];
            let t2 = (bounds.max[i] - self.origin[i]) * self.inv_direction[i];
            t_enter = t_enter.max(t1.min(t2));
            t_exit = t_exit.min(t1.max(t2));
        }

        t_exit >= t_enter
    }

    /// Plane-and-barycentric triangle test on precomputed triangle data.
    ///
    /// 1. Rays travelling with the normal, or nearly parallel to the plane
    ///    (`dot(normal, direction) > -EPSILON`), miss: back faces are culled.
    /// 2. Hits closer than [`MIN_HIT_DISTANCE`] are discarded.
    /// 3. The hit point is accepted iff its barycentric coordinates satisfy
    ///    `alpha > 0`, `beta > 0` and `alpha + beta < 1`.
    ///
    /// # Examples
    /// ```
    /// use meshbvh::ray::Ray;
    /// use meshbvh::triangle::Triangle;
    /// use meshbvh::{Point3, Vector3};
    ///
    /// let triangle = Triangle::new(
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// ).unwrap();
    ///
    /// let front = Ray::new(Point3::new(0.25, 0.25, 2.0), Vector3::new(0.0, 0.0, -1.0));
    /// let hit = front.triangle_hit(&triangle).unwrap();
    /// assert_eq!(hit.distance, 2.0);
    ///
    /// let back = Ray::new(Point3::new(0.25, 0.25, -2.0), Vector3::new(0.0, 0.0, 1.0));
    /// assert!(back.triangle_hit(&triangle).is_none());
    /// ```
    pub fn triangle_hit<T: PrecomputedTriangle>(&self, triangle: &T) -> Option<TriangleHit> {
        let normal = triangle.normal();
        let denom = normal.dot(&self.direction);
        if denom > -EPSILON {
            return None;
        }

        let distance = (triangle.plane_offset() - normal.dot(&self.origin.coords)) / denom;
        if !(distance >= MIN_HIT_DISTANCE) {
            return None;
        }

        let planar_hit = self.at(distance) - triangle.q();
        let w = triangle.w();
        let alpha = w.dot(&planar_hit.cross(&triangle.v()));
        let beta = w.dot(&triangle.u().cross(&planar_hit));

        if alpha > 0.0 && beta > 0.0 && alpha + beta < 1.0 {
            Some(TriangleHit {
                distance,
                alpha,
                beta,
            })
        } else {
            None
        }
    }

    /// Returns true if the ray hits the front face of `triangle`.
    pub fn intersects_triangle<T: PrecomputedTriangle>(&self, triangle: &T) -> bool {
        self.triangle_hit(triangle).is_some()
    }
}
