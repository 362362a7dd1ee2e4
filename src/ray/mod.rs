//! This module holds the [`Ray`] definition and the CPU reference intersector used to
//! validate BVHs independently of any GPU traversal.
//!
//! The triangle test is one-sided: rays arriving from behind a triangle (relative to
//! its counter clockwise winding) never hit it. Points exactly on an edge are not
//! hits either; only measure-zero cases are affected.

mod ray_impl;

pub use self::ray_impl::*;

use crate::triangle::PrecomputedTriangle;
use crate::Point3;

/// Tests whether `ray` intersects the box spanned by `min` and `max`.
///
/// # Examples
/// ```
/// use meshbvh::ray::{intersect_box, Ray};
/// use meshbvh::{Point3, Vector3};
///
/// let ray = Ray::new(Point3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
/// assert!(intersect_box(&Point3::new(-1.0, -1.0, -1.0), &Point3::new(1.0, 1.0, 1.0), &ray));
/// assert!(!intersect_box(&Point3::new(2.0, 2.0, -1.0), &Point3::new(3.0, 3.0, 1.0), &ray));
/// ```
pub fn intersect_box(min: &Point3, max: &Point3, ray: &Ray) -> bool {
    ray.intersects_bounds(&crate::aabb::Bounds::with_bounds(*min, *max))
}

/// Tests whether `ray` hits the front face of `triangle`.
pub fn intersect_triangle<T: PrecomputedTriangle>(triangle: &T, ray: &Ray) -> bool {
    ray.intersects_triangle(triangle)
}
