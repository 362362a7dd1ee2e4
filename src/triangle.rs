//! This module defines the [`Triangle`] geometry primitive together with the data
//! precomputed for ray intersection.

use crate::aabb::{Bounded, Bounds};
use crate::error::{BvhError, Result};
use crate::utils::{fast_max, fast_min};
use crate::{Point3, Real, Vector3, EPSILON};

/// Read access to the precomputed plane-and-barycentric data of a triangle.
///
/// Both the CPU [`Triangle`] and the flattened [`TriangleRecord`] implement this, so the
/// reference intersector in [`ray`] runs on either representation.
///
/// [`TriangleRecord`]: crate::flat_bvh::TriangleRecord
/// [`ray`]: crate::ray
pub trait PrecomputedTriangle {
    /// The first corner, origin of the `u`/`v` edge basis.
    fn q(&self) -> Point3;

    /// Edge vector `b - a`.
    fn u(&self) -> Vector3;

    /// Edge vector `c - a`.
    fn v(&self) -> Vector3;

    /// Unit normal of the supporting plane.
    fn normal(&self) -> Vector3;

    /// Plane offset `dot(normal, a)`.
    fn plane_offset(&self) -> Real;

    /// Barycentric helper `n / dot(n, n)` with `n = u × v`.
    fn w(&self) -> Vector3;
}

/// A triangle with its intersection data cached at construction.
///
/// Triangles are immutable: all derived fields are computed once in [`Triangle::new`]
/// from the three corners and never recomputed elsewhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    a: Point3,
    b: Point3,
    c: Point3,
    u: Vector3,
    v: Vector3,
    n: Vector3,
    normal: Vector3,
    plane_offset: Real,
    w: Vector3,
    center: Point3,
    min: Point3,
    max: Point3,
}

impl Triangle {
    /// Creates a new triangle from three corners given in counter clockwise order
    /// when seen from the front.
    ///
    /// Returns [`BvhError::DegenerateTriangle`] if the corners are collinear
    /// (`|u × v| < EPSILON`), as the normal would be undefined.
    ///
    /// # Examples
    /// ```
    /// use meshbvh::triangle::{PrecomputedTriangle, Triangle};
    /// use meshbvh::{Point3, Vector3};
    ///
    /// let triangle = Triangle::new(
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(3.0, 0.0, 0.0),
    ///     Point3::new(0.0, 3.0, 0.0),
    /// ).unwrap();
    /// assert_eq!(triangle.normal(), Vector3::new(0.0, 0.0, 1.0));
    /// assert_eq!(triangle.center(), Point3::new(1.0, 1.0, 0.0));
    ///
    /// let collinear = Triangle::new(
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 1.0, 1.0),
    ///     Point3::new(2.0, 2.0, 2.0),
    /// );
    /// assert!(collinear.is_err());
    /// ```
    pub fn new(a: Point3, b: Point3, c: Point3) -> Result<Triangle> {
        Self::with_index(a, b, c, 0)
    }

    /// Like [`Triangle::new`], but reports `index` in the degenerate-triangle error.
    pub fn with_index(a: Point3, b: Point3, c: Point3, index: usize) -> Result<Triangle> {
        let u = b - a;
        let v = c - a;
        let n = u.cross(&v);
        let n_dot_n = n.dot(&n);
        let length = n_dot_n.sqrt();

        // Non-finite corners (or a squared length overflowing `Real`) count as degenerate.
        if !length.is_finite() || length < EPSILON {
            return Err(BvhError::DegenerateTriangle { index });
        }

        let normal = n / length;
        Ok(Triangle {
            a,
            b,
            c,
            u,
            v,
            n,
            normal,
            plane_offset: normal.dot(&a.coords),
            w: n / n_dot_n,
            center: Point3::from((a.coords + b.coords + c.coords) / 3.0),
            min: Point3::new(
                fast_min(a.x, fast_min(b.x, c.x)),
                fast_min(a.y, fast_min(b.y, c.y)),
                fast_min(a.z, fast_min(b.z, c.z)),
            ),
            max: Point3::new(
                fast_max(a.x, fast_max(b.x, c.x)),
                fast_max(a.y, fast_max(b.y, c.y)),
                fast_max(a.z, fast_max(b.z, c.z)),
            ),
        })
    }

    /// First corner.
    pub fn a(&self) -> Point3 {
        self.a
    }

    /// Second corner.
    pub fn b(&self) -> Point3 {
        self.b
    }

    /// Third corner.
    pub fn c(&self) -> Point3 {
        self.c
    }

    /// The three corners in construction order.
    pub fn vertices(&self) -> [Point3; 3] {
        [self.a, self.b, self.c]
    }

    /// The unnormalized normal `u × v`.
    pub fn cross(&self) -> Vector3 {
        self.n
    }

    /// Centroid `(a + b + c) / 3`, used to assign the triangle to a side of a split plane.
    pub fn center(&self) -> Point3 {
        self.center
    }

    /// Componentwise minimum of the corners.
    pub fn min(&self) -> Point3 {
        self.min
    }

    /// Componentwise maximum of the corners.
    pub fn max(&self) -> Point3 {
        self.max
    }

    /// Area of the triangle.
    pub fn area(&self) -> Real {
        self.n.norm() / 2.0
    }
}

impl PrecomputedTriangle for Triangle {
    fn q(&self) -> Point3 {
        self.a
    }

    fn u(&self) -> Vector3 {
        self.u
    }

    fn v(&self) -> Vector3 {
        self.v
    }

    fn normal(&self) -> Vector3 {
        self.normal
    }

    fn plane_offset(&self) -> Real {
        self.plane_offset
    }

    fn w(&self) -> Vector3 {
        self.w
    }
}

impl Bounded for Triangle {
    fn bounds(&self) -> Bounds {
        Bounds::with_bounds(self.min, self.max)
    }
}
