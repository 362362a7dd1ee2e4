//! Common utilities shared by unit tests.
#![cfg(test)]

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ray::Ray;
use crate::triangle::Triangle;
use crate::{Point3, Vector3};

/// A vector represented as a tuple
pub type TupleVec = (f32, f32, f32);

/// Generate a `TupleVec` for [`proptest::strategy::Strategy`] from -10e10 to 10e10
/// A small enough range to prevent most fp32 errors from breaking certain tests
pub fn tuplevec_small_strategy() -> impl Strategy<Value = TupleVec> {
    (
        -10e10_f32..10e10_f32,
        -10e10_f32..10e10_f32,
        -10e10_f32..10e10_f32,
    )
}

/// Generate a `TupleVec` for [`proptest::strategy::Strategy`] from -1000 to 1000,
/// the scale of a typical scene. Cross products of such corners cannot overflow.
pub fn tuplevec_scene_strategy() -> impl Strategy<Value = TupleVec> {
    (-1000_f32..1000_f32, -1000_f32..1000_f32, -1000_f32..1000_f32)
}

/// Convert a `TupleVec` to a [`Point3`].
pub fn tuple_to_point(tpl: &TupleVec) -> Point3 {
    Point3::new(tpl.0, tpl.1, tpl.2)
}

/// Convert a `TupleVec` to a [`Vector3`].
pub fn tuple_to_vector(tpl: &TupleVec) -> Vector3 {
    Vector3::new(tpl.0, tpl.1, tpl.2)
}

/// A right triangle with unit legs in the plane `z = pos.z`, facing `+z`.
pub fn unit_triangle_at(pos: Point3) -> Triangle {
    Triangle::new(
        pos,
        pos + Vector3::new(1.0, 0.0, 0.0),
        pos + Vector3::new(0.0, 1.0, 0.0),
    )
    .unwrap()
}

/// The unit square in the `z = 0` plane, facing `+z`, made of two `0.5 x 1` strips
/// (`x < 0.5` and `x > 0.5`) of two triangles each.
pub fn unit_square_strips() -> Vec<Triangle> {
    let mut triangles = Vec::with_capacity(4);
    for x in [0.0, 0.5] {
        let p = |dx: f32, dy: f32| Point3::new(x + dx, dy, 0.0);
        triangles.push(Triangle::new(p(0.0, 0.0), p(0.5, 0.0), p(0.0, 1.0)).unwrap());
        triangles.push(Triangle::new(p(0.5, 0.0), p(0.5, 1.0), p(0.0, 1.0)).unwrap());
    }
    triangles
}

/// A `side x side` grid of unit triangles in the `z = 0` plane, spaced 2 apart.
pub fn triangle_grid(side: usize) -> Vec<Triangle> {
    let mut triangles = Vec::with_capacity(side * side);
    for i in 0..side {
        for j in 0..side {
            triangles.push(unit_triangle_at(Point3::new(
                2.0 * i as f32,
                2.0 * j as f32,
                0.0,
            )));
        }
    }
    triangles
}

/// Creates `count` deterministic random triangles with corners at most 2 apart, spread
/// over the box from -10 to 10. Degenerate draws are discarded.
pub fn random_triangle_soup(seed: u64, count: usize) -> Vec<Triangle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut triangles = Vec::with_capacity(count);
    while triangles.len() < count {
        let center = random_point(&mut rng, 10.0);
        let a = center + random_point(&mut rng, 1.0).coords;
        let b = center + random_point(&mut rng, 1.0).coords;
        let c = center + random_point(&mut rng, 1.0).coords;
        if let Ok(triangle) = Triangle::new(a, b, c) {
            if triangle.area() > 1e-3 {
                triangles.push(triangle);
            }
        }
    }
    triangles
}

/// Creates `count` deterministic random rays starting around the soup of
/// [`random_triangle_soup`] and pointing into it.
pub fn random_rays(seed: u64, count: usize) -> Vec<Ray> {
    let mut rng = StdRng::seed_from_u64(seed ^ 0x9E37_79B9_7F4A_7C15);
    (0..count)
        .map(|_| {
            let origin = random_point(&mut rng, 15.0);
            let target = random_point(&mut rng, 10.0);
            Ray::new(origin, target - origin)
        })
        .collect()
}

/// The bit patterns of a triangle's corners, for exact set comparisons.
pub fn triangle_key(triangle: &Triangle) -> [u32; 9] {
    let mut key = [0; 9];
    for (i, vertex) in triangle.vertices().iter().enumerate() {
        key[3 * i] = vertex.x.to_bits();
        key[3 * i + 1] = vertex.y.to_bits();
        key[3 * i + 2] = vertex.z.to_bits();
    }
    key
}

fn random_point(rng: &mut StdRng, extent: f32) -> Point3 {
    Point3::new(
        rng.random_range(-extent..extent),
        rng.random_range(-extent..extent),
        rng.random_range(-extent..extent),
    )
}
