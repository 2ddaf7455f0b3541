// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use glam::Vec3A;

use crate::{
    bsp::BoundingBox,
    ray::{
        Primitive,
        Ray,
    },
};

// Below this the ray is treated as lying in the triangle's plane
const PARALLEL_EPSILON: f32 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Object {
    Sphere { center: Vec3A, radius: f32 },
    Triangle { a: Vec3A, b: Vec3A, c: Vec3A },
}

impl Object {
    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        match self {
            Self::Sphere { center, radius } => BoundingBox::new(
                *center - Vec3A::splat(*radius),
                *center + Vec3A::splat(*radius),
            ),
            Self::Triangle { a, b, c } => BoundingBox::from_points([*a, *b, *c]),
        }
    }

    /// Distance along `ray` to the first surface crossing in `[t_min, t_max]`.
    #[must_use]
    pub fn hit_distance(
        &self,
        ray: &Ray,
        t_min: f32,
        t_max: f32,
    ) -> Option<f32> {
        let in_range = |t: f32| t_min <= t && t <= t_max;

        match self {
            Self::Sphere { center, radius } => {
                let offset_origin = *center - ray.origin;
                let a = ray.direction.length_squared();
                let h = ray.direction.dot(offset_origin);
                let c = radius.mul_add(-radius, offset_origin.length_squared());

                let discrim = h.mul_add(h, -(a * c));
                if discrim < 0.0 {
                    return None;
                }

                let sqrt_d = discrim.sqrt();
                let root = (h - sqrt_d) / a;
                if in_range(root) {
                    return Some(root);
                }
                let root = (h + sqrt_d) / a;
                in_range(root).then_some(root)
            },
            Self::Triangle { a, b, c } => {
                // Möller–Trumbore
                let edge1 = *b - *a;
                let edge2 = *c - *a;

                let p = ray.direction.cross(edge2);
                let det = edge1.dot(p);
                if det.abs() < PARALLEL_EPSILON {
                    return None;
                }
                let inv_det = det.recip();

                let s = ray.origin - *a;
                let u = s.dot(p) * inv_det;
                if !(0.0..=1.0).contains(&u) {
                    return None;
                }

                let q = s.cross(edge1);
                let v = ray.direction.dot(q) * inv_det;
                if v < 0.0 || u + v > 1.0 {
                    return None;
                }

                let t = edge2.dot(q) * inv_det;
                in_range(t).then_some(t)
            },
        }
    }
}

impl Primitive for Object {
    fn contained_in(
        &self,
        bounds: &BoundingBox,
    ) -> bool {
        bounds.contains_box(&self.bounds())
    }

    fn intersect(
        &self,
        ray: &mut Ray,
        t_min: f32,
        t_max: f32,
    ) -> bool {
        let Some(t) = self.hit_distance(ray, t_min, t_max) else {
            return false;
        };
        if t >= ray.t {
            return false;
        }

        ray.t = t;
        true
    }
}
