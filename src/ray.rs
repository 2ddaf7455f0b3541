// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use glam::Vec3A;

use crate::bsp::BoundingBox;

/// A half-line `origin + t * direction` together with the closest hit
/// distance found so far.
///
/// Queries only ever tighten `t`; `origin` and `direction` are left alone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin:    Vec3A,
    pub direction: Vec3A,
    pub t:         f32,
}

impl Ray {
    /// Creates a ray that has not hit anything yet (`t = +inf`).
    #[must_use]
    pub const fn new(
        origin: Vec3A,
        direction: Vec3A,
    ) -> Self {
        Self {
            origin,
            direction,
            t: f32::INFINITY,
        }
    }

    #[inline]
    #[must_use]
    pub fn at(
        &self,
        t: f32,
    ) -> Vec3A {
        self.origin + self.direction * t
    }

    /// Whether some intersection has already been recorded on this ray.
    #[inline]
    #[must_use]
    pub fn has_hit(&self) -> bool {
        self.t.is_finite()
    }

    /// Forgets any recorded hit so the ray can be traced again.
    #[inline]
    pub fn reset(&mut self) {
        self.t = f32::INFINITY;
    }
}

/// Anything a [`BspTree`](crate::bsp::BspTree) can partition and trace.
///
/// The tree never owns primitives, it only keeps references to them; the
/// scene that created them decides how they are stored.
pub trait Primitive {
    /// Build-time test deciding which half of a split a primitive goes to.
    ///
    /// A primitive for which this returns `true` on the lower half of a split
    /// is placed there, otherwise it goes to the upper half. Primitives are
    /// never duplicated, so a primitive straddling a split plane is only found
    /// by rays whose traversal reaches the leaf it ended up in.
    fn contained_in(
        &self,
        bounds: &BoundingBox,
    ) -> bool;

    /// Intersects `ray` within `[t_min, t_max]`.
    ///
    /// Returns `true` and writes the distance into `ray.t` only when the hit
    /// lies inside the interval and is closer than the one already recorded.
    fn intersect(
        &self,
        ray: &mut Ray,
        t_min: f32,
        t_max: f32,
    ) -> bool;
}

impl<T: Primitive + ?Sized> Primitive for &T {
    #[inline]
    fn contained_in(
        &self,
        bounds: &BoundingBox,
    ) -> bool {
        (**self).contained_in(bounds)
    }

    #[inline]
    fn intersect(
        &self,
        ray: &mut Ray,
        t_min: f32,
        t_max: f32,
    ) -> bool {
        (**self).intersect(ray, t_min, t_max)
    }
}

impl<T: Primitive + ?Sized> Primitive for Box<T> {
    #[inline]
    fn contained_in(
        &self,
        bounds: &BoundingBox,
    ) -> bool {
        (**self).contained_in(bounds)
    }

    #[inline]
    fn intersect(
        &self,
        ray: &mut Ray,
        t_min: f32,
        t_max: f32,
    ) -> bool {
        (**self).intersect(ray, t_min, t_max)
    }
}
