// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

mod node;
mod tree;

use glam::Vec3A;
pub use node::BspNode;
pub use tree::{
    BspConfig,
    BspTree,
    Leaves,
    TreeStats,
};

use crate::ray::Ray;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3A,
    pub max: Vec3A,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    /// Inverted box that any call to [`extend`](Self::extend) replaces.
    pub const EMPTY: Self = Self {
        min: Vec3A::splat(f32::INFINITY),
        max: Vec3A::splat(f32::NEG_INFINITY),
    };

    #[must_use]
    pub const fn new(
        min: Vec3A,
        max: Vec3A,
    ) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3A>) -> Self {
        let mut bounds = Self::EMPTY;
        for point in points {
            bounds.extend(point);
        }
        bounds
    }

    #[inline]
    pub fn clear(&mut self) {
        *self = Self::EMPTY;
    }

    /// True until the box has been extended by at least one point.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    #[inline]
    pub fn extend(
        &mut self,
        point: Vec3A,
    ) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    #[inline]
    pub fn extend_box(
        &mut self,
        other: &Self,
    ) {
        self.extend(other.max);
        self.extend(other.min);
    }

    #[inline]
    #[must_use]
    pub fn overlaps(
        &self,
        other: &Self,
    ) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Whether `other` lies entirely inside `self`, touching faces included.
    #[inline]
    #[must_use]
    pub fn contains_box(
        &self,
        other: &Self,
    ) -> bool {
        self.min.cmple(other.min).all() && other.max.cmple(self.max).all()
    }

    #[inline]
    #[must_use]
    pub fn extent(&self) -> Vec3A {
        self.max - self.min
    }

    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec3A {
        (self.min + self.max) * 0.5
    }

    /// Axis of greatest extent. Ties go to x, then z, then y.
    #[must_use]
    pub fn widest_axis(&self) -> usize {
        let size = self.extent();
        if size.x >= size.y && size.x >= size.z {
            0
        } else if size.z >= size.y {
            2
        } else {
            1
        }
    }

    /// Cuts the box with the plane `axis = value`, returning the lower and
    /// upper halves.
    #[must_use]
    pub fn split(
        &self,
        axis: usize,
        value: f32,
    ) -> (Self, Self) {
        let mut lower = *self;
        let mut upper = *self;
        lower.max[axis] = value;
        upper.min[axis] = value;
        (lower, upper)
    }

    /// Slab test. Returns the parametric entry and exit distances of `ray`,
    /// or `None` if the ray's line misses the box.
    ///
    /// Zero direction components are divided through as-is; the resulting
    /// infinities make a parallel ray pass the slab exactly when its origin
    /// lies inside it. A NaN (origin on the plane of a parallel ray) leaves
    /// the interval unconstrained on that axis.
    #[inline]
    #[must_use]
    pub fn clip(
        &self,
        ray: &Ray,
    ) -> Option<(f32, f32)> {
        let mut t0 = f32::NEG_INFINITY;
        let mut t1 = f32::INFINITY;

        for axis in 0..3 {
            let mut near = (self.min[axis] - ray.origin[axis]) / ray.direction[axis];
            let mut far = (self.max[axis] - ray.origin[axis]) / ray.direction[axis];

            // Sign bit, so a -0.0 component swaps the same way 1/-0.0 would
            if ray.direction[axis].is_sign_negative() {
                core::mem::swap(&mut near, &mut far);
            }

            t0 = t0.max(near);
            t1 = t1.min(far);
        }

        (t0 < t1).then_some((t0, t1))
    }
}

impl FromIterator<Vec3A> for BoundingBox {
    fn from_iter<I: IntoIterator<Item = Vec3A>>(iter: I) -> Self {
        Self::from_points(iter)
    }
}
