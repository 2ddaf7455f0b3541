// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use crate::ray::{
    Primitive,
    Ray,
};

/// One region of a [`BspTree`](super::BspTree).
#[derive(Debug)]
pub enum BspNode<'a, P: ?Sized> {
    Leaf {
        primitives: Vec<&'a P>,
    },
    Internal {
        axis:     usize,
        split:    f32,
        /// `[lower, upper]` with respect to `split` along `axis`.
        children: Box<[Self; 2]>,
    },
}

impl<'a, P: ?Sized> BspNode<'a, P> {
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }

    /// Primitives held directly by this node, empty for internal nodes.
    #[must_use]
    pub fn primitives(&self) -> &[&'a P] {
        match self {
            Self::Leaf { primitives } => primitives.as_slice(),
            Self::Internal { .. } => &[],
        }
    }
}

impl<P: Primitive + ?Sized> BspNode<'_, P> {
    /// Front-to-back descent over the parametric interval `[t0, t1]`.
    ///
    /// Returns `true` if some primitive below this node recorded a hit in the
    /// interval, with `ray.t` holding the closest one.
    pub fn traverse(
        &self,
        ray: &mut Ray,
        t0: f32,
        t1: f32,
    ) -> bool {
        match self {
            Self::Leaf { primitives } => {
                // No short-circuit, every primitive gets the chance to be closer
                primitives
                    .iter()
                    .fold(false, |hit, primitive| primitive.intersect(ray, t0, t1) | hit)
            },
            Self::Internal {
                axis,
                split,
                children,
            } => {
                let [lower, upper] = &**children;
                let origin = ray.origin[*axis];
                let direction = ray.direction[*axis];

                // Parallel to the plane, the ray never leaves the side it starts on
                if direction == 0.0 {
                    let side = if origin <= *split { lower } else { upper };
                    return side.traverse(ray, t0, t1);
                }

                let t_split = (split - origin) / direction;
                let (near, far) = if direction > 0.0 {
                    (lower, upper)
                } else {
                    (upper, lower)
                };

                // A plane at t0 or t1 still visits the zero-length side
                if t_split > t1 {
                    near.traverse(ray, t0, t1)
                } else if t_split < t0 {
                    far.traverse(ray, t0, t1)
                } else {
                    near.traverse(ray, t0, t_split) || far.traverse(ray, t_split, t1)
                }
            },
        }
    }
}
