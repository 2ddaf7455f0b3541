// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

//! Binary space partitioning for closest-hit ray queries.
//!
//! A [`BspTree`] is built once over primitives borrowed from a scene and then
//! answers [`BspTree::intersect`] by clipping the ray against the scene box and
//! descending front to back, so only the regions the ray actually crosses are
//! tested.

pub mod bsp;
pub mod object;
pub mod ray;

pub use bsp::{
    BoundingBox,
    BspConfig,
    BspNode,
    BspTree,
    TreeStats,
};
pub use object::Object;
pub use ray::{
    Primitive,
    Ray,
};
