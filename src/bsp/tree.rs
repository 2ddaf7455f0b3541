// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use tracing::instrument;

use super::{
    BoundingBox,
    BspNode,
};
use crate::ray::{
    Primitive,
    Ray,
};

/// Build parameters of a [`BspTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BspConfig {
    /// Deepest level a leaf may sit at, the root being level 0.
    pub max_depth:      usize,
    /// Nodes holding fewer primitives than this become leaves.
    pub min_primitives: usize,
}

impl BspConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 20;
    pub const DEFAULT_MIN_PRIMITIVES: usize = 3;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_depth:      Self::DEFAULT_MAX_DEPTH,
            min_primitives: Self::DEFAULT_MIN_PRIMITIVES,
        }
    }

    #[must_use]
    pub const fn with_max_depth(
        mut self,
        max_depth: usize,
    ) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub const fn with_min_primitives(
        mut self,
        min_primitives: usize,
    ) -> Self {
        self.min_primitives = min_primitives;
        self
    }

    const fn is_leaf(
        &self,
        count: usize,
        depth: usize,
    ) -> bool {
        depth >= self.max_depth || count < self.min_primitives
    }
}

impl Default for BspConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Shape summary of a built tree.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TreeStats {
    pub nodes:      usize,
    pub leaves:     usize,
    /// Primitive references summed over all leaves.
    pub primitives: usize,
    pub max_depth:  usize,
    pub avg_depth:  f64,
}

/// Binary space partition over primitives borrowed from a scene.
///
/// Built once, read-only afterwards. Queries only mutate the [`Ray`] they are
/// given, so a tree over `Sync` primitives can be shared between threads.
#[derive(Debug)]
pub struct BspTree<'a, P: ?Sized> {
    bounds: BoundingBox,
    config: BspConfig,
    root:   BspNode<'a, P>,
}

impl<'a, P: Primitive + ?Sized> BspTree<'a, P> {
    /// Builds with [`BspConfig::default`].
    pub fn build(
        bounds: BoundingBox,
        primitives: impl IntoIterator<Item = &'a P>,
    ) -> Self {
        Self::build_with(BspConfig::default(), bounds, primitives)
    }

    #[instrument(level = "debug", skip(primitives))]
    pub fn build_with(
        config: BspConfig,
        bounds: BoundingBox,
        primitives: impl IntoIterator<Item = &'a P>,
    ) -> Self {
        let primitives = primitives.into_iter().collect();
        let tree = Self {
            bounds,
            config,
            root: build_node(&config, &bounds, primitives, 0),
        };
        tree.log_stats();
        tree
    }

    /// Closest-hit query. On a hit `ray.t` holds the distance to the nearest
    /// primitive in front of the origin.
    pub fn intersect(
        &self,
        ray: &mut Ray,
    ) -> bool {
        let Some((t0, t1)) = self.bounds.clip(ray) else {
            return false;
        };

        let t0 = t0.max(0.0);
        let t1 = t1.min(ray.t);
        if t1 < t0 {
            return false;
        }

        self.root.traverse(ray, t0, t1)
    }

    fn log_stats(&self) {
        let stats = self.stats();
        tracing::debug!(
            nodes = stats.nodes,
            leaves = stats.leaves,
            primitives = stats.primitives,
            max_depth = stats.max_depth,
            avg_depth = stats.avg_depth,
            "BSP tree built"
        );
    }
}

impl<'a, P: Primitive + Sync + ?Sized> BspTree<'a, P> {
    /// Same tree as [`build_with`](Self::build_with), with sibling subtrees
    /// built on the rayon pool.
    #[instrument(level = "debug", skip(primitives))]
    pub fn build_parallel(
        config: BspConfig,
        bounds: BoundingBox,
        primitives: impl IntoIterator<Item = &'a P>,
    ) -> Self {
        let primitives = primitives.into_iter().collect();
        let tree = Self {
            bounds,
            config,
            root: build_node_parallel(&config, &bounds, primitives, 0),
        };
        tree.log_stats();
        tree
    }
}

impl<'a, P: ?Sized> BspTree<'a, P> {
    #[must_use]
    pub const fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    #[must_use]
    pub const fn config(&self) -> &BspConfig {
        &self.config
    }

    #[must_use]
    pub const fn root(&self) -> &BspNode<'a, P> {
        &self.root
    }

    /// Depth-first walk over the leaves, lower child before upper.
    #[must_use]
    pub fn leaves(&self) -> Leaves<'_, 'a, P> {
        Leaves {
            stack: vec![(&self.root, 0)],
        }
    }

    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        let mut depth_sum = 0;

        let mut search_nodes = vec![(&self.root, 0usize)];
        while let Some((node, depth)) = search_nodes.pop() {
            stats.nodes += 1;
            match node {
                BspNode::Leaf { primitives } => {
                    stats.leaves += 1;
                    stats.primitives += primitives.len();
                    stats.max_depth = stats.max_depth.max(depth);
                    depth_sum += depth;
                },
                BspNode::Internal { children, .. } => {
                    let [lower, upper] = &**children;
                    search_nodes.push((upper, depth + 1));
                    search_nodes.push((lower, depth + 1));
                },
            }
        }

        stats.avg_depth = depth_sum as f64 / stats.leaves as f64;
        stats
    }
}

/// Iterator returned by [`BspTree::leaves`], yielding each leaf's depth and
/// primitives.
pub struct Leaves<'t, 'a, P: ?Sized> {
    stack: Vec<(&'t BspNode<'a, P>, usize)>,
}

impl<'t, 'a, P: ?Sized> Iterator for Leaves<'t, 'a, P> {
    type Item = (usize, &'t [&'a P]);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, depth)) = self.stack.pop() {
            match node {
                BspNode::Leaf { primitives } => return Some((depth, primitives.as_slice())),
                BspNode::Internal { children, .. } => {
                    let [lower, upper] = &**children;
                    self.stack.push((upper, depth + 1));
                    self.stack.push((lower, depth + 1));
                },
            }
        }
        None
    }
}

/// Chooses the split plane of `bounds` and sorts `primitives` into the lower
/// and upper halves. Each primitive lands in exactly one half.
fn partition<'a, P: Primitive + ?Sized>(
    bounds: &BoundingBox,
    primitives: Vec<&'a P>,
) -> (usize, f32, [(BoundingBox, Vec<&'a P>); 2]) {
    let axis = bounds.widest_axis();
    let split = (bounds.min[axis] + bounds.max[axis]) / 2.0;
    let (lower_bounds, upper_bounds) = bounds.split(axis, split);

    let count = primitives.len();
    let (lower, upper): (Vec<&'a P>, Vec<&'a P>) = primitives
        .into_iter()
        .partition(|primitive| primitive.contained_in(&lower_bounds));
    debug_assert_eq!(lower.len() + upper.len(), count);

    (axis, split, [(lower_bounds, lower), (upper_bounds, upper)])
}

fn build_node<'a, P: Primitive + ?Sized>(
    config: &BspConfig,
    bounds: &BoundingBox,
    primitives: Vec<&'a P>,
    depth: usize,
) -> BspNode<'a, P> {
    if config.is_leaf(primitives.len(), depth) {
        return BspNode::Leaf { primitives };
    }

    let (axis, split, [(lower_bounds, lower), (upper_bounds, upper)]) =
        partition(bounds, primitives);

    BspNode::Internal {
        axis,
        split,
        children: Box::new([
            build_node(config, &lower_bounds, lower, depth + 1),
            build_node(config, &upper_bounds, upper, depth + 1),
        ]),
    }
}

fn build_node_parallel<'a, P: Primitive + Sync + ?Sized>(
    config: &BspConfig,
    bounds: &BoundingBox,
    primitives: Vec<&'a P>,
    depth: usize,
) -> BspNode<'a, P> {
    // Below this, spawning costs more than building the subtree inline
    const SEQUENTIAL_CUTOFF: usize = 256;

    if config.is_leaf(primitives.len(), depth) {
        return BspNode::Leaf { primitives };
    }
    if primitives.len() < SEQUENTIAL_CUTOFF {
        return build_node(config, bounds, primitives, depth);
    }

    let (axis, split, [(lower_bounds, lower), (upper_bounds, upper)]) =
        partition(bounds, primitives);

    let (lower, upper) = rayon::join(
        || build_node_parallel(config, &lower_bounds, lower, depth + 1),
        || build_node_parallel(config, &upper_bounds, upper, depth + 1),
    );

    BspNode::Internal {
        axis,
        split,
        children: Box::new([lower, upper]),
    }
}
