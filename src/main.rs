// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use std::time::Instant;

use glam::Vec3A;
use indicatif::{
    ParallelProgressIterator,
    ProgressBar,
};
use rand::{
    rngs::StdRng,
    Rng,
    SeedableRng,
};
use rayon::iter::{
    IntoParallelRefIterator,
    ParallelIterator,
};
use rtbsp::{
    BoundingBox,
    BspConfig,
    BspTree,
    Object,
    Primitive,
    Ray,
};
use tracing::{
    info,
    warn,
};

pub const PRIMITIVES: usize = 20_000;
pub const RAYS: usize = 200_000;
pub const SEED: u64 = 0x5EED;

pub const SCENE_EXTENT: f32 = 50.0;
pub const MAX_RADIUS: f32 = 1.0;

// Relative tolerance when comparing closest hits
pub const AGREEMENT: f32 = 1e-4;

fn random_point(
    rng: &mut StdRng,
    extent: f32,
) -> Vec3A {
    Vec3A::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

#[inline]
fn random_unit_sphere(rng: &mut StdRng) -> Vec3A {
    loop {
        // Rejection sampling
        let vector = random_point(rng, 1.0);
        let length_squared = vector.length_squared();
        if length_squared > 1e-6 && length_squared <= 1.0 {
            return vector.normalize();
        }
    }
}

fn linear_intersect(
    objects: &[Object],
    ray: &mut Ray,
) -> bool {
    objects.iter().fold(false, |hit, object| {
        object.intersect(ray, 0.0, f32::INFINITY) | hit
    })
}

fn agrees(
    tree: Option<f32>,
    linear: Option<f32>,
) -> bool {
    match (tree, linear) {
        (Some(tree), Some(linear)) => (tree - linear).abs() <= AGREEMENT * linear.max(1.0),
        (None, None) => true,
        _ => false,
    }
}

fn trace_all(
    rays: &[Ray],
    trace: impl Fn(&mut Ray) -> bool + Sync,
) -> Result<Vec<Option<f32>>, Box<dyn std::error::Error>> {
    let bar = ProgressBar::new(u64::try_from(rays.len())?);
    let hits = rays
        .par_iter()
        .progress_with(bar)
        .map(|ray| {
            let mut ray = *ray;
            trace(&mut ray).then_some(ray.t)
        })
        .collect();
    Ok(hits)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let fmt_subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(fmt_subscriber)?;

    let mut rng = StdRng::seed_from_u64(SEED);

    info!(primitives = PRIMITIVES, "Building scene");
    let objects: Vec<Object> = (0..PRIMITIVES)
        .map(|_| Object::Sphere {
            center: random_point(&mut rng, SCENE_EXTENT - MAX_RADIUS),
            radius: rng.gen_range(0.1..MAX_RADIUS),
        })
        .collect();

    let mut bounds = BoundingBox::EMPTY;
    for object in &objects {
        bounds.extend_box(&object.bounds());
    }

    let begin_time = Instant::now();
    let tree = BspTree::build_parallel(BspConfig::default(), bounds, &objects);
    let stats = tree.stats();
    info!(
        elapsed_s = begin_time.elapsed().as_secs_f32(),
        nodes = stats.nodes,
        leaves = stats.leaves,
        max_depth = stats.max_depth,
        avg_depth = stats.avg_depth,
        "Tree built"
    );

    let rays: Vec<Ray> = (0..RAYS)
        .map(|_| {
            let origin = random_unit_sphere(&mut rng) * SCENE_EXTENT * 2.0;
            let target = random_point(&mut rng, SCENE_EXTENT);
            Ray::new(origin, target - origin)
        })
        .collect();

    info!(rays = RAYS, "Tracing through tree");
    let begin_time = Instant::now();
    let tree_hits = trace_all(&rays, |ray| tree.intersect(ray))?;
    let tree_time = begin_time.elapsed();

    info!(rays = RAYS, "Tracing linear scan");
    let begin_time = Instant::now();
    let linear_hits = trace_all(&rays, |ray| linear_intersect(&objects, ray))?;
    let linear_time = begin_time.elapsed();

    let hits = tree_hits.iter().filter(|hit| hit.is_some()).count();
    let mismatches = tree_hits
        .iter()
        .zip(&linear_hits)
        .filter(|(tree, linear)| !agrees(**tree, **linear))
        .count();

    info!(
        hits,
        tree_s = tree_time.as_secs_f32(),
        linear_s = linear_time.as_secs_f32(),
        speedup = linear_time.as_secs_f32() / tree_time.as_secs_f32().max(f32::EPSILON),
        "Done"
    );
    if mismatches > 0 {
        // Spheres cut by a split plane live in one half only
        warn!(mismatches, "Tree and linear scan disagree");
    }

    Ok(())
}
