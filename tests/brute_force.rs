// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use glam::Vec3A;
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

const CELLS: usize = 4;
const CELL_SIZE: f32 = 2.0;
const EPSILON: f32 = 1e-5;

fn scene_bounds() -> BoundingBox {
    #[allow(clippy::cast_precision_loss)]
    let size = CELLS as f32 * CELL_SIZE;
    BoundingBox::new(Vec3A::ZERO, Vec3A::splat(size))
}

fn random_in(
    rng: &mut StdRng,
    extent: f32,
) -> Vec3A {
    Vec3A::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

fn random_direction(rng: &mut StdRng) -> Vec3A {
    loop {
        let vector = random_in(rng, 1.0);
        let length_squared = vector.length_squared();
        if length_squared > 1e-4 && length_squared <= 1.0 {
            return vector.normalize();
        }
    }
}

/// Up to two primitives per grid cell, each strictly inside its cell.
///
/// Midpoint splits of the scene box land on cell walls until a node holds
/// fewer than three primitives, so no primitive is ever cut by a split plane.
#[allow(clippy::cast_precision_loss)]
fn grid_scene(seed: u64) -> Vec<Object> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut objects = Vec::new();

    for x in 0..CELLS {
        for y in 0..CELLS {
            for z in 0..CELLS {
                let center = (Vec3A::new(x as f32, y as f32, z as f32) + 0.5) * CELL_SIZE;
                for _ in 0..rng.gen_range(0..=2) {
                    let object = if rng.gen_bool(0.5) {
                        Object::Sphere {
                            center: center + random_in(&mut rng, 0.3),
                            radius: rng.gen_range(0.2..0.6),
                        }
                    } else {
                        Object::Triangle {
                            a: center + random_in(&mut rng, 0.9),
                            b: center + random_in(&mut rng, 0.9),
                            c: center + random_in(&mut rng, 0.9),
                        }
                    };
                    objects.push(object);
                }
            }
        }
    }

    objects
}

/// Rays from outside the scene, from inside it, and exactly along the axes.
fn rays(
    seed: u64,
    count: usize,
) -> Vec<Ray> {
    let mut rng = StdRng::seed_from_u64(seed);
    let center = scene_bounds().center();
    let axes = [Vec3A::X, Vec3A::Y, Vec3A::Z, -Vec3A::X, -Vec3A::Y, -Vec3A::Z];

    (0..count)
        .map(|i| match i % 3 {
            0 => {
                let origin = center + random_direction(&mut rng) * 12.0;
                let target = center + random_in(&mut rng, 4.0);
                Ray::new(origin, target - origin)
            },
            1 => Ray::new(
                center + random_in(&mut rng, 3.9),
                random_direction(&mut rng),
            ),
            _ => Ray::new(
                center + random_in(&mut rng, 3.9),
                axes[rng.gen_range(0..axes.len())],
            ),
        })
        .collect()
}

fn linear_intersect(
    objects: &[Object],
    ray: &mut Ray,
) -> bool {
    objects.iter().fold(false, |hit, object| {
        object.intersect(ray, 0.0, f32::INFINITY) | hit
    })
}

fn assert_same_hit(
    tree: &BspTree<'_, Object>,
    objects: &[Object],
    ray: Ray,
) {
    let mut tree_ray = ray;
    let mut linear_ray = ray;
    let tree_hit = tree.intersect(&mut tree_ray);
    let linear_hit = linear_intersect(objects, &mut linear_ray);

    assert_eq!(tree_hit, linear_hit, "hit mismatch for {ray:?}");
    if linear_hit {
        let point = tree_ray.at(tree_ray.t);
        assert!(
            tree.bounds().contains_box(&BoundingBox::from_points([point])),
            "hit point {point:?} outside the scene"
        );
        assert!(
            (tree_ray.t - linear_ray.t).abs() < EPSILON,
            "distance mismatch for {ray:?}: {} vs {}",
            tree_ray.t,
            linear_ray.t
        );
    } else {
        assert!(!tree_ray.has_hit());
    }
}

#[test]
fn test_matches_linear_scan() {
    for seed in 0..4 {
        let objects = grid_scene(seed);
        let tree = BspTree::build(scene_bounds(), &objects);
        assert!(tree.stats().leaves > 1);

        for ray in rays(seed + 100, 3000) {
            assert_same_hit(&tree, &objects, ray);
        }
    }
}

#[test]
fn test_tree_hits_are_real_with_straddling_primitives() {
    // Large spheres get cut by split planes and may be missed, but whatever
    // the tree does report is a genuine hit that is never closer than the truth
    let mut rng = StdRng::seed_from_u64(7);
    let objects: Vec<Object> = (0..200)
        .map(|_| Object::Sphere {
            center: Vec3A::splat(4.0) + random_in(&mut rng, 3.0),
            radius: rng.gen_range(0.2..1.0),
        })
        .collect();
    let tree = BspTree::build(scene_bounds(), &objects);

    for ray in rays(8, 3000) {
        let mut tree_ray = ray;
        let mut linear_ray = ray;
        let tree_hit = tree.intersect(&mut tree_ray);
        let linear_hit = linear_intersect(&objects, &mut linear_ray);

        if tree_hit {
            assert!(linear_hit);
            assert!(tree_ray.t >= linear_ray.t - EPSILON);
            assert!(objects.iter().any(|object| {
                object
                    .hit_distance(&ray, tree_ray.t - EPSILON, tree_ray.t + EPSILON)
                    .is_some()
            }));
        }
    }
}

#[test]
fn test_every_primitive_in_exactly_one_leaf() {
    // Random spheres straddle split planes freely; none may be lost or duplicated
    let mut rng = StdRng::seed_from_u64(42);
    let objects: Vec<Object> = (0..500)
        .map(|_| Object::Sphere {
            center: Vec3A::splat(4.0) + random_in(&mut rng, 3.5),
            radius: rng.gen_range(0.05..0.5),
        })
        .collect();

    let tree = BspTree::build(scene_bounds(), &objects);

    let mut seen: Vec<*const Object> = tree
        .leaves()
        .flat_map(|(_, primitives)| primitives.iter().map(|p| std::ptr::from_ref(*p)))
        .collect();
    let mut expected: Vec<*const Object> = objects.iter().map(std::ptr::from_ref).collect();
    seen.sort_unstable();
    expected.sort_unstable();
    assert_eq!(seen, expected);
    assert_eq!(tree.stats().primitives, objects.len());
}

#[test]
fn test_leaf_depth_and_size() {
    let mut rng = StdRng::seed_from_u64(9);
    let objects: Vec<Object> = (0..300)
        .map(|_| Object::Sphere {
            center: Vec3A::splat(4.0) + random_in(&mut rng, 3.9),
            radius: rng.gen_range(0.01..0.05),
        })
        .collect();

    for config in [
        BspConfig::default(),
        BspConfig::default().with_max_depth(4),
        BspConfig::default().with_max_depth(8).with_min_primitives(10),
    ] {
        let tree = BspTree::build_with(config, scene_bounds(), &objects);
        for (depth, primitives) in tree.leaves() {
            assert!(depth <= config.max_depth);
            if depth < config.max_depth {
                assert!(primitives.len() < config.min_primitives);
            }
        }
        assert!(tree.stats().max_depth <= config.max_depth);
    }
}

#[test]
fn test_parallel_build_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(3);
    let objects: Vec<Object> = (0..4000)
        .map(|_| Object::Sphere {
            center: Vec3A::splat(4.0) + random_in(&mut rng, 3.9),
            radius: rng.gen_range(0.01..0.05),
        })
        .collect();

    let sequential = BspTree::build(scene_bounds(), &objects);
    let parallel = BspTree::build_parallel(BspConfig::default(), scene_bounds(), &objects);

    assert_eq!(sequential.stats(), parallel.stats());
    assert!(sequential.leaves().zip(parallel.leaves()).all(|(a, b)| {
        a.0 == b.0
            && a.1.len() == b.1.len()
            && a.1.iter().zip(b.1).all(|(x, y)| std::ptr::eq(*x, *y))
    }));
}

#[test]
fn test_concurrent_queries() {
    let objects = grid_scene(11);
    let tree = BspTree::build(scene_bounds(), &objects);
    let rays = rays(12, 5000);

    let sequential: Vec<Option<f32>> = rays
        .iter()
        .map(|ray| {
            let mut ray = *ray;
            tree.intersect(&mut ray).then_some(ray.t)
        })
        .collect();

    let concurrent: Vec<Option<f32>> = rays
        .par_iter()
        .map(|ray| {
            let mut ray = *ray;
            tree.intersect(&mut ray).then_some(ray.t)
        })
        .collect();

    assert_eq!(sequential, concurrent);
}

#[test]
fn test_ray_missing_scene_box() {
    let objects = grid_scene(5);
    let tree = BspTree::build(scene_bounds(), &objects);

    let mut ray = Ray::new(Vec3A::new(-1.0, 20.0, 4.0), Vec3A::X);
    assert!(!tree.intersect(&mut ray));
    assert!(!ray.has_hit());

    // Box lies entirely behind the origin
    let mut ray = Ray::new(Vec3A::new(20.0, 4.0, 4.0), Vec3A::X);
    assert!(!tree.intersect(&mut ray));
    assert!(!ray.has_hit());
}
