//! Property tests for the spatial index.

use std::collections::BTreeSet;

use eb_core::entity::EntityId;
use eb_simulation::spatial::{Aabb, SpatialIndex};
use glam::DVec3;
use proptest::prelude::*;

fn point() -> impl Strategy<Value = DVec3> {
    (-100.0..100.0f64, -100.0..100.0f64, -100.0..100.0f64).prop_map(|(x, y, z)| DVec3::new(x, y, z))
}

fn build(points: &[DVec3]) -> (SpatialIndex, Vec<(EntityId, DVec3)>) {
    let mut index = SpatialIndex::new(Aabb::cube(100.0));
    let entries: Vec<(EntityId, DVec3)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (EntityId::from_u128(i as u128 + 1), *p))
        .collect();
    for (id, p) in &entries {
        assert!(index.insert(*id, *p));
    }
    (index, entries)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn radius_query_matches_brute_force(
        points in prop::collection::vec(point(), 0..120),
        center in point(),
        radius in 0.0..80.0f64,
    ) {
        let (index, entries) = build(&points);
        let found: BTreeSet<EntityId> = index.query_radius(center, radius).into_iter().collect();
        let expected: BTreeSet<EntityId> = entries
            .iter()
            .filter(|(_, p)| p.distance_squared(center) <= radius * radius)
            .map(|(id, _)| *id)
            .collect();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn aabb_query_matches_brute_force(
        points in prop::collection::vec(point(), 0..120),
        a in point(),
        b in point(),
    ) {
        let (index, entries) = build(&points);
        let bounds = Aabb::new(a.min(b), a.max(b));
        let found: BTreeSet<EntityId> = index.query_aabb(&bounds).into_iter().collect();
        let expected: BTreeSet<EntityId> = entries
            .iter()
            .filter(|(_, p)| bounds.contains(*p))
            .map(|(id, _)| *id)
            .collect();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn insert_then_remove_leaves_the_rest(
        points in prop::collection::vec(point(), 1..80),
        remove_every in 1usize..5,
    ) {
        let (mut index, entries) = build(&points);
        prop_assert_eq!(index.len(), entries.len());

        let mut kept = BTreeSet::new();
        for (i, (id, _)) in entries.iter().enumerate() {
            if i % remove_every == 0 {
                prop_assert!(index.remove(*id));
            } else {
                kept.insert(*id);
            }
        }

        let ids: BTreeSet<EntityId> = index.ids().collect();
        prop_assert_eq!(&ids, &kept);
        let everything: BTreeSet<EntityId> =
            index.query_aabb(&Aabb::cube(100.0)).into_iter().collect();
        prop_assert_eq!(everything, kept);
    }

    #[test]
    fn nearest_is_sorted_by_distance(
        points in prop::collection::vec(point(), 1..60),
        target in point(),
        k in 1usize..10,
    ) {
        let (index, _) = build(&points);
        let nearest = index.query_nearest(target, k);
        prop_assert_eq!(nearest.len(), k.min(points.len()));
        let distances: Vec<f64> = nearest
            .iter()
            .filter_map(|id| index.position_of(*id))
            .map(|p| p.distance_squared(target))
            .collect();
        prop_assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }
}
