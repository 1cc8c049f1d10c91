use std::collections::HashMap;

use eb_core::entity::EntityId;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Maximum entries a leaf holds before it subdivides.
pub const NODE_CAPACITY: usize = 8;
/// Nodes at this depth never subdivide and accept unbounded entries.
pub const MAX_DEPTH: u32 = 8;

/// Closed axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Lower corner.
    pub min: DVec3,
    /// Upper corner.
    pub max: DVec3,
}

impl Aabb {
    /// Box between two corners.
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// A cube of half-width `half_extent` centred on the origin.
    pub fn cube(half_extent: f64) -> Self {
        Self::new(DVec3::splat(-half_extent), DVec3::splat(half_extent))
    }

    /// Centre point.
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Closed containment test.
    pub fn contains(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// `true` when the boxes overlap or touch.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Box-to-sphere squared-distance test.
    pub fn intersects_sphere(&self, center: DVec3, radius: f64) -> bool {
        let closest = center.clamp(self.min, self.max);
        closest.distance_squared(center) <= radius * radius
    }

    /// Index of the octant owning `p`. Each axis picks its upper half when `p >= mid`.
    fn octant_of(&self, p: DVec3) -> usize {
        let mid = self.center();
        usize::from(p.x >= mid.x) | usize::from(p.y >= mid.y) << 1 | usize::from(p.z >= mid.z) << 2
    }

    fn octant(&self, index: usize) -> Aabb {
        let mid = self.center();
        let pick = |bit: usize, lo: f64, m: f64, hi: f64| {
            if index & bit != 0 { (m, hi) } else { (lo, m) }
        };
        let (x0, x1) = pick(1, self.min.x, mid.x, self.max.x);
        let (y0, y1) = pick(2, self.min.y, mid.y, self.max.y);
        let (z0, z1) = pick(4, self.min.z, mid.z, self.max.z);
        Aabb::new(DVec3::new(x0, y0, z0), DVec3::new(x1, y1, z1))
    }
}

#[derive(Debug, Clone)]
struct OctreeNode {
    bounds: Aabb,
    depth: u32,
    entries: Vec<(EntityId, DVec3)>,
    children: Option<Box<[OctreeNode; 8]>>,
}

impl OctreeNode {
    fn new(bounds: Aabb, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            entries: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, id: EntityId, p: DVec3) {
        if let Some(children) = self.children.as_mut() {
            children[self.bounds.octant_of(p)].insert(id, p);
            return;
        }

        self.entries.push((id, p));
        if self.entries.len() > NODE_CAPACITY && self.depth < MAX_DEPTH {
            self.subdivide();
        }
    }

    fn subdivide(&mut self) {
        tracing::trace!(depth = self.depth, entries = self.entries.len(), "octree subdivide");
        let bounds = self.bounds;
        let depth = self.depth + 1;
        let mut children = Box::new(std::array::from_fn(|i| {
            OctreeNode::new(bounds.octant(i), depth)
        }));
        for (id, p) in self.entries.drain(..) {
            children[bounds.octant_of(p)].insert(id, p);
        }
        self.children = Some(children);
    }

    fn remove(&mut self, id: EntityId, p: DVec3) -> bool {
        match self.children.as_mut() {
            Some(children) => children[self.bounds.octant_of(p)].remove(id, p),
            None => {
                let before = self.entries.len();
                self.entries.retain(|(eid, _)| *eid != id);
                self.entries.len() != before
            }
        }
    }

    fn query_radius(&self, center: DVec3, radius: f64, out: &mut Vec<EntityId>) {
        if !self.bounds.intersects_sphere(center, radius) {
            return;
        }
        match &self.children {
            Some(children) => children
                .iter()
                .for_each(|c| c.query_radius(center, radius, out)),
            None => {
                let r2 = radius * radius;
                out.extend(
                    self.entries
                        .iter()
                        .filter(|(_, p)| p.distance_squared(center) <= r2)
                        .map(|(id, _)| *id),
                );
            }
        }
    }

    fn query_aabb(&self, bounds: &Aabb, out: &mut Vec<EntityId>) {
        if !self.bounds.intersects(bounds) {
            return;
        }
        match &self.children {
            Some(children) => children.iter().for_each(|c| c.query_aabb(bounds, out)),
            None => out.extend(
                self.entries
                    .iter()
                    .filter(|(_, p)| bounds.contains(*p))
                    .map(|(id, _)| *id),
            ),
        }
    }

    fn depth_below(&self) -> u32 {
        match &self.children {
            Some(children) => 1 + children.iter().map(|c| c.depth_below()).max().unwrap_or(0),
            None => 0,
        }
    }

    fn node_count(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map_or(0, |c| c.iter().map(|n| n.node_count()).sum())
    }
}

/// Index size and shape, for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpatialStats {
    /// Entities in the index.
    pub total_entities: usize,
    /// Number of subdivision levels below the root.
    pub tree_depth: u32,
    /// Nodes in the tree, root included.
    pub node_count: usize,
}

/// Octree over entity positions.
///
/// The identifier map and the tree always hold the same entities: a point
/// outside the world bounds is neither placed in the tree nor remembered.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    root: OctreeNode,
    positions: HashMap<EntityId, DVec3>,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(Aabb::cube(10_000.0))
    }
}

impl SpatialIndex {
    /// An empty index over `bounds`.
    pub fn new(bounds: Aabb) -> Self {
        Self {
            root: OctreeNode::new(bounds, 0),
            positions: HashMap::new(),
        }
    }

    /// The root box.
    pub fn bounds(&self) -> Aabb {
        self.root.bounds
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Index `id` at `position`, replacing any earlier placement.
    ///
    /// Returns `false` when the point lies outside the world bounds; the
    /// entity is then not indexed at all.
    pub fn insert(&mut self, id: EntityId, position: DVec3) -> bool {
        self.remove(id);
        if !self.root.bounds.contains(position) {
            tracing::trace!(%id, ?position, "dropping out-of-bounds point");
            return false;
        }
        self.root.insert(id, position);
        self.positions.insert(id, position);
        true
    }

    /// Returns `true` if the entity was indexed.
    pub fn remove(&mut self, id: EntityId) -> bool {
        match self.positions.remove(&id) {
            Some(p) => self.root.remove(id, p),
            None => false,
        }
    }

    /// Move an entity: remove followed by insert.
    pub fn update(&mut self, id: EntityId, position: DVec3) -> bool {
        self.insert(id, position)
    }

    /// Clear and reinsert a full entity list.
    pub fn rebuild(&mut self, entities: impl IntoIterator<Item = (EntityId, DVec3)>) {
        self.clear();
        for (id, p) in entities {
            self.insert(id, p);
        }
    }

    /// Drop every entity.
    pub fn clear(&mut self) {
        self.root = OctreeNode::new(self.root.bounds, 0);
        self.positions.clear();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Entities within `radius` of `center`, boundary inclusive.
    pub fn query_radius(&self, center: DVec3, radius: f64) -> Vec<EntityId> {
        let mut out = Vec::new();
        if radius >= 0.0 {
            self.root.query_radius(center, radius, &mut out);
        }
        out
    }

    /// Entities whose position lies inside `bounds`, boundary inclusive.
    pub fn query_aabb(&self, bounds: &Aabb) -> Vec<EntityId> {
        let mut out = Vec::new();
        self.root.query_aabb(bounds, &mut out);
        out
    }

    /// The `k` entities closest to `position`, nearest first.
    ///
    /// Linear scan; only distance order is guaranteed between ties.
    pub fn query_nearest(&self, position: DVec3, k: usize) -> Vec<EntityId> {
        let mut by_distance: Vec<(f64, EntityId)> = self
            .positions
            .iter()
            .map(|(id, p)| (p.distance_squared(position), *id))
            .collect();
        by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));
        by_distance.into_iter().take(k).map(|(_, id)| id).collect()
    }

    /// `true` if `id` is indexed.
    pub fn contains(&self, id: EntityId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Indexed position of `id`.
    pub fn position_of(&self, id: EntityId) -> Option<DVec3> {
        self.positions.get(&id).copied()
    }

    /// Every indexed id, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.positions.keys().copied()
    }

    /// Number of indexed entities.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// `true` when nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Size and shape of the tree.
    pub fn statistics(&self) -> SpatialStats {
        SpatialStats {
            total_entities: self.positions.len(),
            tree_depth: self.root.depth_below(),
            node_count: self.root.node_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn line_index(xs: &[f64]) -> (SpatialIndex, Vec<EntityId>) {
        let mut index = SpatialIndex::default();
        let ids = xs
            .iter()
            .map(|x| {
                let id = EntityId::new();
                assert!(index.insert(id, DVec3::new(*x, 0.0, 0.0)));
                id
            })
            .collect();
        (index, ids)
    }

    #[test]
    fn radius_query_on_a_line() {
        let (index, ids) = line_index(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let found: HashSet<_> = index.query_radius(DVec3::ZERO, 2.0).into_iter().collect();
        let expected: HashSet<_> = ids[..3].iter().copied().collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn nearest_picks_closest() {
        let (index, ids) = line_index(&[0.0, 4.0, 10.0]);
        assert_eq!(index.query_nearest(DVec3::new(5.0, 0.0, 0.0), 1), vec![ids[1]]);
        assert_eq!(
            index.query_nearest(DVec3::new(5.0, 0.0, 0.0), 3),
            vec![ids[1], ids[0], ids[2]]
        );
    }

    #[test]
    fn out_of_bounds_point_is_dropped_from_tree_and_map() {
        let mut index = SpatialIndex::new(Aabb::cube(10.0));
        let id = EntityId::new();
        assert!(!index.insert(id, DVec3::new(11.0, 0.0, 0.0)));
        assert!(!index.contains(id));
        assert!(index.is_empty());
        assert!(index.query_radius(DVec3::new(11.0, 0.0, 0.0), 1.0).is_empty());
    }

    #[test]
    fn points_on_the_outer_boundary_are_indexed() {
        let mut index = SpatialIndex::new(Aabb::cube(10.0));
        let id = EntityId::new();
        assert!(index.insert(id, DVec3::splat(10.0)));
        assert_eq!(index.query_nearest(DVec3::ZERO, 1), vec![id]);
    }

    #[test]
    fn update_moves_entity() {
        let (mut index, ids) = line_index(&[0.0]);
        index.update(ids[0], DVec3::new(50.0, 0.0, 0.0));
        assert!(index.query_radius(DVec3::ZERO, 1.0).is_empty());
        assert_eq!(index.query_radius(DVec3::new(50.0, 0.0, 0.0), 0.5), vec![ids[0]]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn subdivision_keeps_every_point_once() {
        let mut index = SpatialIndex::new(Aabb::cube(100.0));
        // Many points on octant boundaries (mid planes at 0, ±50, ...).
        let mut ids = Vec::new();
        for i in -4..=4 {
            for j in -2..=2 {
                let id = EntityId::new();
                index.insert(id, DVec3::new(i as f64 * 25.0, j as f64 * 50.0, 0.0));
                ids.push(id);
            }
        }
        let stats = index.statistics();
        assert_eq!(stats.total_entities, ids.len());
        assert!(stats.tree_depth >= 1);
        assert_eq!(stats.node_count % 8, 1);

        let all = index.query_aabb(&index.bounds());
        assert_eq!(all.len(), ids.len());
        let unique: HashSet<_> = all.into_iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn coincident_points_stop_at_max_depth() {
        let mut index = SpatialIndex::new(Aabb::cube(1.0));
        for _ in 0..100 {
            index.insert(EntityId::new(), DVec3::splat(0.3));
        }
        assert_eq!(index.statistics().tree_depth, MAX_DEPTH);
        assert_eq!(index.query_radius(DVec3::splat(0.3), 0.0).len(), 100);
    }

    #[test]
    fn rebuild_replaces_contents() {
        let (mut index, ids) = line_index(&[0.0, 1.0]);
        let fresh = EntityId::new();
        index.rebuild([(fresh, DVec3::ONE)]);
        assert!(!index.contains(ids[0]));
        assert_eq!(index.position_of(fresh), Some(DVec3::ONE));
    }
}
