use std::collections::HashMap;

use crate::conserved::ConservedQuantities;
use crate::entity::{Entity, EntityId, Lifecycle, Scale};
use crate::error::{EbError, EbResult};
use crate::query::QueryBuilder;

/// The entity container. Owns every entity and remembers insertion order.
#[derive(Debug, Clone, Default)]
pub struct World {
    entities: HashMap<EntityId, Entity>,

    // Indexes
    order: Vec<EntityId>,
    by_scale: HashMap<Scale, Vec<EntityId>>,
}

impl World {
    /// An empty world.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Entity CRUD
    // -----------------------------------------------------------------------

    /// Add an entity to the world. Returns the entity's ID.
    pub fn add_entity(&mut self, entity: Entity) -> EbResult<EntityId> {
        let id = entity.id;
        if self.entities.contains_key(&id) {
            return Err(EbError::DuplicateId(id));
        }

        self.by_scale.entry(entity.scale()).or_default().push(id);
        self.order.push(id);
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Get a reference to an entity by ID.
    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    ///
    /// The body variant must not be swapped for one of a different scale;
    /// the scale index is not refreshed.
    pub fn get_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Returns true if an entity with this ID exists, consumed or not.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Remove an entity and drop it from every index.
    pub fn remove_entity(&mut self, id: EntityId) -> EbResult<Entity> {
        let entity = self
            .entities
            .remove(&id)
            .ok_or(EbError::EntityNotFound(id))?;

        self.order.retain(|eid| *eid != id);
        if let Some(ids) = self.by_scale.get_mut(&entity.scale()) {
            ids.retain(|eid| *eid != id);
        }
        Ok(entity)
    }

    /// Tag an entity as merged into `into`. It stays in the container.
    pub fn consume(&mut self, id: EntityId, into: EntityId) -> EbResult<()> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(EbError::EntityNotFound(id))?;
        entity.lifecycle = Lifecycle::ConsumedInto(into);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Get all entities of a specific scale, in insertion order.
    pub fn entities_by_scale(&self, scale: Scale) -> Vec<&Entity> {
        self.by_scale
            .get(&scale)
            .map(|ids| ids.iter().filter_map(|id| self.entities.get(id)).collect())
            .unwrap_or_default()
    }

    /// Get all entities in insertion order.
    pub fn all_entities(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    /// Start building a query.
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    /// Total number of entities, consumed ones included.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of entities still active.
    pub fn active_count(&self) -> usize {
        self.entities.values().filter(|e| e.is_active()).count()
    }

    /// Count entities by scale. Scales with no entities are omitted.
    pub fn entity_counts_by_scale(&self) -> HashMap<Scale, usize> {
        self.by_scale
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(s, ids)| (*s, ids.len()))
            .collect()
    }

    /// Conserved totals over active entities only.
    pub fn active_totals(&self) -> ConservedQuantities {
        self.all_entities()
            .filter(|e| e.is_active())
            .map(ConservedQuantities::of)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;
    use crate::component::{Genome, OrganismBody};

    fn molecule_at(x: f64) -> Entity {
        Entity::molecule(Default::default(), 1.0, DVec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn add_and_get_entity() {
        let mut world = World::new();
        let id = world.add_entity(molecule_at(3.0)).unwrap();
        let retrieved = world.get_entity(id).unwrap();
        assert_eq!(retrieved.position().x, 3.0);
        assert!(world.contains(id));
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut world = World::new();
        let e = molecule_at(0.0);
        world.add_entity(e.clone()).unwrap();
        let result = world.add_entity(e);
        assert!(matches!(result, Err(EbError::DuplicateId(_))));
    }

    #[test]
    fn remove_entity_clears_indexes() {
        let mut world = World::new();
        let a = world.add_entity(molecule_at(0.0)).unwrap();
        let b = world.add_entity(molecule_at(1.0)).unwrap();

        world.remove_entity(a).unwrap();
        assert_eq!(world.entity_count(), 1);
        assert_eq!(world.entities_by_scale(Scale::Molecular).len(), 1);
        assert_eq!(world.all_entities().next().unwrap().id, b);
        assert!(matches!(
            world.remove_entity(a),
            Err(EbError::EntityNotFound(_))
        ));
    }

    #[test]
    fn all_entities_preserves_insertion_order() {
        let mut world = World::new();
        let ids: Vec<_> = (0..10)
            .map(|i| world.add_entity(molecule_at(i as f64)).unwrap())
            .collect();
        let seen: Vec<_> = world.all_entities().map(|e| e.id).collect();
        assert_eq!(seen, ids);
    }

    #[test]
    fn entities_by_scale() {
        let mut world = World::new();
        world.add_entity(molecule_at(0.0)).unwrap();
        world.add_entity(molecule_at(1.0)).unwrap();
        world
            .add_entity(Entity::organism(
                OrganismBody::new(Genome::default(), 10.0),
                2.0,
                DVec3::ZERO,
            ))
            .unwrap();

        assert_eq!(world.entities_by_scale(Scale::Molecular).len(), 2);
        assert_eq!(world.entities_by_scale(Scale::Organismal).len(), 1);
        assert_eq!(world.entities_by_scale(Scale::Population).len(), 0);

        let counts = world.entity_counts_by_scale();
        assert_eq!(counts.get(&Scale::Molecular), Some(&2));
        assert!(!counts.contains_key(&Scale::Population));
    }

    #[test]
    fn consumed_entities_leave_active_totals() {
        let mut world = World::new();
        let a = world.add_entity(molecule_at(0.0)).unwrap();
        let b = world.add_entity(molecule_at(1.0)).unwrap();
        assert_eq!(world.active_totals().mass, 2.0);

        world.consume(a, b).unwrap();
        assert_eq!(world.active_count(), 1);
        assert_eq!(world.entity_count(), 2);
        assert_eq!(world.active_totals().mass, 1.0);
        assert_eq!(
            world.get_entity(a).unwrap().lifecycle,
            Lifecycle::ConsumedInto(b)
        );
    }

    mod props {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn removals_keep_indexes_in_step(
                xs in prop::collection::vec(-100.0f64..100.0, 1..40),
                remove_mask in prop::collection::vec(any::<bool>(), 40),
            ) {
                let mut world = World::new();
                let ids: Vec<_> = xs.iter().map(|x| world.add_entity(molecule_at(*x)).unwrap()).collect();

                let mut kept = Vec::new();
                for (i, id) in ids.iter().enumerate() {
                    if remove_mask[i] {
                        world.remove_entity(*id).unwrap();
                    } else {
                        kept.push(*id);
                    }
                }

                let seen: Vec<_> = world.all_entities().map(|e| e.id).collect();
                prop_assert_eq!(&seen, &kept);
                prop_assert_eq!(world.entity_count(), kept.len());
                prop_assert_eq!(world.entities_by_scale(Scale::Molecular).len(), kept.len());
            }
        }
    }
}
