use eb_core::conserved::ConservedQuantities;
use eb_core::entity::{Entity, EntityId};
use eb_core::world::World;
use glam::DVec3;
use rand::Rng;
use rand::rngs::StdRng;

use crate::clock::SimClock;
use crate::error::{SimError, SimResult};
use crate::event::{EventLog, SimEvent, SimEventKind};
use crate::ledger::ConservationLedger;
use crate::spatial::SpatialIndex;

/// Mutable context passed to each system during a tick.
///
/// `spawn`, `despawn`, `consume` and `move_entity` keep the world, the
/// spatial index and the ledger totals in step. Writing positions through
/// `world` directly leaves the index stale.
pub struct SimContext<'a> {
    /// The entity container.
    pub world: &'a mut World,
    /// Spatial index over active entities.
    pub index: &'a mut SpatialIndex,
    /// Conservation ledger and its running totals.
    pub ledger: &'a mut ConservationLedger,
    /// The simulation clock, already advanced for this tick.
    pub clock: &'a SimClock,
    /// Event log for this run.
    pub events: &'a mut EventLog,
    /// The run's only random source.
    pub rng: &'a mut StdRng,
    /// Duration of the current tick in seconds.
    pub dt: f64,
}

impl SimContext<'_> {
    /// Emit a simulation event at the current tick.
    pub fn emit(&mut self, kind: SimEventKind, description: impl Into<String>) {
        self.events
            .push(SimEvent::new(self.clock.tick(), kind, description));
    }

    /// The tick being processed.
    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// A fresh ID drawn from the seeded RNG, so reruns reproduce IDs too.
    pub fn new_id(&mut self) -> EntityId {
        EntityId::from_u128(self.rng.random())
    }

    // -----------------------------------------------------------------------
    // World mutation
    // -----------------------------------------------------------------------

    /// Add an entity to the world, the index and the ledger totals.
    pub fn spawn(&mut self, entity: Entity) -> SimResult<EntityId> {
        let quantities = ConservedQuantities::of(&entity);
        let position = entity.position();
        let active = entity.is_active();
        let id = self.world.add_entity(entity)?;
        if active {
            self.index.insert(id, position);
            self.ledger.add_entity(id, &quantities);
        }
        Ok(id)
    }

    /// Remove an entity from the world, the index and the ledger totals.
    ///
    /// The ledger subtracts what the entity contributed at spawn, not its
    /// current state.
    pub fn despawn(&mut self, id: EntityId) -> SimResult<Entity> {
        let entity = self.world.remove_entity(id)?;
        self.index.remove(id);
        self.ledger.remove_entity(id);
        Ok(entity)
    }

    /// Mark `id` as merged into `into`: it leaves the index and the totals
    /// but stays in the world for inspection.
    pub fn consume(&mut self, id: EntityId, into: EntityId) -> SimResult<()> {
        self.world.consume(id, into)?;
        self.index.remove(id);
        self.ledger.remove_entity(id);
        Ok(())
    }

    /// Move an entity and update its index placement.
    pub fn move_entity(&mut self, id: EntityId, position: DVec3) -> SimResult<()> {
        let entity = self
            .world
            .get_entity_mut(id)
            .ok_or(SimError::EntityNotFound(id))?;
        entity.physical.position = position;
        if entity.is_active() {
            self.index.update(id, position);
        }
        Ok(())
    }
}
