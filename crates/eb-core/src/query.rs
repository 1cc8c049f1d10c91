use crate::entity::{Capability, Entity, EntityId, Scale};
use crate::world::World;

/// A builder for filtering entities in a world.
///
/// Results always come back in insertion order.
pub struct QueryBuilder<'w> {
    world: &'w World,
    scale_filter: Vec<Scale>,
    capabilities: Vec<Capability>,
    active_only: bool,
    limit: Option<usize>,
}

impl<'w> QueryBuilder<'w> {
    /// Start an unfiltered query over `world`.
    pub fn new(world: &'w World) -> Self {
        Self {
            world,
            scale_filter: Vec::new(),
            capabilities: Vec::new(),
            active_only: false,
            limit: None,
        }
    }

    /// Filter by a single scale.
    pub fn scale(mut self, scale: Scale) -> Self {
        self.scale_filter = vec![scale];
        self
    }

    /// Filter to entities at any of the given scales.
    pub fn scales(mut self, scales: &[Scale]) -> Self {
        self.scale_filter = scales.to_vec();
        self
    }

    /// Require a capability.
    pub fn with(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Require every capability in the set.
    pub fn with_all(mut self, capabilities: &[Capability]) -> Self {
        self.capabilities.extend_from_slice(capabilities);
        self
    }

    /// Skip entities consumed by an aggregate or reaction.
    pub fn active(mut self) -> Self {
        self.active_only = true;
        self
    }

    /// Limit the number of results.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Execute the query and return matching entities.
    pub fn execute(self) -> Vec<&'w Entity> {
        let limit = self.limit.unwrap_or(usize::MAX);
        self.world
            .all_entities()
            .filter(|e| self.matches(e))
            .take(limit)
            .collect()
    }

    /// Matching IDs. Lets callers mutate the world while walking the result.
    pub fn ids(self) -> Vec<EntityId> {
        self.execute().into_iter().map(|e| e.id).collect()
    }

    /// Count matching entities without collecting them.
    pub fn count(self) -> usize {
        let limit = self.limit.unwrap_or(usize::MAX);
        self.world
            .all_entities()
            .filter(|e| self.matches(e))
            .take(limit)
            .count()
    }

    fn matches(&self, entity: &Entity) -> bool {
        if !self.scale_filter.is_empty() && !self.scale_filter.contains(&entity.scale()) {
            return false;
        }

        if self.active_only && !entity.is_active() {
            return false;
        }

        entity.has_all(&self.capabilities)
    }
}
