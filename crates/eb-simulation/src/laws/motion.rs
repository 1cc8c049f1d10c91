use std::collections::{HashMap, HashSet};

use eb_core::entity::{Capability, EntityId};
use glam::DVec3;
use serde::Deserialize;

use crate::context::SimContext;
use crate::error::{SimError, SimResult};
use crate::system::System;

/// Configuration for rigid-body integration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Uniform acceleration applied to every moving body, m/s².
    pub gravity: DVec3,
    /// Linear damping per second. 0 keeps velocities unchanged.
    pub damping: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            gravity: DVec3::ZERO,
            damping: 0.0,
        }
    }
}

/// Per-body integration state kept between ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBody {
    /// Zero for static (massless) bodies.
    pub inverse_mass: f64,
}

/// Semi-implicit Euler integration of every entity with a velocity.
///
/// Owns a body table that has to be allocated by `init` before the first
/// update and is released again on `shutdown`.
#[derive(Debug, Default)]
pub struct MotionSystem {
    config: MotionConfig,
    bodies: Option<HashMap<EntityId, RigidBody>>,
}

impl MotionSystem {
    /// Create the system. The body table is allocated by `init`.
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            bodies: None,
        }
    }

    /// `true` between `init` and `shutdown`.
    pub fn is_ready(&self) -> bool {
        self.bodies.is_some()
    }

    /// Integration state of one body.
    pub fn body(&self, id: EntityId) -> Option<&RigidBody> {
        self.bodies.as_ref().and_then(|b| b.get(&id))
    }

    /// Number of tracked bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.as_ref().map_or(0, HashMap::len)
    }

    fn rigid_body(mass: f64) -> RigidBody {
        RigidBody {
            inverse_mass: if mass > 0.0 { 1.0 / mass } else { 0.0 },
        }
    }
}

impl System for MotionSystem {
    fn name(&self) -> &str {
        "motion"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::Velocity]
    }

    fn init(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let bodies = ctx
            .world
            .query()
            .with_all(self.capabilities())
            .active()
            .execute()
            .into_iter()
            .map(|e| (e.id, Self::rigid_body(e.physical.mass)))
            .collect::<HashMap<_, _>>();
        tracing::debug!(bodies = bodies.len(), "motion body table allocated");
        self.bodies = Some(bodies);
        Ok(())
    }

    fn update(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let bodies = self
            .bodies
            .as_mut()
            .ok_or_else(|| SimError::NotInitialized("motion".into()))?;

        let ids = ctx
            .world
            .query()
            .with(Capability::Velocity)
            .active()
            .ids();

        // Sync the table with bodies spawned or removed since last tick.
        let live: HashSet<EntityId> = ids.iter().copied().collect();
        bodies.retain(|id, _| live.contains(id));

        let dt = ctx.dt;
        let decay = (1.0 - self.config.damping * dt).max(0.0);
        for id in ids {
            let Some(entity) = ctx.world.get_entity_mut(id) else {
                continue;
            };
            let body = *bodies
                .entry(id)
                .or_insert_with(|| Self::rigid_body(entity.physical.mass));
            if body.inverse_mass == 0.0 {
                continue;
            }

            let v = entity.physical.velocity_or_zero() * decay + self.config.gravity * dt;
            entity.physical.velocity = Some(v);
            let position = entity.physical.position + v * dt;
            ctx.move_entity(id, position)?;
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        self.bodies = None;
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
