use eb_core::entity::Capability;
use serde::Deserialize;

use crate::context::SimContext;
use crate::error::SimResult;
use crate::system::System;

/// Configuration for [`ThermodynamicsSystem`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThermodynamicsConfig {
    /// Temperature every body relaxes towards, K.
    pub ambient_temperature: f64,
    /// Relaxation rate, 1/s.
    pub relaxation_rate: f64,
    /// Cosmic background floor, K.
    pub min_temperature: f64,
    /// Upper clamp, K.
    pub max_temperature: f64,
}

impl Default for ThermodynamicsConfig {
    fn default() -> Self {
        Self {
            ambient_temperature: 300.0,
            relaxation_rate: 0.1,
            min_temperature: 2.7,
            max_temperature: 10_000.0,
        }
    }
}

impl ThermodynamicsConfig {
    /// Temperature after relaxing for `dt` seconds, clamped to the allowed range.
    pub fn relax(&self, temperature: f64, dt: f64) -> f64 {
        let alpha = 1.0 - (-self.relaxation_rate * dt).exp();
        let t = temperature + (self.ambient_temperature - temperature) * alpha;
        t.clamp(self.min_temperature, self.max_temperature)
    }
}

/// Newtonian cooling towards the ambient temperature.
#[derive(Debug, Default)]
pub struct ThermodynamicsSystem {
    config: ThermodynamicsConfig,
}

impl ThermodynamicsSystem {
    /// Create the system.
    pub fn new(config: ThermodynamicsConfig) -> Self {
        Self { config }
    }
}

impl System for ThermodynamicsSystem {
    fn name(&self) -> &str {
        "thermodynamics"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::Temperature]
    }

    fn update(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let ids = ctx
            .world
            .query()
            .with_all(self.capabilities())
            .active()
            .ids();
        for id in ids {
            if let Some(entity) = ctx.world.get_entity_mut(id)
                && let Some(t) = entity.physical.temperature
            {
                entity.physical.temperature = Some(self.config.relax(t, ctx.dt));
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
