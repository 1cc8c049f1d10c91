use eb_core::entity::{Capability, Scale};
use serde::Deserialize;

use crate::context::SimContext;
use crate::error::SimResult;
use crate::kernels::{REFERENCE_BODY_TEMPERATURE, metabolic_rate};
use crate::system::System;

/// Configuration for [`MetabolismSystem`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetabolismConfig {
    /// Fraction of the Kleiber rate drawn from energy stores each second.
    pub cost_factor: f64,
    /// Temperature at which the metabolic rate is unscaled, K.
    pub reference_temperature: f64,
    /// Body temperature assumed when an organism carries none, K.
    pub default_temperature: f64,
}

impl Default for MetabolismConfig {
    fn default() -> Self {
        Self {
            cost_factor: 0.01,
            reference_temperature: REFERENCE_BODY_TEMPERATURE,
            default_temperature: REFERENCE_BODY_TEMPERATURE,
        }
    }
}

/// Drains organism energy stores at their metabolic rate.
#[derive(Debug, Default)]
pub struct MetabolismSystem {
    config: MetabolismConfig,
}

impl MetabolismSystem {
    /// Create the system.
    pub fn new(config: MetabolismConfig) -> Self {
        Self { config }
    }
}

impl System for MetabolismSystem {
    fn name(&self) -> &str {
        "metabolism"
    }

    fn scales(&self) -> &[Scale] {
        &[Scale::Organismal]
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::EnergyStores]
    }

    fn update(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let ids = ctx
            .world
            .query()
            .scales(self.scales())
            .with_all(self.capabilities())
            .active()
            .ids();
        let dt = ctx.dt;

        for id in ids {
            let Some(entity) = ctx.world.get_entity_mut(id) else {
                continue;
            };
            let temperature = entity
                .physical
                .temperature
                .unwrap_or(self.config.default_temperature);
            let burn = metabolic_rate(entity.physical.mass, temperature, self.config.reference_temperature)
                * self.config.cost_factor
                * dt;
            let Some(organism) = entity.body.as_organism_mut() else {
                continue;
            };

            let mut energy = organism.energy_stores - burn;
            if let Some(m) = organism.metabolism {
                energy += (m.energy_production - m.maintenance_cost) * dt;
            }
            organism.energy_stores = if energy.is_nan() { 0.0 } else { energy };
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
