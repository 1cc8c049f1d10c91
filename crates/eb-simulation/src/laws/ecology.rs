use eb_core::entity::{Capability, Scale};
use serde::Deserialize;

use crate::context::SimContext;
use crate::error::SimResult;
use crate::kernels::logistic_growth;
use crate::system::System;

/// Configuration for [`EcologySystem`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EcologyConfig {
    /// Multiplier on every population's intrinsic growth rate.
    pub growth_scale: f64,
}

impl Default for EcologyConfig {
    fn default() -> Self {
        Self { growth_scale: 1.0 }
    }
}

/// Logistic population growth towards carrying capacity.
#[derive(Debug, Default)]
pub struct EcologySystem {
    config: EcologyConfig,
}

impl EcologySystem {
    /// Create the system.
    pub fn new(config: EcologyConfig) -> Self {
        Self { config }
    }
}

impl System for EcologySystem {
    fn name(&self) -> &str {
        "ecology"
    }

    fn scales(&self) -> &[Scale] {
        &[Scale::Population]
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::PopulationStats]
    }

    fn update(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let ids = ctx
            .world
            .query()
            .scales(self.scales())
            .with_all(self.capabilities())
            .active()
            .ids();
        for id in ids {
            let Some(population) = ctx
                .world
                .get_entity_mut(id)
                .and_then(|e| e.body.as_population_mut())
            else {
                continue;
            };
            let growth = logistic_growth(
                population.count,
                population.carrying_capacity,
                population.growth_rate * self.config.growth_scale,
            );
            population.count = (population.count + growth * ctx.dt).max(0.0);
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
