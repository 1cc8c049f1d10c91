use serde::Deserialize;

use crate::error::{SimError, SimResult};
use crate::laws::{
    AggregationConfig, EcologyConfig, EvolutionConfig, MetabolismConfig, MotionConfig,
    ReactionConfig, ThermodynamicsConfig,
};
use crate::ledger::Tolerance;
use crate::spatial::Aabb;

/// Configuration for a simulation run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed for deterministic simulation.
    pub seed: u64,
    /// Default tick duration in seconds, used by `Simulation::run`.
    pub dt: f64,
    /// Maximum event log size (oldest events dropped when exceeded). 0 = unlimited.
    pub max_events: usize,
    /// Spatial index bounds. Points outside are not indexed.
    pub world_bounds: Aabb,
    /// Ledger comparison tolerance.
    pub tolerance: Tolerance,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            dt: 1.0,
            max_events: 0,
            world_bounds: Aabb::cube(10_000.0),
            tolerance: Tolerance::default(),
        }
    }
}

impl SimConfig {
    /// Set the RNG seed for deterministic simulation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the default tick duration in seconds.
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Set the maximum event log size (0 = unlimited).
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }

    /// Set the octree root box.
    pub fn with_world_bounds(mut self, bounds: Aabb) -> Self {
        self.world_bounds = bounds;
        self
    }

    /// Set the ledger tolerance.
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Reject a non-positive or non-finite `dt` and inverted world bounds.
    pub fn validate(&self) -> SimResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "dt must be positive, got {}",
                self.dt
            )));
        }
        if !self.world_bounds.min.cmple(self.world_bounds.max).all() {
            return Err(SimError::InvalidConfig(
                "world bounds min must not exceed max".into(),
            ));
        }
        Ok(())
    }
}

/// Per-law settings for the standard pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LawsConfig {
    /// Rigid-body integration.
    pub motion: MotionConfig,
    /// Temperature relaxation.
    pub thermodynamics: ThermodynamicsConfig,
    /// Reaction kinetics.
    pub reaction: ReactionConfig,
    /// Proximity aggregation.
    pub aggregation: AggregationConfig,
    /// Organism metabolism.
    pub metabolism: MetabolismConfig,
    /// Population growth.
    pub ecology: EcologyConfig,
    /// Evolutionary selection.
    pub evolution: EvolutionConfig,
}

impl LawsConfig {
    /// Parse a (possibly partial) JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A whole run configuration file: `{ "sim": {...}, "laws": {...} }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Orchestrator settings.
    pub sim: SimConfig,
    /// Per-law settings.
    pub laws: LawsConfig,
}

impl RunConfig {
    /// Parse a (possibly partial) JSON document and validate the `sim` section.
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.sim.validate()?;
        Ok(config)
    }
}
