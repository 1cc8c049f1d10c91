use eb_core::component::{Base, Body, Genome, OrganismBody};
use eb_core::entity::{Capability, Entity, EntityId, Physical, Scale};
use glam::DVec3;
use rand::Rng;
use serde::Deserialize;

use crate::context::SimContext;
use crate::error::SimResult;
use crate::event::SimEventKind;
use crate::system::System;

/// Configuration for [`EvolutionSystem`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Fitness before energy and mass factors.
    pub base_fitness: f64,
    /// Energy above this boosts fitness by `high_energy_bonus`.
    pub high_energy_threshold: f64,
    /// Multiplier applied above the high energy threshold.
    pub high_energy_bonus: f64,
    /// Energy below this scales fitness by `low_energy_penalty`.
    pub low_energy_threshold: f64,
    /// Multiplier applied below the low energy threshold.
    pub low_energy_penalty: f64,
    /// Mass with the best fitness.
    pub optimal_mass: f64,
    /// Reproductions per unit fitness per second.
    pub reproduction_rate: f64,
    /// Energy a parent needs before it can reproduce.
    pub reproduction_threshold: f64,
    /// Energy the parent pays per offspring.
    pub reproduction_cost: f64,
    /// Energy an offspring starts with.
    pub offspring_energy: f64,
    /// Offspring mass as a fraction of the parent's.
    pub offspring_mass_scale: f64,
    /// Maximum offspring displacement per axis.
    pub offspring_jitter: f64,
    /// Per-base substitution probability.
    pub mutation_rate: f64,
    /// Fitness below which an organism may be culled.
    pub cull_fitness_threshold: f64,
    /// Chance per pass that an unfit organism is culled.
    pub cull_probability: f64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            base_fitness: 1.0,
            high_energy_threshold: 150.0,
            high_energy_bonus: 1.2,
            low_energy_threshold: 50.0,
            low_energy_penalty: 0.8,
            optimal_mass: 50.0,
            reproduction_rate: 0.1,
            reproduction_threshold: 100.0,
            reproduction_cost: 60.0,
            offspring_energy: 50.0,
            offspring_mass_scale: 0.5,
            offspring_jitter: 1.0,
            mutation_rate: 0.01,
            cull_fitness_threshold: 0.3,
            cull_probability: 0.01,
        }
    }
}

impl EvolutionConfig {
    /// Multiplicative fitness from energy band and distance to the optimal mass.
    pub fn fitness(&self, energy: f64, mass: f64) -> f64 {
        let mut fitness = self.base_fitness;
        if energy > self.high_energy_threshold {
            fitness *= self.high_energy_bonus;
        } else if energy < self.low_energy_threshold {
            fitness *= self.low_energy_penalty;
        }
        if self.optimal_mass > 0.0 {
            fitness *= 1.0 / (1.0 + (mass - self.optimal_mass).abs() / self.optimal_mass);
        }
        fitness
    }
}

/// Substitute each base with one of the other three with probability `rate`.
pub fn mutate(genome: &Genome, rate: f64, rng: &mut impl Rng) -> Genome {
    let bases = genome
        .bases()
        .iter()
        .map(|&base| {
            if rng.random::<f64>() < rate {
                let others: Vec<Base> = Base::ALL.into_iter().filter(|b| *b != base).collect();
                others[rng.random_range(0..others.len())]
            } else {
                base
            }
        })
        .collect();
    Genome::from_bases(bases)
}

/// Why an organism was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    /// Energy store reached zero.
    Starvation,
    /// Removed by low-fitness selection.
    Culled,
}

impl DeathCause {
    /// Cause as written into `Died` events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starvation => "starvation",
            Self::Culled => "culled",
        }
    }
}

/// Fitness evaluation, reproduction, and selection for organisms.
///
/// Per organism and tick: write `fitness`, maybe reproduce, then remove on
/// starvation or, with a small probability, on low fitness. Offspring born
/// during a pass are first considered on the next one.
#[derive(Debug, Default)]
pub struct EvolutionSystem {
    config: EvolutionConfig,
    births: u64,
    deaths: u64,
}

impl EvolutionSystem {
    /// Create the system with zeroed counters.
    pub fn new(config: EvolutionConfig) -> Self {
        Self {
            config,
            births: 0,
            deaths: 0,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Offspring created so far.
    pub fn births(&self) -> u64 {
        self.births
    }

    /// Organisms removed so far.
    pub fn deaths(&self) -> u64 {
        self.deaths
    }

    fn reproduce(&mut self, ctx: &mut SimContext<'_>, parent_id: EntityId) -> SimResult<Option<EntityId>> {
        let Some(parent) = ctx.world.get_entity(parent_id) else {
            return Ok(None);
        };
        let Some(organism) = parent.body.as_organism() else {
            return Ok(None);
        };
        if organism.energy_stores <= self.config.reproduction_threshold {
            return Ok(None);
        }
        let fitness = organism.phenotype.fitness().unwrap_or(self.config.base_fitness);
        let p = (fitness * self.config.reproduction_rate * ctx.dt).clamp(0.0, 1.0);
        if ctx.rng.random::<f64>() >= p {
            return Ok(None);
        }

        let jitter = self.config.offspring_jitter.abs();
        let offset = if jitter > 0.0 {
            DVec3::new(
                ctx.rng.random_range(-jitter..=jitter),
                ctx.rng.random_range(-jitter..=jitter),
                ctx.rng.random_range(-jitter..=jitter),
            )
        } else {
            DVec3::ZERO
        };
        let child_body = OrganismBody {
            genome: mutate(&organism.genome, self.config.mutation_rate, &mut *ctx.rng),
            phenotype: organism.phenotype.clone(),
            energy_stores: self.config.offspring_energy,
            lineage: organism.lineage.child_of(parent_id),
            metabolism: organism.metabolism,
        };
        let physical = Physical {
            mass: parent.physical.mass * self.config.offspring_mass_scale,
            charge: 0.0,
            temperature: parent.physical.temperature,
            position: parent.position() + offset,
            velocity: None,
        };

        let id = ctx.new_id();
        let child = ctx.spawn(Entity::with_id(id, physical, Body::Organismal(child_body)))?;
        if let Some(parent) = ctx
            .world
            .get_entity_mut(parent_id)
            .and_then(|e| e.body.as_organism_mut())
        {
            parent.energy_stores -= self.config.reproduction_cost;
        }

        self.births += 1;
        tracing::debug!(%child, parent = %parent_id, "offspring born");
        ctx.emit(
            SimEventKind::Born {
                child,
                parent: parent_id,
            },
            format!("{parent_id} reproduced"),
        );
        Ok(Some(child))
    }

    fn select(&mut self, ctx: &mut SimContext<'_>, id: EntityId) -> SimResult<Option<DeathCause>> {
        let Some(organism) = ctx.world.get_entity(id).and_then(|e| e.body.as_organism()) else {
            return Ok(None);
        };
        let fitness = organism.phenotype.fitness().unwrap_or(self.config.base_fitness);

        let cause = if organism.energy_stores <= 0.0 {
            Some(DeathCause::Starvation)
        } else if fitness < self.config.cull_fitness_threshold
            && ctx.rng.random::<f64>() < self.config.cull_probability
        {
            Some(DeathCause::Culled)
        } else {
            None
        };

        if let Some(cause) = cause {
            ctx.despawn(id)?;
            self.deaths += 1;
            tracing::debug!(%id, cause = cause.as_str(), "organism died");
            ctx.emit(
                SimEventKind::Died {
                    entity: id,
                    cause: cause.as_str().into(),
                },
                format!("{id} died of {}", cause.as_str()),
            );
        }
        Ok(cause)
    }
}

impl System for EvolutionSystem {
    fn name(&self) -> &str {
        "evolution"
    }

    fn scales(&self) -> &[Scale] {
        &[Scale::Organismal]
    }

    fn capabilities(&self) -> &[Capability] {
        &[
            Capability::Genome,
            Capability::Phenotype,
            Capability::EnergyStores,
        ]
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
            let Some(entity) = ctx.world.get_entity_mut(id) else {
                continue;
            };
            let mass = entity.physical.mass;
            let Some(organism) = entity.body.as_organism_mut() else {
                continue;
            };
            let fitness = self.config.fitness(organism.energy_stores, mass);
            organism.phenotype.set_fitness(fitness);

            self.reproduce(ctx, id)?;
            self.select(ctx, id)?;
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

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn fitness_bands() {
        let config = EvolutionConfig::default();
        assert!((config.fitness(100.0, 50.0) - 1.0).abs() < 1e-12);
        assert!((config.fitness(200.0, 50.0) - 1.2).abs() < 1e-12);
        assert!((config.fitness(10.0, 50.0) - 0.8).abs() < 1e-12);
        // |100 - 50| / 50 = 1, so the mass factor halves fitness
        assert!((config.fitness(100.0, 100.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_rate_mutation_is_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        let genome: Genome = "ACGTACGTACGT".parse().unwrap();
        assert_eq!(mutate(&genome, 0.0, &mut rng), genome);
    }

    #[test]
    fn full_rate_mutation_changes_every_base() {
        let mut rng = StdRng::seed_from_u64(2);
        let genome: Genome = "ACGTACGTACGT".parse().unwrap();
        let mutated = mutate(&genome, 1.0, &mut rng);
        assert_eq!(mutated.len(), genome.len());
        assert_eq!(mutated.hamming(&genome), genome.len());
    }

    #[test]
    fn mutation_count_converges_to_length_times_rate() {
        let mut rng = StdRng::seed_from_u64(42);
        let length = 200;
        let rate = 0.05;
        let genome = Genome::from_bases(vec![Base::A; length]);

        let trials = 2_000;
        let total: usize = (0..trials)
            .map(|_| mutate(&genome, rate, &mut rng).hamming(&genome))
            .sum();
        let mean = total as f64 / trials as f64;
        let expected = length as f64 * rate;
        // Standard error of the mean is sqrt(L·p·(1-p) / N) ≈ 0.07
        assert!((mean - expected).abs() < 0.5, "mean {mean} vs {expected}");
    }
}
