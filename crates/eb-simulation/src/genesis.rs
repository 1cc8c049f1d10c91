//! Initial world population.
//!
//! Genesis runs once, before the orchestrator is built. Everything it draws
//! comes from the caller's seeded RNG, so the same seed always yields the
//! same world.

use eb_core::component::{
    ChemicalBody, ElementCounts, Genome, Metabolism, OrganismBody, PopulationBody,
};
use eb_core::elements::molecular_mass;
use eb_core::entity::{Entity, EntityId, Physical};
use eb_core::error::EbResult;
use eb_core::world::World;
use eb_core::{Base, Body};
use glam::DVec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const GENOME_LENGTH: usize = 32;
const MOLECULE_SPEED: f64 = 0.5;

/// Above this metallicity rocky and metallic species join the palette.
pub const HIGH_METALLICITY: f64 = 0.015;

/// Starting conditions handed to [`seed_world`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConstants {
    /// Initial temperature of every chemical entity, in kelvin.
    pub ambient_temperature: f64,
    /// Heavy-element mass fraction.
    pub metallicity: f64,
    /// Molecules scattered at start.
    pub molecule_count: usize,
    /// Founder organisms.
    pub organism_count: usize,
    /// Species populations.
    pub population_count: usize,
    /// Half-width of the cube entities are scattered in.
    pub spread: f64,
    /// Molecular species to draw from, as formulas like `"H2O"`.
    pub element_palette: Vec<String>,
}

impl Default for GenesisConstants {
    fn default() -> Self {
        Self {
            ambient_temperature: 300.0,
            metallicity: 0.02,
            molecule_count: 200,
            organism_count: 20,
            population_count: 3,
            spread: 50.0,
            element_palette: base_palette(),
        }
    }
}

fn base_palette() -> Vec<String> {
    ["H2", "H2O", "CH4", "NH3", "CO2", "O2", "N2"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl GenesisConstants {
    /// Derive a complete set of constants from a seed.
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let metallicity = rng.random_range(0.0001..0.03);
        let mut element_palette = base_palette();
        if metallicity > HIGH_METALLICITY {
            element_palette.extend(["SiO2", "FeO", "Fe"].map(String::from));
        }

        Self {
            ambient_temperature: rng.random_range(250.0..330.0),
            metallicity,
            molecule_count: rng.random_range(150..=250),
            organism_count: rng.random_range(10..=30),
            population_count: rng.random_range(2..=5),
            spread: 50.0,
            element_palette,
        }
    }
}

/// Parse a simple formula such as `"H2O"` or `"SiO2"`.
///
/// An element symbol is an uppercase letter followed by optional lowercase
/// letters; a missing count means one.
pub fn parse_formula(formula: &str) -> Option<ElementCounts> {
    let mut counts = ElementCounts::new();
    let mut chars = formula.chars().peekable();
    while let Some(c) = chars.next() {
        if !c.is_ascii_uppercase() {
            return None;
        }
        let mut symbol = c.to_string();
        while let Some(&next) = chars.peek()
            && next.is_ascii_lowercase()
        {
            symbol.push(next);
            chars.next();
        }
        let mut digits = String::new();
        while let Some(&next) = chars.peek()
            && next.is_ascii_digit()
        {
            digits.push(next);
            chars.next();
        }
        let n: u32 = if digits.is_empty() { 1 } else { digits.parse().ok()? };
        *counts.entry(symbol).or_insert(0) += n;
    }
    (!counts.is_empty()).then_some(counts)
}

fn scatter(rng: &mut StdRng, spread: f64) -> DVec3 {
    if spread > 0.0 {
        DVec3::new(
            rng.random_range(-spread..=spread),
            rng.random_range(-spread..=spread),
            rng.random_range(-spread..=spread),
        )
    } else {
        DVec3::ZERO
    }
}

/// Populate `world` with molecules, founder organisms, and populations.
pub fn seed_world(world: &mut World, constants: &GenesisConstants, rng: &mut StdRng) -> EbResult<()> {
    let palette: Vec<ElementCounts> = constants
        .element_palette
        .iter()
        .filter_map(|formula| {
            let parsed = parse_formula(formula);
            if parsed.is_none() {
                tracing::warn!(%formula, "skipping unparseable formula");
            }
            parsed
        })
        .collect();

    let spread = constants.spread.abs();

    if !palette.is_empty() {
        for _ in 0..constants.molecule_count {
            let counts = palette[rng.random_range(0..palette.len())].clone();
            let mass = molecular_mass(&counts);
            let position = scatter(rng, spread);
            let velocity = DVec3::new(
                rng.random_range(-MOLECULE_SPEED..=MOLECULE_SPEED),
                rng.random_range(-MOLECULE_SPEED..=MOLECULE_SPEED),
                rng.random_range(-MOLECULE_SPEED..=MOLECULE_SPEED),
            );
            let physical = Physical {
                mass,
                charge: 0.0,
                temperature: Some(constants.ambient_temperature),
                position,
                velocity: Some(velocity),
            };
            let id = EntityId::from_u128(rng.random());
            world.add_entity(Entity::with_id(
                id,
                physical,
                Body::Molecular(ChemicalBody::new(counts)),
            ))?;
        }
    }

    for _ in 0..constants.organism_count {
        let genome = Genome::from_bases(
            (0..GENOME_LENGTH)
                .map(|_| Base::ALL[rng.random_range(0..Base::ALL.len())])
                .collect(),
        );
        let mut body = OrganismBody::new(genome, rng.random_range(80.0..200.0));
        body.metabolism = Some(Metabolism {
            energy_production: rng.random_range(0.5..2.0),
            maintenance_cost: 0.5,
        });
        let physical = Physical {
            temperature: Some(constants.ambient_temperature),
            ..Physical::at(scatter(rng, spread), rng.random_range(20.0..80.0))
        };
        let id = EntityId::from_u128(rng.random());
        world.add_entity(Entity::with_id(id, physical, Body::Organismal(body)))?;
    }

    for _ in 0..constants.population_count {
        let body = PopulationBody {
            count: rng.random_range(10.0..100.0),
            carrying_capacity: 1_000.0,
            growth_rate: rng.random_range(0.05..0.2),
            trophic_level: rng.random_range(1..=3),
        };
        let id = EntityId::from_u128(rng.random());
        world.add_entity(Entity::with_id(
            id,
            Physical::at(scatter(rng, spread), 0.0),
            Body::Population(body),
        ))?;
    }

    tracing::info!(
        entities = world.entity_count(),
        temperature = constants.ambient_temperature,
        "world seeded"
    );
    Ok(())
}

/// Seed a fresh world from `seed` alone: constants and placement share it.
pub fn genesis_world(seed: u64) -> EbResult<(GenesisConstants, World)> {
    let constants = GenesisConstants::from_seed(seed);
    let mut world = World::new();
    let mut rng = StdRng::seed_from_u64(seed);
    seed_world(&mut world, &constants, &mut rng)?;
    Ok((constants, world))
}

#[cfg(test)]
mod tests {
    use eb_core::entity::Scale;

    use super::*;

    #[test]
    fn parse_simple_formulas() {
        let water = parse_formula("H2O").unwrap();
        assert_eq!(water.get("H"), Some(&2));
        assert_eq!(water.get("O"), Some(&1));

        let silica = parse_formula("SiO2").unwrap();
        assert_eq!(silica.get("Si"), Some(&1));
        assert_eq!(silica.get("O"), Some(&2));

        assert!(parse_formula("").is_none());
        assert!(parse_formula("h2o").is_none());
    }

    #[test]
    fn from_seed_is_deterministic() {
        assert_eq!(GenesisConstants::from_seed(9), GenesisConstants::from_seed(9));
    }

    #[test]
    fn metal_species_follow_metallicity() {
        for seed in 0..20 {
            let constants = GenesisConstants::from_seed(seed);
            let has_iron = constants.element_palette.iter().any(|f| f == "Fe");
            assert_eq!(has_iron, constants.metallicity > HIGH_METALLICITY);
        }
    }

    #[test]
    fn seed_world_creates_requested_counts() {
        let constants = GenesisConstants {
            molecule_count: 12,
            organism_count: 4,
            population_count: 2,
            ..Default::default()
        };
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(3);
        seed_world(&mut world, &constants, &mut rng).unwrap();

        let by_scale = world.entity_counts_by_scale();
        assert_eq!(by_scale.get(&Scale::Molecular), Some(&12));
        assert_eq!(by_scale.get(&Scale::Organismal), Some(&4));
        assert_eq!(by_scale.get(&Scale::Population), Some(&2));
        for entity in world.all_entities() {
            let p = entity.position();
            assert!(p.abs().max_element() <= constants.spread);
        }
    }

    #[test]
    fn same_seed_same_world() {
        let constants = GenesisConstants::default();
        let build = || {
            let mut world = World::new();
            let mut rng = StdRng::seed_from_u64(11);
            seed_world(&mut world, &constants, &mut rng).unwrap();
            world
                .all_entities()
                .map(|e| (e.id, e.position()))
                .collect::<Vec<_>>()
        };
        assert_eq!(build(), build());
    }
}
