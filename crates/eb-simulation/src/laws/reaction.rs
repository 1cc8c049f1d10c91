use std::collections::{HashMap, HashSet};

use eb_core::component::{Body, ChemicalBody, ElementCounts, union_counts};
use eb_core::conserved::ConservedQuantities;
use eb_core::elements::composition_bond_energy;
use eb_core::entity::{Capability, Entity, EntityId, Physical, Scale};
use glam::DVec3;
use rand::Rng;
use serde::Deserialize;

use crate::context::SimContext;
use crate::error::{SimError, SimResult};
use crate::event::SimEventKind;
use crate::kernels::{DEFAULT_PRE_EXPONENTIAL, arrhenius, event_probability, kinetic_energy};
use crate::system::System;

/// Whether detected reactions change the world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionMode {
    /// Record reactions and audit their conservation, leave entities untouched.
    #[default]
    DetectOnly,
    /// Spawn a product and consume both reactants.
    Apply,
}

/// Configuration for [`ReactionSystem`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReactionConfig {
    /// Maximum separation for two entities to react.
    pub cutoff: f64,
    /// J/mol.
    pub activation_energy: f64,
    /// Arrhenius pre-exponential factor A, 1/s.
    pub pre_exponential: f64,
    /// Used when neither reactant carries a temperature, K.
    pub default_temperature: f64,
    /// Whether reactions change the world.
    pub mode: ReactionMode,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            cutoff: 1.5,
            activation_energy: 80_000.0,
            pre_exponential: DEFAULT_PRE_EXPONENTIAL,
            default_temperature: 300.0,
            mode: ReactionMode::DetectOnly,
        }
    }
}

/// A reaction that fired during detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    /// The two reacting entities.
    pub reactants: [EntityId; 2],
    /// Union of the reactants' element counts.
    pub product_counts: ElementCounts,
    /// Product mass.
    pub mass: f64,
    /// Product charge.
    pub charge: f64,
    /// Mass-weighted centre of the reactants.
    pub position: DVec3,
    /// Momentum-conserving product velocity.
    pub velocity: DVec3,
    /// Mean reactant temperature, when known.
    pub temperature: Option<f64>,
    /// Quantities before the reaction.
    pub reactant_totals: ConservedQuantities,
    /// Quantities the product would carry.
    pub product_totals: ConservedQuantities,
    /// Ledger verdict for this reaction.
    pub conserved: bool,
}

/// Arrhenius-driven pairwise reactions between nearby chemical entities.
#[derive(Debug, Default)]
pub struct ReactionSystem {
    config: ReactionConfig,
}

impl ReactionSystem {
    /// Create the system.
    pub fn new(config: ReactionConfig) -> Self {
        Self { config }
    }

    /// The configured mode.
    pub fn mode(&self) -> ReactionMode {
        self.config.mode
    }

    /// Find reacting pairs and audit each against the ledger.
    ///
    /// Entities are visited in insertion order and partners are looked up
    /// through the spatial index. In [`ReactionMode::DetectOnly`] every pair
    /// within the cutoff is evaluated. In [`ReactionMode::Apply`] an entity
    /// takes part in at most one reaction per call, since applying it
    /// consumes both reactants.
    pub fn detect(&self, ctx: &mut SimContext<'_>) -> Vec<Reaction> {
        let exclusive = self.config.mode == ReactionMode::Apply;
        let candidates: Vec<EntityId> = ctx
            .world
            .query()
            .scales(self.scales())
            .with_all(self.capabilities())
            .active()
            .ids();
        let rank: HashMap<EntityId, usize> =
            candidates.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut reacted: HashSet<EntityId> = HashSet::new();
        let mut reactions = Vec::new();

        for (i, &a_id) in candidates.iter().enumerate() {
            if exclusive && reacted.contains(&a_id) {
                continue;
            }
            let Some(a) = ctx.world.get_entity(a_id) else {
                continue;
            };

            let mut partners: Vec<(usize, EntityId)> = ctx
                .index
                .query_radius(a.position(), self.config.cutoff)
                .into_iter()
                .filter_map(|id| rank.get(&id).map(|r| (*r, id)))
                .filter(|(r, id)| *r > i && !(exclusive && reacted.contains(id)))
                .collect();
            partners.sort_unstable();

            for (_, b_id) in partners {
                let Some(b) = ctx.world.get_entity(b_id) else {
                    continue;
                };
                let temperature = mean_temperature(a, b).unwrap_or(self.config.default_temperature);
                let rate = arrhenius(
                    self.config.activation_energy,
                    temperature,
                    self.config.pre_exponential,
                );
                let p = event_probability(rate, ctx.dt);
                if ctx.rng.random::<f64>() >= p {
                    continue;
                }

                let mut reaction = combine(a, b);
                let reason = format!("reaction {a_id} + {b_id}");
                reaction.conserved = ctx.ledger.validate_reaction(
                    &reaction.reactants,
                    &[],
                    &reaction.reactant_totals,
                    &reaction.product_totals,
                    &reason,
                );
                reactions.push(reaction);
                if exclusive {
                    reacted.insert(a_id);
                    reacted.insert(b_id);
                    break;
                }
            }
        }
        reactions
    }

    /// Spawn one product per reaction and consume its reactants.
    ///
    /// The result lines up with `reactions`; a reaction whose reactant is no
    /// longer active is skipped and yields `None`.
    ///
    /// Products are spawned whatever the ledger verdict. Forming bonds
    /// releases bond energy that no entity carries as heat, so most bond
    /// forming reactions fail the energy check. A failed verdict stays on
    /// [`Reaction::conserved`] and is reported as a
    /// [`SimEventKind::ConservationViolated`] event by the system update.
    pub fn apply(
        &self,
        ctx: &mut SimContext<'_>,
        reactions: &[Reaction],
    ) -> SimResult<Vec<Option<EntityId>>> {
        let mut products = Vec::with_capacity(reactions.len());
        for reaction in reactions {
            let still_active = reaction
                .reactants
                .iter()
                .all(|id| ctx.world.get_entity(*id).is_some_and(Entity::is_active));
            if !still_active {
                products.push(None);
                continue;
            }

            let physical = Physical {
                mass: reaction.mass,
                charge: reaction.charge,
                temperature: reaction.temperature,
                position: reaction.position,
                velocity: Some(reaction.velocity),
            };
            let body = Body::Molecular(ChemicalBody::new(reaction.product_counts.clone()));
            let id = ctx.new_id();
            let product = ctx.spawn(Entity::with_id(id, physical, body))?;
            for reactant in reaction.reactants {
                ctx.consume(reactant, product)?;
            }
            products.push(Some(product));
        }
        Ok(products)
    }
}

fn mean_temperature(a: &Entity, b: &Entity) -> Option<f64> {
    match (a.physical.temperature, b.physical.temperature) {
        (Some(x), Some(y)) => Some((x + y) / 2.0),
        (Some(t), None) | (None, Some(t)) => Some(t),
        (None, None) => None,
    }
}

fn chemical_energy(entity: &Entity) -> f64 {
    entity
        .body
        .element_counts()
        .map_or(0.0, composition_bond_energy)
}

/// Hypothetical product of `a` and `b` with pre/post conserved totals.
fn combine(a: &Entity, b: &Entity) -> Reaction {
    let empty = ElementCounts::new();
    let product_counts = union_counts(
        a.body.element_counts().unwrap_or(&empty),
        b.body.element_counts().unwrap_or(&empty),
    );

    let (ma, mb) = (a.physical.mass, b.physical.mass);
    let mass = ma + mb;
    let charge = a.physical.charge + b.physical.charge;
    let (va, vb) = (a.physical.velocity_or_zero(), b.physical.velocity_or_zero());
    let momentum = va * ma + vb * mb;
    let (position, velocity) = if mass > 0.0 {
        (
            (a.position() * ma + b.position() * mb) / mass,
            momentum / mass,
        )
    } else {
        ((a.position() + b.position()) / 2.0, DVec3::ZERO)
    };

    let reactant_energy = kinetic_energy(ma, va)
        + kinetic_energy(mb, vb)
        + chemical_energy(a)
        + chemical_energy(b);
    let product_energy = kinetic_energy(mass, velocity) + composition_bond_energy(&product_counts);

    Reaction {
        reactants: [a.id, b.id],
        product_counts,
        mass,
        charge,
        position,
        velocity,
        temperature: mean_temperature(a, b),
        reactant_totals: ConservedQuantities::new(mass, reactant_energy, charge, momentum),
        product_totals: ConservedQuantities::new(mass, product_energy, charge, velocity * mass),
        conserved: true,
    }
}

impl System for ReactionSystem {
    fn name(&self) -> &str {
        "reaction"
    }

    fn scales(&self) -> &[Scale] {
        &[Scale::Atomic, Scale::Molecular]
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::Chemistry]
    }

    fn update(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        if self.config.cutoff < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "reaction cutoff must be non-negative, got {}",
                self.config.cutoff
            )));
        }

        let reactions = self.detect(ctx);
        let products = match self.config.mode {
            ReactionMode::DetectOnly => vec![None; reactions.len()],
            ReactionMode::Apply => self.apply(ctx, &reactions)?,
        };

        for (reaction, product) in reactions.iter().zip(products) {
            tracing::debug!(
                a = %reaction.reactants[0],
                b = %reaction.reactants[1],
                conserved = reaction.conserved,
                "reaction"
            );
            ctx.emit(
                SimEventKind::Reaction {
                    reactants: reaction.reactants,
                    product,
                },
                format!(
                    "{} + {} reacted",
                    reaction.reactants[0], reaction.reactants[1]
                ),
            );
            if !reaction.conserved {
                ctx.emit(
                    SimEventKind::ConservationViolated {
                        entities: reaction.reactants.to_vec(),
                        reason: "reaction".into(),
                    },
                    "reaction failed conservation audit",
                );
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
