use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::component::{
    Body, ChemicalBody, ElementCounts, MaterialBody, OrganismBody, PopulationBody, StructuralBody,
};

/// Unique identifier for every entity in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Generate a new random entity ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic ID built from a 128-bit value. Used by seeded generators
    /// so that a whole run is reproducible from one seed.
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Level of physical organization an entity represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    /// Single atoms.
    Atomic,
    /// Molecules.
    Molecular,
    /// Aggregated materials.
    Material,
    /// Individual organisms.
    Organismal,
    /// Species populations.
    Population,
    /// Built structures.
    Structural,
}

impl Scale {
    /// Every scale, smallest first.
    pub const ALL: [Scale; 6] = [
        Scale::Atomic,
        Scale::Molecular,
        Scale::Material,
        Scale::Organismal,
        Scale::Population,
        Scale::Structural,
    ];

    /// Atomic and molecular entities take part in chemistry.
    pub fn is_chemical(self) -> bool {
        matches!(self, Self::Atomic | Self::Molecular)
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Atomic => "atomic",
            Self::Molecular => "molecular",
            Self::Material => "material",
            Self::Organismal => "organismal",
            Self::Population => "population",
            Self::Structural => "structural",
        };
        write!(f, "{s}")
    }
}

/// Whether an entity still counts towards whole-population totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Still part of the simulation.
    #[default]
    Active,
    /// Merged into the given aggregate or reaction product. Kept in the
    /// container for inspection but excluded from totals and law passes.
    ConsumedInto(EntityId),
}

impl Lifecycle {
    /// `true` unless consumed.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Physical state shared by every scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Physical {
    /// Mass in atomic mass units for chemistry, kg otherwise.
    pub mass: f64,
    /// Net electric charge.
    pub charge: f64,
    /// Temperature in K, when tracked.
    pub temperature: Option<f64>,
    /// Position in world space.
    pub position: DVec3,
    /// Velocity, when the entity moves.
    pub velocity: Option<DVec3>,
}

impl Physical {
    /// Neutral, resting, without temperature.
    pub fn at(position: DVec3, mass: f64) -> Self {
        Self {
            mass,
            charge: 0.0,
            temperature: None,
            position,
            velocity: None,
        }
    }

    /// Velocity, treating a missing value as rest.
    pub fn velocity_or_zero(&self) -> DVec3 {
        self.velocity.unwrap_or(DVec3::ZERO)
    }
}

/// An attribute combination a law system can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Carries element counts.
    Chemistry,
    /// Has a velocity.
    Velocity,
    /// Has a temperature.
    Temperature,
    /// Carries a genome.
    Genome,
    /// Carries a phenotype.
    Phenotype,
    /// Carries an energy reserve.
    EnergyStores,
    /// Has production and upkeep rates.
    Metabolism,
    /// Formed by aggregation.
    Aggregate,
    /// Tracks a population count.
    PopulationStats,
    /// Is a built structure.
    Structure,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Chemistry => "chemistry",
            Self::Velocity => "velocity",
            Self::Temperature => "temperature",
            Self::Genome => "genome",
            Self::Phenotype => "phenotype",
            Self::EnergyStores => "energy_stores",
            Self::Metabolism => "metabolism",
            Self::Aggregate => "aggregate",
            Self::PopulationStats => "population_stats",
            Self::Structure => "structure",
        };
        write!(f, "{s}")
    }
}

/// Core entity struct. Every simulated object is an Entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier, stable for the entity's lifetime.
    pub id: EntityId,
    /// Active, or merged into another entity.
    pub lifecycle: Lifecycle,
    /// Mass, charge, temperature and kinematics.
    pub physical: Physical,
    /// Scale-specific payload. Determines [`Entity::scale`].
    pub body: Body,
}

impl Entity {
    /// Create a new entity with a random ID.
    pub fn new(physical: Physical, body: Body) -> Self {
        Self::with_id(EntityId::new(), physical, body)
    }

    /// Create an entity with a pre-assigned ID.
    pub fn with_id(id: EntityId, physical: Physical, body: Body) -> Self {
        Self {
            id,
            lifecycle: Lifecycle::Active,
            physical,
            body,
        }
    }

    // -----------------------------------------------------------------------
    // Constructors per scale
    // -----------------------------------------------------------------------

    /// A single atom of `symbol`.
    pub fn atom(symbol: &str, mass: f64, position: DVec3) -> Self {
        Self::new(
            Physical::at(position, mass),
            Body::Atomic(ChemicalBody::from_pairs([(symbol, 1)])),
        )
    }

    /// A molecule with the given composition.
    pub fn molecule(element_counts: ElementCounts, mass: f64, position: DVec3) -> Self {
        Self::new(
            Physical::at(position, mass),
            Body::Molecular(ChemicalBody::new(element_counts)),
        )
    }

    /// An aggregate material.
    pub fn material(body: MaterialBody, mass: f64, position: DVec3) -> Self {
        Self::new(Physical::at(position, mass), Body::Material(body))
    }

    /// An organism.
    pub fn organism(body: OrganismBody, mass: f64, position: DVec3) -> Self {
        Self::new(Physical::at(position, mass), Body::Organismal(body))
    }

    /// A massless population marker.
    pub fn population(body: PopulationBody, position: DVec3) -> Self {
        Self::new(Physical::at(position, 0.0), Body::Population(body))
    }

    /// A built structure.
    pub fn structure(body: StructuralBody, mass: f64, position: DVec3) -> Self {
        Self::new(Physical::at(position, mass), Body::Structural(body))
    }

    /// Set the velocity.
    pub fn with_velocity(mut self, velocity: DVec3) -> Self {
        self.physical.velocity = Some(velocity);
        self
    }

    /// Set the temperature in K.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.physical.temperature = Some(temperature);
        self
    }

    /// Set the net charge.
    pub fn with_charge(mut self, charge: f64) -> Self {
        self.physical.charge = charge;
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The scale implied by the body.
    pub fn scale(&self) -> Scale {
        self.body.scale()
    }

    /// `true` unless consumed into another entity.
    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    /// Current position.
    pub fn position(&self) -> DVec3 {
        self.physical.position
    }

    /// Returns true if this entity carries the given capability.
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Chemistry => self.body.element_counts().is_some(),
            Capability::Velocity => self.physical.velocity.is_some(),
            Capability::Temperature => self.physical.temperature.is_some(),
            Capability::Genome | Capability::Phenotype | Capability::EnergyStores => {
                matches!(self.body, Body::Organismal(_))
            }
            Capability::Metabolism => self
                .body
                .as_organism()
                .is_some_and(|o| o.metabolism.is_some()),
            Capability::Aggregate => matches!(self.body, Body::Material(_)),
            Capability::PopulationStats => matches!(self.body, Body::Population(_)),
            Capability::Structure => matches!(self.body, Body::Structural(_)),
        }
    }

    /// Returns true if this entity carries every capability in the list.
    pub fn has_all(&self, capabilities: &[Capability]) -> bool {
        capabilities.iter().all(|c| self.has(*c))
    }
}
