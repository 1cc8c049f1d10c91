use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::component::Body;
use crate::entity::Entity;

/// Totals that must survive any merge or reaction unchanged.
///
/// A plain value type: computed on demand from one or more entities and
/// only stored long-term as ledger running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConservedQuantities {
    /// Total mass.
    pub mass: f64,
    /// Kinetic plus stored energy.
    pub energy: f64,
    /// Net charge.
    pub charge: f64,
    /// Linear momentum, m·v.
    pub momentum: DVec3,
}

impl ConservedQuantities {
    /// All components zero.
    pub const ZERO: Self = Self {
        mass: 0.0,
        energy: 0.0,
        charge: 0.0,
        momentum: DVec3::ZERO,
    };

    /// Build from components.
    pub fn new(mass: f64, energy: f64, charge: f64, momentum: DVec3) -> Self {
        Self {
            mass,
            energy,
            charge,
            momentum,
        }
    }

    /// Quantities carried by a single entity.
    ///
    /// Aggregates report the energy they were formed with. Everything else
    /// reports kinetic energy, plus the energy reserve for organisms.
    pub fn of(entity: &Entity) -> Self {
        let mass = entity.physical.mass;
        let velocity = entity.physical.velocity_or_zero();
        let kinetic = 0.5 * mass * velocity.length_squared();
        let energy = match &entity.body {
            Body::Material(m) => m.conserved_energy,
            Body::Organismal(o) => kinetic + o.energy_stores,
            _ => kinetic,
        };
        Self {
            mass,
            energy,
            charge: entity.physical.charge,
            momentum: velocity * mass,
        }
    }

    /// Component value by kind.
    pub fn get(&self, kind: QuantityKind) -> f64 {
        match kind {
            QuantityKind::Mass => self.mass,
            QuantityKind::Energy => self.energy,
            QuantityKind::Charge => self.charge,
            QuantityKind::MomentumX => self.momentum.x,
            QuantityKind::MomentumY => self.momentum.y,
            QuantityKind::MomentumZ => self.momentum.z,
        }
    }
}

impl Add for ConservedQuantities {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            mass: self.mass + rhs.mass,
            energy: self.energy + rhs.energy,
            charge: self.charge + rhs.charge,
            momentum: self.momentum + rhs.momentum,
        }
    }
}

impl AddAssign for ConservedQuantities {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for ConservedQuantities {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            mass: self.mass - rhs.mass,
            energy: self.energy - rhs.energy,
            charge: self.charge - rhs.charge,
            momentum: self.momentum - rhs.momentum,
        }
    }
}

impl Sum for ConservedQuantities {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a ConservedQuantities> for ConservedQuantities {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// One checked component of [`ConservedQuantities`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityKind {
    /// Total mass.
    Mass,
    /// Total energy.
    Energy,
    /// Net charge.
    Charge,
    /// Momentum along x.
    MomentumX,
    /// Momentum along y.
    MomentumY,
    /// Momentum along z.
    MomentumZ,
}

impl QuantityKind {
    /// Every component, in check order.
    pub const ALL: [QuantityKind; 6] = [
        QuantityKind::Mass,
        QuantityKind::Energy,
        QuantityKind::Charge,
        QuantityKind::MomentumX,
        QuantityKind::MomentumY,
        QuantityKind::MomentumZ,
    ];
}

impl fmt::Display for QuantityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Mass => "mass",
            Self::Energy => "energy",
            Self::Charge => "charge",
            Self::MomentumX => "momentum.x",
            Self::MomentumY => "momentum.y",
            Self::MomentumZ => "momentum.z",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Genome, MaterialBody, OrganismBody};

    #[test]
    fn molecule_energy_is_kinetic() {
        let e = Entity::molecule(Default::default(), 2.0, DVec3::ZERO)
            .with_velocity(DVec3::new(3.0, 0.0, 0.0))
            .with_charge(-1.0);
        let q = ConservedQuantities::of(&e);
        assert_eq!(q.mass, 2.0);
        assert_eq!(q.energy, 9.0);
        assert_eq!(q.charge, -1.0);
        assert_eq!(q.momentum, DVec3::new(6.0, 0.0, 0.0));
    }

    #[test]
    fn organism_energy_includes_stores() {
        let e = Entity::organism(OrganismBody::new(Genome::default(), 40.0), 1.0, DVec3::ZERO);
        assert_eq!(ConservedQuantities::of(&e).energy, 40.0);
    }

    #[test]
    fn aggregate_reports_formation_energy() {
        let body = MaterialBody {
            conserved_energy: 12.5,
            ..Default::default()
        };
        let e = Entity::material(body, 4.0, DVec3::ZERO).with_velocity(DVec3::ONE);
        assert_eq!(ConservedQuantities::of(&e).energy, 12.5);
    }

    #[test]
    fn sum_and_difference() {
        let a = ConservedQuantities::new(1.0, 2.0, 3.0, DVec3::X);
        let b = ConservedQuantities::new(0.5, 0.5, -1.0, DVec3::Y);
        let total: ConservedQuantities = [a, b].iter().sum();
        assert_eq!(total.mass, 1.5);
        assert_eq!(total.momentum, DVec3::new(1.0, 1.0, 0.0));
        assert_eq!(total - b, a);
        assert_eq!(total.get(QuantityKind::MomentumY), 1.0);
    }
}
