//! The standard law systems, one per module.

/// Proximity aggregation of molecules into materials.
pub mod aggregation;
/// Logistic population dynamics.
pub mod ecology;
/// Fitness, reproduction, and selection of organisms.
pub mod evolution;
/// Temperature-scaled energy drain of organisms.
pub mod metabolism;
/// Rigid-body integration of moving entities.
pub mod motion;
/// Arrhenius reaction kinetics between chemical entities.
pub mod reaction;
/// Relaxation of temperatures towards ambient.
pub mod thermodynamics;

pub use aggregation::{AggregationConfig, AggregationSystem};
pub use ecology::{EcologyConfig, EcologySystem};
pub use evolution::{EvolutionConfig, EvolutionSystem};
pub use metabolism::{MetabolismConfig, MetabolismSystem};
pub use motion::{MotionConfig, MotionSystem};
pub use reaction::{ReactionConfig, ReactionMode, ReactionSystem};
pub use thermodynamics::{ThermodynamicsConfig, ThermodynamicsSystem};

use crate::config::LawsConfig;
use crate::system::System;

/// The standard pipeline in its fixed order.
pub fn standard_pipeline(laws: &LawsConfig) -> Vec<Box<dyn System>> {
    vec![
        Box::new(MotionSystem::new(laws.motion.clone())),
        Box::new(ThermodynamicsSystem::new(laws.thermodynamics.clone())),
        Box::new(ReactionSystem::new(laws.reaction.clone())),
        Box::new(AggregationSystem::new(laws.aggregation.clone())),
        Box::new(MetabolismSystem::new(laws.metabolism.clone())),
        Box::new(EcologySystem::new(laws.ecology.clone())),
        Box::new(EvolutionSystem::new(laws.evolution.clone())),
    ]
}
