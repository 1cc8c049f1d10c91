//! Core types for Ebb & Bloom: entities, scales, and the entity container.
//!
//! Entities are a tagged union keyed by scale, so every law sees exactly the
//! fields its scale carries. The [`World`] container keeps insertion order
//! and answers capability queries; it knows nothing about laws or ticks.

/// Scale-specific entity payloads (chemistry, organisms, populations, etc.).
pub mod component;
/// Conserved quantity totals computed from entities.
pub mod conserved;
/// Element table and pairwise bond energies.
pub mod elements;
/// Entity types, identifiers, scales, and capabilities.
pub mod entity;
/// Error types used throughout the crate.
pub mod error;
/// Query builder for filtering entities by scale and capability.
pub mod query;
/// The entity container.
pub mod world;

/// Re-export scale payloads.
pub use component::{
    Base, Body, ChemicalBody, ElementCounts, Genome, Lineage, MaterialBody, Metabolism,
    OrganismBody, Phenotype, PopulationBody, StructuralBody,
};
/// Re-export conserved quantity types.
pub use conserved::{ConservedQuantities, QuantityKind};
/// Re-export core entity types.
pub use entity::{Capability, Entity, EntityId, Lifecycle, Physical, Scale};
/// Re-export error types.
pub use error::{EbError, EbResult};
/// Re-export the container.
pub use world::World;
