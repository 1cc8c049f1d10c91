//! Conservation-enforced simulation core for Ebb & Bloom.
//!
//! A [`Simulation`] owns a [`eb_core::World`] together with a spatial index
//! and a conservation ledger, and advances it by running an ordered list of
//! law systems once per tick. Systems mutate the world through a
//! [`SimContext`], which keeps the index and the ledger totals in step.

/// Simulation clock for tracking ticks and elapsed time.
pub mod clock;
/// Configuration types for simulation runs.
pub mod config;
/// Mutable context passed to systems each tick.
pub mod context;
/// Error types for the simulation crate.
pub mod error;
/// Simulation event types and the event log.
pub mod event;
/// Seeded creation of the initial world.
pub mod genesis;
/// Pure physical and biological rate formulas.
pub mod kernels;
/// The standard law systems.
pub mod laws;
/// Running conserved totals and violation records.
pub mod ledger;
/// Top-level law orchestrator.
pub mod simulation;
/// Octree index over entity positions.
pub mod spatial;
/// The trait that all law systems implement.
pub mod system;

/// Re-export of [`clock::SimClock`].
pub use clock::SimClock;
/// Re-exports of the configuration types.
pub use config::{LawsConfig, RunConfig, SimConfig};
/// Re-export of [`context::SimContext`].
pub use context::SimContext;
/// Re-exports of [`error::SimError`] and [`error::SimResult`].
pub use error::{SimError, SimResult};
/// Re-exports of [`event::EventLog`], [`event::SimEvent`], and [`event::SimEventKind`].
pub use event::{EventLog, SimEvent, SimEventKind};
/// Re-exports of the genesis entry points.
pub use genesis::{GenesisConstants, genesis_world, seed_world};
/// Re-exports of the ledger types.
pub use ledger::{ConservationLedger, LedgerStats, Tolerance, Violation};
/// Re-exports of the orchestrator types.
pub use simulation::{OrchestratorState, OrchestratorStats, Simulation, SystemFailure, TickReport};
/// Re-exports of the spatial index types.
pub use spatial::{Aabb, SpatialIndex, SpatialStats};
/// Re-export of [`system::System`].
pub use system::System;
