use std::fmt;

use eb_core::conserved::ConservedQuantities;
use eb_core::world::World;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::clock::SimClock;
use crate::config::{LawsConfig, SimConfig};
use crate::context::SimContext;
use crate::error::SimResult;
use crate::event::{EventLog, SimEvent, SimEventKind};
use crate::laws::standard_pipeline;
use crate::ledger::{ConservationLedger, LedgerStats};
use crate::spatial::{SpatialIndex, SpatialStats};
use crate::system::System;

/// Orchestrator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    /// Constructed, `initialize` not yet called or failed.
    Uninitialized,
    /// Running system `init` hooks.
    Initializing,
    /// Accepting ticks.
    Ready,
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
        };
        write!(f, "{s}")
    }
}

/// A system whose `update` returned an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemFailure {
    /// Name of the failing system.
    pub system: String,
    /// The error it returned.
    pub message: String,
}

/// Outcome of one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    /// Tick number after advancing.
    pub tick: u64,
    /// `true` when the tick was refused because the orchestrator was not ready.
    pub skipped: bool,
    /// Every system invoked, in order, including the ones that failed.
    pub ran: Vec<String>,
    /// Systems that returned an error.
    pub failures: Vec<SystemFailure>,
}

impl TickReport {
    fn skipped(tick: u64) -> Self {
        Self {
            tick,
            skipped: true,
            ran: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Ran, and nothing failed.
    pub fn is_clean(&self) -> bool {
        !self.skipped && self.failures.is_empty()
    }
}

/// Snapshot of the orchestrator for observability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestratorStats {
    /// Current tick.
    pub tick: u64,
    /// Lifecycle state.
    pub state: OrchestratorState,
    /// Installed systems.
    pub system_count: usize,
    /// System names in execution order.
    pub system_names: Vec<String>,
    /// Ledger counters.
    pub ledger: LedgerStats,
    /// Spatial index shape.
    pub spatial: SpatialStats,
    /// Entities in the world, consumed ones included.
    pub entity_count: usize,
    /// Entities still active.
    pub active_count: usize,
    /// Conserved totals recomputed from active entities.
    pub active_totals: ConservedQuantities,
}

/// The law orchestrator.
///
/// Owns the world, spatial index, ledger, clock, RNG, event log, and the
/// ordered law systems. Each tick invokes every system exactly once; a
/// failing system is recorded and skipped, never allowed to stop the tick.
pub struct Simulation {
    world: World,
    index: SpatialIndex,
    ledger: ConservationLedger,
    clock: SimClock,
    rng: StdRng,
    events: EventLog,
    systems: Vec<Box<dyn System>>,
    state: OrchestratorState,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.clock.tick())
            .field("state", &self.state)
            .field("systems", &self.systems.len())
            .field("entities", &self.world.entity_count())
            .field("events", &self.events.len())
            .finish()
    }
}

impl Simulation {
    /// Create a simulation over an existing world.
    ///
    /// Every active entity is indexed and added to the ledger totals. No
    /// systems are registered yet.
    pub fn new(world: World, config: SimConfig) -> Self {
        let mut index = SpatialIndex::new(config.world_bounds);
        let mut ledger = ConservationLedger::new(config.tolerance);
        for entity in world.all_entities().filter(|e| e.is_active()) {
            index.insert(entity.id, entity.position());
            ledger.add_entity(entity.id, &ConservedQuantities::of(entity));
        }

        Self {
            world,
            index,
            ledger,
            clock: SimClock::new(config.dt),
            rng: StdRng::seed_from_u64(config.seed),
            events: EventLog::new(config.max_events),
            systems: Vec::new(),
            state: OrchestratorState::Uninitialized,
        }
    }

    /// Create a simulation with the standard law pipeline installed.
    pub fn with_laws(world: World, config: SimConfig, laws: &LawsConfig) -> Self {
        let mut sim = Self::new(world, config);
        sim.systems = standard_pipeline(laws);
        sim
    }

    /// Register a system. Systems are ticked in registration order.
    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        self.systems.push(Box::new(system));
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Run every system's `init` hook, then accept ticks.
    ///
    /// If any hook fails the error is returned and the orchestrator falls
    /// back to `Uninitialized`, so `initialize` can be retried.
    pub fn initialize(&mut self) -> SimResult<()> {
        if self.state == OrchestratorState::Ready {
            return Ok(());
        }
        self.state = OrchestratorState::Initializing;
        tracing::info!(systems = self.systems.len(), "orchestrator initializing");

        for i in 0..self.systems.len() {
            let mut system = std::mem::replace(&mut self.systems[i], Box::new(NoopSystem));
            let result = system.init(&mut self.context(self.clock.default_dt()));
            self.systems[i] = system;
            if let Err(e) = result {
                tracing::error!(system = self.systems[i].name(), error = %e, "system init failed");
                self.state = OrchestratorState::Uninitialized;
                return Err(e);
            }
        }

        self.state = OrchestratorState::Ready;
        tracing::info!("orchestrator ready");
        Ok(())
    }

    /// Advance the simulation by one tick of `dt` seconds.
    ///
    /// Before `initialize` this is a logged no-op returning a skipped report.
    pub fn tick(&mut self, dt: f64) -> TickReport {
        if self.state != OrchestratorState::Ready {
            tracing::warn!(state = %self.state, "tick requested before orchestrator is ready");
            return TickReport::skipped(self.clock.tick());
        }

        let tick = self.clock.advance(dt);
        let _span = tracing::info_span!("tick", tick).entered();
        let mut report = TickReport {
            tick,
            skipped: false,
            ran: Vec::with_capacity(self.systems.len()),
            failures: Vec::new(),
        };

        for i in 0..self.systems.len() {
            let mut system = std::mem::replace(&mut self.systems[i], Box::new(NoopSystem));
            let name = system.name().to_string();
            let result = {
                let _span = tracing::debug_span!("system", name = %name).entered();
                system.update(&mut self.context(dt))
            };
            self.systems[i] = system;
            report.ran.push(name.clone());

            if let Err(e) = result {
                let message = e.to_string();
                tracing::error!(system = %name, error = %message, "system failed; continuing tick");
                self.events.push(SimEvent::new(
                    tick,
                    SimEventKind::SystemFailed {
                        system: name.clone(),
                        message: message.clone(),
                    },
                    format!("{name} failed: {message}"),
                ));
                report.failures.push(SystemFailure {
                    system: name,
                    message,
                });
            }
        }
        report
    }

    /// Advance the simulation by `n` ticks of the configured duration.
    pub fn run(&mut self, n: u64) -> Vec<TickReport> {
        let dt = self.clock.default_dt();
        (0..n).map(|_| self.tick(dt)).collect()
    }

    /// Call every system's `shutdown` hook and return to `Uninitialized`.
    pub fn destroy(&mut self) {
        for system in &mut self.systems {
            system.shutdown();
        }
        self.state = OrchestratorState::Uninitialized;
        tracing::info!("orchestrator destroyed");
    }

    fn context(&mut self, dt: f64) -> SimContext<'_> {
        SimContext {
            world: &mut self.world,
            index: &mut self.index,
            ledger: &mut self.ledger,
            clock: &self.clock,
            events: &mut self.events,
            rng: &mut self.rng,
            dt,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Snapshot of counters across the orchestrator, ledger and index.
    pub fn statistics(&self) -> OrchestratorStats {
        OrchestratorStats {
            tick: self.clock.tick(),
            state: self.state,
            system_count: self.systems.len(),
            system_names: self.system_names(),
            ledger: self.ledger.statistics(),
            spatial: self.index.statistics(),
            entity_count: self.world.entity_count(),
            active_count: self.world.active_count(),
            active_totals: self.world.active_totals(),
        }
    }

    /// System names in execution order.
    pub fn system_names(&self) -> Vec<String> {
        self.systems.iter().map(|s| s.name().to_string()).collect()
    }

    /// Lifecycle state.
    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// The entity container.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The spatial index.
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// The conservation ledger.
    pub fn ledger(&self) -> &ConservationLedger {
        &self.ledger
    }

    /// The simulation clock.
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// The event log.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Access a system by downcasting to a concrete type.
    pub fn get_system<T: System + 'static>(&self) -> Option<&T> {
        self.systems
            .iter()
            .find_map(|s| s.as_any().downcast_ref::<T>())
    }

    /// Access a system mutably by downcasting to a concrete type.
    pub fn get_system_mut<T: System + 'static>(&mut self) -> Option<&mut T> {
        self.systems
            .iter_mut()
            .find_map(|s| s.as_any_mut().downcast_mut::<T>())
    }

    /// Extract the world, consuming the simulation.
    pub fn into_world(self) -> World {
        self.world
    }

    /// Ticks advanced so far.
    pub fn current_tick(&self) -> u64 {
        self.clock.tick()
    }
}

/// Placeholder system used during the swap-and-tick pattern.
#[derive(Debug)]
struct NoopSystem;

impl System for NoopSystem {
    fn name(&self) -> &str {
        "noop"
    }
    fn update(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        Ok(())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
