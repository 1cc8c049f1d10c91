use eb_core::entity::{Capability, Scale};

use crate::context::SimContext;
use crate::error::SimResult;

/// A law system that runs once per tick.
///
/// Systems are executed in registration order, each inside the
/// orchestrator's failure boundary: an `Err` from `update` is recorded and
/// the next system still runs. A system must therefore tolerate being
/// skipped on any tick.
pub trait System: std::fmt::Debug {
    /// Human-readable name for this system.
    fn name(&self) -> &str;

    /// Scales this system considers. Empty means every scale.
    fn scales(&self) -> &[Scale] {
        &[]
    }

    /// Attributes an entity must carry for this system to touch it.
    fn capabilities(&self) -> &[Capability] {
        &[]
    }

    /// Called once per tick.
    fn update(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()>;

    /// One-time setup run by `Simulation::initialize` before the first tick.
    fn init(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        Ok(())
    }

    /// Release anything acquired in `init`.
    fn shutdown(&mut self) {}

    /// Support downcasting to concrete types for cross-system communication.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Support downcasting to concrete types for cross-system communication.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
