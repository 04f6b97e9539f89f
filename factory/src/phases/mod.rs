//! Phase handlers.
//!
//! Each workflow phase has exactly one [`PhaseHandler`]. The orchestrator
//! looks the handler up in [`PhaseHandlers`] and passes it a read-only
//! [`PhaseContext`]; handlers return an artifact and never mutate run state.

pub mod build;
pub mod delivery;
pub mod discovery;
pub mod specification;

use anyhow::Result;

use crate::core::types::{Phase, PhaseArtifact};
use crate::io::config::FactoryConfig;
use crate::io::run_state::RunState;
use crate::io::store::ArtifactStore;

pub use build::BuildPhase;
pub use delivery::DeliveryPhase;
pub use discovery::{DiscoveryPhase, PlaybookResearch, ResearchProvider};
pub use specification::SpecificationPhase;

/// Everything a handler may read while executing.
pub struct PhaseContext<'a> {
    pub config: &'a FactoryConfig,
    pub state: &'a RunState,
    pub store: &'a dyn ArtifactStore,
    /// ISO date (`YYYY-MM-DD`) stamped into generated documents.
    pub today: &'a str,
}

/// Phase-specific logic.
pub trait PhaseHandler {
    fn phase(&self) -> Phase;

    /// Run the phase against accumulated state.
    ///
    /// Errors propagate unchanged; the orchestrator does not retry.
    fn execute(&self, ctx: &PhaseContext<'_>) -> Result<PhaseArtifact>;
}

/// Fixed table holding one handler per executable phase.
pub struct PhaseHandlers {
    pub discovery: DiscoveryPhase,
    pub specification: SpecificationPhase,
    pub build: BuildPhase,
    pub delivery: DeliveryPhase,
}

impl PhaseHandlers {
    pub fn new(research: Box<dyn ResearchProvider>) -> Self {
        Self {
            discovery: DiscoveryPhase::new(research),
            specification: SpecificationPhase,
            build: BuildPhase,
            delivery: DeliveryPhase,
        }
    }

    /// The handler for `phase`, or `None` for `Complete`.
    pub fn handler(&self, phase: Phase) -> Option<&dyn PhaseHandler> {
        match phase {
            Phase::Discovery => Some(&self.discovery),
            Phase::Specification => Some(&self.specification),
            Phase::Build => Some(&self.build),
            Phase::Delivery => Some(&self.delivery),
            Phase::Complete => None,
        }
    }
}

impl Default for PhaseHandlers {
    fn default() -> Self {
        Self::new(Box::new(PlaybookResearch))
    }
}
