//! Phase orchestration with approval gates.
//!
//! The [`Orchestrator`] is an explicit state object: callers drive it with
//! [`Orchestrator::run_phase`] and [`Orchestrator::approve`], or let
//! [`Orchestrator::drive`] run until the next gate. Suspension at a gate is
//! simply returning to the caller; nothing is held while a run waits.
//!
//! Every failing call leaves the run state exactly as it was.

use std::path::Path;

use anyhow::{Result, bail};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::core::error::WorkflowError;
use crate::core::slug::slugify;
use crate::core::types::{Phase, PhaseArtifact};
use crate::io::config::FactoryConfig;
use crate::io::run_state::RunState;
use crate::io::store::ArtifactStore;
use crate::phases::{PhaseContext, PhaseHandlers};

/// Artifact produced by one executed phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseResult {
    pub phase: Phase,
    pub artifact: PhaseArtifact,
}

/// Where [`Orchestrator::drive`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "gate", rename_all = "snake_case")]
pub enum WorkflowStatus {
    Complete,
    /// Parked until `approve(gate, ..)` is called.
    AwaitingApproval(Phase),
}

/// Phases executed by one [`Orchestrator::drive`] call and where it stopped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowOutcome {
    pub results: Vec<PhaseResult>,
    pub status: WorkflowStatus,
}

pub struct Orchestrator<S: ArtifactStore> {
    config: FactoryConfig,
    handlers: PhaseHandlers,
    store: S,
    state: Option<RunState>,
}

impl<S: ArtifactStore> Orchestrator<S> {
    pub fn new(config: FactoryConfig, handlers: PhaseHandlers, store: S) -> Self {
        Self {
            config,
            handlers,
            store,
            state: None,
        }
    }

    /// Rebuild an orchestrator around a previously saved run.
    pub fn resume(
        config: FactoryConfig,
        handlers: PhaseHandlers,
        store: S,
        state: RunState,
    ) -> Self {
        Self {
            state: Some(state),
            ..Self::new(config, handlers, store)
        }
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> Option<&RunState> {
        self.state.as_ref()
    }

    pub fn into_state(self) -> Option<RunState> {
        self.state
    }

    pub fn current_phase(&self) -> Option<Phase> {
        self.state.as_ref().map(|state| state.current_phase)
    }

    pub fn awaiting_approval(&self) -> Option<Phase> {
        self.state.as_ref().and_then(RunState::awaiting_approval)
    }

    fn started(&self) -> Result<&RunState, WorkflowError> {
        self.state.as_ref().ok_or(WorkflowError::NotStarted)
    }

    /// Begin a new run for `subject_name`, replacing any run in progress.
    ///
    /// The output location is `output_override` when given, otherwise
    /// `<output_directory>/<slug>`.
    #[instrument(skip(self, output_override))]
    pub fn start(
        &mut self,
        subject_name: &str,
        output_override: Option<&Path>,
    ) -> Result<&RunState> {
        let slug = slugify(subject_name);
        if slug.is_empty() {
            return Err(WorkflowError::InvalidName {
                name: subject_name.to_string(),
            }
            .into());
        }
        let output_location = match output_override {
            Some(path) => path.to_path_buf(),
            None => self.config.output_root().join(&slug),
        };
        if self.state.is_some() {
            warn!("replacing run already in progress");
        }
        info!(%slug, output = %output_location.display(), "run started");
        Ok(self
            .state
            .insert(RunState::new(subject_name, &slug, output_location)))
    }

    /// Execute `phase`, which must be the current phase.
    ///
    /// Discovery and Specification park the run at the following gate and may
    /// be re-run while parked; each re-run replaces the stored artifact. Build
    /// and Delivery advance the run on success.
    #[instrument(skip_all, fields(phase = %phase))]
    pub fn run_phase(&mut self, phase: Phase) -> Result<PhaseArtifact> {
        let state = self.started()?;
        let current = state.current_phase;
        if phase != current || current == Phase::Complete {
            return Err(WorkflowError::PhaseOutOfOrder {
                requested: phase,
                current,
            }
            .into());
        }
        let Some(handler) = self.handlers.handler(phase) else {
            bail!("no handler registered for phase '{phase}'");
        };

        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        let ctx = PhaseContext {
            config: &self.config,
            state,
            store: &self.store,
            today: &today,
        };
        debug!("executing phase handler");
        let artifact = handler.execute(&ctx)?;
        if artifact.phase() != phase {
            bail!(
                "handler for '{phase}' returned a '{}' artifact",
                artifact.phase()
            );
        }

        let state = self.state.as_mut().ok_or(WorkflowError::NotStarted)?;
        match artifact.clone() {
            PhaseArtifact::Discovery(report) => state.discovery_report = Some(report),
            PhaseArtifact::Specification(spec) => state.specification = Some(*spec),
            PhaseArtifact::Build(build) => state.build_output = Some(build),
            PhaseArtifact::Delivery(summary) => state.delivery = Some(summary),
        }
        match phase.next() {
            Some(next) if next.is_gated() => {
                info!(gate = %next, "phase complete, awaiting approval");
            }
            Some(next) => {
                state.current_phase = next;
                info!(next = %next, "phase complete, advanced");
            }
            None => {}
        }
        Ok(artifact)
    }

    /// Pass the gate in front of `phase`.
    ///
    /// `phase` must be the gated phase directly after the current one, and the
    /// current phase must already have produced its artifact. Approving
    /// Specification requires `selection`, the name of a workflow option from
    /// the discovery report.
    #[instrument(skip_all, fields(phase = %phase, selection = ?selection))]
    pub fn approve(&mut self, phase: Phase, selection: Option<&str>) -> Result<Phase> {
        let state = self.started()?;
        if !phase.is_gated() {
            return Err(WorkflowError::NotAGate { phase }.into());
        }
        let current = state.current_phase;
        if current.next() != Some(phase) {
            return Err(WorkflowError::PhaseOutOfOrder {
                requested: phase,
                current,
            }
            .into());
        }
        if !state.has_artifact(current) {
            return Err(WorkflowError::ApprovalWithoutArtifact {
                phase,
                awaiting: current,
            }
            .into());
        }

        let selected = match (phase, &state.discovery_report) {
            (Phase::Specification, Some(report)) => {
                let name = selection.ok_or(WorkflowError::MissingSelection)?;
                let option = report
                    .option(name)
                    .ok_or_else(|| WorkflowError::UnknownOption {
                        name: name.to_string(),
                    })?;
                Some(option.clone())
            }
            _ => {
                if let Some(name) = selection {
                    debug!(selection = name, "selection ignored at this gate");
                }
                None
            }
        };

        let state = self.state.as_mut().ok_or(WorkflowError::NotStarted)?;
        if let Some(option) = selected {
            info!(option = %option.name, "workflow option approved");
            state.selected_option = Some(option);
        }
        state.current_phase = phase;
        info!("gate approved");
        Ok(phase)
    }

    /// Run phases from the current position until the run completes or parks
    /// at a gate.
    ///
    /// With `auto_approve`, gates are passed on the caller's behalf: the
    /// Specification gate selects the recommended option, else the first one.
    pub fn drive(&mut self, auto_approve: bool) -> Result<WorkflowOutcome> {
        let mut results = Vec::new();
        loop {
            let state = self.started()?;
            if state.is_complete() {
                info!(executed = results.len(), "workflow complete");
                return Ok(WorkflowOutcome {
                    results,
                    status: WorkflowStatus::Complete,
                });
            }
            if let Some(gate) = state.awaiting_approval() {
                if !auto_approve {
                    info!(gate = %gate, "workflow suspended at gate");
                    return Ok(WorkflowOutcome {
                        results,
                        status: WorkflowStatus::AwaitingApproval(gate),
                    });
                }
                let selection = match (gate, &state.discovery_report) {
                    (Phase::Specification, Some(report)) => Some(
                        report
                            .auto_selection()
                            .ok_or(WorkflowError::NoOptions)?
                            .name
                            .clone(),
                    ),
                    _ => None,
                };
                info!(gate = %gate, selection = ?selection, "auto-approving gate");
                self.approve(gate, selection.as_deref())?;
                continue;
            }
            let phase = state.current_phase;
            let artifact = self.run_phase(phase)?;
            results.push(PhaseResult { phase, artifact });
        }
    }

    /// Start a run and drive it as far as `auto_approve` allows.
    pub fn run_full_workflow(
        &mut self,
        subject_name: &str,
        output_override: Option<&Path>,
        auto_approve: bool,
    ) -> Result<WorkflowOutcome> {
        self.start(subject_name, output_override)?;
        self.drive(auto_approve)
    }
}
