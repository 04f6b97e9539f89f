//! Run state for one factory run, and its JSON persistence.
//!
//! The orchestrator owns a [`RunState`] in memory. Only the CLI writes it to
//! disk (`.factory/run_state.json`) so gates can span separate invocations.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::{
    BuildOutput, DeliverySummary, DiscoveryReport, Phase, Specification, WorkflowOption,
};

/// Everything known about a run. `current_phase` never moves backwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunState {
    pub subject_name: String,
    pub subject_slug: String,
    pub current_phase: Phase,
    pub output_location: PathBuf,
    pub discovery_report: Option<DiscoveryReport>,
    pub selected_option: Option<WorkflowOption>,
    pub specification: Option<Specification>,
    pub build_output: Option<BuildOutput>,
    pub delivery: Option<DeliverySummary>,
}

impl RunState {
    pub fn new(subject_name: &str, subject_slug: &str, output_location: PathBuf) -> Self {
        Self {
            subject_name: subject_name.to_string(),
            subject_slug: subject_slug.to_string(),
            current_phase: Phase::Discovery,
            output_location,
            discovery_report: None,
            selected_option: None,
            specification: None,
            build_output: None,
            delivery: None,
        }
    }

    /// True when the artifact produced by `phase` is present.
    pub fn has_artifact(&self, phase: Phase) -> bool {
        match phase {
            Phase::Discovery => self.discovery_report.is_some(),
            Phase::Specification => self.specification.is_some(),
            Phase::Build => self.build_output.is_some(),
            Phase::Delivery => self.delivery.is_some(),
            Phase::Complete => false,
        }
    }

    /// The gate the run is parked at, if any.
    ///
    /// A run waits at a gate once the phase before it has produced its
    /// artifact and no approval has moved `current_phase` on.
    pub fn awaiting_approval(&self) -> Option<Phase> {
        let next = self.current_phase.next()?;
        (next.is_gated() && self.has_artifact(self.current_phase)).then_some(next)
    }

    pub fn is_complete(&self) -> bool {
        self.current_phase == Phase::Complete
    }
}

/// Load run state from disk.
pub fn load_run_state(path: &Path) -> Result<RunState> {
    debug!(path = %path.display(), "loading run state");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read run state {}", path.display()))?;
    let state: RunState = serde_json::from_str(&contents)
        .with_context(|| format!("parse run state {}", path.display()))?;
    debug!(slug = %state.subject_slug, phase = %state.current_phase, "run state loaded");
    Ok(state)
}

/// Atomically write run state to disk (temp file + rename).
pub fn write_run_state(path: &Path, state: &RunState) -> Result<()> {
    debug!(
        path = %path.display(),
        slug = %state.subject_slug,
        phase = %state.current_phase,
        "writing run state"
    );
    let mut buf = serde_json::to_string_pretty(state).context("serialize run state")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("run state path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp run state {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace run state {}", path.display()))?;
    Ok(())
}
