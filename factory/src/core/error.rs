//! Typed workflow failures.
//!
//! Orchestrator and handler APIs return `anyhow::Result`; callers that need to
//! branch on a specific failure recover it with
//! `err.downcast_ref::<WorkflowError>()`.

use std::path::PathBuf;

use crate::core::types::Phase;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("subject name '{name}' normalizes to an empty slug")]
    InvalidName { name: String },

    #[error("workflow not started (call start first)")]
    NotStarted,

    #[error("cannot run phase '{requested}' while the run is at '{current}'")]
    PhaseOutOfOrder { requested: Phase, current: Phase },

    #[error("phase '{phase}' requires {missing}")]
    MissingPrerequisite {
        phase: Phase,
        missing: &'static str,
    },

    #[error("cannot approve '{phase}': no {awaiting} artifact exists yet")]
    ApprovalWithoutArtifact { phase: Phase, awaiting: Phase },

    #[error("phase '{phase}' has no approval gate")]
    NotAGate { phase: Phase },

    #[error("no workflow option was approved for specification")]
    MissingSelection,

    #[error("workflow option '{name}' is not in the discovery report")]
    UnknownOption { name: String },

    #[error("discovery report contains no workflow options")]
    NoOptions,

    #[error("workflow option '{name}' is invalid: {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("state graph invalid:\n- {}", .errors.join("\n- "))]
    InvalidStateGraph { errors: Vec<String> },

    #[error("output location {} already exists and is not empty", .path.display())]
    OutputExists { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_phases() {
        let err = WorkflowError::PhaseOutOfOrder {
            requested: Phase::Build,
            current: Phase::Discovery,
        };
        assert_eq!(
            err.to_string(),
            "cannot run phase 'build' while the run is at 'discovery'"
        );
    }

    #[test]
    fn graph_errors_are_listed() {
        let err = WorkflowError::InvalidStateGraph {
            errors: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "state graph invalid:\n- a\n- b");
    }

    #[test]
    fn downcasts_through_anyhow() {
        let err: anyhow::Error = WorkflowError::NoOptions.into();
        assert_eq!(
            err.downcast_ref::<WorkflowError>(),
            Some(&WorkflowError::NoOptions)
        );
    }
}
