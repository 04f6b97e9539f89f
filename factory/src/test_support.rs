//! Test-only collaborators and builders.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, anyhow};

use crate::core::types::{
    MarketData, PricingRecommendation, PricingTier, StateNode, UiComponent, WorkflowOption,
};
use crate::io::config::FactoryConfig;
use crate::io::store::ArtifactStore;
use crate::orchestrator::Orchestrator;
use crate::phases::{PhaseHandlers, ResearchProvider};

/// Create a workflow option with deterministic filler fields.
pub fn option(name: &str, automation_potential: f64, recommended: bool) -> WorkflowOption {
    WorkflowOption {
        name: name.to_string(),
        description: format!("{name} description"),
        automation_potential,
        time_savings: "10 hrs/week".to_string(),
        integration_requirements: vec!["Email".to_string()],
        recommended,
    }
}

/// Create a state node with no component.
pub fn node(name: &str, next: &str) -> StateNode {
    StateNode {
        name: name.to_string(),
        next_name: next.to_string(),
        message: format!("{name} message"),
        component: None,
        required: false,
    }
}

/// Create a state node carrying `component`.
pub fn node_with(name: &str, next: &str, component: UiComponent) -> StateNode {
    StateNode {
        component: Some(component),
        ..node(name, next)
    }
}

/// Research provider returning fixed data, or failing on every call.
#[derive(Debug, Clone)]
pub struct ScriptedResearch {
    pub market: Option<MarketData>,
    pub options: Vec<WorkflowOption>,
    pub failure: Option<String>,
}

impl Default for ScriptedResearch {
    fn default() -> Self {
        Self {
            market: None,
            options: vec![
                option("Billing", 70.0, false),
                option("Intake", 85.0, true),
            ],
            failure: None,
        }
    }
}

impl ScriptedResearch {
    fn check(&self) -> Result<()> {
        match &self.failure {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

impl ResearchProvider for ScriptedResearch {
    fn market(&self, _subject: &str) -> Result<Option<MarketData>> {
        self.check()?;
        Ok(self.market.clone())
    }

    fn workflows(
        &self,
        _subject: &str,
        _market: Option<&MarketData>,
    ) -> Result<Vec<WorkflowOption>> {
        self.check()?;
        Ok(self.options.clone())
    }

    fn pricing(
        &self,
        _options: &[WorkflowOption],
        _market: Option<&MarketData>,
    ) -> Result<PricingRecommendation> {
        self.check()?;
        Ok(PricingRecommendation {
            base_monthly: "$99/month".to_string(),
            base_annual: "$990/year".to_string(),
            justification: "Saves time".to_string(),
            tiers: vec![PricingTier {
                name: "Starter".to_string(),
                price: "$49/month".to_string(),
                features: vec!["Core automation".to_string()],
            }],
        })
    }
}

/// Artifact store that keeps files in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemoryStore {
    pub fn get(&self, path: &Path) -> Option<String> {
        self.lock().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, String>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ArtifactStore for MemoryStore {
    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.lock().insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Option<String>> {
        Ok(self.get(path))
    }

    fn has_entries(&self, dir: &Path) -> Result<bool> {
        Ok(self
            .lock()
            .keys()
            .any(|path| path != dir && path.starts_with(dir)))
    }

    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        Ok(self
            .lock()
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .cloned()
            .collect())
    }
}

/// Orchestrator over `research` and an empty in-memory store.
pub fn orchestrator(research: ScriptedResearch) -> Orchestrator<MemoryStore> {
    let config = FactoryConfig {
        output_directory: PathBuf::from("/virtual/agents"),
        artifacts_directory: PathBuf::from("/virtual/verticals"),
        playbooks_directory: PathBuf::from("/virtual/playbooks"),
        ..FactoryConfig::default()
    };
    Orchestrator::new(
        config,
        PhaseHandlers::new(Box::new(research)),
        MemoryStore::default(),
    )
}
