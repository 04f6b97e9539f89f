//! Discovery: market research and workflow options for a subject.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::error::WorkflowError;
use crate::core::types::{
    Competitor, Confidence, DiscoveryReport, MarketData, Phase, PhaseArtifact,
    PricingRecommendation, PricingTier, WorkflowOption,
};
use crate::phases::{PhaseContext, PhaseHandler};

/// Source of market research.
///
/// Implementations may call out to a search service; the default returns
/// bracketed research prompts to be filled in by a human or a model.
pub trait ResearchProvider {
    /// Market data for `subject`, or `None` when nothing could be gathered.
    fn market(&self, subject: &str) -> Result<Option<MarketData>>;

    /// Candidate workflows, in any order.
    fn workflows(&self, subject: &str, market: Option<&MarketData>) -> Result<Vec<WorkflowOption>>;

    fn pricing(
        &self,
        options: &[WorkflowOption],
        market: Option<&MarketData>,
    ) -> Result<PricingRecommendation>;
}

/// Research provider that emits structured placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybookResearch;

impl ResearchProvider for PlaybookResearch {
    fn market(&self, _subject: &str) -> Result<Option<MarketData>> {
        Ok(Some(MarketData {
            smb_count: "[Research: Number of SMBs in this vertical in US]".to_string(),
            avg_revenue: "[Research: Average revenue range]".to_string(),
            tech_adoption: "[Research: Low/Medium/High tech adoption]".to_string(),
            key_pain_points: (1..=3)
                .map(|n| format!("[Research: Pain point {n}]"))
                .collect(),
            existing_solutions: (1..=2)
                .map(|n| Competitor {
                    name: format!("[Competitor {n}]"),
                    price: "[Price]".to_string(),
                    gap: "[Gap]".to_string(),
                })
                .collect(),
            pricing_benchmark: "[Research: What they currently pay for similar solutions]"
                .to_string(),
        }))
    }

    fn workflows(
        &self,
        _subject: &str,
        _market: Option<&MarketData>,
    ) -> Result<Vec<WorkflowOption>> {
        let templates = [
            ("[Primary Workflow - Most Common Pain Point]", 2, true),
            ("[Secondary Workflow - High Value]", 1, false),
            ("[Tertiary Workflow - Nice to Have]", 1, false),
        ];
        Ok(templates
            .into_iter()
            .map(|(name, integrations, recommended)| WorkflowOption {
                name: name.to_string(),
                description: "[Description of what this workflow does]".to_string(),
                automation_potential: 0.0,
                time_savings: "[X] hrs/week".to_string(),
                integration_requirements: (1..=integrations)
                    .map(|n| format!("[Integration {n}]"))
                    .collect(),
                recommended,
            })
            .collect())
    }

    fn pricing(
        &self,
        _options: &[WorkflowOption],
        _market: Option<&MarketData>,
    ) -> Result<PricingRecommendation> {
        let tier = |name: &str, price: &str, features: &[&str]| PricingTier {
            name: name.to_string(),
            price: price.to_string(),
            features: features.iter().map(|f| f.to_string()).collect(),
        };
        Ok(PricingRecommendation {
            base_monthly: "[Calculate: Based on time saved x hourly rate]".to_string(),
            base_annual: "[Calculate: Monthly x 12 with discount]".to_string(),
            justification: "[Explain ROI: X hrs/week x $Y/hr = $Z/month value]".to_string(),
            tiers: vec![
                tier("Starter", "$[X]/month", &["Core automation"]),
                tier("Pro", "$[X]/month", &["+ Integrations", "+ Priority support"]),
                tier("Enterprise", "Custom", &["+ Multi-location", "+ API access"]),
            ],
        })
    }
}

pub struct DiscoveryPhase {
    research: Box<dyn ResearchProvider>,
}

impl DiscoveryPhase {
    pub fn new(research: Box<dyn ResearchProvider>) -> Self {
        Self { research }
    }

    /// Look for an earlier specification for `slug`, then for a playbook
    /// whose file stem contains `slug`.
    fn find_playbook(&self, ctx: &PhaseContext<'_>, slug: &str) -> Result<Option<PathBuf>> {
        let earlier = ctx.config.artifacts_root().join(slug).join("VERTICAL.md");
        if ctx.store.read(&earlier)?.is_some() {
            debug!(path = %earlier.display(), "earlier specification found");
            return Ok(Some(earlier));
        }
        let playbook = ctx
            .store
            .list(&ctx.config.playbooks_root())?
            .into_iter()
            .find(|path| is_playbook_for(path, slug));
        if let Some(path) = &playbook {
            debug!(path = %path.display(), "existing playbook found");
        }
        Ok(playbook)
    }
}

/// A markdown file whose lowercased stem contains `slug`.
fn is_playbook_for(path: &Path, slug: &str) -> bool {
    let is_markdown = path.extension().is_some_and(|ext| ext == "md");
    let stem_matches = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem.to_lowercase().contains(slug));
    is_markdown && stem_matches
}

impl PhaseHandler for DiscoveryPhase {
    fn phase(&self) -> Phase {
        Phase::Discovery
    }

    #[instrument(skip_all, fields(slug = %ctx.state.subject_slug))]
    fn execute(&self, ctx: &PhaseContext<'_>) -> Result<PhaseArtifact> {
        let subject = ctx.state.subject_name.as_str();
        let playbook = self.find_playbook(ctx, &ctx.state.subject_slug)?;
        let market = self
            .research
            .market(subject)
            .with_context(|| format!("research market for '{subject}'"))?;
        let mut options = self
            .research
            .workflows(subject, market.as_ref())
            .with_context(|| format!("identify workflows for '{subject}'"))?;
        validate_options(&options)?;
        rank_options(&mut options);

        let recommended = options.iter().filter(|o| o.recommended).count();
        if options.is_empty() {
            warn!("discovery produced no workflow options");
        } else if recommended != 1 {
            warn!(recommended, "expected exactly one recommended workflow option");
        }

        let pricing = self
            .research
            .pricing(&options, market.as_ref())
            .context("calculate pricing recommendation")?;
        let confidence = confidence(playbook.is_some(), market.is_some());

        info!(options = options.len(), %confidence, "discovery complete");
        Ok(PhaseArtifact::Discovery(DiscoveryReport {
            subject: subject.to_string(),
            subject_slug: ctx.state.subject_slug.clone(),
            research_date: ctx.today.to_string(),
            search_provider: ctx.config.search_provider_id.clone(),
            confidence,
            market_data: market,
            workflow_options: options,
            pricing_recommendation: pricing,
            playbook_reference: playbook.map(|p| p.display().to_string()),
        }))
    }
}

fn confidence(has_playbook: bool, has_market: bool) -> Confidence {
    if has_playbook {
        Confidence::High
    } else if has_market {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// Reject options with blank or duplicate names or out-of-range potential.
pub fn validate_options(options: &[WorkflowOption]) -> Result<(), WorkflowError> {
    for (idx, option) in options.iter().enumerate() {
        let invalid = |reason: &str| WorkflowError::InvalidOption {
            name: option.name.clone(),
            reason: reason.to_string(),
        };
        if option.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if !(0.0..=100.0).contains(&option.automation_potential) {
            return Err(invalid("automation_potential must be within 0-100"));
        }
        if options[..idx].iter().any(|prior| prior.name == option.name) {
            return Err(invalid("duplicate option name"));
        }
    }
    Ok(())
}

/// Order by automation potential, highest first. Ties keep provider order.
pub fn rank_options(options: &mut [WorkflowOption]) {
    options.sort_by(|a, b| b.automation_potential.total_cmp(&a.automation_potential));
}
