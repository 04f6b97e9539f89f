//! Shared deterministic types for the factory core.
//!
//! These types define the contracts exchanged between the orchestrator and the
//! phase handlers. They carry no I/O and serialize to stable JSON so a run can
//! be inspected or persisted by outer layers.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Workflow phase, in execution order.
///
/// The derived ordering is the workflow order; `Complete` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Discovery,
    Specification,
    Build,
    Delivery,
    Complete,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Discovery,
        Phase::Specification,
        Phase::Build,
        Phase::Delivery,
        Phase::Complete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Discovery => "discovery",
            Phase::Specification => "specification",
            Phase::Build => "build",
            Phase::Delivery => "delivery",
            Phase::Complete => "complete",
        }
    }

    /// The phase that follows this one, or `None` for `Complete`.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Discovery => Some(Phase::Specification),
            Phase::Specification => Some(Phase::Build),
            Phase::Build => Some(Phase::Delivery),
            Phase::Delivery => Some(Phase::Complete),
            Phase::Complete => None,
        }
    }

    /// The phase that precedes this one, or `None` for `Discovery`.
    pub fn previous(self) -> Option<Phase> {
        match self {
            Phase::Discovery => None,
            Phase::Specification => Some(Phase::Discovery),
            Phase::Build => Some(Phase::Specification),
            Phase::Delivery => Some(Phase::Build),
            Phase::Complete => Some(Phase::Delivery),
        }
    }

    /// True when entering this phase requires an explicit approval.
    ///
    /// Only the phases following Discovery and Specification are gated; Build
    /// flows into Delivery without a checkpoint.
    pub fn is_gated(self) -> bool {
        matches!(self, Phase::Specification | Phase::Build)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown phase '{s}'"))
    }
}

/// A candidate process surfaced by Discovery for the user to select.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowOption {
    pub name: String,
    pub description: String,
    /// Estimated automation potential, 0–100.
    pub automation_potential: f64,
    /// Free-form estimate such as `"15 hrs/week"`.
    pub time_savings: String,
    pub integration_requirements: Vec<String>,
    #[serde(default)]
    pub recommended: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    pub name: String,
    pub price: String,
    pub gap: String,
}

/// Market research gathered for a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketData {
    pub smb_count: String,
    pub avg_revenue: String,
    pub tech_adoption: String,
    pub key_pain_points: Vec<String>,
    pub existing_solutions: Vec<Competitor>,
    pub pricing_benchmark: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTier {
    pub name: String,
    pub price: String,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRecommendation {
    pub base_monthly: String,
    pub base_annual: String,
    pub justification: String,
    pub tiers: Vec<PricingTier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        f.write_str(label)
    }
}

/// Output of the Discovery phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub subject: String,
    pub subject_slug: String,
    pub research_date: String,
    pub search_provider: String,
    pub confidence: Confidence,
    pub market_data: Option<MarketData>,
    /// Ranked by automation potential, highest first.
    pub workflow_options: Vec<WorkflowOption>,
    pub pricing_recommendation: PricingRecommendation,
    pub playbook_reference: Option<String>,
}

impl DiscoveryReport {
    pub fn option(&self, name: &str) -> Option<&WorkflowOption> {
        self.workflow_options.iter().find(|option| option.name == name)
    }

    /// The option auto-approval selects: the first flagged `recommended`,
    /// otherwise the first in list order.
    pub fn auto_selection(&self) -> Option<&WorkflowOption> {
        self.workflow_options
            .iter()
            .find(|option| option.recommended)
            .or_else(|| self.workflow_options.first())
    }
}

/// One property of a tool's input schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,
}

/// Ordered input schema for a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub properties: Vec<ToolParameter>,
    pub required: Vec<String>,
}

impl ParameterSchema {
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|required| required == name)
    }
}

/// MCP-style tool descriptor. Immutable once produced for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameter_schema: ParameterSchema,
    pub returns: String,
}

impl ToolDescriptor {
    /// Render as an MCP tool definition (`parameters` as a JSON Schema object).
    pub fn to_mcp(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        for param in &self.parameter_schema.properties {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), param.kind.clone().into());
            if !param.description.is_empty() {
                prop.insert("description".into(), param.description.clone().into());
            }
            if !param.allowed.is_empty() {
                prop.insert("enum".into(), param.allowed.clone().into());
            }
            properties.insert(param.name.clone(), prop.into());
        }
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": self.parameter_schema.required,
            },
            "returns": self.returns,
        })
    }
}

/// A field inside a `form` component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
}

/// UI component attached to a state node. The set of kinds is closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiComponent {
    Form {
        fields: Vec<FormField>,
    },
    SingleSelect {
        name: String,
        options: Vec<String>,
    },
    MultiSelect {
        name: String,
        options: Vec<String>,
    },
    Slider {
        name: String,
        min: i64,
        max: i64,
        #[serde(default)]
        labels: BTreeMap<String, String>,
    },
    FreeText {
        name: String,
        #[serde(default)]
        placeholder: Option<String>,
    },
    FileUpload {
        name: String,
        #[serde(default)]
        accept: Vec<String>,
        #[serde(default)]
        multiple: bool,
    },
    None,
}

/// One node of the onboarding interaction graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateNode {
    pub name: String,
    #[serde(rename = "next")]
    pub next_name: String,
    pub message: String,
    #[serde(default, deserialize_with = "component_or_sentinel")]
    pub component: Option<UiComponent>,
    #[serde(default)]
    pub required: bool,
}

/// Accept a tagged component object, `null`, or the bare string `"none"`.
fn component_or_sentinel<'de, D>(deserializer: D) -> Result<Option<UiComponent>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Sentinel(String),
        Typed(UiComponent),
    }

    match Option::<Repr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Repr::Typed(component)) => Ok(Some(component)),
        Some(Repr::Sentinel(value)) if value == "none" => Ok(Some(UiComponent::None)),
        Some(Repr::Sentinel(value)) => Err(serde::de::Error::custom(format!(
            "unknown component sentinel '{value}'"
        ))),
    }
}

/// A step of the standalone onboarding form flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingStep {
    pub id: String,
    pub title: String,
    pub description: String,
    pub fields: Vec<serde_json::Value>,
}

/// Agent persona used to fill the prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub essence: String,
    pub worldview: Worldview,
    pub expertise: Expertise,
    pub style: ConversationalStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worldview {
    pub core_beliefs: Vec<String>,
    pub aesthetic: String,
    pub pet_peeves: String,
    pub influences: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expertise {
    pub deep_mastery: Vec<String>,
    pub working_knowledge: Vec<String>,
    pub curiosity_edges: Vec<String>,
    pub honest_limits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationalStyle {
    pub energy: String,
    pub when_exploring: String,
    pub when_sharing_opinions: String,
    pub when_teaching: String,
    pub when_building: String,
    pub signature_expressions: Vec<String>,
}

/// Output of the Specification phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub workflow: WorkflowOption,
    /// Rendered VERTICAL.md document.
    pub vertical_spec: String,
    /// Rendered dual-mode system prompt.
    pub system_prompt: String,
    pub persona: Persona,
    pub tools: Vec<ToolDescriptor>,
    pub states: Vec<StateNode>,
    pub onboarding: Vec<OnboardingStep>,
    pub escalation_triggers: Vec<String>,
    pub prompt_engine: String,
    /// Placeholder tokens left unresolved while rendering.
    pub template_anomalies: Vec<String>,
    pub artifacts_path: Option<PathBuf>,
}

/// Output of the Build phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutput {
    pub location: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Output of the Delivery phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySummary {
    pub output_location: PathBuf,
    pub dashboard_files: Vec<PathBuf>,
    pub landing_files: Vec<PathBuf>,
    pub marketing_files: Vec<PathBuf>,
    pub deployment_files: Vec<PathBuf>,
    pub next_steps: Vec<String>,
}

impl DeliverySummary {
    pub fn all_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.dashboard_files
            .iter()
            .chain(&self.landing_files)
            .chain(&self.marketing_files)
            .chain(&self.deployment_files)
    }
}

/// Artifact returned by a phase handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "artifact", rename_all = "lowercase")]
pub enum PhaseArtifact {
    Discovery(DiscoveryReport),
    Specification(Box<Specification>),
    Build(BuildOutput),
    Delivery(DeliverySummary),
}

impl PhaseArtifact {
    pub fn phase(&self) -> Phase {
        match self {
            PhaseArtifact::Discovery(_) => Phase::Discovery,
            PhaseArtifact::Specification(_) => Phase::Specification,
            PhaseArtifact::Build(_) => Phase::Build,
            PhaseArtifact::Delivery(_) => Phase::Delivery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_order_is_workflow_order() {
        let mut sorted = Phase::ALL;
        sorted.sort();
        assert_eq!(sorted, Phase::ALL);
        assert_eq!(Phase::Delivery.next(), Some(Phase::Complete));
        assert_eq!(Phase::Complete.next(), None);
        assert_eq!(Phase::Build.previous(), Some(Phase::Specification));
    }

    #[test]
    fn only_specification_and_build_are_gated() {
        let gated: Vec<Phase> = Phase::ALL.into_iter().filter(|p| p.is_gated()).collect();
        assert_eq!(gated, vec![Phase::Specification, Phase::Build]);
    }

    #[test]
    fn phase_parses_case_insensitively() {
        assert_eq!("Build".parse::<Phase>(), Ok(Phase::Build));
        assert!("deploy".parse::<Phase>().is_err());
    }

    #[test]
    fn component_sentinel_and_absent_field_both_parse() {
        let sentinel: StateNode = serde_json::from_str(
            r#"{"name":"a","next":"b","message":"m","component":"none"}"#,
        )
        .expect("sentinel");
        assert_eq!(sentinel.component, Some(UiComponent::None));

        let absent: StateNode =
            serde_json::from_str(r#"{"name":"a","next":"b","message":"m"}"#).expect("absent");
        assert_eq!(absent.component, None);

        let typed: StateNode = serde_json::from_str(
            r#"{"name":"a","next":"b","message":"m","component":{"type":"free-text","name":"details"}}"#,
        )
        .expect("typed");
        assert_eq!(
            typed.component,
            Some(UiComponent::FreeText {
                name: "details".to_string(),
                placeholder: None
            })
        );
    }

    #[test]
    fn unknown_component_sentinel_is_rejected() {
        let err = serde_json::from_str::<StateNode>(
            r#"{"name":"a","next":"b","message":"m","component":"carousel"}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn tool_to_mcp_keeps_required_list() {
        let tool = ToolDescriptor {
            name: "notify_human".to_string(),
            description: "Notify".to_string(),
            parameter_schema: ParameterSchema {
                properties: vec![ToolParameter {
                    name: "priority".to_string(),
                    kind: "string".to_string(),
                    description: String::new(),
                    allowed: vec!["low".to_string(), "high".to_string()],
                }],
                required: vec!["priority".to_string()],
            },
            returns: "ok".to_string(),
        };
        let mcp = tool.to_mcp();
        assert_eq!(mcp["parameters"]["required"][0], "priority");
        assert_eq!(mcp["parameters"]["properties"]["priority"]["enum"][1], "high");
    }
}
