//! Specification: turn an approved workflow into a persona, tools, a state
//! graph and the rendered prompt documents.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::core::error::WorkflowError;
use crate::core::invariants::{TERMINAL_NEXT, validate_state_graph};
use crate::core::prompt::{MASTER_TEMPLATE, PromptConfig, assemble_with_template};
use crate::core::state_graph::COMPLETE_NODE;
use crate::core::types::{
    ConversationalStyle, Expertise, FormField, OnboardingStep, ParameterSchema, Persona, Phase,
    PhaseArtifact, Specification, StateNode, ToolDescriptor, ToolParameter, UiComponent,
    Worldview,
};
use crate::core::vertical_doc::VerticalDoc;
use crate::io::store::write_tree;
use crate::phases::{PhaseContext, PhaseHandler};

/// Template engine id served by the built-in master template.
pub const DUAL_MODE_ENGINE: &str = "dual-mode";

#[derive(Debug, Clone, Copy, Default)]
pub struct SpecificationPhase;

impl PhaseHandler for SpecificationPhase {
    fn phase(&self) -> Phase {
        Phase::Specification
    }

    #[instrument(skip_all, fields(slug = %ctx.state.subject_slug))]
    fn execute(&self, ctx: &PhaseContext<'_>) -> Result<PhaseArtifact> {
        let state = ctx.state;
        let report = state
            .discovery_report
            .as_ref()
            .ok_or(WorkflowError::MissingPrerequisite {
                phase: Phase::Specification,
                missing: "a discovery report",
            })?;
        let workflow = state
            .selected_option
            .as_ref()
            .ok_or(WorkflowError::MissingSelection)?;
        let master = master_template(&ctx.config.template_engine_id)?;

        let vertical_name = state.subject_name.as_str();
        let slug = state.subject_slug.as_str();
        let archetype = Archetype::from_slug(slug);

        let tools = common_tools();
        let persona = custom_persona(vertical_name, &workflow.name, archetype);
        let escalation_triggers = escalation_triggers(slug);
        let states = default_states();
        let errors = validate_state_graph(&states);
        if !errors.is_empty() {
            return Err(WorkflowError::InvalidStateGraph { errors }.into());
        }
        let onboarding = onboarding_flow(vertical_name);

        let vertical_doc = VerticalDoc {
            vertical_name,
            report,
            workflow,
            tools: &tools,
            created: ctx.today,
        }
        .render();

        let prompt_config = PromptConfig {
            persona: Some(persona.clone()),
            states: states.clone(),
            tools: tools.clone(),
            escalation_triggers: escalation_triggers.clone(),
            ..PromptConfig::new(vertical_name, slug, &persona.name)
        };
        let system_prompt = assemble_with_template(master, &prompt_config);

        let mut template_anomalies = vertical_doc.unresolved.clone();
        for name in &system_prompt.unresolved {
            if !template_anomalies.contains(name) {
                template_anomalies.push(name.clone());
            }
        }
        for name in &template_anomalies {
            warn!(placeholder = %name, "unresolved template placeholder");
        }

        let mut spec = Specification {
            workflow: workflow.clone(),
            vertical_spec: vertical_doc.text,
            system_prompt: system_prompt.text,
            persona,
            tools,
            states,
            onboarding,
            escalation_triggers,
            prompt_engine: ctx.config.template_engine_id.clone(),
            template_anomalies,
            artifacts_path: None,
        };
        if ctx.config.save_artifacts {
            spec.artifacts_path = Some(save_artifacts(ctx, &spec)?);
        }

        info!(
            workflow = %spec.workflow.name,
            tools = spec.tools.len(),
            states = spec.states.len(),
            anomalies = spec.template_anomalies.len(),
            "specification complete"
        );
        Ok(PhaseArtifact::Specification(Box::new(spec)))
    }
}

fn master_template(engine_id: &str) -> Result<&'static str> {
    match engine_id {
        DUAL_MODE_ENGINE => Ok(MASTER_TEMPLATE),
        other => bail!("unknown template engine '{other}'"),
    }
}

/// Write reference copies under `<artifacts_directory>/<slug>/`.
fn save_artifacts(ctx: &PhaseContext<'_>, spec: &Specification) -> Result<PathBuf> {
    let root = ctx.config.artifacts_root().join(&ctx.state.subject_slug);
    let tools: Vec<serde_json::Value> = spec.tools.iter().map(ToolDescriptor::to_mcp).collect();
    let flow = json!({ "steps": spec.onboarding, "states": spec.states });
    let files = vec![
        (PathBuf::from("VERTICAL.md"), spec.vertical_spec.clone()),
        (PathBuf::from("system-prompt.xml"), spec.system_prompt.clone()),
        (PathBuf::from("tools/tools.json"), pretty_json(&tools)?),
        (PathBuf::from("onboarding/flow.json"), pretty_json(&flow)?),
    ];
    write_tree(ctx.store, &root, &files)
        .with_context(|| format!("save specification artifacts to {}", root.display()))?;
    info!(path = %root.display(), "specification artifacts saved");
    Ok(root)
}

pub(crate) fn pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = serde_json::to_string_pretty(value).context("serialize json")?;
    buf.push('\n');
    Ok(buf)
}

/// Broad industry families that shape persona tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Archetype {
    Legal,
    Trades,
    AnimalCare,
    Automotive,
    General,
}

impl Archetype {
    /// Match slug keywords. The first family with a hit wins.
    pub fn from_slug(slug: &str) -> Self {
        let has = |terms: &[&str]| terms.iter().any(|term| slug.contains(term));
        if has(&["law", "legal", "attorney"]) {
            Archetype::Legal
        } else if has(&["construction", "contractor", "trade"]) {
            Archetype::Trades
        } else if has(&["vet", "pet", "animal", "clinic"]) {
            Archetype::AnimalCare
        } else if has(&["auto", "repair", "mechanic"]) {
            Archetype::Automotive
        } else {
            Archetype::General
        }
    }

    fn energy(self) -> &'static str {
        match self {
            Archetype::Legal => "calm, reassuring, professional",
            Archetype::Trades => "direct, efficient, confident",
            Archetype::AnimalCare => "warm, caring, patient",
            Archetype::Automotive => "helpful, straightforward, knowledgeable",
            Archetype::General => "professional, helpful, attentive",
        }
    }

    fn essence(self, workflow: &str) -> String {
        match self {
            Archetype::Legal => format!(
                "Compassionate advocate who guides clients through {workflow} with empathy and clarity"
            ),
            Archetype::Trades => format!(
                "No-nonsense professional who respects your time and delivers accurate {workflow} results"
            ),
            Archetype::AnimalCare => format!(
                "Caring professional who treats every interaction with compassion during {workflow}"
            ),
            Archetype::Automotive => {
                format!("Trusted expert who explains {workflow} clearly without the runaround")
            }
            Archetype::General => {
                format!("Dedicated specialist who makes {workflow} simple and stress-free")
            }
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn custom_persona(vertical_name: &str, workflow: &str, archetype: Archetype) -> Persona {
    let energy = archetype.energy();
    Persona {
        name: format!("{} Assistant", title_case(vertical_name)),
        essence: archetype.essence(workflow),
        worldview: Worldview {
            core_beliefs: vec![
                format!("Every client deserves clear, honest communication about {workflow}"),
                "Efficiency and empathy aren't mutually exclusive".to_string(),
                "The best service anticipates needs before they're expressed".to_string(),
                format!("Trust is built through transparency in {workflow}"),
            ],
            aesthetic: format!("Clear communication, no jargon, {energy} tone"),
            pet_peeves: "Making clients feel rushed, confused, or unimportant".to_string(),
            influences: "Best practices from hospitality, healthcare communication, and customer service excellence"
                .to_string(),
        },
        expertise: Expertise {
            deep_mastery: vec![
                format!("{workflow} processes and best practices"),
                format!("{vertical_name} industry knowledge"),
                "Client communication and expectation management".to_string(),
                "Data collection and validation".to_string(),
            ],
            working_knowledge: vec![
                format!("Common {} terminology", vertical_name.to_lowercase()),
                "General business processes".to_string(),
                "Customer relationship management".to_string(),
            ],
            curiosity_edges: strings(&[
                "Emerging industry trends",
                "New communication technologies",
                "Process improvement methods",
            ]),
            honest_limits: strings(&[
                "Specific professional advice (requires licensed expert)",
                "Decisions that require human judgment",
                "Complex situations requiring escalation",
            ]),
        },
        style: ConversationalStyle {
            energy: energy.to_string(),
            when_exploring: format!(
                "Ask clarifying questions to understand the client's {workflow} needs fully"
            ),
            when_sharing_opinions:
                "Frame as professional perspective with reasoning, not absolutes".to_string(),
            when_teaching: "Use plain language with relatable examples, check for understanding"
                .to_string(),
            when_building:
                "Focus on actionable next steps, confirm understanding before proceeding"
                    .to_string(),
            signature_expressions: vec![
                "Validates concerns before moving to solutions".to_string(),
                format!("Breaks down {workflow} into simple, clear steps"),
                "Offers reassurance with specific next actions".to_string(),
            ],
        },
    }
}

/// Triggers added for a slug on top of the common set.
///
/// Narrower than [`Archetype::from_slug`]: a slug like `dental-clinics` gets a
/// general persona tone but no animal-care escalations.
fn vertical_triggers(slug: &str) -> &'static [&'static str] {
    let has = |terms: &[&str]| terms.iter().any(|term| slug.contains(term));
    if has(&["law", "legal"]) {
        &[
            "Statute of limitations may be expiring soon",
            "User mentions existing legal representation",
            "Criminal charges are involved",
        ]
    } else if has(&["vet", "pet"]) {
        &[
            "Symptoms suggest medical emergency",
            "Questions about euthanasia or end-of-life care",
            "Suspected animal abuse situation",
        ]
    } else if has(&["construction", "contractor"]) {
        &[
            "Project requires licenses we don't hold",
            "Unrealistic timeline for scope",
            "Safety or insurance concerns raised",
        ]
    } else {
        &[]
    }
}

/// Common triggers followed by the ones specific to `slug`.
pub fn escalation_triggers(slug: &str) -> Vec<String> {
    let mut triggers = strings(&[
        "User expresses severe distress or mentions self-harm",
        "Request requires professional licensing or certification",
        "Situation involves legal liability or compliance concerns",
        "User explicitly requests to speak with a human",
        "Complex situation that exceeds agent knowledge boundaries",
    ]);
    triggers.extend(strings(vertical_triggers(slug)));
    triggers
}

fn param(name: &str, kind: &str, description: &str) -> ToolParameter {
    ToolParameter {
        name: name.to_string(),
        kind: kind.to_string(),
        description: description.to_string(),
        allowed: Vec::new(),
    }
}

fn tool(
    name: &str,
    description: &str,
    properties: Vec<ToolParameter>,
    required: &[&str],
    returns: &str,
) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: description.to_string(),
        parameter_schema: ParameterSchema {
            properties,
            required: strings(required),
        },
        returns: returns.to_string(),
    }
}

/// Tools every generated agent ships with.
pub fn common_tools() -> Vec<ToolDescriptor> {
    let priority = ToolParameter {
        allowed: strings(&["low", "medium", "high", "urgent"]),
        ..param("priority", "string", "")
    };
    vec![
        tool(
            "save_intake_data",
            "Save collected intake data to the database",
            vec![
                param("data", "object", "Intake data to save"),
                param("stage", "string", "Current stage of intake"),
            ],
            &["data", "stage"],
            "Confirmation of saved data with record ID",
        ),
        tool(
            "get_user_progress",
            "Get the user's current progress in the onboarding flow",
            vec![param("user_id", "string", "User identifier")],
            &["user_id"],
            "Current stage and completed data",
        ),
        tool(
            "notify_human",
            "Notify a human team member for review or escalation",
            vec![
                param("message", "string", "Notification message"),
                priority,
                param("context", "object", "Relevant context data"),
            ],
            &["message", "priority"],
            "Notification confirmation",
        ),
        tool(
            "schedule_followup",
            "Schedule a follow-up action or reminder",
            vec![
                param("action", "string", "What action to take"),
                param("when", "string", "When to take action (ISO date or relative)"),
                param("user_id", "string", "User to follow up with"),
            ],
            &["action", "when"],
            "Scheduled follow-up confirmation",
        ),
    ]
}

fn state(
    name: &str,
    next: &str,
    message: &str,
    component: Option<UiComponent>,
    required: bool,
) -> StateNode {
    StateNode {
        name: name.to_string(),
        next_name: next.to_string(),
        message: message.to_string(),
        component,
        required,
    }
}

fn field(name: &str, kind: &str, label: &str) -> FormField {
    FormField {
        name: name.to_string(),
        kind: kind.to_string(),
        label: label.to_string(),
        required: true,
    }
}

/// The six-node onboarding graph used when no vertical-specific flow exists.
pub fn default_states() -> Vec<StateNode> {
    vec![
        state(
            "welcome",
            "contact_info",
            "Hi! I'm here to help you get started. Let me collect some information to serve you better.",
            None,
            false,
        ),
        state(
            "contact_info",
            "situation_type",
            "First, could you share your contact information?",
            Some(UiComponent::Form {
                fields: vec![
                    field("full_name", "text", "Your Name"),
                    field("email", "email", "Email"),
                    field("phone", "phone", "Phone"),
                ],
            }),
            true,
        ),
        state(
            "situation_type",
            "details",
            "What brings you in today?",
            Some(UiComponent::SingleSelect {
                name: "situation_type".to_string(),
                options: strings(&[
                    "General Inquiry",
                    "New Request",
                    "Follow-up",
                    "Emergency",
                    "Other",
                ]),
            }),
            true,
        ),
        state(
            "details",
            "urgency",
            "Can you tell me more about your situation?",
            Some(UiComponent::FreeText {
                name: "details".to_string(),
                placeholder: Some("Please describe your situation...".to_string()),
            }),
            true,
        ),
        state(
            "urgency",
            COMPLETE_NODE,
            "How urgent is this matter?",
            Some(UiComponent::Slider {
                name: "urgency".to_string(),
                min: 1,
                max: 10,
                labels: BTreeMap::from([
                    ("1".to_string(), "Not urgent".to_string()),
                    ("10".to_string(), "Very urgent".to_string()),
                ]),
            }),
            true,
        ),
        state(
            COMPLETE_NODE,
            TERMINAL_NEXT,
            "Thank you! I have all the information I need. How can I help you further?",
            None,
            false,
        ),
    ]
}

/// Standalone five-step onboarding form flow for UI tooling.
pub fn onboarding_flow(vertical_name: &str) -> Vec<OnboardingStep> {
    let step = |id: &str, title: &str, description: String, fields: Vec<serde_json::Value>| {
        OnboardingStep {
            id: id.to_string(),
            title: title.to_string(),
            description,
            fields,
        }
    };
    vec![
        step(
            "welcome",
            "Welcome",
            format!("Welcome to {vertical_name} - let's get started"),
            vec![
                json!({
                    "type": "display",
                    "content": "[Welcome message explaining what will happen]"
                }),
                json!({"type": "button", "label": "Start Onboarding", "action": "next"}),
            ],
        ),
        step(
            "basic_info",
            "Basic Information",
            "Tell us about yourself".to_string(),
            vec![
                json!({
                    "type": "text",
                    "name": "full_name",
                    "label": "Your Name",
                    "required": true
                }),
                json!({
                    "type": "email",
                    "name": "email",
                    "label": "Email Address",
                    "required": true
                }),
                json!({
                    "type": "phone",
                    "name": "phone",
                    "label": "Phone Number",
                    "required": true
                }),
            ],
        ),
        step(
            "situation",
            "Your Situation",
            "Help us understand your needs".to_string(),
            vec![
                json!({
                    "type": "inline_select",
                    "name": "situation_type",
                    "label": "[Workflow-specific question]",
                    "options": ["[Option 1]", "[Option 2]", "[Option 3]", "[Other]"],
                    "required": true
                }),
                json!({
                    "type": "inline_slider",
                    "name": "urgency",
                    "label": "How urgent is this?",
                    "min": 1,
                    "max": 10,
                    "default": 5
                }),
                json!({
                    "type": "textarea",
                    "name": "description",
                    "label": "Tell us more",
                    "placeholder": "Describe your situation in a few sentences..."
                }),
            ],
        ),
        step(
            "details",
            "Additional Details",
            "A few more questions to help us help you".to_string(),
            vec![
                json!({
                    "type": "inline_buttons",
                    "name": "timeline",
                    "label": "When did this happen?",
                    "options": ["Today", "This week", "This month", "Longer ago"]
                }),
                json!({
                    "type": "file_upload",
                    "name": "documents",
                    "label": "Upload any relevant documents (optional)",
                    "accept": [".pdf", ".jpg", ".png", ".doc", ".docx"],
                    "multiple": true,
                    "required": false
                }),
            ],
        ),
        step(
            "confirmation",
            "All Set!",
            "We've got everything we need".to_string(),
            vec![
                json!({"type": "display", "content": "[Summary of collected information]"}),
                json!({"type": "display", "content": "[Next steps - what happens now]"}),
                json!({"type": "button", "label": "Submit", "action": "submit"}),
            ],
        ),
    ]
}
