//! Dual-mode system prompt assembly.
//!
//! Sub-renderers flatten the persona, tool set, escalation triggers and state
//! graph into strings; [`PromptConfig::bindings`] collects them into a single
//! bindings map, and [`assemble_system_prompt`] runs one substitution pass over
//! the master template.

use crate::core::state_graph::render_graph;
use crate::core::template::{Bindings, Rendered, placeholder, render_with_report};
use crate::core::types::{Persona, StateNode, ToolDescriptor};

/// Built-in master template for the dual-mode agent prompt.
pub const MASTER_TEMPLATE: &str = include_str!("../templates/dual-mode-agent.xml");

/// Runtime variable left in the prompt for the deploying company to fill.
pub const COMPANY_NAME_VAR: &str = "COMPANY_NAME";

const SECTION_JOIN: &str = "\n      ";
const TOOL_JOIN: &str = "\n    ";
const EXPERTISE_CATEGORIES: [&str; 4] = [
    "deep_mastery",
    "working_knowledge",
    "curiosity_edges",
    "honest_limits",
];

/// Everything needed to assemble one system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptConfig {
    pub vertical_name: String,
    pub vertical_slug: String,
    pub agent_name: String,
    /// Company name, or the `{{COMPANY_NAME}}` runtime variable.
    pub company_name: String,
    pub persona: Option<Persona>,
    pub states: Vec<StateNode>,
    pub tools: Vec<ToolDescriptor>,
    pub escalation_triggers: Vec<String>,
    /// Extra bindings. These never shadow the standard placeholders.
    pub custom_variables: Bindings,
}

impl PromptConfig {
    pub fn new(vertical_name: &str, vertical_slug: &str, agent_name: &str) -> Self {
        Self {
            vertical_name: vertical_name.to_string(),
            vertical_slug: vertical_slug.to_string(),
            agent_name: agent_name.to_string(),
            company_name: placeholder(COMPANY_NAME_VAR),
            persona: None,
            states: Vec::new(),
            tools: Vec::new(),
            escalation_triggers: Vec::new(),
            custom_variables: Bindings::new(),
        }
    }

    /// Build the single bindings map consumed by the master template.
    ///
    /// Persona and state placeholders are only bound when the corresponding
    /// inputs are present; otherwise they stay literal in the output.
    pub fn bindings(&self) -> Bindings {
        let mut bindings = Bindings::new();
        bind(&mut bindings, "AGENT_NAME", self.agent_name.clone());
        bind(&mut bindings, "VERTICAL_NAME", self.vertical_name.clone());
        bind(&mut bindings, "VERTICAL_SLUG", self.vertical_slug.clone());
        bind(&mut bindings, COMPANY_NAME_VAR, self.company_name.clone());

        if let Some(persona) = &self.persona {
            bind(&mut bindings, "ONE_SENTENCE_ESSENCE", persona.essence.clone());
            bind(&mut bindings, "PERSONA_WORLDVIEW", render_worldview(persona));
            bind(&mut bindings, "PERSONA_EXPERTISE", render_expertise(persona));
            bind(&mut bindings, "PERSONA_STYLE", render_style(persona));
        }
        if !self.states.is_empty() {
            bind(&mut bindings, "ONBOARDING_STATES", render_graph(&self.states));
        }
        bind(&mut bindings, "MCP_TOOL_DEFINITIONS", render_tools(&self.tools));
        bind(
            &mut bindings,
            "ESCALATION_TRIGGERS",
            render_escalation_triggers(&self.escalation_triggers),
        );

        for (key, value) in &self.custom_variables {
            bindings.entry(key.clone()).or_insert_with(|| value.clone());
        }
        bindings
    }
}

fn bind(bindings: &mut Bindings, key: &str, value: String) {
    bindings.insert(key.to_string(), value);
}

/// Render the master template for `config`.
pub fn assemble_system_prompt(config: &PromptConfig) -> Rendered {
    assemble_with_template(MASTER_TEMPLATE, config)
}

/// Render an arbitrary master template for `config`.
pub fn assemble_with_template(template: &str, config: &PromptConfig) -> Rendered {
    render_with_report(template, &config.bindings())
}

pub fn render_worldview(persona: &Persona) -> String {
    let wv = &persona.worldview;
    let mut lines = vec!["<worldview>".to_string(), "  <core_beliefs>".to_string()];
    for belief in &wv.core_beliefs {
        lines.push(format!("    <belief>{belief}</belief>"));
    }
    lines.push("  </core_beliefs>".to_string());
    lines.push(format!("  <aesthetic>{}</aesthetic>", wv.aesthetic));
    lines.push(format!("  <pet_peeves>{}</pet_peeves>", wv.pet_peeves));
    lines.push(format!("  <influences>{}</influences>", wv.influences));
    lines.push("</worldview>".to_string());
    lines.join(SECTION_JOIN)
}

pub fn render_expertise(persona: &Persona) -> String {
    let exp = &persona.expertise;
    let groups: [&[String]; 4] = [
        &exp.deep_mastery,
        &exp.working_knowledge,
        &exp.curiosity_edges,
        &exp.honest_limits,
    ];
    let mut lines = vec!["<expertise>".to_string()];
    for (category, items) in EXPERTISE_CATEGORIES.iter().zip(groups) {
        lines.push(format!("  <{category}>"));
        for item in items {
            lines.push(format!("    <item>{item}</item>"));
        }
        lines.push(format!("  </{category}>"));
    }
    lines.push("</expertise>".to_string());
    lines.join(SECTION_JOIN)
}

pub fn render_style(persona: &Persona) -> String {
    let style = &persona.style;
    let entries = [
        ("energy", &style.energy),
        ("when_exploring", &style.when_exploring),
        ("when_sharing_opinions", &style.when_sharing_opinions),
        ("when_teaching", &style.when_teaching),
        ("when_building", &style.when_building),
    ];
    let mut lines = vec!["<conversational_style>".to_string()];
    for (key, value) in entries {
        lines.push(format!("  <{key}>{value}</{key}>"));
    }
    if !style.signature_expressions.is_empty() {
        lines.push("  <signature_expressions>".to_string());
        for expr in &style.signature_expressions {
            lines.push(format!("    <expression>{expr}</expression>"));
        }
        lines.push("  </signature_expressions>".to_string());
    }
    lines.push("</conversational_style>".to_string());
    lines.join(SECTION_JOIN)
}

/// Render tool descriptors with one `<property>` per parameter.
pub fn render_tools(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return "<!-- No tools defined -->".to_string();
    }
    let mut lines = Vec::new();
    for tool in tools {
        lines.push(format!(r#"<tool name="{}">"#, tool.name));
        lines.push(format!("  <description>{}</description>", tool.description));
        let schema = &tool.parameter_schema;
        if !schema.properties.is_empty() {
            lines.push("  <input_schema>".to_string());
            for param in &schema.properties {
                lines.push(format!(
                    r#"    <property name="{}" type="{}" required="{}">"#,
                    param.name,
                    param.kind,
                    schema.is_required(&param.name)
                ));
                if !param.description.is_empty() {
                    lines.push(format!("      {}", param.description));
                }
                lines.push("    </property>".to_string());
            }
            lines.push("  </input_schema>".to_string());
        }
        lines.push(format!("  <returns>{}</returns>", tool.returns));
        lines.push("</tool>".to_string());
    }
    lines.join(TOOL_JOIN)
}

pub fn render_escalation_triggers(triggers: &[String]) -> String {
    let mut lines = vec!["<vertical_triggers>".to_string()];
    for trigger in triggers {
        lines.push(format!("  <trigger>{trigger}</trigger>"));
    }
    lines.push("</vertical_triggers>".to_string());
    lines.join(SECTION_JOIN)
}
