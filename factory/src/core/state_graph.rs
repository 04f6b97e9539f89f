//! Rendering of the onboarding state graph into the prompt's XML form.
//!
//! Blocks are emitted in the order the nodes are supplied, not in the order
//! implied by following `next` links.

use crate::core::types::{FormField, StateNode, UiComponent};

/// Node that closes onboarding and receives the terminal marker.
pub const COMPLETE_NODE: &str = "complete";
/// Marker block appended to the [`COMPLETE_NODE`] block.
pub const TERMINAL_MARKER: &str = "<action>mark_onboarding_complete</action>";

const STATE_INDENT: &str = "      ";
const BODY_INDENT: &str = "        ";
const COMPONENT_INDENT: &str = "          ";
const FIELD_INDENT: &str = "            ";

/// Render nodes into `<state>` blocks, one per node, in input order.
pub fn render_graph(nodes: &[StateNode]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for node in nodes {
        render_node(node, &mut lines);
    }
    lines.join("\n")
}

fn render_node(node: &StateNode, lines: &mut Vec<String>) {
    lines.push(format!(
        r#"{STATE_INDENT}<state name="{}" next="{}">"#,
        attr(&node.name),
        attr(&node.next_name)
    ));
    lines.push(format!("{BODY_INDENT}<message>{}</message>", text(&node.message)));

    match node.component.as_ref() {
        None | Some(UiComponent::None) => {
            lines.push(format!("{BODY_INDENT}<a2ui_component>none</a2ui_component>"));
        }
        Some(component) => {
            lines.push(format!("{BODY_INDENT}<a2ui_component>"));
            render_component(component, lines);
            lines.push(format!("{BODY_INDENT}</a2ui_component>"));
        }
    }

    lines.push(format!("{BODY_INDENT}<required>{}</required>", node.required));
    if node.name == COMPLETE_NODE {
        lines.push(format!("{BODY_INDENT}{TERMINAL_MARKER}"));
    }
    lines.push(format!("{STATE_INDENT}</state>"));
    lines.push(String::new());
}

fn render_component(component: &UiComponent, lines: &mut Vec<String>) {
    match component {
        UiComponent::Form { fields } => {
            lines.push(format!("{COMPONENT_INDENT}<InlineChatForm>"));
            for field in fields {
                lines.push(render_field(field));
            }
            lines.push(format!("{COMPONENT_INDENT}</InlineChatForm>"));
        }
        UiComponent::SingleSelect { name, options } => {
            lines.push(element(
                "InlineButtons",
                &[("name", attr(name)), ("options", list(options))],
            ));
        }
        UiComponent::MultiSelect { name, options } => {
            lines.push(element(
                "InlineMultiSelect",
                &[("name", attr(name)), ("options", list(options))],
            ));
        }
        UiComponent::Slider {
            name,
            min,
            max,
            labels,
        } => {
            let labels = labels
                .iter()
                .map(|(k, v)| format!("{}:{}", attr(k), attr(v)))
                .collect::<Vec<_>>()
                .join("|");
            lines.push(element(
                "InlineSlider",
                &[
                    ("name", attr(name)),
                    ("min", min.to_string()),
                    ("max", max.to_string()),
                    ("labels", labels),
                ],
            ));
        }
        UiComponent::FreeText { name, placeholder } => {
            let mut attrs = vec![("name", attr(name))];
            if let Some(placeholder) = placeholder {
                attrs.push(("placeholder", attr(placeholder)));
            }
            lines.push(element("InlineTextarea", &attrs));
        }
        UiComponent::FileUpload {
            name,
            accept,
            multiple,
        } => {
            lines.push(element(
                "InlineFileUpload",
                &[
                    ("name", attr(name)),
                    ("accept", list(accept)),
                    ("multiple", multiple.to_string()),
                ],
            ));
        }
        // Handled by the caller; kept exhaustive for the closed set.
        UiComponent::None => lines.push(format!("{COMPONENT_INDENT}none")),
    }
}

fn render_field(field: &FormField) -> String {
    format!(
        r#"{FIELD_INDENT}<field name="{}" type="{}" label="{}" required="{}" />"#,
        attr(&field.name),
        attr(&field.kind),
        attr(&field.label),
        field.required
    )
}

fn element(tag: &str, attrs: &[(&str, String)]) -> String {
    let rendered = attrs
        .iter()
        .map(|(key, value)| format!(r#"{key}="{value}""#))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{COMPONENT_INDENT}<{tag} {rendered} />")
}

fn list(items: &[String]) -> String {
    items.iter().map(|item| attr(item)).collect::<Vec<_>>().join("|")
}

/// Escape a value for use as element text.
fn text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape a value for use inside a double-quoted attribute.
fn attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
