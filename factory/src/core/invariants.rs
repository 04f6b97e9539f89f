//! Structural invariants of the onboarding state graph.

use std::collections::HashSet;

use crate::core::state_graph::COMPLETE_NODE;
use crate::core::types::{StateNode, UiComponent};

/// Successor name that hands control from onboarding to consultation.
pub const TERMINAL_NEXT: &str = "consultation_mode";

/// Check graph invariants:
/// - At least one node
/// - No duplicate or empty names
/// - Every `next` names an existing node or [`TERMINAL_NEXT`]
/// - No node points at itself
/// - Form components have at least one field with unique names
pub fn validate_state_graph(nodes: &[StateNode]) -> Vec<String> {
    let mut errors = Vec::new();
    if nodes.is_empty() {
        errors.push("state graph has no nodes".to_string());
        return errors;
    }

    let names: HashSet<&str> = nodes.iter().map(|node| node.name.as_str()).collect();
    let mut seen = HashSet::new();
    for (idx, node) in nodes.iter().enumerate() {
        let at = format!("nodes[{idx}]");
        if node.name.trim().is_empty() {
            errors.push(format!("{at}: name must not be empty"));
        }
        if !seen.insert(node.name.as_str()) {
            errors.push(format!("duplicate node name '{}' at {at}", node.name));
        }
        if node.next_name == node.name {
            errors.push(format!("{at}: '{}' names itself as next", node.name));
        } else if node.next_name != TERMINAL_NEXT && !names.contains(node.next_name.as_str()) {
            errors.push(format!(
                "{at}: '{}' points at unknown node '{}'",
                node.name, node.next_name
            ));
        }
        if let Some(UiComponent::Form { fields }) = &node.component {
            if fields.is_empty() {
                errors.push(format!("{at}: form component has no fields"));
            }
            let mut field_names = HashSet::new();
            for field in fields {
                if !field_names.insert(field.name.as_str()) {
                    errors.push(format!("{at}: duplicate form field '{}'", field.name));
                }
            }
        }
    }
    errors
}

/// True when the final node of the sequence is the completion node.
pub fn ends_with_complete(nodes: &[StateNode]) -> bool {
    nodes.last().is_some_and(|node| node.name == COMPLETE_NODE)
}
