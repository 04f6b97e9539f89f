//! VERTICAL.md rendering.
//!
//! The document body lives in a built-in template; this module only formats
//! discovery data into bindings.

use crate::core::template::{Bindings, Rendered, render_with_report};
use crate::core::types::{
    Competitor, DiscoveryReport, MarketData, PricingRecommendation, ToolDescriptor,
    WorkflowOption,
};

pub const VERTICAL_TEMPLATE: &str = include_str!("../templates/vertical.md");

const RESEARCH_PENDING: &str = "[To be filled based on discovery research]";

/// Inputs for one VERTICAL.md document.
#[derive(Debug, Clone, Copy)]
pub struct VerticalDoc<'a> {
    pub vertical_name: &'a str,
    pub report: &'a DiscoveryReport,
    pub workflow: &'a WorkflowOption,
    pub tools: &'a [ToolDescriptor],
    /// ISO date stamped into the front matter.
    pub created: &'a str,
}

impl VerticalDoc<'_> {
    pub fn bindings(&self) -> Bindings {
        let market = self.report.market_data.as_ref();
        let pain_points = market.map(|m| m.key_pain_points.as_slice()).unwrap_or(&[]);
        let competitors = market.map(|m| m.existing_solutions.as_slice()).unwrap_or(&[]);

        let pairs = [
            ("VERTICAL_SLUG", self.report.subject_slug.clone()),
            ("VERTICAL_NAME", self.vertical_name.to_string()),
            ("CREATED", self.created.to_string()),
            ("CONFIDENCE", self.report.confidence.to_string()),
            ("WORKFLOW_NAME", self.workflow.name.clone()),
            ("WORKFLOW_DESCRIPTION", self.workflow.description.clone()),
            ("TIME_SAVINGS", self.workflow.time_savings.clone()),
            (
                "AUTOMATION_POTENTIAL",
                format_percent(self.workflow.automation_potential),
            ),
            ("MARKET_OVERVIEW", format_market(market)),
            ("PAIN_POINTS", format_pain_points(pain_points)),
            ("TOOL_SUMMARY", format_tool_summary(self.tools)),
            (
                "INTEGRATIONS",
                format_integrations(&self.workflow.integration_requirements),
            ),
            (
                "PRICING",
                format_pricing(&self.report.pricing_recommendation),
            ),
            ("COMPETITION", format_competition(competitors)),
        ];
        pairs
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    pub fn render(&self) -> Rendered {
        render_with_report(VERTICAL_TEMPLATE, &self.bindings())
    }
}

fn format_percent(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn format_market(market: Option<&MarketData>) -> String {
    match market {
        None => RESEARCH_PENDING.to_string(),
        Some(m) => format!(
            "- **SMB Count**: {}\n\
             - **Average Revenue**: {}\n\
             - **Tech Adoption**: {}\n\
             - **Pricing Benchmark**: {}",
            m.smb_count, m.avg_revenue, m.tech_adoption, m.pricing_benchmark
        ),
    }
}

fn format_pain_points(points: &[String]) -> String {
    if points.is_empty() {
        return "1. [Pain point 1]\n2. [Pain point 2]\n3. [Pain point 3]".to_string();
    }
    points
        .iter()
        .enumerate()
        .map(|(idx, point)| format!("{}. {point}", idx + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_tool_summary(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return "- [No tools defined]".to_string();
    }
    tools
        .iter()
        .map(|tool| format!("- `{}`: {}", tool.name, tool.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_integrations(requirements: &[String]) -> String {
    let mut lines = vec![
        "| System | Purpose |".to_string(),
        "|--------|---------|".to_string(),
    ];
    if requirements.is_empty() {
        lines.push("| [System 1] | [Why needed] |".to_string());
    }
    for system in requirements {
        lines.push(format!("| {system} | [Why needed] |"));
    }
    lines.join("\n")
}

fn format_pricing(pricing: &PricingRecommendation) -> String {
    let mut lines = vec![
        format!(
            "**Base Price:** {} ({})",
            pricing.base_monthly, pricing.base_annual
        ),
        String::new(),
        "**Justification:**".to_string(),
        pricing.justification.clone(),
    ];
    if !pricing.tiers.is_empty() {
        lines.push(String::new());
        lines.push("**Pricing Tiers:**".to_string());
        lines.push(String::new());
        lines.push("| Tier | Price | Includes |".to_string());
        lines.push("|------|-------|----------|".to_string());
        for tier in &pricing.tiers {
            lines.push(format!(
                "| {} | {} | {} |",
                tier.name,
                tier.price,
                tier.features.join(", ")
            ));
        }
    }
    lines.join("\n")
}

fn format_competition(competitors: &[Competitor]) -> String {
    let mut lines = vec![
        "| Competitor | Price | Gap |".to_string(),
        "|------------|-------|-----|".to_string(),
    ];
    if competitors.is_empty() {
        lines.push("| [Competitor 1] | $[X] | [Gap] |".to_string());
    }
    for c in competitors {
        lines.push(format!("| {} | {} | {} |", c.name, c.price, c.gap));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Confidence, PricingTier};

    fn report(market: Option<MarketData>) -> DiscoveryReport {
        DiscoveryReport {
            subject: "Dental Practices".to_string(),
            subject_slug: "dental-practices".to_string(),
            research_date: "2026-01-05".to_string(),
            search_provider: "exa".to_string(),
            confidence: Confidence::Medium,
            market_data: market,
            workflow_options: Vec::new(),
            pricing_recommendation: PricingRecommendation {
                base_monthly: "$99/month".to_string(),
                base_annual: "$990/year".to_string(),
                justification: "Saves 10 hrs/week".to_string(),
                tiers: vec![PricingTier {
                    name: "Starter".to_string(),
                    price: "$49/month".to_string(),
                    features: vec!["Basic".to_string(), "Email".to_string()],
                }],
            },
            playbook_reference: None,
        }
    }

    fn workflow() -> WorkflowOption {
        WorkflowOption {
            name: "Patient Intake".to_string(),
            description: "Collect intake forms".to_string(),
            automation_potential: 85.0,
            time_savings: "15 hrs/week".to_string(),
            integration_requirements: vec!["Email".to_string(), "CRM".to_string()],
            recommended: true,
        }
    }

    #[test]
    fn renders_without_unresolved_tokens() {
        let report = report(None);
        let workflow = workflow();
        let doc = VerticalDoc {
            vertical_name: "Dental Practices",
            report: &report,
            workflow: &workflow,
            tools: &[],
            created: "2026-01-05",
        };
        let rendered = doc.render();
        assert!(rendered.is_clean(), "unresolved: {:?}", rendered.unresolved);
        assert!(rendered.text.contains("vertical: dental-practices"));
        assert!(rendered.text.contains("## Target Workflow: Patient Intake"));
        assert!(rendered.text.contains("Automation potential: 85%"));
        assert!(rendered.text.contains(RESEARCH_PENDING));
        assert!(rendered.text.contains("| Starter | $49/month | Basic, Email |"));
        assert!(rendered.text.contains("| CRM | [Why needed] |"));
    }

    #[test]
    fn market_data_fills_overview_and_tables() {
        let report = report(Some(MarketData {
            smb_count: "200k".to_string(),
            avg_revenue: "$1M".to_string(),
            tech_adoption: "Medium".to_string(),
            key_pain_points: vec!["No-shows".to_string(), "Paperwork".to_string()],
            existing_solutions: vec![Competitor {
                name: "Dentrix".to_string(),
                price: "$300".to_string(),
                gap: "Complex".to_string(),
            }],
            pricing_benchmark: "$100-300".to_string(),
        }));
        let workflow = workflow();
        let doc = VerticalDoc {
            vertical_name: "Dental Practices",
            report: &report,
            workflow: &workflow,
            tools: &[],
            created: "2026-01-05",
        };
        let text = doc.render().text;
        assert!(text.contains("- **SMB Count**: 200k"));
        assert!(text.contains("1. No-shows\n2. Paperwork"));
        assert!(text.contains("| Dentrix | $300 | Complex |"));
    }

    #[test]
    fn fractional_potential_keeps_one_decimal() {
        assert_eq!(format_percent(72.5), "72.5");
        assert_eq!(format_percent(70.0), "70");
    }
}
