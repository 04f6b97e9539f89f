//! Delivery: presentation artifacts and the hand-off manifest.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, instrument};

use crate::core::error::WorkflowError;
use crate::core::types::{DeliverySummary, Phase, PhaseArtifact, Specification};
use crate::io::store::write_tree;
use crate::phases::specification::pretty_json;
use crate::phases::{PhaseContext, PhaseHandler};

const ROBOTS_TXT: &str = "User-agent: *\nAllow: /\n\nSitemap: /sitemap.xml\n";

const LOGO_SVG: &str = r##"<svg width="200" height="50" viewBox="0 0 200 50" xmlns="http://www.w3.org/2000/svg">
  <rect width="50" height="50" rx="10" fill="#2563eb"/>
  <text x="30" y="35" font-family="Arial, sans-serif" font-size="24" fill="white" text-anchor="middle">AI</text>
  <text x="130" y="32" font-family="Arial, sans-serif" font-size="18" fill="#1f2937" text-anchor="middle">Agent</text>
</svg>
"##;

#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryPhase;

impl PhaseHandler for DeliveryPhase {
    fn phase(&self) -> Phase {
        Phase::Delivery
    }

    #[instrument(skip_all, fields(slug = %ctx.state.subject_slug))]
    fn execute(&self, ctx: &PhaseContext<'_>) -> Result<PhaseArtifact> {
        let spec = ctx
            .state
            .specification
            .as_ref()
            .ok_or(WorkflowError::MissingPrerequisite {
                phase: Phase::Delivery,
                missing: "an approved specification",
            })?;
        let build = ctx
            .state
            .build_output
            .as_ref()
            .ok_or(WorkflowError::MissingPrerequisite {
                phase: Phase::Delivery,
                missing: "a build output location",
            })?;
        let location = build.location.as_path();
        let vertical_name = ctx.state.subject_name.as_str();
        let slug = ctx.state.subject_slug.as_str();

        let write = |files: Vec<(PathBuf, String)>| -> Result<Vec<PathBuf>> {
            write_tree(ctx.store, location, &files)
                .with_context(|| format!("deliver to {}", location.display()))
        };

        let dashboard_files = write(dashboard(vertical_name, spec)?)?;
        let landing_files = write(landing(vertical_name, spec))?;
        let marketing_files = write(vec![
            (PathBuf::from("public/robots.txt"), ROBOTS_TXT.to_string()),
            (PathBuf::from("public/logo.svg"), LOGO_SVG.to_string()),
        ])?;
        let deployment_files = write(vec![(PathBuf::from("vercel.json"), vercel(slug)?)])?;
        write(vec![(
            PathBuf::from("src/config/navigation.json"),
            navigation()?,
        )])?;

        let summary = DeliverySummary {
            output_location: location.to_path_buf(),
            dashboard_files,
            landing_files,
            marketing_files,
            deployment_files,
            next_steps: next_steps(location),
        };
        info!(
            path = %location.display(),
            files = summary.all_files().count(),
            "delivery complete"
        );
        Ok(PhaseArtifact::Delivery(summary))
    }
}

fn dashboard(vertical_name: &str, spec: &Specification) -> Result<Vec<(PathBuf, String)>> {
    let intake_fields: Vec<&str> = spec
        .states
        .iter()
        .filter(|state| state.required)
        .map(|state| state.name.as_str())
        .collect();
    let panels = json!({
        "title": format!("{vertical_name} Admin"),
        "panels": [
            {
                "name": "knowledge",
                "title": "Knowledge Base",
                "components": ["sources", "search"]
            },
            {
                "name": "chat",
                "title": "Agent Chat",
                "components": ["transcript", "composer"]
            },
            {
                "name": "tuning",
                "title": "Tuning",
                "components": ["examples", "tone", "settings"]
            },
        ],
        "intakeFields": intake_fields,
    });
    let page = format!(
        "import dashboard from \"./dashboard.json\";\n\n\
         export default function AdminPage() {{\n  \
         return (\n    \
         <main>\n      \
         <h1>{{dashboard.title}}</h1>\n      \
         <p>Agent: {agent}</p>\n      \
         {{dashboard.panels.map((panel) => (\n        \
         <section key={{panel.name}}>\n          \
         <h2>{{panel.title}}</h2>\n          \
         <ul>{{panel.components.map((c) => <li key={{c}}>{{c}}</li>)}}</ul>\n        \
         </section>\n      \
         ))}}\n    \
         </main>\n  \
         );\n\
         }}\n",
        agent = spec.persona.name,
    );
    Ok(vec![
        (PathBuf::from("src/app/admin/page.tsx"), page),
        (PathBuf::from("src/app/admin/dashboard.json"), pretty_json(&panels)?),
    ])
}

fn landing(vertical_name: &str, spec: &Specification) -> Vec<(PathBuf, String)> {
    let page = format!(
        "export default function LandingPage() {{\n  \
         return (\n    \
         <main>\n      \
         <h1>{vertical_name}</h1>\n      \
         <p>{essence}</p>\n      \
         <p>We handle {workflow} so you can focus on your clients.</p>\n      \
         <a href=\"/chat\">Start Onboarding</a>\n    \
         </main>\n  \
         );\n\
         }}\n",
        essence = spec.persona.essence,
        workflow = spec.workflow.name,
    );
    let chat = format!(
        "import states from \"../../agent/onboarding/states.json\";\n\n\
         export default function ChatPage() {{\n  \
         const [first] = states;\n  \
         return (\n    \
         <main>\n      \
         <h1>{vertical_name} Onboarding</h1>\n      \
         <p>{{first.message}}</p>\n      \
         <textarea name=\"reply\" />\n    \
         </main>\n  \
         );\n\
         }}\n"
    );
    vec![
        (PathBuf::from("src/app/page.tsx"), page),
        (PathBuf::from("src/app/chat/page.tsx"), chat),
    ]
}

fn vercel(slug: &str) -> Result<String> {
    pretty_json(&json!({
        "name": format!("{slug}-agent"),
        "buildCommand": "npm run build",
        "outputDirectory": ".next",
        "framework": "nextjs",
        "regions": ["iad1"],
        "env": {"NEXT_PUBLIC_APP_URL": "@app_url"},
    }))
}

fn navigation() -> Result<String> {
    let link = |href: &str, label: &str| json!({"href": href, "label": label});
    pretty_json(&json!({
        "public": [
            link("/", "Home"),
            link("/#features", "Features"),
            link("/#how-it-works", "How It Works"),
            {"href": "/chat", "label": "Start Onboarding", "cta": true},
        ],
        "authenticated": [link("/chat", "Chat"), link("/admin", "Dashboard")],
        "admin": [
            link("/admin", "Dashboard"),
            link("/admin/knowledge", "Knowledge Base"),
            link("/admin/settings", "Settings"),
        ],
    }))
}

/// Numbered deployment checklist for the generated package.
pub fn next_steps(location: &Path) -> Vec<String> {
    vec![
        format!("1. Navigate to output directory: cd {}", location.display()),
        "2. Install dependencies: npm install".to_string(),
        "3. Copy .env.example to .env.local and fill in values".to_string(),
        "4. Run database migrations: npx supabase db push".to_string(),
        "5. Start development server: npm run dev".to_string(),
        "6. Test the landing page at http://localhost:3000".to_string(),
        "7. Test the chat at http://localhost:3000/chat".to_string(),
        "8. Test admin dashboard at http://localhost:3000/admin".to_string(),
        "9. Deploy to Vercel: vercel --prod".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_steps_start_in_output_directory() {
        let steps = next_steps(Path::new("/tmp/vet"));
        assert_eq!(steps.len(), 9);
        assert_eq!(steps[0], "1. Navigate to output directory: cd /tmp/vet");
        assert!(steps[8].starts_with("9. "));
    }

    #[test]
    fn vercel_config_names_the_agent() {
        let config: serde_json::Value =
            serde_json::from_str(&vercel("dental").expect("vercel")).expect("json");
        assert_eq!(config["name"], "dental-agent");
    }
}
