//! Build: materialize the agent package at the run's output location.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::core::error::WorkflowError;
use crate::core::prompt::COMPANY_NAME_VAR;
use crate::core::template::placeholder;
use crate::core::types::{BuildOutput, Phase, PhaseArtifact, Specification, ToolDescriptor};
use crate::io::config::ExistingOutput;
use crate::io::store::write_tree;
use crate::phases::specification::pretty_json;
use crate::phases::{PhaseContext, PhaseHandler};

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildPhase;

impl PhaseHandler for BuildPhase {
    fn phase(&self) -> Phase {
        Phase::Build
    }

    #[instrument(skip_all, fields(slug = %ctx.state.subject_slug))]
    fn execute(&self, ctx: &PhaseContext<'_>) -> Result<PhaseArtifact> {
        let spec = ctx
            .state
            .specification
            .as_ref()
            .ok_or(WorkflowError::MissingPrerequisite {
                phase: Phase::Build,
                missing: "an approved specification",
            })?;
        let location = ctx.state.output_location.clone();

        if ctx.store.has_entries(&location)? {
            match ctx.config.existing_output {
                ExistingOutput::Reject => {
                    return Err(WorkflowError::OutputExists { path: location }.into());
                }
                ExistingOutput::Overwrite => {
                    warn!(path = %location.display(), "output location not empty, overwriting");
                }
            }
        }

        let files = package_files(ctx, spec)?;
        let written = write_tree(ctx.store, &location, &files)
            .with_context(|| format!("build agent package at {}", location.display()))?;

        info!(path = %location.display(), files = written.len(), "build complete");
        Ok(PhaseArtifact::Build(BuildOutput {
            location,
            files: written,
        }))
    }
}

fn package_files(ctx: &PhaseContext<'_>, spec: &Specification) -> Result<Vec<(PathBuf, String)>> {
    let agent_config = json!({
        "name": spec.persona.name,
        "vertical": ctx.state.subject_slug,
        "model": ctx.config.generation_model_id,
        "companyName": placeholder(COMPANY_NAME_VAR),
        "promptEngine": spec.prompt_engine,
        "workflow": spec.workflow.name,
        "escalationTriggers": spec.escalation_triggers,
    });
    let tools: Vec<serde_json::Value> = spec.tools.iter().map(ToolDescriptor::to_mcp).collect();

    Ok(vec![
        (PathBuf::from("README.md"), readme(&ctx.state.subject_name, spec)),
        (
            PathBuf::from("src/agent/system-prompt.xml"),
            spec.system_prompt.clone(),
        ),
        (PathBuf::from("src/agent/config.json"), pretty_json(&agent_config)?),
        (PathBuf::from("src/agent/tools/tools.json"), pretty_json(&tools)?),
        (
            PathBuf::from("src/agent/onboarding/states.json"),
            pretty_json(&spec.states)?,
        ),
        (PathBuf::from("VERTICAL.md"), spec.vertical_spec.clone()),
        (
            PathBuf::from("package.json"),
            package_json(&ctx.state.subject_slug)?,
        ),
        (
            PathBuf::from(".env.example"),
            env_example(&ctx.config.generation_model_id),
        ),
        (
            PathBuf::from("supabase/migrations/0001_intake.sql"),
            INTAKE_MIGRATION.to_string(),
        ),
    ])
}

const INTAKE_MIGRATION: &str = "\
create table if not exists intake_records (
  id uuid primary key default gen_random_uuid(),
  user_id text,
  stage text not null,
  data jsonb not null default '{}'::jsonb,
  created_at timestamptz not null default now()
);

create table if not exists followups (
  id uuid primary key default gen_random_uuid(),
  user_id text,
  action text not null,
  due text not null,
  created_at timestamptz not null default now()
);
";

fn package_json(slug: &str) -> Result<String> {
    pretty_json(&json!({
        "name": format!("{slug}-agent"),
        "version": "0.1.0",
        "private": true,
        "scripts": {
            "dev": "next dev",
            "build": "next build",
            "start": "next start",
        },
        "dependencies": {
            "next": "^14.2.0",
            "react": "^18.3.0",
            "react-dom": "^18.3.0",
        },
        "devDependencies": {
            "@types/node": "^20.12.0",
            "@types/react": "^18.3.0",
            "supabase": "^1.200.0",
            "typescript": "^5.4.0",
        },
    }))
}

fn env_example(model: &str) -> String {
    format!(
        "NEXT_PUBLIC_APP_URL=http://localhost:3000\n\
         NEXT_PUBLIC_SUPABASE_URL=\n\
         NEXT_PUBLIC_SUPABASE_ANON_KEY=\n\
         ANTHROPIC_API_KEY=\n\
         GENERATION_MODEL={model}\n"
    )
}

fn readme(vertical_name: &str, spec: &Specification) -> String {
    let tools = spec
        .tools
        .iter()
        .map(|tool| format!("- `{}`: {}", tool.name, tool.description))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "# {vertical_name} Agent\n\n\
         {persona}: {essence}\n\n\
         Automates **{workflow}**.\n\n\
         ## Layout\n\n\
         - `src/agent/system-prompt.xml`: dual-mode system prompt\n\
         - `src/agent/config.json`: agent settings\n\
         - `src/agent/tools/tools.json`: MCP tool definitions\n\
         - `src/agent/onboarding/states.json`: onboarding state graph\n\
         - `VERTICAL.md`: vertical specification\n\
         - `supabase/migrations/`: intake and follow-up tables\n\n\
         ## Tools\n\n\
         {tools}\n\n\
         Replace `{company}` in the system prompt with the deploying company's name.\n",
        persona = spec.persona.name,
        essence = spec.persona.essence,
        workflow = spec.workflow.name,
        company = placeholder(COMPANY_NAME_VAR),
    )
}
