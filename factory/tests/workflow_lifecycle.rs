//! End-to-end workflow tests against the filesystem store.
//!
//! Drives the orchestrator through every phase with the default research
//! provider and checks gate behavior, phase ordering and the files written.

use std::fs;
use std::path::Path;

use factory::core::error::WorkflowError;
use factory::core::state_graph::TERMINAL_MARKER;
use factory::core::types::{Phase, PhaseArtifact};
use factory::io::config::{ExistingOutput, FactoryConfig};
use factory::io::store::FsArtifactStore;
use factory::orchestrator::{Orchestrator, WorkflowStatus};
use factory::phases::PhaseHandlers;
use factory::test_support::ScriptedResearch;

fn config(root: &Path) -> FactoryConfig {
    FactoryConfig {
        output_directory: root.join("agents"),
        artifacts_directory: root.join("verticals"),
        playbooks_directory: root.join("playbooks"),
        ..FactoryConfig::default()
    }
}

fn fs_orchestrator(config: FactoryConfig) -> Orchestrator<FsArtifactStore> {
    Orchestrator::new(config, PhaseHandlers::default(), FsArtifactStore)
}

fn workflow_error(err: &anyhow::Error) -> &WorkflowError {
    err.downcast_ref::<WorkflowError>()
        .expect("expected a workflow error")
}

#[test]
fn veterinary_clinics_end_to_end() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut orch = fs_orchestrator(config(temp.path()));

    let state = orch.start("Veterinary Clinics", None).expect("start");
    assert_eq!(state.subject_slug, "veterinary-clinics");

    let err = orch
        .approve(Phase::Specification, Some("anything"))
        .expect_err("approval before discovery");
    assert!(matches!(
        workflow_error(&err),
        WorkflowError::ApprovalWithoutArtifact { .. }
    ));

    let report = match orch.run_phase(Phase::Discovery).expect("discovery") {
        PhaseArtifact::Discovery(report) => report,
        other => panic!("unexpected artifact {other:?}"),
    };
    assert!(!report.workflow_options.is_empty());
    let chosen = report.auto_selection().expect("option").name.clone();

    orch.approve(Phase::Specification, Some(&chosen))
        .expect("approve specification");
    assert_eq!(orch.current_phase(), Some(Phase::Specification));

    let spec = match orch.run_phase(Phase::Specification).expect("specification") {
        PhaseArtifact::Specification(spec) => spec,
        other => panic!("unexpected artifact {other:?}"),
    };
    assert!(!spec.tools.is_empty());
    assert_eq!(spec.states.last().map(|s| s.name.as_str()), Some("complete"));
    assert_eq!(spec.system_prompt.matches(TERMINAL_MARKER).count(), 1);
    assert!(spec.system_prompt.contains("Veterinary Clinics Assistant"));
    assert!(spec.system_prompt.contains("Symptoms suggest medical emergency"));
    assert!(spec.system_prompt.contains("{{COMPANY_NAME}}"));
    assert!(spec.template_anomalies.is_empty(), "{:?}", spec.template_anomalies);
    assert!(spec.vertical_spec.contains("vertical: veterinary-clinics"));

    orch.approve(Phase::Build, None).expect("approve build");
    let build = match orch.run_phase(Phase::Build).expect("build") {
        PhaseArtifact::Build(build) => build,
        other => panic!("unexpected artifact {other:?}"),
    };
    assert_eq!(build.location, temp.path().join("agents").join("veterinary-clinics"));
    for file in &build.files {
        assert!(build.location.join(file).is_file(), "{}", file.display());
    }
    let prompt = fs::read_to_string(build.location.join("src/agent/system-prompt.xml"))
        .expect("prompt");
    assert_eq!(prompt, spec.system_prompt);

    let delivery = match orch.run_phase(Phase::Delivery).expect("delivery") {
        PhaseArtifact::Delivery(summary) => summary,
        other => panic!("unexpected artifact {other:?}"),
    };
    assert_eq!(delivery.next_steps.len(), 9);
    for file in delivery.all_files() {
        assert!(build.location.join(file).is_file(), "{}", file.display());
    }
    assert_eq!(orch.current_phase(), Some(Phase::Complete));
}

/// A single call made against the orchestrator.
#[derive(Debug, Clone, Copy)]
enum Call {
    Run(Phase),
    Approve(Phase, Option<&'static str>),
}

#[test]
fn observed_phases_never_decrease() {
    let mut orch = factory::test_support::orchestrator(ScriptedResearch::default());
    orch.start("Dental", None).expect("start");

    let calls = [
        Call::Run(Phase::Build),
        Call::Run(Phase::Discovery),
        Call::Approve(Phase::Build, None),
        Call::Approve(Phase::Specification, Some("Intake")),
        Call::Run(Phase::Discovery),
        Call::Run(Phase::Specification),
        Call::Approve(Phase::Build, None),
        Call::Run(Phase::Delivery),
        Call::Run(Phase::Build),
        Call::Run(Phase::Delivery),
        Call::Run(Phase::Delivery),
    ];
    let mut observed = vec![orch.current_phase().expect("phase")];
    for call in calls {
        // Failures are expected for some calls; only the phase matters here.
        let _ = match call {
            Call::Run(phase) => orch.run_phase(phase).map(drop),
            Call::Approve(phase, selection) => orch.approve(phase, selection).map(drop),
        };
        observed.push(orch.current_phase().expect("phase"));
    }

    assert!(observed.windows(2).all(|pair| pair[0] <= pair[1]), "{observed:?}");
    assert_eq!(observed.last(), Some(&Phase::Complete));
}

#[test]
fn premature_approval_is_repeatable_and_mutates_nothing() {
    let mut orch = factory::test_support::orchestrator(ScriptedResearch::default());
    orch.start("Veterinary Clinics", None).expect("start");
    let before = serde_json::to_string(orch.state().expect("state")).expect("json");

    let first = orch
        .approve(Phase::Specification, Some("Intake"))
        .expect_err("first");
    let second = orch
        .approve(Phase::Specification, Some("Intake"))
        .expect_err("second");

    assert_eq!(workflow_error(&first), workflow_error(&second));
    assert_eq!(first.to_string(), second.to_string());
    let after = serde_json::to_string(orch.state().expect("state")).expect("json");
    assert_eq!(before, after);
}

#[test]
fn full_workflow_with_auto_approve_writes_package() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out = temp.path().join("custom-out");
    let mut orch = fs_orchestrator(config(temp.path()));

    let outcome = orch
        .run_full_workflow("Personal Injury Law!", Some(&out), true)
        .expect("workflow");

    assert_eq!(outcome.status, WorkflowStatus::Complete);
    let phases: Vec<Phase> = outcome.results.iter().map(|r| r.phase).collect();
    assert_eq!(
        phases,
        vec![Phase::Discovery, Phase::Specification, Phase::Build, Phase::Delivery]
    );
    assert!(out.join("README.md").is_file());
    assert!(out.join("vercel.json").is_file());
    assert!(out.join("public/robots.txt").is_file());
    let state = orch.state().expect("state");
    assert_eq!(state.subject_slug, "personal-injury-law");
    assert!(state.delivery.is_some());
}

#[test]
fn next_steps_refer_to_files_in_the_package() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out = temp.path().join("vet");
    let mut orch = fs_orchestrator(config(temp.path()));
    let outcome = orch
        .run_full_workflow("Veterinary Clinics", Some(&out), true)
        .expect("workflow");
    assert_eq!(outcome.status, WorkflowStatus::Complete);

    let steps = &orch
        .state()
        .and_then(|s| s.delivery.as_ref())
        .expect("delivery")
        .next_steps;
    let referenced = [
        ("npm install", "package.json"),
        (".env.example", ".env.example"),
        ("supabase db push", "supabase/migrations/0001_intake.sql"),
        ("/chat", "src/app/chat/page.tsx"),
        ("/admin", "src/app/admin/page.tsx"),
        ("vercel", "vercel.json"),
    ];
    for (needle, file) in referenced {
        assert!(steps.iter().any(|step| step.contains(needle)), "{needle}");
        assert!(out.join(file).is_file(), "{file}");
    }

    let package: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("package.json")).expect("read"))
            .expect("json");
    assert_eq!(package["name"], "veterinary-clinics-agent");
    for page in ["src/app/admin/page.tsx", "src/app/chat/page.tsx", "src/app/page.tsx"] {
        let source = fs::read_to_string(out.join(page)).expect("read");
        assert!(!source.contains("@/"), "{page} imports a missing alias");
    }
}

#[test]
fn save_artifacts_writes_reference_copies() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cfg = FactoryConfig {
        save_artifacts: true,
        ..config(temp.path())
    };
    let mut orch = fs_orchestrator(cfg);
    orch.run_full_workflow("Auto Repair", None, true)
        .expect("workflow");

    let dir = temp.path().join("verticals").join("auto-repair");
    for name in ["VERTICAL.md", "system-prompt.xml", "tools/tools.json", "onboarding/flow.json"] {
        assert!(dir.join(name).is_file(), "{name}");
    }
    let tools: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("tools/tools.json")).expect("read"))
            .expect("json");
    assert_eq!(tools[0]["name"], "save_intake_data");
    let spec = orch
        .state()
        .and_then(|s| s.specification.as_ref())
        .expect("spec");
    assert_eq!(spec.artifacts_path.as_deref(), Some(dir.as_path()));
}

#[test]
fn earlier_specification_raises_discovery_confidence() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cfg = FactoryConfig {
        save_artifacts: true,
        ..config(temp.path())
    };
    let mut first = fs_orchestrator(cfg.clone());
    first
        .run_full_workflow("Dental", Some(&temp.path().join("one")), true)
        .expect("first run");

    let mut second = fs_orchestrator(cfg);
    second.start("Dental", Some(&temp.path().join("two"))).expect("start");
    let report = match second.run_phase(Phase::Discovery).expect("discovery") {
        PhaseArtifact::Discovery(report) => report,
        other => panic!("unexpected artifact {other:?}"),
    };
    assert_eq!(report.confidence.to_string(), "high");
    assert!(report.playbook_reference.is_some());
}

#[test]
fn playbook_with_matching_stem_raises_discovery_confidence() {
    let temp = tempfile::tempdir().expect("tempdir");
    let playbooks = temp.path().join("playbooks");
    fs::create_dir_all(&playbooks).expect("mkdir");
    fs::write(playbooks.join("Dental-Industry-Notes.md"), "# Dental").expect("write");
    fs::write(playbooks.join("dental.txt"), "ignored").expect("write");

    let mut orch = fs_orchestrator(config(temp.path()));
    orch.start("Dental", None).expect("start");
    let report = match orch.run_phase(Phase::Discovery).expect("discovery") {
        PhaseArtifact::Discovery(report) => report,
        other => panic!("unexpected artifact {other:?}"),
    };
    assert_eq!(report.confidence.to_string(), "high");
    let expected = playbooks.join("Dental-Industry-Notes.md");
    assert_eq!(
        report.playbook_reference.as_deref(),
        Some(expected.display().to_string().as_str())
    );
}

#[test]
fn reject_policy_refuses_non_empty_output() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out = temp.path().join("occupied");
    fs::create_dir_all(&out).expect("mkdir");
    fs::write(out.join("keep.txt"), "mine").expect("write");

    let cfg = FactoryConfig {
        existing_output: ExistingOutput::Reject,
        ..config(temp.path())
    };
    let mut orch = fs_orchestrator(cfg);
    let err = orch
        .run_full_workflow("Dental", Some(&out), true)
        .expect_err("occupied");
    assert_eq!(
        workflow_error(&err),
        &WorkflowError::OutputExists { path: out.clone() }
    );
    assert_eq!(orch.current_phase(), Some(Phase::Build));
    assert_eq!(fs::read_to_string(out.join("keep.txt")).expect("read"), "mine");
    assert!(!out.join("README.md").exists());
}

#[test]
fn overwrite_policy_writes_into_non_empty_output() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out = temp.path().join("occupied");
    fs::create_dir_all(&out).expect("mkdir");
    fs::write(out.join("README.md"), "old").expect("write");

    let mut orch = fs_orchestrator(config(temp.path()));
    orch.run_full_workflow("Dental", Some(&out), true)
        .expect("workflow");
    let readme = fs::read_to_string(out.join("README.md")).expect("read");
    assert!(readme.starts_with("# Dental Agent"));
}
