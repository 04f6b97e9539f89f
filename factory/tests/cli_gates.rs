//! CLI tests for the gate-spanning commands.
//!
//! Spawns the factory binary in a temp directory and checks exit codes and
//! persisted run state across separate invocations.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use factory::core::types::Phase;
use factory::exit_codes;
use factory::io::run_state::load_run_state;

fn factory(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_factory"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("spawn factory")
}

fn write_config(dir: &Path) {
    let state_dir = dir.join(".factory");
    fs::create_dir_all(&state_dir).expect("mkdir");
    let config = format!(
        "output_directory = {:?}\nartifacts_directory = {:?}\nplaybooks_directory = {:?}\n",
        dir.join("agents").display().to_string(),
        dir.join("verticals").display().to_string(),
        dir.join("playbooks").display().to_string(),
    );
    fs::write(state_dir.join("config.toml"), config).expect("write config");
}

#[test]
fn gated_run_spans_invocations() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_config(temp.path());

    let start = factory(temp.path(), &["start", "Veterinary Clinics"]);
    assert_eq!(start.status.code(), Some(exit_codes::OK));
    assert_eq!(String::from_utf8_lossy(&start.stdout).trim(), "veterinary-clinics");

    let early = factory(temp.path(), &["approve", "specification", "--select", "x"]);
    assert_eq!(early.status.code(), Some(exit_codes::INVALID));

    let discovery = factory(temp.path(), &["run"]);
    assert_eq!(discovery.status.code(), Some(exit_codes::AWAITING_APPROVAL));

    let state_path = temp.path().join(".factory/run_state.json");
    let state = load_run_state(&state_path).expect("state");
    assert_eq!(state.awaiting_approval(), Some(Phase::Specification));
    let choice = state
        .discovery_report
        .as_ref()
        .and_then(|report| report.auto_selection())
        .map(|option| option.name.clone())
        .expect("option");

    let approve = factory(temp.path(), &["approve", "specification", "--select", &choice]);
    assert_eq!(approve.status.code(), Some(exit_codes::OK));

    let status = factory(temp.path(), &["status"]);
    assert_eq!(status.status.code(), Some(exit_codes::OK));
    let report: serde_json::Value = serde_json::from_slice(&status.stdout).expect("json");
    assert_eq!(report["current_phase"], "specification");
}

#[test]
fn auto_stops_at_first_gate_without_approval() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_config(temp.path());

    let output = factory(temp.path(), &["auto", "Dental"]);
    assert_eq!(output.status.code(), Some(exit_codes::AWAITING_APPROVAL));
    let state = load_run_state(&temp.path().join(".factory/run_state.json")).expect("state");
    assert_eq!(state.current_phase, Phase::Discovery);
    assert!(state.discovery_report.is_some());
}

#[test]
fn auto_approve_completes_the_run() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_config(temp.path());

    let output = factory(temp.path(), &["auto", "Dental", "--auto-approve"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(temp.path().join("agents/dental/README.md").is_file());
    let state = load_run_state(&temp.path().join(".factory/run_state.json")).expect("state");
    assert_eq!(state.current_phase, Phase::Complete);
}

#[test]
fn commands_without_a_run_are_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = factory(temp.path(), &["run"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("factory start"), "{stderr}");
}
