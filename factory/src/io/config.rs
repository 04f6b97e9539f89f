//! Factory configuration stored as TOML (default `.factory/config.toml`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What Build does when the output location already holds files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingOutput {
    /// Write over whatever is there.
    #[default]
    Overwrite,
    /// Fail with `OutputExists` before writing anything.
    Reject,
}

/// Factory configuration (TOML).
///
/// Loaded once per run. Missing fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FactoryConfig {
    /// Parent directory for generated agents. `~/` expands to the home dir.
    pub output_directory: PathBuf,
    /// Master template family used to render the system prompt.
    pub template_engine_id: String,
    pub generation_model_id: String,
    pub search_provider_id: String,
    /// When false, `factory auto` approves gates on its own.
    pub require_approval: bool,
    /// Also write specification artifacts under `artifacts_directory`.
    pub save_artifacts: bool,
    pub artifacts_directory: PathBuf,
    /// Directory searched for `<slug>.md` playbooks during discovery.
    pub playbooks_directory: PathBuf,
    pub existing_output: ExistingOutput,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("~/VerticalAgents"),
            template_engine_id: "dual-mode".to_string(),
            generation_model_id: "claude-sonnet-4-20250514".to_string(),
            search_provider_id: "exa".to_string(),
            require_approval: true,
            save_artifacts: false,
            artifacts_directory: PathBuf::from("verticals"),
            playbooks_directory: PathBuf::from("playbooks"),
            existing_output: ExistingOutput::default(),
        }
    }
}

impl FactoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_directory.as_os_str().is_empty() {
            return Err(anyhow!("output_directory must not be empty"));
        }
        if self.artifacts_directory.as_os_str().is_empty() {
            return Err(anyhow!("artifacts_directory must not be empty"));
        }
        for (key, value) in [
            ("template_engine_id", &self.template_engine_id),
            ("generation_model_id", &self.generation_model_id),
            ("search_provider_id", &self.search_provider_id),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("{key} must not be empty"));
            }
        }
        Ok(())
    }

    /// `output_directory` with a leading `~/` expanded.
    pub fn output_root(&self) -> PathBuf {
        expand_home(&self.output_directory)
    }

    /// `artifacts_directory` with a leading `~/` expanded.
    pub fn artifacts_root(&self) -> PathBuf {
        expand_home(&self.artifacts_directory)
    }

    pub fn playbooks_root(&self) -> PathBuf {
        expand_home(&self.playbooks_directory)
    }
}

/// Expand a leading `~` component against the home directory.
///
/// Paths without the prefix, or when no home directory is known, are returned
/// unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FactoryConfig::default()`.
pub fn load_config(path: &Path) -> Result<FactoryConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = FactoryConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FactoryConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &FactoryConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, FactoryConfig::default());
        assert!(cfg.require_approval);
        assert_eq!(cfg.existing_output, ExistingOutput::Overwrite);
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("config.toml");
        let cfg = FactoryConfig {
            save_artifacts: true,
            existing_output: ExistingOutput::Reject,
            ..FactoryConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "existing_output = \"reject\"\nsearch_provider_id = \"perplexity\"\n")
            .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.existing_output, ExistingOutput::Reject);
        assert_eq!(cfg.search_provider_id, "perplexity");
        assert_eq!(cfg.template_engine_id, "dual-mode");
    }

    #[test]
    fn empty_ids_are_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "generation_model_id = \"  \"\n").expect("write");
        let err = load_config(&path).expect_err("invalid");
        assert!(format!("{err:#}").contains("generation_model_id must not be empty"));
    }

    #[test]
    fn home_prefix_is_expanded() {
        let plain = Path::new("out/agents");
        assert_eq!(expand_home(plain), plain);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home(Path::new("~/VerticalAgents")),
                home.join("VerticalAgents")
            );
        }
    }
}
