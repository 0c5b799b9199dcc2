//! `aigov.toml` configuration.
//!
//! Precedence, lowest to highest: built-in defaults, the TOML file,
//! `AIGOV_*` environment variables, command-line flags.
//!
//! ```toml
//! docs_dir = "docs"
//! system = "aigov_poc"
//! mode = "ci"
//! policy_file = "policies/governance.toml"
//! policy_version = "v0.4_human_approval"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use aigov_contracts::{
    error::{AigovError, AigovResult},
    layout::ArtifactLayout,
    mode::ExecutionMode,
};
use aigov_policy::TomlPolicy;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "aigov.toml";

pub const DEFAULT_DOCS_DIR: &str = "docs";
pub const DEFAULT_SYSTEM: &str = "aigov_poc";

/// Fields as written in the file; everything optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    docs_dir: Option<PathBuf>,
    system: Option<String>,
    mode: Option<ExecutionMode>,
    policy_file: Option<PathBuf>,
    policy_version: Option<String>,
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AigovConfig {
    pub docs_dir: PathBuf,
    /// Default `system` for emitted events.
    pub system: String,
    pub mode: ExecutionMode,
    /// Custom policy rules; the built-in policy when `None`.
    pub policy_file: Option<PathBuf>,
    /// Stamped onto newly created evidence logs.
    pub policy_version: Option<String>,
}

impl Default for AigovConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from(DEFAULT_DOCS_DIR),
            system: DEFAULT_SYSTEM.to_string(),
            mode: ExecutionMode::default(),
            policy_file: None,
            policy_version: None,
        }
    }
}

impl AigovConfig {
    /// Load configuration from `path`, or from `aigov.toml` in the working
    /// directory when it exists, then apply the process environment.
    ///
    /// An explicit `path` that cannot be read is an error; a missing default
    /// file is not.
    pub fn load(path: Option<&Path>) -> AigovResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> AigovResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AigovError::ConfigError {
            reason: format!("failed to read config file '{}': {e}", path.display()),
        })?;
        debug!(path = %path.display(), "loading configuration");
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(s: &str) -> AigovResult<Self> {
        let file: FileConfig = toml::from_str(s).map_err(|e| AigovError::ConfigError {
            reason: format!("failed to parse config TOML: {e}"),
        })?;
        let defaults = Self::default();
        Ok(Self {
            docs_dir: file.docs_dir.unwrap_or(defaults.docs_dir),
            system: file.system.unwrap_or(defaults.system),
            mode: file.mode.unwrap_or(defaults.mode),
            policy_file: file.policy_file,
            policy_version: file.policy_version,
        })
    }

    /// Apply `AIGOV_DOCS_DIR`, `AIGOV_SYSTEM`, `AIGOV_MODE` and
    /// `AIGOV_POLICY_VERSION` as returned by `lookup`. Blank values are
    /// ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> AigovResult<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("AIGOV_DOCS_DIR") {
            self.docs_dir = PathBuf::from(v);
        }
        if let Some(v) = get("AIGOV_SYSTEM") {
            self.system = v.trim().to_string();
        }
        if let Some(v) = get("AIGOV_MODE") {
            self.mode = v.parse()?;
        }
        if let Some(v) = get("AIGOV_POLICY_VERSION") {
            self.policy_version = Some(v.trim().to_string());
        }
        Ok(())
    }

    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(&self.docs_dir)
    }

    /// The configured policy file, or the built-in policy.
    pub fn policy(&self) -> AigovResult<TomlPolicy> {
        match &self.policy_file {
            Some(path) => TomlPolicy::from_file(path),
            None => TomlPolicy::builtin(),
        }
    }
}
