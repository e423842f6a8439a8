//! Hierarchical configuration: CLI flags > `.coe/config.toml` (discovered
//! upward from cwd) > built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scoring weights for the opinion engine's dimensions. Must sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Weights {
    pub primary_namespaces_available: f64,
    pub secondary_namespaces_available: f64,
    pub domain_available: f64,
    pub no_close_collisions: f64,
    pub linguistic_cleanliness: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            primary_namespaces_available: 0.45,
            secondary_namespaces_available: 0.15,
            domain_available: 0.15,
            no_close_collisions: 0.15,
            linguistic_cleanliness: 0.10,
        }
    }
}

impl Weights {
    /// # Errors
    /// Returns an error if the weights do not sum to 1.0 within tolerance.
    pub fn validate(&self) -> Result<(), coe_error::CoeError> {
        let sum = self.primary_namespaces_available
            + self.secondary_namespaces_available
            + self.domain_available
            + self.no_close_collisions
            + self.linguistic_cleanliness;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(coe_error::CoeError::Config(format!(
                "scoring weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Which namespace adapters the run should exercise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdapterToggles {
    pub github_org: bool,
    pub github_repo: bool,
    pub npm: bool,
    pub pypi: bool,
    pub crates: bool,
    pub dockerhub: bool,
    pub huggingface_model: bool,
    pub huggingface_space: bool,
    pub domain: bool,
}

impl Default for AdapterToggles {
    fn default() -> Self {
        Self {
            github_org: true,
            github_repo: true,
            npm: true,
            pypi: true,
            crates: true,
            dockerhub: true,
            huggingface_model: true,
            huggingface_space: true,
            domain: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoeConfig {
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl_hours: u64,
    pub concurrency_limit: usize,
    pub timeout_seconds: u64,
    pub weights: Weights,
    pub tlds: Vec<String>,
    pub adapters: AdapterToggles,
}

impl Default for CoeConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            cache_ttl_hours: 168,
            concurrency_limit: 8,
            timeout_seconds: 10,
            weights: Weights::default(),
            tlds: vec!["com".into(), "org".into(), "io".into(), "dev".into()],
            adapters: AdapterToggles::default(),
        }
    }
}

impl CoeConfig {
    /// Loads defaults, then overlays `.coe/config.toml` discovered by walking
    /// upward from `start_dir`, if one exists. Missing file is not an error.
    ///
    /// # Errors
    /// Returns an error if a config file exists but fails to parse, or if
    /// its weights don't sum to 1.0.
    pub fn load(start_dir: &Path) -> Result<Self, coe_error::CoeError> {
        let mut config = Self::default();
        if let Some(path) = find_config_file(start_dir) {
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                coe_error::CoeError::Config(format!("reading {}: {e}", path.display()))
            })?;
            config = toml::from_str(&raw)
                .map_err(|e| coe_error::CoeError::Config(format!("parsing {}: {e}", path.display())))?;
        }
        config.weights.validate()?;
        Ok(config)
    }

    /// Resolves the effective cache directory: an explicit CLI flag wins,
    /// then `COE_CACHE_DIR`, then the config file's `cache_dir`; if none are
    /// set the cache is disabled (`None`).
    #[must_use]
    pub fn resolve_cache_dir(&self, cli_flag: Option<PathBuf>) -> Option<PathBuf> {
        cli_flag
            .or_else(|| std::env::var("COE_CACHE_DIR").ok().map(PathBuf::from))
            .or_else(|| self.cache_dir.clone())
    }
}

fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir.to_path_buf();
    loop {
        let candidate = dir.join(".coe").join("config.toml");
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}
