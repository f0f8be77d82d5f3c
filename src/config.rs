use eyre::{Context, Result};
use scaffoldr::llm::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use scaffoldr::orchestrator::PipelineConfig;
use scaffoldr::persist::DEFAULT_MANIFEST;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub catalogue: CatalogueConfig,
    pub intents: IntentsConfig,
    pub scaffold: ScaffoldConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_ms: 300000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogueConfig {
    /// Base URL of the best-practice catalogue; domain plans are disabled without it
    pub base_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 10000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentsConfig {
    /// Router endpoint receiving schema.synthesise / workflow.compose
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
}

impl Default for IntentsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: 10000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaffoldConfig {
    pub target_dir: PathBuf,
    pub baseline_dir: Option<PathBuf>,
    pub protected_manifest: String,
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from("scaffold"),
            baseline_dir: None,
            protected_manifest: DEFAULT_MANIFEST.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            llm: LlmConfig::default(),
            pipeline: PipelineConfig::default(),
            catalogue: CatalogueConfig::default(),
            intents: IntentsConfig::default(),
            scaffold: ScaffoldConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Primary location: ~/.config/<project>/<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}
