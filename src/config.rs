use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use redraft::guardrail::{DEFAULT_GUARDRAIL_SYSTEM, DEFAULT_REFUSAL};
use redraft::llm::AnthropicConfig;
use redraft::llm::anthropic::{ANTHROPIC_API_URL, DEFAULT_API_KEY_ENV, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use redraft::prompt::RevisionPrompts;
use redraft::revision::{DEFAULT_ROUNDS, RevisionConfig};
use redraft::server::{DEFAULT_CHANNEL_CAPACITY, ServerConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    pub revision: RevisionSection,
    pub prompts: RevisionPrompts,
    pub server: ServerSection,
    pub guardrail: GuardrailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    pub api_key_env: String,
    pub base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_ms: 300000,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }
}

impl LlmConfig {
    pub fn to_anthropic(&self) -> AnthropicConfig {
        AnthropicConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            timeout: Duration::from_millis(self.timeout_ms),
            base_url: self.base_url.clone(),
            api_key_env: self.api_key_env.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevisionSection {
    pub rounds: u32,
    pub channel_capacity: usize,
}

impl Default for RevisionSection {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl RevisionSection {
    pub fn to_revision_config(&self) -> RevisionConfig {
        RevisionConfig {
            rounds: self.rounds,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind_addr: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            bind_addr: defaults.bind_addr,
            port: defaults.port,
        }
    }
}

impl ServerSection {
    pub fn to_server_config(&self, port_override: Option<u16>) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind_addr.clone(),
            port: port_override.unwrap_or(self.port),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    pub enabled: bool,
    pub system_prompt: String,
    pub refusal: String,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            system_prompt: DEFAULT_GUARDRAIL_SYSTEM.to_string(),
            refusal: DEFAULT_REFUSAL.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            llm: LlmConfig::default(),
            revision: RevisionSection::default(),
            prompts: RevisionPrompts::default(),
            server: ServerSection::default(),
            guardrail: GuardrailConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");

        // Try primary location: ~/.config/<project>/<project>.yml
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

        // Try fallback location: ./<project>.yml
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
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.revision.rounds == 0 {
            bail!("revision.rounds must be at least 1");
        }
        if self.revision.channel_capacity == 0 {
            bail!("revision.channel_capacity must be at least 1");
        }
        Ok(())
    }
}
