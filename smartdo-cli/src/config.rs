use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use smartdo_core::DEFAULT_SUBTASK_COUNT;
use std::fs;
use std::path::{Path, PathBuf};

use crate::llm::Provider;
use crate::state::ensure_smartdo_home;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub expand: ExpandSection,
    #[serde(default)]
    pub display: DisplaySection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub provider: Provider,
    pub model: String,
    /// Defaults to the provider's public endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub temperature: f32,
    /// Per-request timeout for the subtask call.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandSection {
    pub subtask_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    /// IANA name used when printing `createdAt`.
    pub timezone: String,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: Provider::Gemini,
            model: "gemini-2.5-flash".to_string(),
            base_url: None,
            temperature: 0.4,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmSection {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }
}

impl Default for ExpandSection {
    fn default() -> Self {
        Self {
            subtask_count: DEFAULT_SUBTASK_COUNT,
        }
    }
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            timezone: "America/Chicago".to_string(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_smartdo_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_at(&config_path()?)
}

pub fn load_config_at(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config() -> Result<()> {
    let p = config_path()?;
    let cfg = load_config_at(&p)?;
    println!("# {}{}", p.display(), if p.exists() { "" } else { " (defaults)" });
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    Ok(())
}
