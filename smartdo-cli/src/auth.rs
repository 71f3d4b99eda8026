use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};

use crate::llm::Provider;
use crate::state::ensure_smartdo_home;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthState {
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
}

impl AuthState {
    fn slot(&mut self, provider: Provider) -> &mut Option<String> {
        match provider {
            Provider::Gemini => &mut self.gemini_api_key,
            Provider::OpenAI => &mut self.openai_api_key,
            Provider::Anthropic => &mut self.anthropic_api_key,
        }
    }

    fn stored(&self, provider: Provider) -> Option<&String> {
        match provider {
            Provider::Gemini => self.gemini_api_key.as_ref(),
            Provider::OpenAI => self.openai_api_key.as_ref(),
            Provider::Anthropic => self.anthropic_api_key.as_ref(),
        }
    }
}

fn auth_path() -> Result<std::path::PathBuf> {
    Ok(ensure_smartdo_home()?.join("auth.json"))
}

pub fn load_auth() -> Result<AuthState> {
    let p = auth_path()?;
    if !p.exists() {
        return Ok(AuthState::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_auth(auth: &AuthState) -> Result<()> {
    let p = auth_path()?;
    let s = serde_json::to_string_pretty(auth)?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

/// Key for `provider`: the environment variable wins over auth.json.
pub fn api_key(provider: Provider) -> Result<Option<String>> {
    if let Ok(k) = std::env::var(provider.key_env_var()) {
        if !k.trim().is_empty() {
            return Ok(Some(k.trim().to_string()));
        }
    }
    Ok(load_auth()?.stored(provider).cloned())
}

fn prompt_secret(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

pub fn paste_key(provider: Provider) -> Result<()> {
    let key = prompt_secret(&format!("Paste {} API key", provider.label()))?;
    if key.is_empty() {
        bail!("no key entered");
    }
    if let Some(prefix) = provider.key_prefix() {
        if !key.starts_with(prefix) {
            bail!(
                "key didn't look like a {} key (expected prefix {prefix})",
                provider.label()
            );
        }
    }

    let mut auth = load_auth()?;
    *auth.slot(provider) = Some(key);
    save_auth(&auth)?;
    println!("Saved {} key to {}", provider.label(), auth_path()?.display());
    Ok(())
}
