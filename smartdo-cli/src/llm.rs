use anyhow::{Context, Result, anyhow, bail};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use smartdo_core::{parse_subtask_lines, subtask_prompt};
use std::time::Duration;

use crate::auth;
use crate::config::Config;

/// Shown to the user whenever generation fails, whatever the cause.
pub const EXPAND_FAILED: &str = "Could not generate subtasks. Check llm.model in ~/.smartdo/config.toml and your API key (smartdo auth --help).";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    #[serde(rename = "openai")]
    OpenAI,
    Anthropic,
}

impl Provider {
    pub fn label(self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::OpenAI => "OpenAI",
            Provider::Anthropic => "Anthropic",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Gemini => "https://generativelanguage.googleapis.com",
            Provider::OpenAI => "https://api.openai.com",
            Provider::Anthropic => "https://api.anthropic.com",
        }
    }

    pub fn key_env_var(self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn key_prefix(self) -> Option<&'static str> {
        match self {
            Provider::Gemini => None,
            Provider::OpenAI => Some("sk-"),
            Provider::Anthropic => Some("sk-ant-"),
        }
    }
}

/// Outcome of one generation request. Never an error: failures become an
/// empty list plus a message for the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Suggestions {
    pub subtasks: Vec<String>,
    pub error: Option<String>,
}

pub async fn suggest_subtasks(cfg: &Config, title: &str) -> Suggestions {
    match try_suggest(cfg, title).await {
        Ok(subtasks) => {
            tracing::info!(count = subtasks.len(), "subtasks generated");
            Suggestions {
                subtasks,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "subtask generation failed");
            Suggestions {
                subtasks: vec![],
                error: Some(EXPAND_FAILED.to_string()),
            }
        }
    }
}

async fn try_suggest(cfg: &Config, title: &str) -> Result<Vec<String>> {
    let provider = cfg.llm.provider;
    let key = auth::api_key(provider)?.ok_or_else(|| {
        anyhow!(
            "missing {} key; set {} or run: smartdo auth paste-{}-api-key",
            provider.label(),
            provider.key_env_var(),
            provider.label().to_lowercase()
        )
    })?;

    let prompt = subtask_prompt(title, cfg.expand.subtask_count);
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.llm.timeout_secs))
        .build()
        .context("build http client")?;

    tracing::debug!(provider = provider.label(), model = %cfg.llm.model, "requesting subtasks");
    let reply = match provider {
        Provider::Gemini => gemini_complete(&client, cfg, &key, &prompt).await?,
        Provider::OpenAI => openai_complete(&client, cfg, &key, &prompt).await?,
        Provider::Anthropic => anthropic_complete(&client, cfg, &key, &prompt).await?,
    };

    parse_subtask_lines(&reply)
}

async fn gemini_complete(
    client: &reqwest::Client,
    cfg: &Config,
    key: &str,
    prompt: &str,
) -> Result<String> {
    #[derive(Serialize)]
    struct Part<'a> {
        text: &'a str,
    }

    #[derive(Serialize)]
    struct Content<'a> {
        parts: Vec<Part<'a>>,
    }

    #[derive(Serialize)]
    struct GenConfig {
        temperature: f32,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Req<'a> {
        contents: Vec<Content<'a>>,
        generation_config: GenConfig,
    }

    #[derive(Deserialize)]
    struct Resp {
        #[serde(default)]
        candidates: Vec<Candidate>,
    }

    #[derive(Deserialize)]
    struct Candidate {
        content: Option<CandidateContent>,
    }

    #[derive(Deserialize)]
    struct CandidateContent {
        #[serde(default)]
        parts: Vec<PartOut>,
    }

    #[derive(Deserialize)]
    struct PartOut {
        text: Option<String>,
    }

    let body = Req {
        contents: vec![Content {
            parts: vec![Part { text: prompt }],
        }],
        generation_config: GenConfig {
            temperature: cfg.llm.temperature,
        },
    };

    let url = format!(
        "{}/v1beta/models/{}:generateContent",
        cfg.llm.base_url(),
        cfg.llm.model
    );
    let resp = client
        .post(url)
        .header("x-goog-api-key", key)
        .json(&body)
        .send()
        .await
        .context("gemini request")?;

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        bail!("gemini error: {status} {txt}");
    }

    let out: Resp = resp.json().await.context("parse gemini response")?;
    let mut s = String::new();
    for part in out
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default()
    {
        if let Some(t) = part.text {
            s.push_str(&t);
        }
    }
    Ok(s.trim().to_string())
}

async fn openai_complete(
    client: &reqwest::Client,
    cfg: &Config,
    key: &str,
    prompt: &str,
) -> Result<String> {
    #[derive(Serialize)]
    struct Msg<'a> {
        role: &'a str,
        content: &'a str,
    }

    #[derive(Serialize)]
    struct Req<'a> {
        model: &'a str,
        messages: Vec<Msg<'a>>,
        temperature: f32,
    }

    #[derive(Deserialize)]
    struct Resp {
        choices: Vec<Choice>,
    }

    #[derive(Deserialize)]
    struct Choice {
        message: MsgOut,
    }

    #[derive(Deserialize)]
    struct MsgOut {
        content: Option<String>,
    }

    let body = Req {
        model: &cfg.llm.model,
        messages: vec![Msg {
            role: "user",
            content: prompt,
        }],
        temperature: cfg.llm.temperature,
    };

    let resp = client
        .post(format!("{}/v1/chat/completions", cfg.llm.base_url()))
        .bearer_auth(key)
        .json(&body)
        .send()
        .await
        .context("openai request")?;

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        bail!("openai error: {status} {txt}");
    }

    let out: Resp = resp.json().await.context("parse openai response")?;
    let content = out
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default();

    Ok(content.trim().to_string())
}

async fn anthropic_complete(
    client: &reqwest::Client,
    cfg: &Config,
    key: &str,
    prompt: &str,
) -> Result<String> {
    #[derive(Serialize)]
    struct Msg<'a> {
        role: &'a str,
        content: &'a str,
    }

    #[derive(Serialize)]
    struct Req<'a> {
        model: &'a str,
        max_tokens: i32,
        temperature: f32,
        messages: Vec<Msg<'a>>,
    }

    #[derive(Deserialize)]
    struct Resp {
        content: Vec<ContentBlock>,
    }

    #[derive(Deserialize)]
    struct ContentBlock {
        #[serde(rename = "type")]
        t: String,
        text: Option<String>,
    }

    let body = Req {
        model: &cfg.llm.model,
        max_tokens: 450,
        temperature: cfg.llm.temperature,
        messages: vec![Msg {
            role: "user",
            content: prompt,
        }],
    };

    let mut headers = HeaderMap::new();
    headers.insert("x-api-key", HeaderValue::from_str(key)?);
    headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let resp = client
        .post(format!("{}/v1/messages", cfg.llm.base_url()))
        .headers(headers)
        .json(&body)
        .send()
        .await
        .context("anthropic request")?;

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        bail!("anthropic error: {status} {txt}");
    }

    let out: Resp = resp.json().await.context("parse anthropic response")?;
    let mut s = String::new();
    for b in out.content {
        if b.t == "text" {
            if let Some(t) = b.text {
                s.push_str(&t);
            }
        }
    }
    Ok(s.trim().to_string())
}
