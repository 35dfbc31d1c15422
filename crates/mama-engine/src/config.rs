// mama/crates/mama-engine/src/config.rs

use anyhow::{Context, Result};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::context_engine::{LanguageCode, LanguagePolicy, SelectorConfig};
use crate::session::SessionStoreConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_host: IpAddr,
    pub api_port: u16,
    pub session_timeout_hours: i64,
    pub session_purge_interval_seconds: u64,
    pub session_cookie_name: String,
    pub default_language: LanguageCode,
    pub blocked_language: LanguageCode,
    pub language_policy: LanguagePolicy,
    pub followup_context_chars: usize,
    pub history_window_turns: usize,
    pub language_sample_chars: usize,
    pub summarizer_url: String,
    pub summarizer_model: String,
    /// Credential service answering login attempts; logins are refused when unset
    pub auth_validator_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("Failed to load .env file: {}. Using system environment variables.", e);
        } else {
            info!("Loaded environment variables from .env file");
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; missing keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let default_language = LanguageCode::parse(&var("DEFAULT_LANGUAGE", "en"))
            .context("DEFAULT_LANGUAGE is not a valid language code")?;
        let blocked_language = LanguageCode::parse(&var("BLOCKED_LANGUAGE", "id"))
            .context("BLOCKED_LANGUAGE is not a valid language code")?;
        if default_language == blocked_language {
            anyhow::bail!("DEFAULT_LANGUAGE and BLOCKED_LANGUAGE are both {}", default_language);
        }

        let language_policy = LanguagePolicy::from_str(&var("LANGUAGE_POLICY", "lock"))
            .map_err(anyhow::Error::msg)
            .context("Invalid LANGUAGE_POLICY")?;

        let session_timeout_hours: i64 = parse_var(&var, "SESSION_TIMEOUT_HOURS", "24")?;
        if session_timeout_hours <= 0 {
            anyhow::bail!("SESSION_TIMEOUT_HOURS must be positive, got {}", session_timeout_hours);
        }
        let session_purge_interval_seconds: u64 = parse_var(&var, "SESSION_PURGE_INTERVAL_SECONDS", "300")?;
        if session_purge_interval_seconds == 0 {
            anyhow::bail!("SESSION_PURGE_INTERVAL_SECONDS must be positive");
        }

        let session_cookie_name = var("SESSION_COOKIE_NAME", "session_id");
        if session_cookie_name.is_empty()
            || !session_cookie_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            anyhow::bail!("SESSION_COOKIE_NAME {:?} is not a valid cookie name", session_cookie_name);
        }

        let config = Self {
            api_host: parse_var(&var, "API_HOST", "127.0.0.1")?,
            api_port: parse_var(&var, "API_PORT", "8000")?,
            session_timeout_hours,
            session_purge_interval_seconds,
            session_cookie_name,
            default_language,
            blocked_language,
            language_policy,
            followup_context_chars: parse_var(&var, "FOLLOWUP_CONTEXT_CHARS", "300")?,
            history_window_turns: parse_var(&var, "HISTORY_WINDOW_TURNS", "10")?,
            language_sample_chars: parse_var(&var, "LANGUAGE_SAMPLE_CHARS", "100")?,
            summarizer_url: var("SUMMARIZER_URL", "http://127.0.0.1:8081"),
            summarizer_model: var("SUMMARIZER_MODEL", "local-llm"),
            auth_validator_url: lookup("AUTH_VALIDATOR_URL")
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
        };

        info!(
            "Language configuration: default {}, blocked {}, policy {:?}",
            config.default_language, config.blocked_language, config.language_policy
        );
        Ok(config)
    }

    pub fn selector_config(&self) -> SelectorConfig {
        SelectorConfig {
            default_language: self.default_language.clone(),
            blocked_language: self.blocked_language.clone(),
            language_policy: self.language_policy,
            followup_context_chars: self.followup_context_chars,
            history_window_turns: self.history_window_turns,
            language_sample_chars: self.language_sample_chars,
        }
    }

    pub fn session_config(&self) -> SessionStoreConfig {
        SessionStoreConfig::with_timeout_hours(self.session_timeout_hours)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.session_purge_interval_seconds)
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- API: {}", self.api_addr());
        info!("- Session Timeout: {}h", self.session_timeout_hours);
        info!("- Session Purge Interval: {}s", self.session_purge_interval_seconds);
        info!("- Session Cookie: {}", self.session_cookie_name);
        info!("- Default Language: {}", self.default_language);
        info!("- Blocked Language: {}", self.blocked_language);
        info!("- Language Policy: {:?}", self.language_policy);
        info!("- Follow-up Context: {} chars", self.followup_context_chars);
        info!("- History Window: {} turns", self.history_window_turns);
        info!("- Language Sample: {} chars", self.language_sample_chars);
        info!("- Summarizer: {} ({})", self.summarizer_url, self.summarizer_model);
        match &self.auth_validator_url {
            Some(url) => info!("- Credential Validator: {}", url),
            None => warn!("- Credential Validator: not configured, logins will be refused"),
        }
    }

    pub fn api_addr(&self) -> SocketAddr {
        SocketAddr::new(self.api_host, self.api_port)
    }
}

fn parse_var<T, V>(var: &V, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    V: Fn(&str, &str) -> String,
{
    let raw = var(key, default);
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: {:?}", key, raw))
}
