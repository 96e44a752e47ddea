use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::extraction::{EstimatorKind, ExtractionMode, TokenBudget};
use crate::llm_client::{LlmProvider, LlmSettings, RetryPolicy};
use crate::models::resume::SchemaVariant;

/// 16 MiB upload ceiling.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
const DEFAULT_TOKEN_BUDGET: usize = 2000;
const DEFAULT_LLM_MAX_TOKENS: u32 = 4000;

/// Application configuration loaded from environment variables.
/// Read-only after startup; fails fast if a required variable is missing or invalid.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmSettings,
    pub token_budget: TokenBudget,
    pub token_estimator: EstimatorKind,
    pub extraction_mode: ExtractionMode,
    pub schema_variant: SchemaVariant,
    pub max_upload_bytes: usize,
    pub upload_dir: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env(&lookup);

        let provider: LlmProvider = env.parse_or("LLM_PROVIDER", LlmProvider::default())?;
        let max_attempts: u32 = env.parse_or("LLM_MAX_ATTEMPTS", 1)?;
        if max_attempts == 0 {
            return Err(anyhow!("LLM_MAX_ATTEMPTS must be at least 1"));
        }

        let llm = LlmSettings {
            provider,
            api_key: env.require("LLM_API_KEY")?,
            base_url: env
                .get("LLM_BASE_URL")
                .unwrap_or_else(|| provider.default_base_url().to_string()),
            model: env
                .get("LLM_MODEL")
                .unwrap_or_else(|| provider.default_model().to_string()),
            max_tokens: env.parse_or("LLM_MAX_TOKENS", DEFAULT_LLM_MAX_TOKENS)?,
            temperature: env.parse_or("LLM_TEMPERATURE", 0.0)?,
            retry: RetryPolicy {
                max_attempts,
                base_delay: Duration::from_millis(env.parse_or("LLM_RETRY_BASE_MS", 1000)?),
            },
            timeout: env
                .parse::<u64>("LLM_TIMEOUT_SECS")?
                .map(Duration::from_secs),
        };

        let budget: usize = env.parse_or("TOKEN_BUDGET", DEFAULT_TOKEN_BUDGET)?;
        let token_budget =
            TokenBudget::new(budget).context("TOKEN_BUDGET must be greater than zero")?;

        Ok(Config {
            llm,
            token_budget,
            token_estimator: env.parse_or("TOKEN_ESTIMATOR", EstimatorKind::default())?,
            extraction_mode: env.parse_or("EXTRACTION_MODE", ExtractionMode::default())?,
            schema_variant: env.parse_or("SCHEMA_VARIANT", SchemaVariant::default())?,
            max_upload_bytes: env.parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            upload_dir: env
                .get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            port: env
                .parse_or("PORT", 8080u16)
                .context("PORT must be a valid port number")?,
            rust_log: env.get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Unset and empty values are treated the same.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .with_context(|| format!("Required environment variable '{key}' is not set"))
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.trim()
                    .parse::<T>()
                    .map_err(|e| anyhow!("Invalid value for '{key}' ({raw}): {e}"))
            })
            .transpose()
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.parse(key)?.unwrap_or(default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_only_api_key() {
        let config = config_from(&[("LLM_API_KEY", "secret")]).unwrap();

        assert_eq!(config.llm.provider, LlmProvider::OpenAi);
        assert_eq!(config.llm.model, "deepseek-r1-distill-llama-70b");
        assert_eq!(config.llm.max_tokens, 4000);
        assert_eq!(config.llm.retry.max_attempts, 1);
        assert!(config.llm.timeout.is_none());
        assert_eq!(config.token_budget.get(), 2000);
        assert_eq!(config.token_estimator, EstimatorKind::Cl100k);
        assert_eq!(config.extraction_mode, ExtractionMode::Text);
        assert_eq!(config.schema_variant, SchemaVariant::Basic);
        assert_eq!(config.max_upload_bytes, 16 * 1024 * 1024);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_missing_api_key_fails() {
        let err = config_from(&[]).unwrap_err();
        assert!(err.to_string().contains("LLM_API_KEY"));
    }

    #[test]
    fn test_zero_token_budget_is_rejected() {
        let err = config_from(&[("LLM_API_KEY", "k"), ("TOKEN_BUDGET", "0")]).unwrap_err();
        assert!(err.to_string().contains("TOKEN_BUDGET"));
    }

    #[test]
    fn test_zero_attempts_is_rejected() {
        assert!(config_from(&[("LLM_API_KEY", "k"), ("LLM_MAX_ATTEMPTS", "0")]).is_err());
    }

    #[test]
    fn test_invalid_variant_names_the_variable() {
        let err = config_from(&[("LLM_API_KEY", "k"), ("SCHEMA_VARIANT", "huge")]).unwrap_err();
        assert!(err.to_string().contains("SCHEMA_VARIANT"));
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = config_from(&[
            ("LLM_API_KEY", "k"),
            ("LLM_PROVIDER", "anthropic"),
            ("LLM_MAX_ATTEMPTS", "3"),
            ("LLM_TIMEOUT_SECS", "30"),
            ("TOKEN_ESTIMATOR", "heuristic"),
            ("EXTRACTION_MODE", "raw"),
            ("SCHEMA_VARIANT", "extended"),
            ("MAX_UPLOAD_BYTES", "1024"),
            ("PORT", "5000"),
        ])
        .unwrap();

        assert_eq!(config.llm.provider, LlmProvider::Anthropic);
        assert_eq!(config.llm.base_url, "https://api.anthropic.com/v1");
        assert_eq!(config.llm.retry.max_attempts, 3);
        assert_eq!(config.llm.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.token_estimator, EstimatorKind::Heuristic);
        assert_eq!(config.extraction_mode, ExtractionMode::Raw);
        assert_eq!(config.schema_variant, SchemaVariant::Extended);
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn test_empty_value_counts_as_unset() {
        let config = config_from(&[("LLM_API_KEY", "k"), ("LLM_MODEL", "  ")]).unwrap();
        assert_eq!(config.llm.model, "deepseek-r1-distill-llama-70b");
    }
}
