use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
/// Leads are processed one at a time unless the deployment opts in.
const DEFAULT_MAX_CONCURRENCY: usize = 1;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub company_context_path: PathBuf,
    pub company_name: String,
    pub partner_platform: String,
    pub model_timeout_secs: u64,
    pub max_concurrency: usize,
    pub max_batch_size: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            gemini_base_url: validated_url(
                "GEMINI_BASE_URL",
                &std::env::var("GEMINI_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            )?,
            gemini_model: non_empty_or_default("GEMINI_MODEL", DEFAULT_GEMINI_MODEL)?,
            company_context_path: PathBuf::from(non_empty_or_default(
                "COMPANY_CONTEXT_PATH",
                "company_context.txt",
            )?),
            company_name: non_empty_or_default("COMPANY_NAME", "WildnetEdge")?,
            partner_platform: non_empty_or_default("PARTNER_PLATFORM", "Salesforce")?,
            model_timeout_secs: bounded_number("MODEL_TIMEOUT_SECS", 60, 1, 600)?,
            max_concurrency: bounded_number("MAX_CONCURRENCY", DEFAULT_MAX_CONCURRENCY, 1, 32)?,
            max_batch_size: bounded_number("MAX_BATCH_SIZE", 200, 1, usize::MAX)?,
        };

        // Log successful configuration load
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Gemini Base URL: {}", config.gemini_base_url);
        tracing::debug!("Gemini Model: {}", config.gemini_model);
        tracing::debug!(
            "Company context path: {}",
            config.company_context_path.display()
        );
        tracing::debug!(
            "Batch limits: concurrency={}, max_size={}, timeout={}s",
            config.max_concurrency,
            config.max_batch_size,
            config.model_timeout_secs
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Timeout applied to every outbound model call.
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }
}

fn non_empty_or_default(key: &str, default: &str) -> anyhow::Result<String> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => anyhow::bail!("{} cannot be empty", key),
        Ok(value) => Ok(value.trim().to_string()),
        Err(_) => Ok(default.to_string()),
    }
}

fn bounded_number<T>(key: &str, default: T, min: T, max: T) -> anyhow::Result<T>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
{
    let value = match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", key))?,
        Err(_) => default,
    };
    if value < min || value > max {
        anyhow::bail!("{} must be between {} and {}", key, min, max);
    }
    Ok(value)
}

fn validated_url(key: &str, raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/').to_string();
    if trimmed.is_empty() {
        anyhow::bail!("{} cannot be empty", key);
    }
    let parsed =
        url::Url::parse(&trimmed).map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", key, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", key);
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_validation() {
        assert_eq!(
            validated_url("X", "https://example.com/").unwrap(),
            "https://example.com"
        );
        assert!(validated_url("X", "ftp://example.com").is_err());
        assert!(validated_url("X", "   ").is_err());
        assert!(validated_url("X", "not a url").is_err());
    }

    #[test]
    fn test_bounded_number_uses_default_when_unset() {
        let value: u64 = bounded_number("LEAD_SCORING_TEST_UNSET_VAR", 60, 1, 600).unwrap();
        assert_eq!(value, 60);
    }

    #[test]
    fn test_concurrency_defaults_to_sequential() {
        let value: usize = bounded_number(
            "LEAD_SCORING_TEST_UNSET_CONCURRENCY",
            DEFAULT_MAX_CONCURRENCY,
            1,
            32,
        )
        .unwrap();
        assert_eq!(value, 1);
    }
}
