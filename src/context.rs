use anyhow::Context as _;

use crate::config::Config;

/// Company description injected into every prompt.
///
/// Loaded once before the server starts and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyContext {
    /// Name the prompts speak for.
    pub company_name: String,
    /// Platform the company sells services around; its partners and
    /// resellers are competitors, not buyers.
    pub partner_platform: String,
    document: String,
}

impl CompanyContext {
    pub fn new(
        company_name: impl Into<String>,
        partner_platform: impl Into<String>,
        document: impl Into<String>,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            partner_platform: partner_platform.into(),
            document: document.into(),
        }
    }

    /// Reads the context document named by the configuration.
    ///
    /// A missing or blank document is a startup error.
    pub fn load(config: &Config) -> anyhow::Result<Self> {
        let path = &config.company_context_path;
        let document = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read company context {}", path.display()))?;
        if document.trim().is_empty() {
            anyhow::bail!("company context {} is empty", path.display());
        }

        tracing::info!(
            "Company context loaded from {} ({} bytes)",
            path.display(),
            document.len()
        );
        Ok(Self::new(
            config.company_name.clone(),
            config.partner_platform.clone(),
            document.trim().to_string(),
        ))
    }

    pub fn document(&self) -> &str {
        &self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config_with_path(path: PathBuf) -> Config {
        Config {
            port: 8000,
            gemini_base_url: "https://example.com".to_string(),
            gemini_model: "gemini-2.5-flash".to_string(),
            company_context_path: path,
            company_name: "WildnetEdge".to_string(),
            partner_platform: "Salesforce".to_string(),
            model_timeout_secs: 5,
            max_concurrency: 1,
            max_batch_size: 10,
        }
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "lead-scoring-{}-{}.txt",
            name,
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_reads_and_trims_document() {
        let path = temp_file("ok", "\n  Salesforce implementation partner.\n");
        let context = CompanyContext::load(&config_with_path(path.clone())).unwrap();
        assert_eq!(context.document(), "Salesforce implementation partner.");
        assert_eq!(context.company_name, "WildnetEdge");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_document_is_fatal() {
        let path = std::env::temp_dir().join("lead-scoring-definitely-missing.txt");
        let err = CompanyContext::load(&config_with_path(path)).unwrap_err();
        assert!(err.to_string().contains("failed to read company context"));
    }

    #[test]
    fn test_blank_document_is_fatal() {
        let path = temp_file("blank", "   \n");
        assert!(CompanyContext::load(&config_with_path(path.clone())).is_err());
        std::fs::remove_file(path).ok();
    }
}
