use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::retrieve::RetrievalConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub max_tokens: u32,
    /// Normally supplied via the `OPENAI_API_KEY` environment variable
    /// rather than the config file.
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// `qdrant` or `memory`.
    pub backend: String,
    pub qdrant_url: String,
    pub chunk_collection: String,
    pub proposition_collection: String,
    pub vector_size: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub stage_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            embedding_model: "text-embedding-3-small".into(),
            max_tokens: 1024,
            api_key: None,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: "qdrant".into(),
            qdrant_url: "http://localhost:6334".into(),
            chunk_collection: "chunks".into(),
            proposition_collection: "propositions".into(),
            vector_size: 1536,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: 60,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("VERDIKT_LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("VERDIKT_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("VERDIKT_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("VERDIKT_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("VERDIKT_QDRANT_URL") {
            self.index.qdrant_url = v;
        }
        if self.llm.api_key.is_none()
            && let Ok(v) = std::env::var("OPENAI_API_KEY")
        {
            self.llm.api_key = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use super::*;
    use crate::retrieve::RetrievalMode;

    // Tests below mutate process-wide env vars.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_when_file_missing() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.embedding_model, "text-embedding-3-small");
        assert_eq!(config.index.backend, "qdrant");
        assert_eq!(config.retrieval.mode, RetrievalMode::SmallToBig);
        assert_eq!(config.retrieval.proposition_top_k, 3);
        assert_eq!(config.retrieval.flat_top_k, 2);
        assert_eq!(config.pipeline.stage_timeout_secs, 60);
    }

    #[test]
    fn parse_valid_toml() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verdikt.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"
[llm]
provider = "openai"
model = "gpt-4.1"
max_tokens = 2048

[index]
backend = "memory"
vector_size = 64

[retrieval]
mode = "flat"

[pipeline]
stage_timeout_secs = 10
"#
        )
        .unwrap();

        for key in [
            "VERDIKT_LLM_PROVIDER",
            "VERDIKT_LLM_BASE_URL",
            "VERDIKT_LLM_MODEL",
            "VERDIKT_EMBEDDING_MODEL",
            "VERDIKT_QDRANT_URL",
        ] {
            unsafe { std::env::remove_var(key) };
        }

        let config = Config::load(&path).unwrap();
        assert_eq!(config.llm.model, "gpt-4.1");
        assert_eq!(config.llm.max_tokens, 2048);
        assert_eq!(config.index.backend, "memory");
        assert_eq!(config.index.vector_size, 64);
        assert_eq!(config.retrieval.mode, RetrievalMode::Flat);
        assert_eq!(config.pipeline.stage_timeout(), Duration::from_secs(10));
        // Untouched sections keep defaults.
        assert_eq!(config.index.chunk_collection, "chunks");
    }

    #[test]
    fn env_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        let mut config = Config::default();
        assert_eq!(config.llm.model, "gpt-4o-mini");

        unsafe { std::env::set_var("VERDIKT_LLM_MODEL", "gpt-4.1-mini") };
        config.apply_env_overrides();
        unsafe { std::env::remove_var("VERDIKT_LLM_MODEL") };

        assert_eq!(config.llm.model, "gpt-4.1-mini");
    }
}
