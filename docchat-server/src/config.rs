//! Server configuration read from the environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use docchat_rag::RagConfig;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_UPLOAD_DIR: &str = "./uploads";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory uploaded PDFs are written to. Created at startup.
    pub upload_dir: PathBuf,
    /// The single origin allowed by CORS.
    pub cors_origin: String,
    pub openai_api_key: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub max_upload_bytes: usize,
    pub rag: RagConfig,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("upload_dir", &self.upload_dir)
            .field("cors_origin", &self.cors_origin)
            .field("openai_api_key", &"<redacted>")
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("rag", &self.rag)
            .finish()
    }
}

impl ServerConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    ///
    /// Unset or blank variables fall back to defaults, except
    /// `OPENAI_API_KEY` which is required.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let openai_api_key = var("OPENAI_API_KEY")
            .map(|key| key.trim_matches(|c| c == '"' || c == '\'').to_string())
            .filter(|key| !key.is_empty())
            .context("OPENAI_API_KEY must be set")?;

        let defaults = RagConfig::default();
        let mut rag = RagConfig::builder()
            .chunk_size(parse_or(&var, "DOCCHAT_CHUNK_SIZE", defaults.chunk_size)?)
            .chunk_overlap(parse_or(&var, "DOCCHAT_CHUNK_OVERLAP", defaults.chunk_overlap)?)
            .top_k(parse_or(&var, "DOCCHAT_TOP_K", defaults.top_k)?);
        rag = match var("DOCCHAT_PROVIDER_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = parse("DOCCHAT_PROVIDER_TIMEOUT_SECS", &raw)?;
                if secs == 0 {
                    rag.no_provider_timeout()
                } else {
                    rag.provider_timeout(Duration::from_secs(secs))
                }
            }
            None => rag,
        };
        let rag = rag.build().context("invalid retrieval settings")?;

        let max_upload_bytes =
            parse_or(&var, "DOCCHAT_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        if max_upload_bytes == 0 {
            bail!("DOCCHAT_MAX_UPLOAD_BYTES must be greater than zero");
        }

        Ok(Self {
            host: var("DOCCHAT_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&var, "DOCCHAT_PORT", DEFAULT_PORT)?,
            upload_dir: var("DOCCHAT_UPLOAD_DIR")
                .unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string())
                .into(),
            cors_origin: var("DOCCHAT_CORS_ORIGIN")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            openai_api_key,
            chat_model: var("DOCCHAT_CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_model: var("DOCCHAT_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            max_upload_bytes,
            rag,
        })
    }
}

fn parse<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().with_context(|| format!("{key} has an invalid value: {raw:?}"))
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => parse(key, &raw),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8000);
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(config.cors_origin, "http://localhost:5173");
        assert_eq!(config.chat_model, "gpt-3.5-turbo");
        assert_eq!(config.embedding_model, "text-embedding-ada-002");
        assert_eq!(config.rag, RagConfig::default());
    }

    #[test]
    fn api_key_is_required_and_unquoted() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("OPENAI_API_KEY", "\"\"")]).is_err());
        let config = config_from(&[("OPENAI_API_KEY", "\"sk-quoted\"")]).unwrap();
        assert_eq!(config.openai_api_key, "sk-quoted");
        assert!(!format!("{config:?}").contains("sk-quoted"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("DOCCHAT_PORT", "9001"),
            ("DOCCHAT_CHUNK_SIZE", "500"),
            ("DOCCHAT_CHUNK_OVERLAP", "50"),
            ("DOCCHAT_TOP_K", "6"),
            ("DOCCHAT_PROVIDER_TIMEOUT_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.rag.chunk_size, 500);
        assert_eq!(config.rag.chunk_overlap, 50);
        assert_eq!(config.rag.top_k, 6);
        assert_eq!(config.rag.provider_timeout, None);
    }

    #[test]
    fn malformed_or_inconsistent_values_are_errors() {
        assert!(config_from(&[("OPENAI_API_KEY", "sk"), ("DOCCHAT_PORT", "eighty")]).is_err());
        assert!(
            config_from(&[("OPENAI_API_KEY", "sk"), ("DOCCHAT_CHUNK_OVERLAP", "1000")]).is_err()
        );
    }
}
