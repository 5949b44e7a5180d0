//! Process configuration, read from environment variables.
//!
//! Every reader takes a lookup function instead of touching the process
//! environment directly, so tests can feed a plain map.

use std::collections::HashMap;
use std::fmt;

use cambist_shared::a2a::{AGENT_CARD_WELL_KNOWN_PATH, DEFAULT_RPC_URL};
use thiserror::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_AGENT_NAME: &str = "currency-exchange-agent";
pub const DEFAULT_MOUNT_PATH: &str = "/a2a";
pub const DEFAULT_GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-08-01-preview";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Returns the value of a variable, or `None` when unset or blank.
pub type Lookup = dyn Fn(&str) -> Option<String> + Send + Sync;

pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Lookup over a fixed map, for tests and embedding.
pub fn map_lookup(vars: HashMap<String, String>) -> impl Fn(&str) -> Option<String> + Send + Sync {
    move |key: &str| vars.get(key).filter(|v| !v.trim().is_empty()).cloned()
}

fn first_of(lookup: &Lookup, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| lookup(k)).map(|v| v.trim().to_string())
}

fn flag(lookup: &Lookup, key: &str, default: bool) -> bool {
    match lookup(key) {
        Some(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variables for MODEL_SOURCE={model_source}: {}", .missing.join(", "))]
    Missing {
        model_source: String,
        missing: Vec<String>,
    },

    #[error("Unsupported MODEL_SOURCE '{0}'. Expected one of: google, azure, openai, ollama")]
    UnsupportedSource(String),

    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSource {
    Google,
    Azure,
    OpenAi,
    Ollama,
}

impl ModelSource {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(ModelSource::Google),
            "azure" => Ok(ModelSource::Azure),
            "openai" => Ok(ModelSource::OpenAi),
            "ollama" => Ok(ModelSource::Ollama),
            _ => Err(ConfigError::UnsupportedSource(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSource::Google => "google",
            ModelSource::Azure => "azure",
            ModelSource::OpenAi => "openai",
            ModelSource::Ollama => "ollama",
        }
    }

    /// Provider name reported on tracing spans.
    pub fn provider_name(&self) -> &'static str {
        match self {
            ModelSource::Google => "gcp.gemini",
            ModelSource::Azure => "azure.ai.openai",
            ModelSource::OpenAi => "openai",
            ModelSource::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, PartialEq)]
pub struct ModelConfig {
    pub source: ModelSource,
    /// Model name, or the deployment name for Azure.
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_version: Option<String>,
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("source", &self.source)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_version", &self.api_version)
            .finish()
    }
}

struct Required<'a> {
    lookup: &'a Lookup,
    missing: Vec<String>,
}

impl<'a> Required<'a> {
    fn new(lookup: &'a Lookup) -> Self {
        Self {
            lookup,
            missing: Vec::new(),
        }
    }

    /// First set variable among `keys`; records them as missing otherwise.
    fn any(&mut self, keys: &[&str]) -> String {
        match first_of(self.lookup, keys) {
            Some(v) => v,
            None => {
                self.missing.push(keys.join(" or "));
                String::new()
            }
        }
    }

    fn finish(self, source: ModelSource) -> Result<(), ConfigError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing {
                model_source: source.to_string(),
                missing: self.missing,
            })
        }
    }
}

impl ModelConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &Lookup) -> Result<Self, ConfigError> {
        let source = match first_of(lookup, &["MODEL_SOURCE", "model_source"]) {
            Some(raw) => ModelSource::parse(&raw)?,
            None => ModelSource::Google,
        };

        let mut required = Required::new(lookup);

        let config = match source {
            ModelSource::Google => {
                let api_key = required.any(&["GOOGLE_API_KEY"]);
                let model = required.any(&["GOOGLE_MODEL_NAME"]);
                ModelConfig {
                    source,
                    model,
                    base_url: first_of(lookup, &["GOOGLE_API_BASE"])
                        .unwrap_or_else(|| DEFAULT_GOOGLE_API_BASE.to_string()),
                    api_key: Some(api_key),
                    api_version: None,
                }
            }
            ModelSource::Azure => {
                let base_url = required.any(&["AZURE_OPENAI_ENDPOINT", "TOOL_LLM_URL"]);
                let model = required.any(&["AZURE_OPENAI_DEPLOYMENT", "TOOL_LLM_NAME"]);
                let api_key = required.any(&["AZURE_OPENAI_API_KEY", "API_KEY"]);
                ModelConfig {
                    source,
                    model,
                    base_url,
                    api_key: Some(api_key),
                    api_version: Some(
                        first_of(lookup, &["AZURE_OPENAI_API_VERSION", "OPENAI_API_VERSION"])
                            .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
                    ),
                }
            }
            ModelSource::OpenAi => {
                let base_url = required.any(&["TOOL_LLM_URL"]);
                let model = required.any(&["TOOL_LLM_NAME"]);
                let api_key = required.any(&["API_KEY"]);
                ModelConfig {
                    source,
                    model,
                    base_url,
                    api_key: Some(api_key),
                    api_version: None,
                }
            }
            ModelSource::Ollama => {
                let model = required.any(&["TOOL_LLM_NAME"]);
                ModelConfig {
                    source,
                    model,
                    base_url: first_of(lookup, &["TOOL_LLM_URL"])
                        .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
                    api_key: first_of(lookup, &["API_KEY"]),
                    api_version: None,
                }
            }
        };

        required.finish(source)?;
        Ok(config)
    }

    /// Full URL of the chat endpoint for this source.
    pub fn chat_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.source {
            ModelSource::Azure => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                base,
                self.model,
                self.api_version.as_deref().unwrap_or(DEFAULT_AZURE_API_VERSION)
            ),
            ModelSource::Ollama if base.ends_with("/api/chat") => base.to_string(),
            ModelSource::Ollama => format!("{}/api/chat", base),
            _ if base.ends_with("/chat/completions") => base.to_string(),
            _ => format!("{}/chat/completions", base),
        }
    }
}

/// Adds a leading slash and strips a trailing one. `/` itself is only kept
/// when `allow_root` is set, otherwise `default` is returned.
pub fn normalize_path(path: Option<&str>, default: &str, allow_root: bool) -> String {
    let raw = match path.map(str::trim) {
        Some(p) if !p.is_empty() => p,
        _ => return default.to_string(),
    };

    let mut value = raw.to_string();
    if value != "/" && !value.starts_with('/') {
        value.insert(0, '/');
    }
    if value != "/" && value.ends_with('/') {
        value = value.trim_end_matches('/').to_string();
        if value.is_empty() {
            value = "/".to_string();
        }
    }
    if value == "/" && !allow_root {
        return default.to_string();
    }
    value
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Command line values win over `BIND_HOST`, `HOST` and `PORT`.
    pub fn resolve(
        host: Option<String>,
        port: Option<u16>,
        lookup: &Lookup,
    ) -> Result<Self, ConfigError> {
        let host = host
            .or_else(|| first_of(lookup, &["BIND_HOST", "HOST"]))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match port {
            Some(p) => p,
            None => match lookup("PORT") {
                Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: "PORT".to_string(),
                    value: raw,
                })?,
                None => DEFAULT_PORT,
            },
        };

        Ok(Self { host, port })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct A2aConfig {
    pub agent_name: String,
    pub mount_path: String,
    pub card_path: String,
    pub rpc_route: String,
    /// Public URL of the mounted A2A app, advertised in the agent card.
    pub public_url: String,
    pub version: String,
    pub documentation_url: Option<String>,
    pub api_key: Option<String>,
}

impl A2aConfig {
    pub fn from_lookup(lookup: &Lookup, server: &ServerConfig) -> Self {
        let mount_path = normalize_path(lookup("A2A_MOUNT_PATH").as_deref(), DEFAULT_MOUNT_PATH, false);

        Self {
            agent_name: first_of(lookup, &["AGENT_NAME"])
                .unwrap_or_else(|| DEFAULT_AGENT_NAME.to_string()),
            card_path: normalize_path(
                lookup("A2A_AGENT_CARD_PATH").as_deref(),
                AGENT_CARD_WELL_KNOWN_PATH,
                false,
            ),
            rpc_route: normalize_path(lookup("A2A_RPC_ROUTE").as_deref(), DEFAULT_RPC_URL, true),
            public_url: format!("{}{}", public_base_url(lookup, server), mount_path),
            mount_path,
            version: first_of(lookup, &["A2A_AGENT_VERSION"]).unwrap_or_else(|| "1.0.0".to_string()),
            documentation_url: first_of(lookup, &["A2A_AGENT_DOCUMENTATION_URL"]),
            api_key: first_of(lookup, &["A2A_AGENT_API_KEY"]),
        }
    }
}

/// Externally reachable base URL, without a trailing slash.
pub fn public_base_url(lookup: &Lookup, server: &ServerConfig) -> String {
    if let Some(base) = first_of(lookup, &["A2A_PUBLIC_BASE_URL", "PUBLIC_BASE_URL"]) {
        return base.trim_end_matches('/').to_string();
    }

    let host = first_of(lookup, &["PUBLIC_HOST"]).unwrap_or_else(|| {
        if matches!(server.host.as_str(), "0.0.0.0" | "::" | "::0") {
            "localhost".to_string()
        } else {
            server.host.clone()
        }
    });
    let scheme = first_of(lookup, &["PUBLIC_SCHEME"]).unwrap_or_else(|| "http".to_string());
    let port = first_of(lookup, &["PUBLIC_PORT"]).unwrap_or_else(|| server.port.to_string());

    if port == "80" || port == "443" {
        format!("{}://{}", scheme, host)
    } else {
        format!("{}://{}:{}", scheme, host, port)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TracerConfig {
    /// Exporting is done by an external collector; only presence is tracked.
    pub connection_string: Option<String>,
    pub enable_content: bool,
    pub agent_name: Option<String>,
    pub agent_id: Option<String>,
    pub provider_name: Option<String>,
    pub service_name: String,
}

impl TracerConfig {
    pub fn from_lookup(lookup: &Lookup) -> Self {
        Self {
            connection_string: first_of(lookup, &["APPLICATION_INSIGHTS_CONNECTION_STRING"]),
            enable_content: flag(lookup, "APPLICATION_INSIGHTS_ENABLE_CONTENT", true),
            agent_name: first_of(lookup, &["APPLICATION_INSIGHTS_AGENT_NAME"]),
            agent_id: first_of(lookup, &["APPLICATION_INSIGHTS_AGENT_ID"]),
            provider_name: first_of(lookup, &["APPLICATION_INSIGHTS_PROVIDER_NAME"]),
            service_name: first_of(lookup, &["OTEL_SERVICE_NAME", "AGENT_NAME"])
                .unwrap_or_else(|| DEFAULT_AGENT_NAME.to_string()),
        }
    }
}

/// Everything except the model, which is built lazily by the runtime.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub a2a: A2aConfig,
    pub tracer: TracerConfig,
}

impl Config {
    pub fn from_lookup(
        lookup: &Lookup,
        host: Option<String>,
        port: Option<u16>,
    ) -> Result<Self, ConfigError> {
        let server = ServerConfig::resolve(host, port, lookup)?;
        Ok(Self {
            a2a: A2aConfig::from_lookup(lookup, &server),
            tracer: TracerConfig::from_lookup(lookup),
            server,
        })
    }

    pub fn from_env(host: Option<String>, port: Option<u16>) -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup, host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + Send + Sync {
        map_lookup(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn google_is_the_default_source() {
        let lookup = vars(&[("GOOGLE_API_KEY", "k"), ("GOOGLE_MODEL_NAME", "gemini-2.0-flash")]);
        let config = ModelConfig::from_lookup(&lookup).unwrap();
        assert_eq!(config.source, ModelSource::Google);
        assert_eq!(
            config.chat_url(),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
    }

    #[test]
    fn missing_model_name_is_named() {
        let lookup = vars(&[("GOOGLE_API_KEY", "k")]);
        let err = ModelConfig::from_lookup(&lookup).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_MODEL_NAME"));
        assert!(!err.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn azure_lists_every_missing_alternative() {
        let lookup = vars(&[("MODEL_SOURCE", "azure"), ("TOOL_LLM_NAME", "gpt-4o")]);
        match ModelConfig::from_lookup(&lookup).unwrap_err() {
            ConfigError::Missing { model_source, missing } => {
                assert_eq!(model_source, "azure");
                assert_eq!(
                    missing,
                    vec!["AZURE_OPENAI_ENDPOINT or TOOL_LLM_URL", "AZURE_OPENAI_API_KEY or API_KEY"]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn azure_url_uses_deployment_and_version() {
        let lookup = vars(&[
            ("model_source", "Azure"),
            ("AZURE_OPENAI_ENDPOINT", "https://fx.openai.azure.com/"),
            ("AZURE_OPENAI_DEPLOYMENT", "gpt-4o"),
            ("API_KEY", "secret"),
        ]);
        let config = ModelConfig::from_lookup(&lookup).unwrap();
        assert_eq!(
            config.chat_url(),
            "https://fx.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-08-01-preview"
        );
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn ollama_defaults_to_local_server() {
        let lookup = vars(&[("MODEL_SOURCE", "ollama"), ("TOOL_LLM_NAME", "qwen3:8b")]);
        let config = ModelConfig::from_lookup(&lookup).unwrap();
        assert_eq!(config.chat_url(), "http://localhost:11434/api/chat");
    }

    #[test]
    fn unknown_source_is_rejected() {
        let lookup = vars(&[("MODEL_SOURCE", "bedrock")]);
        assert_eq!(
            ModelConfig::from_lookup(&lookup).unwrap_err(),
            ConfigError::UnsupportedSource("bedrock".into())
        );
    }

    #[test]
    fn normalizes_paths() {
        assert_eq!(normalize_path(Some("agents/"), "/a2a", false), "/agents");
        assert_eq!(normalize_path(Some("/"), "/a2a", false), "/a2a");
        assert_eq!(normalize_path(Some("/"), "/", true), "/");
        assert_eq!(normalize_path(Some("rpc/"), "/", true), "/rpc");
        assert_eq!(normalize_path(None, "/a2a", false), "/a2a");
        assert_eq!(normalize_path(Some("  "), "/a2a", false), "/a2a");
    }

    #[test]
    fn cli_overrides_environment() {
        let lookup = vars(&[("BIND_HOST", "10.0.0.1"), ("HOST", "10.0.0.2"), ("PORT", "9000")]);
        let server = ServerConfig::resolve(None, None, &lookup).unwrap();
        assert_eq!(server.bind_address(), "10.0.0.1:9000");

        let server = ServerConfig::resolve(Some("127.0.0.1".into()), Some(7000), &lookup).unwrap();
        assert_eq!(server.bind_address(), "127.0.0.1:7000");

        let bad = vars(&[("PORT", "eighty")]);
        assert!(ServerConfig::resolve(None, None, &bad).is_err());
    }

    #[test]
    fn public_url_for_wildcard_bind() {
        let server = ServerConfig {
            host: "0.0.0.0".into(),
            port: 8080,
        };
        let a2a = A2aConfig::from_lookup(&vars(&[]), &server);
        assert_eq!(a2a.public_url, "http://localhost:8080/a2a");
        assert_eq!(a2a.card_path, "/.well-known/agent-card.json");
        assert_eq!(a2a.rpc_route, "/");

        let lookup = vars(&[("PUBLIC_SCHEME", "https"), ("PUBLIC_HOST", "fx.example.com"), ("PUBLIC_PORT", "443")]);
        assert_eq!(public_base_url(&lookup, &server), "https://fx.example.com");

        let lookup = vars(&[("PUBLIC_BASE_URL", "https://agents.example.com/")]);
        let a2a = A2aConfig::from_lookup(&lookup, &server);
        assert_eq!(a2a.public_url, "https://agents.example.com/a2a");
    }

    #[test]
    fn tracer_content_flag() {
        assert!(TracerConfig::from_lookup(&vars(&[])).enable_content);
        let off = vars(&[("APPLICATION_INSIGHTS_ENABLE_CONTENT", "false")]);
        assert!(!TracerConfig::from_lookup(&off).enable_content);
        let on = vars(&[("APPLICATION_INSIGHTS_ENABLE_CONTENT", "Yes"), ("OTEL_SERVICE_NAME", "fx")]);
        let tracer = TracerConfig::from_lookup(&on);
        assert!(tracer.enable_content);
        assert_eq!(tracer.service_name, "fx");
    }
}
