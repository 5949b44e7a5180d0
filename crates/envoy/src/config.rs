use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    pub server_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            api_key: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    pub fn set_server(&mut self, url: &str) -> Result<()> {
        self.server_url = url.trim_end_matches('/').to_string();
        self.save()
    }

    /// An empty key clears it.
    pub fn set_api_key(&mut self, key: &str) -> Result<()> {
        self.api_key = Some(key.trim().to_string()).filter(|k| !k.is_empty());
        self.save()
    }

    /// Key with its middle masked, for display.
    pub fn masked_api_key(&self) -> String {
        match self.api_key.as_deref() {
            None => "(none)".to_string(),
            Some(key) if key.chars().count() <= 4 => "****".to_string(),
            Some(key) => format!("{}****", key.chars().take(4).collect::<String>()),
        }
    }

    fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".config").join("envoy").join("config.json"))
    }
}
