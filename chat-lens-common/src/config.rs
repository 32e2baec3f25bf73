use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Column names the conversation tables are expected to use. Datasets that
/// renamed their columns can override any of these in config.toml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnsConfig {
    #[serde(default = "default_conv_id")]
    pub conv_id: String,
    #[serde(default = "default_turn_num")]
    pub turn_num: String,
    #[serde(default = "default_message")]
    pub message: String,
    #[serde(default = "default_conversation")]
    pub conversation: String,
}

fn default_conv_id() -> String {
    "conv_id".into()
}
fn default_turn_num() -> String {
    "turn_num".into()
}
fn default_message() -> String {
    "message".into()
}
fn default_conversation() -> String {
    "conversation".into()
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            conv_id: default_conv_id(),
            turn_num: default_turn_num(),
            message: default_message(),
            conversation: default_conversation(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub columns: ColumnsConfig,
}

impl Config {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chat-lens")
            .join("config.toml")
    }

    pub fn load() -> crate::Result<Self> {
        let path = if let Ok(env_path) = std::env::var("CHAT_LENS_CONFIG") {
            PathBuf::from(env_path) // $CHAT_LENS_CONFIG overrides default config path
        } else {
            Self::config_path()
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let cfg: Self =
            toml::from_str(&content).map_err(|e| crate::ChatLensError::Other(e.to_string()))?;
        Ok(cfg)
    }

    pub fn save(&self) -> crate::Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::ChatLensError::Other(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}
