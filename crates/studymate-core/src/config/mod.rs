use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::attachments::{MAX_ATTACHMENTS, MAX_ATTACHMENT_BYTES};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub backend: BackendSettings,
    pub attachments: AttachmentSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentSettings {
    pub max_files: usize,
    pub max_file_bytes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendSettings {
                base_url: "https://studymate-backend-beta.vercel.app".to_string(),
                request_timeout_secs: 120,
            },
            attachments: AttachmentSettings {
                max_files: MAX_ATTACHMENTS,
                max_file_bytes: MAX_ATTACHMENT_BYTES,
            },
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("studymate")
            .join("config.toml")
    }

    /// Load settings, falling back to defaults when the file is absent or
    /// malformed.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        if config_path.exists() {
            if let Ok(content) = std::fs::read_to_string(&config_path) {
                if let Ok(config) = toml::from_str(&content) {
                    return config;
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) -> Result<(), crate::error::StudyMateError> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::StudyMateError::Config(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}
