use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::models::{
    is_embedding_model, is_generation_model, DEFAULT_EMBEDDING_MODEL, DEFAULT_MODEL,
};
use crate::state::Configuration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const BACKEND_URL_ENV: &str = "PDFCHAT_BACKEND_URL";

/// User preferences stored in `<config dir>/pdfchat/config.json`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub backend_url: Option<String>,
    pub default_model: Option<String>,
    pub default_embedding_model: Option<String>,
    pub chunk_size: Option<u32>,
    pub chunk_overlap: Option<u32>,
    pub similarity_threshold: Option<f64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn save_default_model(model: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.default_model = Some(model.to_string());
        config.save()
    }

    pub fn save_default_embedding_model(model: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.default_embedding_model = Some(model.to_string());
        config.save()
    }

    /// Starting configuration for a new session, falling back to the built-in
    /// defaults for anything not stored. Stored model names that are no longer
    /// offered are ignored.
    pub fn initial_configuration(&self) -> Configuration {
        let defaults = Configuration::default();
        Configuration {
            model: known_model(&self.default_model, is_generation_model)
                .unwrap_or(defaults.model),
            embedding_model: known_model(&self.default_embedding_model, is_embedding_model)
                .unwrap_or(defaults.embedding_model),
            chunk_size: self.chunk_size.unwrap_or(defaults.chunk_size),
            chunk_overlap: self.chunk_overlap.unwrap_or(defaults.chunk_overlap),
            similarity_threshold: self
                .similarity_threshold
                .unwrap_or(defaults.similarity_threshold),
        }
    }

    /// Backend base URL: explicit flag, then environment, then config file.
    pub fn resolve_backend_url(&self, flag: Option<&str>) -> String {
        let env = std::env::var(BACKEND_URL_ENV).ok();
        self.resolve_backend_url_from(flag, env.as_deref())
    }

    /// Blank sources are skipped so the next one in line is used.
    fn resolve_backend_url_from(&self, flag: Option<&str>, env: Option<&str>) -> String {
        let url = flag
            .filter(non_blank)
            .or(env.filter(non_blank))
            .or(self.backend_url.as_deref().filter(non_blank))
            .unwrap_or(DEFAULT_BACKEND_URL);

        url.trim().trim_end_matches('/').to_string()
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("pdfchat").join("config.json"))
    }
}

fn known_model(stored: &Option<String>, is_known: fn(&str) -> bool) -> Option<String> {
    let model = stored.as_deref()?;
    if is_known(model) {
        Some(model.to_string())
    } else {
        tracing::warn!(model, "ignoring unknown model from config file");
        None
    }
}

fn non_blank(url: &&str) -> bool {
    !url.trim().is_empty()
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
            similarity_threshold: 0.7,
        }
    }
}
