use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::ComparisonEngine;
use crate::models::validate_threshold;
use crate::normalize::{german_stopwords, BasicNormalizer, Stemming};
use crate::similarity::Method;

pub const CONFIG_ENV_VAR: &str = "SPECSIM_CONFIG";
pub const DEFAULT_DATABASE: &str = "specsim.db";
pub const DEFAULT_THRESHOLD: f64 = 0.2;

/// Product and role names that appear in most requirements and carry no
/// meaning for similarity
pub const DEFAULT_WORDS_TO_REMOVE: &[&str] = &[
    "ePA-Frontend",
    "ePA Frontend",
    "E-Rezept-FdV",
    "TI-ITSM-Teilnehmer",
    "Hersteller",
    "Produkttyp",
];

fn default_database() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE)
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_words_to_remove() -> Vec<String> {
    DEFAULT_WORDS_TO_REMOVE.iter().map(|w| w.to_string()).collect()
}

fn default_stopwords() -> Vec<String> {
    german_stopwords().map(str::to_string).collect()
}

fn default_stemming() -> Stemming {
    Stemming::German
}

fn default_log_level() -> String {
    "info".to_string()
}

/// User settings for the similarity tooling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// SQLite database file
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub method: Method,
    /// Phrases stripped from requirement text before comparison
    #[serde(default = "default_words_to_remove")]
    pub words_to_remove: Vec<String>,
    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,
    #[serde(default = "default_stemming")]
    pub stemming: Stemming,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: default_database(),
            threshold: DEFAULT_THRESHOLD,
            method: Method::default(),
            words_to_remove: default_words_to_remove(),
            stopwords: default_stopwords(),
            stemming: default_stemming(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Loads settings from the provided path; a missing file yields defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        validate_threshold(settings.threshold)
            .with_context(|| format!("Invalid threshold in {:?}", path))?;
        Ok(settings)
    }

    /// Save the settings to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Normalizer configured with these settings' phrase and stopword lists
    /// and stemming
    pub fn normalizer(&self) -> BasicNormalizer {
        BasicNormalizer::new()
            .with_words_to_remove(self.words_to_remove.iter().cloned())
            .with_stopwords(self.stopwords.iter().cloned())
            .with_stemming(self.stemming)
    }

    /// Comparison engine for the given method and threshold, falling back to
    /// the configured ones
    pub fn engine(&self, method: Option<Method>, threshold: Option<f64>) -> Result<ComparisonEngine> {
        let method = method.unwrap_or(self.method);
        let threshold = threshold.unwrap_or(self.threshold);
        Ok(ComparisonEngine::new(method.strategy(), threshold)?)
    }
}

/// Gets the path to the settings file
pub fn settings_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }

    let config_dir = dirs::config_dir().context("Failed to determine config directory")?;

    Ok(config_dir.join("specsim").join("config.yaml"))
}
