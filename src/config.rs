use crate::error::{Result, SpamlensError};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_spam_threshold() -> f64 {
    3.5
}

fn default_probable_spam_threshold() -> f64 {
    2.0
}

fn default_language_detection() -> bool {
    true
}

fn default_min_language_confidence() -> f64 {
    0.5
}

/// Per-request scoring knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Score at or above which a message is spam.
    #[serde(default = "default_spam_threshold", alias = "spamThreshold")]
    pub spam_threshold: f64,
    /// Score at or above which (and below `spam_threshold`) a message is probable spam.
    #[serde(
        default = "default_probable_spam_threshold",
        alias = "probableSpamThreshold"
    )]
    pub probable_spam_threshold: f64,
    /// Attach extracted URLs, addresses, language and text statistics to results.
    #[serde(default, alias = "enableDebug")]
    pub enable_debug: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            spam_threshold: default_spam_threshold(),
            probable_spam_threshold: default_probable_spam_threshold(),
            enable_debug: false,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.spam_threshold.is_finite() || !self.probable_spam_threshold.is_finite() {
            return Err(SpamlensError::Config(
                "thresholds must be finite numbers".to_string(),
            ));
        }
        if self.probable_spam_threshold > self.spam_threshold {
            log::warn!(
                "probable_spam_threshold ({}) is above spam_threshold ({}); probable_spam will never be assigned",
                self.probable_spam_threshold,
                self.spam_threshold
            );
        }
        Ok(())
    }
}

/// Application configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Directory of additional `<lang>.yaml` datasets.
    #[serde(default)]
    pub datasets_dir: Option<String>,
    /// Pick a dataset by detected language; English is always the fallback.
    #[serde(default = "default_language_detection")]
    pub language_detection: bool,
    /// Below this detection confidence the English dataset is used.
    #[serde(default = "default_min_language_confidence")]
    pub min_language_confidence: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            datasets_dir: None,
            language_detection: default_language_detection(),
            min_language_confidence: default_min_language_confidence(),
        }
    }
}

impl AppConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(content)?;
        config.scoring.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_yaml()?)?;
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Commented starting point written by `--generate-config`.
    pub fn default_yaml() -> String {
        let defaults = Self::default();
        format!(
            "# spamlens configuration\n\
             scoring:\n\
             \x20 # score >= spam_threshold -> spam\n\
             \x20 spam_threshold: {:.1}\n\
             \x20 # score >= probable_spam_threshold -> probable_spam\n\
             \x20 probable_spam_threshold: {:.1}\n\
             \x20 enable_debug: {}\n\
             \n\
             # Directory with additional <language>.yaml datasets\n\
             # datasets_dir: /etc/spamlens/datasets\n\
             \n\
             language_detection: {}\n\
             min_language_confidence: {:.1}\n",
            defaults.scoring.spam_threshold,
            defaults.scoring.probable_spam_threshold,
            defaults.scoring.enable_debug,
            defaults.language_detection,
            defaults.min_language_confidence,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoring_defaults() {
        let config = ScoringConfig::default();
        assert_eq!(config.spam_threshold, 3.5);
        assert_eq!(config.probable_spam_threshold, 2.0);
        assert!(!config.enable_debug);
    }

    #[test]
    fn test_scoring_accepts_camel_case() {
        let config: ScoringConfig =
            serde_json::from_str(r#"{"spamThreshold": 5.0, "enableDebug": true}"#).unwrap();
        assert_eq!(config.spam_threshold, 5.0);
        assert_eq!(config.probable_spam_threshold, 2.0);
        assert!(config.enable_debug);
    }

    #[test]
    fn test_default_yaml_round_trips_to_defaults() {
        let parsed = AppConfig::from_yaml_str(&AppConfig::default_yaml()).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "datasets_dir: ./datasets\nscoring:\n  spam_threshold: 4.0\n";
        let config = AppConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.datasets_dir.as_deref(), Some("./datasets"));
        assert_eq!(config.scoring.spam_threshold, 4.0);
        assert_eq!(config.scoring.probable_spam_threshold, 2.0);
        assert!(config.language_detection);
    }

    #[test]
    fn test_file_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spamlens.yaml");
        let mut config = AppConfig::default();
        config.scoring.enable_debug = true;
        config.to_file(&path).unwrap();
        assert_eq!(AppConfig::from_file(&path).unwrap(), config);

        assert!(matches!(
            AppConfig::from_file(dir.path().join("missing.yaml")),
            Err(SpamlensError::Io(_))
        ));
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(matches!(
            AppConfig::from_yaml_str("scoring: [not, a, map]"),
            Err(SpamlensError::Yaml(_))
        ));
    }
}
