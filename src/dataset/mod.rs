//! Per-language lexical datasets and the providers that hand them out.
//!
//! A [`LanguageDataset`] is plain configuration data (YAML or the built-in
//! English tables). It is compiled once into a [`Dataset`]: dataset-supplied
//! regexes are validated at that point and invalid ones are skipped with a
//! warning, so analysis never has to deal with a broken pattern.

pub mod english;

use crate::error::{Result, SpamlensError};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

lazy_static! {
    static ref ENGLISH: Arc<Dataset> = Arc::new(Dataset::compile(english::dataset()));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpamPhrase {
    pub phrase: String,
    pub score: f64,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectPattern {
    pub pattern: String,
    pub score: f64,
    #[serde(default)]
    pub description: Option<String>,
}

/// Raw spam/ham observation counts for a token.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenFrequency {
    pub spam: f64,
    pub ham: f64,
}

impl TokenFrequency {
    /// `spam / (spam + ham)`, or `None` when the token was never observed.
    pub fn spam_probability(&self) -> Option<f64> {
        let total = self.spam + self.ham;
        if total > 0.0 {
            Some(self.spam / total)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageDataset {
    pub language: String,
    pub spam_phrases: Vec<SpamPhrase>,
    pub spam_single_word_scores: BTreeMap<String, f64>,
    pub spam_subject_patterns: Vec<SubjectPattern>,
    pub ham_phrase_adjustments: BTreeMap<String, f64>,
    pub bayesian_token_probabilities: BTreeMap<String, TokenFrequency>,
    pub urgency_words: Vec<String>,
    pub greeting_words: Vec<String>,
    pub generic_greeting_phrases: Vec<String>,
}

impl LanguageDataset {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut dataset = Self::from_yaml_str(&content)?;
        if dataset.language.is_empty() {
            if let Some(stem) = path.file_stem() {
                dataset.language = stem.to_string_lossy().to_lowercase();
            }
        }
        Ok(dataset)
    }
}

#[derive(Debug, Clone)]
pub struct CompiledSubjectPattern {
    pub regex: Regex,
    pub score: f64,
    pub label: String,
}

/// A validated, regex-compiled dataset shared read-only between analyses.
#[derive(Debug, Clone)]
pub struct Dataset {
    data: LanguageDataset,
    subject_patterns: Vec<CompiledSubjectPattern>,
    urgency_pattern: Option<Regex>,
    greeting_pattern: Option<Regex>,
    generic_greeting_pattern: Option<Regex>,
}

impl Dataset {
    pub fn compile(data: LanguageDataset) -> Self {
        let language = if data.language.is_empty() {
            "unknown".to_string()
        } else {
            data.language.to_lowercase()
        };

        let subject_patterns = data
            .spam_subject_patterns
            .iter()
            .filter_map(|p| match Regex::new(&p.pattern) {
                Ok(regex) => Some(CompiledSubjectPattern {
                    regex,
                    score: p.score,
                    label: p.description.clone().unwrap_or_else(|| p.pattern.clone()),
                }),
                Err(e) => {
                    log::warn!(
                        "Skipping invalid subject pattern '{}' in dataset '{}': {}",
                        p.pattern,
                        language,
                        e
                    );
                    None
                }
            })
            .collect();

        let urgency_pattern = word_alternation(&data.urgency_words)
            .and_then(|alt| compile_logged(&format!(r"(?i)\b(?:{})\b", alt), &language, "urgency"));
        let greeting_pattern = word_alternation(&data.greeting_words).and_then(|alt| {
            compile_logged(&format!(r"(?i)^\s*(?:{})\b", alt), &language, "greeting")
        });
        let generic_greeting_pattern = word_alternation(&data.generic_greeting_phrases)
            .and_then(|alt| {
                compile_logged(
                    &format!(r"(?i)^\s*(?:{})(?:\b|\s|[,:!])", alt),
                    &language,
                    "generic greeting",
                )
            });

        let mut data = data;
        data.language = language;

        Self {
            data,
            subject_patterns,
            urgency_pattern,
            greeting_pattern,
            generic_greeting_pattern,
        }
    }

    pub fn language(&self) -> &str {
        &self.data.language
    }

    pub fn data(&self) -> &LanguageDataset {
        &self.data
    }

    pub fn subject_patterns(&self) -> &[CompiledSubjectPattern] {
        &self.subject_patterns
    }

    pub fn urgency_pattern(&self) -> Option<&Regex> {
        self.urgency_pattern.as_ref()
    }

    pub fn greeting_pattern(&self) -> Option<&Regex> {
        self.greeting_pattern.as_ref()
    }

    pub fn generic_greeting_pattern(&self) -> Option<&Regex> {
        self.generic_greeting_pattern.as_ref()
    }

    pub fn token_probability(&self, token: &str) -> Option<f64> {
        self.data
            .bayesian_token_probabilities
            .get(token)
            .and_then(TokenFrequency::spam_probability)
    }
}

/// Escaped `a|b|c` alternation, longest entries first so phrases beat their prefixes.
fn word_alternation(words: &[String]) -> Option<String> {
    let mut words: Vec<&str> = words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return None;
    }
    words.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    words.dedup();
    Some(
        words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|"),
    )
}

fn compile_logged(pattern: &str, language: &str, what: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            log::warn!("Skipping {} pattern for dataset '{}': {}", what, language, e);
            None
        }
    }
}

/// The built-in English dataset, compiled once per process.
pub fn english() -> Arc<Dataset> {
    Arc::clone(&ENGLISH)
}

/// Resolves a dataset by language code.
pub trait DatasetProvider: Send + Sync {
    fn resolve(&self, language: &str) -> Result<Arc<Dataset>>;

    /// Language codes this provider can resolve without falling back.
    fn languages(&self) -> Vec<String>;
}

/// Always answers with the built-in English dataset.
#[derive(Debug, Clone)]
pub struct EnglishDatasets {
    english: Arc<Dataset>,
}

impl Default for EnglishDatasets {
    fn default() -> Self {
        Self::new()
    }
}

impl EnglishDatasets {
    pub fn new() -> Self {
        Self { english: english() }
    }
}

impl DatasetProvider for EnglishDatasets {
    fn resolve(&self, _language: &str) -> Result<Arc<Dataset>> {
        Ok(Arc::clone(&self.english))
    }

    fn languages(&self) -> Vec<String> {
        vec![self.english.language().to_string()]
    }
}

/// Lookup-by-code provider over explicitly registered or directory-loaded datasets.
#[derive(Debug, Clone, Default)]
pub struct DatasetRegistry {
    datasets: HashMap<String, Arc<Dataset>>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in English dataset.
    pub fn with_english() -> Self {
        let mut registry = Self::new();
        registry.insert(english());
        registry
    }

    pub fn register(&mut self, data: LanguageDataset) {
        self.insert(Arc::new(Dataset::compile(data)));
    }

    fn insert(&mut self, dataset: Arc<Dataset>) {
        let code = dataset.language().to_string();
        if self.datasets.insert(code.clone(), dataset).is_some() {
            log::info!("Replaced dataset for language '{}'", code);
        }
    }

    /// Load every `*.yaml` / `*.yml` file in `dir`. Files that fail to parse are
    /// skipped with a warning; a missing directory is an error.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            return Err(SpamlensError::Config(format!(
                "Dataset directory does not exist: {}",
                dir.display()
            )));
        }

        let mut yaml_files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_yaml = path
                .extension()
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false);
            if path.is_file() && is_yaml {
                yaml_files.push(path);
            }
        }
        // Sort files for consistent loading order
        yaml_files.sort();

        let mut loaded = 0;
        for path in &yaml_files {
            match LanguageDataset::load_from_file(path) {
                Ok(data) => {
                    log::debug!("Loaded dataset '{}' from {}", data.language, path.display());
                    self.register(data);
                    loaded += 1;
                }
                Err(e) => log::warn!("Failed to load dataset {}: {}", path.display(), e),
            }
        }
        Ok(loaded)
    }
}

impl DatasetProvider for DatasetRegistry {
    fn resolve(&self, language: &str) -> Result<Arc<Dataset>> {
        self.datasets
            .get(&language.to_lowercase())
            .cloned()
            .ok_or_else(|| SpamlensError::DatasetNotFound(language.to_string()))
    }

    fn languages(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.datasets.keys().cloned().collect();
        codes.sort();
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const GERMAN: &str = include_str!("../../datasets/de.yaml");

    #[test]
    fn test_invalid_subject_pattern_is_skipped() {
        let data = LanguageDataset {
            language: "xx".to_string(),
            spam_subject_patterns: vec![
                SubjectPattern {
                    pattern: "(unclosed".to_string(),
                    score: 1.0,
                    description: None,
                },
                SubjectPattern {
                    pattern: "(?i)win".to_string(),
                    score: 2.0,
                    description: Some("win".to_string()),
                },
            ],
            ..Default::default()
        };
        let dataset = Dataset::compile(data);
        assert_eq!(dataset.subject_patterns().len(), 1);
        assert_eq!(dataset.subject_patterns()[0].label, "win");
    }

    #[test]
    fn test_word_patterns_escape_input() {
        let data = LanguageDataset {
            urgency_words: vec!["act now".to_string(), "a.s.a.p".to_string()],
            greeting_words: vec!["hi".to_string()],
            ..Default::default()
        };
        let dataset = Dataset::compile(data);
        let urgency = dataset.urgency_pattern().unwrap();
        assert!(urgency.is_match("Please ACT NOW"));
        assert!(!urgency.is_match("aXsXaXp"));
        let greeting = dataset.greeting_pattern().unwrap();
        assert!(greeting.is_match("Hi Tom,"));
        assert!(!greeting.is_match("High five"));
        assert!(dataset.generic_greeting_pattern().is_none());
    }

    #[test]
    fn test_token_probability() {
        let english = english();
        let p = english.token_probability("viagra").unwrap();
        assert!(p > 0.9);
        assert!(english.token_probability("zzzunknownzzz").is_none());

        let zero = TokenFrequency { spam: 0.0, ham: 0.0 };
        assert!(zero.spam_probability().is_none());
    }

    #[test]
    fn test_english_provider_always_resolves() {
        let provider = EnglishDatasets::new();
        assert_eq!(provider.resolve("xx").unwrap().language(), "en");
    }

    #[test]
    fn test_registry_not_found() {
        let registry = DatasetRegistry::with_english();
        assert!(registry.resolve("EN").is_ok());
        assert!(matches!(
            registry.resolve("fr"),
            Err(SpamlensError::DatasetNotFound(code)) if code == "fr"
        ));
    }

    #[test]
    fn test_bundled_german_dataset_parses() {
        let data = LanguageDataset::from_yaml_str(GERMAN).unwrap();
        assert_eq!(data.language, "de");
        let dataset = Dataset::compile(data);
        assert!(!dataset.subject_patterns().is_empty());
        assert!(dataset.generic_greeting_pattern().is_some());
    }

    #[test]
    fn test_load_dir_skips_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut good = fs::File::create(dir.path().join("fr.yaml")).unwrap();
        writeln!(good, "urgency_words: [urgent, immédiatement]").unwrap();
        let mut bad = fs::File::create(dir.path().join("broken.yml")).unwrap();
        writeln!(bad, "spam_phrases: {{ not: [a list").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut registry = DatasetRegistry::new();
        let loaded = registry.load_dir(dir.path()).unwrap();
        assert_eq!(loaded, 1);
        assert_eq!(registry.languages(), vec!["fr".to_string()]);
    }

    #[test]
    fn test_load_dir_missing_directory() {
        let mut registry = DatasetRegistry::new();
        assert!(registry.load_dir(Path::new("/nonexistent/datasets")).is_err());
    }
}
