//! Scoring orchestrator.
//!
//! Runs every analyzer over one record, sums their scores and derives the
//! classification, confidence and the ranked list of reasons.

use crate::analyzers::{self, AnalysisContext, Analyzer};
use crate::config::{AppConfig, ScoringConfig};
use crate::dataset::{self, Dataset, DatasetProvider, DatasetRegistry, EnglishDatasets};
use crate::email::EmailRecord;
use crate::error::Result;
use crate::language::{LanguageDetector, LanguageGuess};
use crate::rules::AnalyzerResult;
use crate::text;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Scores at or below this are `ham`; fixed regardless of configuration.
pub const HAM_CEILING: f64 = 1.0;
const MAX_REASONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Spam,
    ProbableSpam,
    ProbableHam,
    Ham,
}

impl Classification {
    /// First match wins: spam, probable spam, ham, probable ham.
    pub fn from_score(score: f64, config: &ScoringConfig) -> Self {
        if score >= config.spam_threshold {
            Classification::Spam
        } else if score >= config.probable_spam_threshold {
            Classification::ProbableSpam
        } else if score <= HAM_CEILING {
            Classification::Ham
        } else {
            Classification::ProbableHam
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Spam => "spam",
            Classification::ProbableSpam => "probable_spam",
            Classification::ProbableHam => "probable_ham",
            Classification::Ham => "ham",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStatistics {
    pub subject_length: usize,
    pub body_length: usize,
    pub html_length: usize,
    pub word_count: usize,
    pub body_entropy: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub urls: Vec<String>,
    pub emails: Vec<String>,
    pub detected_language: LanguageGuess,
    pub dataset_language: String,
    pub text_statistics: TextStatistics,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpamAnalysisResult {
    pub is_spam: bool,
    pub score: f64,
    pub threshold: f64,
    pub confidence: f64,
    pub classification: Classification,
    pub analyzer_results: Vec<AnalyzerResult>,
    pub top_reasons: Vec<String>,
    pub processing_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SpamAnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub spam: usize,
    pub probable_spam: usize,
    pub probable_ham: usize,
    pub ham: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub results: Vec<BatchItem>,
    pub summary: BatchSummary,
}

impl BatchReport {
    fn from_items(results: Vec<BatchItem>) -> Self {
        let mut summary = BatchSummary {
            total: results.len(),
            ..Default::default()
        };
        for item in &results {
            match &item.result {
                Some(result) => match result.classification {
                    Classification::Spam => summary.spam += 1,
                    Classification::ProbableSpam => summary.probable_spam += 1,
                    Classification::ProbableHam => summary.probable_ham += 1,
                    Classification::Ham => summary.ham += 1,
                },
                None => summary.errors += 1,
            }
        }
        Self { results, summary }
    }
}

pub struct SpamScorer {
    analyzers: Vec<Box<dyn Analyzer>>,
    config: ScoringConfig,
    datasets: Arc<dyn DatasetProvider>,
    english: Arc<Dataset>,
    language_detection: bool,
    min_language_confidence: f64,
}

impl Default for SpamScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpamScorer {
    pub fn new() -> Self {
        Self::with_config(ScoringConfig::default())
    }

    pub fn with_config(config: ScoringConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            analyzers: analyzers::default_analyzers(),
            config,
            datasets: Arc::new(EnglishDatasets::new()),
            english: dataset::english(),
            language_detection: defaults.language_detection,
            min_language_confidence: defaults.min_language_confidence,
        }
    }

    /// Build a scorer from the application config, loading extra datasets
    /// from `datasets_dir` when set.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        config.scoring.validate()?;
        let mut registry = DatasetRegistry::with_english();
        if let Some(dir) = &config.datasets_dir {
            let loaded = registry.load_dir(Path::new(dir))?;
            log::info!("Loaded {} dataset(s) from {}", loaded, dir);
        }

        let mut scorer = Self::with_config(config.scoring.clone());
        scorer.datasets = Arc::new(registry);
        scorer.language_detection = config.language_detection;
        scorer.min_language_confidence = config.min_language_confidence;
        Ok(scorer)
    }

    pub fn with_datasets(mut self, datasets: Arc<dyn DatasetProvider>) -> Self {
        self.datasets = datasets;
        self
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn analyzers(&self) -> &[Box<dyn Analyzer>] {
        &self.analyzers
    }

    pub fn languages(&self) -> Vec<String> {
        self.datasets.languages()
    }

    pub fn analyze(&self, email: &EmailRecord) -> SpamAnalysisResult {
        self.analyze_at(email, &self.config, Utc::now())
    }

    pub fn analyze_with(&self, email: &EmailRecord, config: &ScoringConfig) -> SpamAnalysisResult {
        self.analyze_at(email, config, Utc::now())
    }

    /// Analyze with an explicit clock for the date rules.
    pub fn analyze_at(
        &self,
        email: &EmailRecord,
        config: &ScoringConfig,
        now: DateTime<Utc>,
    ) -> SpamAnalysisResult {
        let start = Instant::now();

        let sample = format!("{}\n{}", email.subject, email.text_body);
        let guess = LanguageDetector::detect(&sample);
        let dataset = self.select_dataset(&guess);
        let ctx = AnalysisContext::new(email, &dataset, now);

        let analyzer_results: Vec<AnalyzerResult> =
            self.analyzers.iter().map(|a| a.analyze(&ctx)).collect();

        let score: f64 = analyzer_results.iter().map(|r| r.score).sum();
        let contributing = analyzer_results
            .iter()
            .filter(|r| !r.matches.is_empty())
            .count();
        let confidence =
            (contributing as f64 / self.analyzers.len().max(1) as f64 + 0.2).min(1.0);
        let classification = Classification::from_score(score, config);
        let top_reasons = top_reasons(&analyzer_results);

        let debug = if config.enable_debug {
            Some(debug_info(&ctx, guess))
        } else {
            None
        };

        log::debug!(
            "Scored '{}': {:.2} ({}) from {} contributing analyzers",
            email.subject,
            score,
            classification,
            contributing
        );

        SpamAnalysisResult {
            is_spam: score >= config.spam_threshold,
            score,
            threshold: config.spam_threshold,
            confidence,
            classification,
            analyzer_results,
            top_reasons,
            processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            debug,
        }
    }

    fn select_dataset(&self, guess: &LanguageGuess) -> Arc<Dataset> {
        if !self.language_detection || guess.code == self.english.language() {
            return Arc::clone(&self.english);
        }
        if guess.confidence < self.min_language_confidence {
            log::debug!(
                "Language '{}' detected with low confidence {:.2}, using English dataset",
                guess.code,
                guess.confidence
            );
            return Arc::clone(&self.english);
        }
        match self.datasets.resolve(&guess.code) {
            Ok(dataset) => dataset,
            Err(e) => {
                log::debug!("{}, using English dataset", e);
                Arc::clone(&self.english)
            }
        }
    }

    /// Decode and analyze one batch item.
    pub fn analyze_value(&self, value: Value) -> Result<SpamAnalysisResult> {
        let email = EmailRecord::from_json(value)?;
        Ok(self.analyze(&email))
    }

    /// Analyze every item in order. A bad item becomes an error entry and
    /// never affects its siblings.
    pub fn analyze_batch(&self, values: &[Value]) -> BatchReport {
        let items = values
            .iter()
            .enumerate()
            .map(|(index, value)| item(index, self.analyze_value(value.clone())))
            .collect();
        BatchReport::from_items(items)
    }

    /// Like [`analyze_batch`](Self::analyze_batch) but each item runs on the
    /// blocking pool. Results keep input order.
    pub async fn analyze_batch_concurrent(
        scorer: Arc<SpamScorer>,
        values: Vec<Value>,
    ) -> BatchReport {
        let handles: Vec<_> = values
            .into_iter()
            .map(|value| {
                let scorer = Arc::clone(&scorer);
                tokio::task::spawn_blocking(move || scorer.analyze_value(value))
            })
            .collect();

        let mut items = Vec::with_capacity(handles.len());
        for (index, handle) in handles.into_iter().enumerate() {
            let outcome = match handle.await {
                Ok(outcome) => outcome.map_err(|e| e.to_string()),
                Err(e) => Err(format!("analysis task failed: {}", e)),
            };
            items.push(item_from(index, outcome));
        }
        BatchReport::from_items(items)
    }
}

fn item(index: usize, outcome: Result<SpamAnalysisResult>) -> BatchItem {
    item_from(index, outcome.map_err(|e| e.to_string()))
}

fn item_from(index: usize, outcome: std::result::Result<SpamAnalysisResult, String>) -> BatchItem {
    match outcome {
        Ok(result) => BatchItem {
            index,
            result: Some(result),
            error: None,
        },
        Err(error) => {
            log::warn!("Batch item {} failed: {}", index, error);
            BatchItem {
                index,
                result: None,
                error: Some(error),
            }
        }
    }
}

/// Positive-scoring matches across all analyzers, highest first.
fn top_reasons(results: &[AnalyzerResult]) -> Vec<String> {
    let mut positive: Vec<(f64, String)> = results
        .iter()
        .flat_map(|r| r.matches.iter())
        .filter(|m| !m.explanatory && m.score() > 0.0)
        .map(|m| (m.score(), m.reason()))
        .collect();
    positive.sort_by(|a, b| b.0.total_cmp(&a.0));
    positive
        .into_iter()
        .take(MAX_REASONS)
        .map(|(_, reason)| reason)
        .collect()
}

fn debug_info(ctx: &AnalysisContext<'_>, detected_language: LanguageGuess) -> DebugInfo {
    let email = ctx.email;
    let urls = analyzers::url::collect_urls(ctx);

    let mut emails = text::extract_emails(&ctx.combined);
    emails.sort();
    emails.dedup();

    DebugInfo {
        urls,
        emails,
        detected_language,
        dataset_language: ctx.dataset.language().to_string(),
        text_statistics: TextStatistics {
            subject_length: email.subject.chars().count(),
            body_length: email.text_body.chars().count(),
            html_length: email.html_body.chars().count(),
            word_count: text::word_count(&ctx.body),
            body_entropy: text::shannon_entropy(&ctx.body),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::LanguageDataset;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        "2025-01-15T12:00:00Z".parse().unwrap()
    }

    fn text_email(subject: &str, body: &str) -> EmailRecord {
        EmailRecord {
            subject: subject.to_string(),
            text_body: body.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_classification_order() {
        let config = ScoringConfig::default();
        assert_eq!(Classification::from_score(3.5, &config), Classification::Spam);
        assert_eq!(Classification::from_score(2.0, &config), Classification::ProbableSpam);
        assert_eq!(Classification::from_score(1.0, &config), Classification::Ham);
        assert_eq!(Classification::from_score(1.01, &config), Classification::ProbableHam);
        assert_eq!(Classification::from_score(0.0, &config), Classification::Ham);
    }

    #[test]
    fn test_ham_ceiling_ignores_probable_threshold() {
        let config = ScoringConfig {
            probable_spam_threshold: 0.5,
            ..Default::default()
        };
        // 0.5 <= 0.8 < 1.0: probable spam wins before the ham check.
        assert_eq!(Classification::from_score(0.8, &config), Classification::ProbableSpam);

        let config = ScoringConfig {
            probable_spam_threshold: 3.0,
            ..Default::default()
        };
        assert_eq!(Classification::from_score(1.0, &config), Classification::Ham);
        assert_eq!(Classification::from_score(2.5, &config), Classification::ProbableHam);
    }

    #[test]
    fn test_classification_serializes_snake_case() {
        assert_eq!(json!(Classification::ProbableSpam), json!("probable_spam"));
        assert_eq!(Classification::ProbableHam.to_string(), "probable_ham");
    }

    #[test]
    fn test_result_shape() {
        let scorer = SpamScorer::new();
        let email = text_email("Hello", "Hi Bob, lunch tomorrow?");
        let result = scorer.analyze_at(&email, scorer.config(), fixed_now());
        let value = serde_json::to_value(&result).unwrap();
        for key in [
            "isSpam",
            "score",
            "threshold",
            "confidence",
            "classification",
            "analyzerResults",
            "topReasons",
            "processingTimeMs",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert!(value.get("debug").is_none());
        assert_eq!(result.analyzer_results.len(), 6);
        assert_eq!(result.threshold, 3.5);
    }

    #[test]
    fn test_confidence_formula() {
        let scorer = SpamScorer::new();
        let result = scorer.analyze_at(&text_email("", ""), scorer.config(), fixed_now());
        let contributing = result
            .analyzer_results
            .iter()
            .filter(|r| !r.matches.is_empty())
            .count();
        let expected = (contributing as f64 / 6.0 + 0.2).min(1.0);
        assert!((result.confidence - expected).abs() < 1e-9);
        assert!(result.confidence <= 1.0);
    }

    #[test]
    fn test_top_reasons_sorted_and_positive() {
        let scorer = SpamScorer::new();
        let email = text_email(
            "URGENT!!! WIN $1,000,000 NOW",
            "Dear friend, V1AGRA free money!!! Click here to claim your prize. Act now, limited time.",
        );
        let result = scorer.analyze_at(&email, scorer.config(), fixed_now());
        assert!(!result.top_reasons.is_empty());
        assert!(result.top_reasons.len() <= 5);

        let mut scores: Vec<f64> = result
            .analyzer_results
            .iter()
            .flat_map(|r| r.matches.iter())
            .filter(|m| !m.explanatory && m.score() > 0.0)
            .map(|m| m.score())
            .collect();
        scores.sort_by(|a, b| b.total_cmp(a));
        let best = result
            .analyzer_results
            .iter()
            .flat_map(|r| r.matches.iter())
            .find(|m| m.reason() == result.top_reasons[0])
            .unwrap();
        assert_eq!(best.score(), scores[0]);
    }

    #[test]
    fn test_bayes_token_matches_stay_out_of_top_reasons() {
        let scorer = SpamScorer::new();
        let email = text_email("", "V1AGRA CIALIS free money act now!!! urgent urgent urgent");
        let result = scorer.analyze_at(&email, scorer.config(), fixed_now());
        let bayes = result
            .analyzer_results
            .iter()
            .find(|r| r.analyzer_name == "bayesian")
            .unwrap();
        assert!(bayes.has_match("BAYES_SPAM_TOKENS"));
        assert!(result
            .top_reasons
            .iter()
            .all(|reason| !reason.starts_with("BAYES_SPAM_TOKENS")));
        assert!(result
            .top_reasons
            .iter()
            .any(|reason| reason.starts_with("BAYES_SPAM:")));
    }

    #[test]
    fn test_debug_info() {
        let scorer = SpamScorer::new();
        let config = ScoringConfig {
            enable_debug: true,
            ..Default::default()
        };
        let email = text_email(
            "Invoice",
            "Write to billing@example.com or visit https://example.com/pay today",
        );
        let result = scorer.analyze_at(&email, &config, fixed_now());
        let debug = result.debug.unwrap();
        assert_eq!(debug.emails, vec!["billing@example.com"]);
        assert!(debug.urls.iter().any(|u| u.contains("example.com/pay")));
        assert_eq!(debug.dataset_language, "en");
        assert!(debug.text_statistics.word_count > 5);
        assert!(debug.text_statistics.body_entropy > 0.0);
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        let scorer = SpamScorer::new().with_datasets(Arc::new(DatasetRegistry::new()));
        let config = ScoringConfig {
            enable_debug: true,
            ..Default::default()
        };
        let email = text_email(
            "Rechnung",
            "Sehr geehrte Damen und Herren, die Rechnung ist nicht mit der Post gekommen und wir haben sie auch nicht",
        );
        let result = scorer.analyze_at(&email, &config, fixed_now());
        let debug = result.debug.unwrap();
        assert_eq!(debug.detected_language.code, "de");
        assert_eq!(debug.dataset_language, "en");
    }

    #[test]
    fn test_registered_language_is_used() {
        let mut registry = DatasetRegistry::with_english();
        registry.register(LanguageDataset {
            language: "de".to_string(),
            ..Default::default()
        });
        let scorer = SpamScorer::new().with_datasets(Arc::new(registry));
        let config = ScoringConfig {
            enable_debug: true,
            ..Default::default()
        };
        let email = text_email(
            "Rechnung",
            "Sehr geehrte Damen und Herren, die Rechnung ist nicht mit der Post gekommen und wir haben sie auch nicht",
        );
        let result = scorer.analyze_at(&email, &config, fixed_now());
        assert_eq!(result.debug.unwrap().dataset_language, "de");
    }

    #[test]
    fn test_batch_isolates_bad_items() {
        let scorer = SpamScorer::new();
        let values = vec![
            json!({"subject": "Hi", "textBody": "See you at lunch tomorrow"}),
            Value::Null,
            json!("not an email"),
            json!({"subject": "Second"}),
        ];
        let report = scorer.analyze_batch(&values);
        assert_eq!(report.results.len(), 4);
        assert_eq!(report.summary.total, 4);
        assert_eq!(report.summary.errors, 2);
        assert!(report.results[0].result.is_some());
        assert!(report.results[1].error.is_some());
        assert!(report.results[2].error.is_some());
        assert!(report.results[3].result.is_some());
        assert_eq!(
            report.summary.spam
                + report.summary.probable_spam
                + report.summary.probable_ham
                + report.summary.ham,
            2
        );
        assert_eq!(report.results[3].index, 3);
    }

    #[tokio::test]
    async fn test_concurrent_batch_keeps_order() {
        let scorer = Arc::new(SpamScorer::new());
        let values = vec![
            json!({"subject": "one"}),
            Value::Null,
            json!({"subject": "three", "textBody": "hello there"}),
        ];
        let concurrent =
            SpamScorer::analyze_batch_concurrent(Arc::clone(&scorer), values.clone()).await;
        let sequential = scorer.analyze_batch(&values);

        assert_eq!(concurrent.summary, sequential.summary);
        for (a, b) in concurrent.results.iter().zip(&sequential.results) {
            assert_eq!(a.index, b.index);
            assert_eq!(a.error.is_some(), b.error.is_some());
            if let (Some(ra), Some(rb)) = (&a.result, &b.result) {
                assert_eq!(ra.classification, rb.classification);
            }
        }
    }

    #[test]
    fn test_from_app_config_missing_dir() {
        let config = AppConfig {
            datasets_dir: Some("/nonexistent/spamlens/datasets".to_string()),
            ..Default::default()
        };
        assert!(SpamScorer::from_app_config(&config).is_err());
    }

    #[test]
    fn test_from_app_config_loads_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fr.yaml"), "language: fr\n").unwrap();
        let config = AppConfig {
            datasets_dir: Some(dir.path().display().to_string()),
            ..Default::default()
        };
        let scorer = SpamScorer::from_app_config(&config).unwrap();
        assert_eq!(scorer.languages(), vec!["en", "fr"]);
    }
}
