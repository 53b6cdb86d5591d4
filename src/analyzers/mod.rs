pub mod bayesian;
pub mod content;
pub mod header;
pub mod html;
pub mod pattern;
pub mod url;

use crate::dataset::Dataset;
use crate::email::EmailRecord;
use crate::rules::{AnalyzerResult, RuleCatalog};
use crate::text;
use chrono::{DateTime, Utc};

/// Read-only view of one email shared by all analyzers of a single analysis.
///
/// The derived texts are computed once here so that every analyzer sees the
/// same body representation.
pub struct AnalysisContext<'a> {
    pub email: &'a EmailRecord,
    pub dataset: &'a Dataset,
    pub now: DateTime<Utc>,
    /// HTML body rendered to text (empty without an HTML body).
    pub html_text: String,
    /// Whichever of the plain-text body and `html_text` is longer.
    pub body: String,
    /// Subject and body joined by a newline.
    pub combined: String,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(email: &'a EmailRecord, dataset: &'a Dataset, now: DateTime<Utc>) -> Self {
        let html_text = text::html_to_text(&email.html_body);
        let body = if html_text.chars().count() > email.text_body.chars().count() {
            html_text.clone()
        } else {
            email.text_body.clone()
        };
        let combined = format!("{}\n{}", email.subject, body);

        Self {
            email,
            dataset,
            now,
            html_text,
            body,
            combined,
        }
    }
}

pub trait Analyzer: Send + Sync {
    fn name(&self) -> &str;
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalyzerResult;
    fn catalog(&self) -> &RuleCatalog;
}

/// The six analyzers in reporting order.
pub fn default_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(header::HeaderAnalyzer::new()),
        Box::new(content::ContentAnalyzer::new()),
        Box::new(url::UrlAnalyzer::new()),
        Box::new(html::HtmlAnalyzer::new()),
        Box::new(pattern::PatternAnalyzer::new()),
        Box::new(bayesian::BayesianAnalyzer::new()),
    ]
}
