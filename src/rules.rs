//! Rule catalogs, rule matches and per-analyzer results.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Upper bound on evidence strings kept per match.
pub const MAX_EVIDENCE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Header,
    Authentication,
    Content,
    Url,
    Html,
    Obfuscation,
    Formatting,
    Structure,
    Encoding,
    Statistical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRule {
    pub name: String,
    pub description: String,
    #[serde(rename = "score")]
    pub base_score: f64,
    pub category: RuleCategory,
}

/// Compact definition used for the static per-analyzer tables.
#[derive(Debug, Clone, Copy)]
pub struct RuleDef {
    pub name: &'static str,
    pub description: &'static str,
    pub score: f64,
    pub category: RuleCategory,
}

impl RuleDef {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        score: f64,
        category: RuleCategory,
    ) -> Self {
        Self {
            name,
            description,
            score,
            category,
        }
    }
}

/// Frozen name-indexed rule table, built once per analyzer.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    rules: HashMap<&'static str, RuleDef>,
    order: Vec<&'static str>,
}

impl RuleCatalog {
    pub fn new(defs: &[RuleDef]) -> Self {
        let mut rules = HashMap::new();
        let mut order = Vec::new();
        for def in defs {
            if rules.insert(def.name, *def).is_some() {
                log::warn!("Duplicate rule name in catalog: {}", def.name);
            } else {
                order.push(def.name);
            }
        }
        Self { rules, order }
    }

    pub fn get(&self, name: &str) -> Option<&RuleDef> {
        self.rules.get(name)
    }

    /// Build a match for a catalog rule at its base score.
    pub fn hit(&self, name: &str) -> Option<RuleMatch> {
        match self.rules.get(name) {
            Some(def) => Some(RuleMatch::new(AnalysisRule::from(def))),
            None => {
                log::warn!("Unknown rule requested from catalog: {}", name);
                None
            }
        }
    }

    /// Build a match whose score is decided at match time (dataset-driven rules).
    pub fn hit_scored(&self, name: &str, score: f64) -> Option<RuleMatch> {
        self.hit(name).map(|mut m| {
            m.rule.base_score = score;
            m
        })
    }

    /// Sum of every positive base score, used for `max_score` reporting.
    pub fn max_score(&self) -> f64 {
        self.rules.values().map(|r| r.score.max(0.0)).sum()
    }

    pub fn rules(&self) -> impl Iterator<Item = &RuleDef> {
        self.order.iter().filter_map(|name| self.rules.get(name))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl From<&RuleDef> for AnalysisRule {
    fn from(def: &RuleDef) -> Self {
        Self {
            name: def.name.to_string(),
            description: def.description.to_string(),
            base_score: def.score,
            category: def.category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleMatch {
    pub rule: AnalysisRule,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
    /// Shown with the analyzer's matches but kept out of the overall top reasons.
    #[serde(skip)]
    pub explanatory: bool,
}

impl RuleMatch {
    pub fn new(rule: AnalysisRule) -> Self {
        Self {
            rule,
            matched: true,
            details: None,
            evidence: Vec::new(),
            explanatory: false,
        }
    }

    pub fn explanatory(mut self) -> Self {
        self.explanatory = true;
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach evidence strings, keeping at most [`MAX_EVIDENCE`].
    pub fn with_evidence<I, S>(mut self, evidence: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evidence = evidence
            .into_iter()
            .take(MAX_EVIDENCE)
            .map(Into::into)
            .collect();
        self
    }

    pub fn score(&self) -> f64 {
        self.rule.base_score
    }

    pub fn name(&self) -> &str {
        &self.rule.name
    }

    /// `"<name>: <description> (<details>)"`, details omitted when absent.
    pub fn reason(&self) -> String {
        match &self.details {
            Some(details) => format!(
                "{}: {} ({})",
                self.rule.name, self.rule.description, details
            ),
            None => format!("{}: {}", self.rule.name, self.rule.description),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerResult {
    pub analyzer_name: String,
    pub score: f64,
    pub max_score: f64,
    pub matches: Vec<RuleMatch>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl AnalyzerResult {
    /// Result whose score is the floored sum of its matches.
    pub fn from_matches(
        analyzer_name: &str,
        max_score: f64,
        matches: Vec<RuleMatch>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let total: f64 = matches.iter().map(RuleMatch::score).sum();
        Self::with_score(analyzer_name, total, max_score, matches, metadata)
    }

    /// Result with an explicitly computed score (floored at zero).
    pub fn with_score(
        analyzer_name: &str,
        score: f64,
        max_score: f64,
        matches: Vec<RuleMatch>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            analyzer_name: analyzer_name.to_string(),
            score: score.max(0.0),
            max_score,
            matches,
            metadata,
        }
    }

    pub fn empty(analyzer_name: &str, max_score: f64) -> Self {
        Self::with_score(analyzer_name, 0.0, max_score, Vec::new(), serde_json::Map::new())
    }

    pub fn has_match(&self, name: &str) -> bool {
        self.matches.iter().any(|m| m.rule.name == name)
    }

    pub fn match_count(&self, name: &str) -> usize {
        self.matches.iter().filter(|m| m.rule.name == name).count()
    }

    pub fn find(&self, name: &str) -> Option<&RuleMatch> {
        self.matches.iter().find(|m| m.rule.name == name)
    }
}
