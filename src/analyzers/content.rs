//! Content Analyzer
//!
//! Lexical checks over subject and body against the active language dataset:
//! subject patterns, spam phrases and words, ham phrase offsets, and a few
//! shape statistics (caps, special characters, exclamations, money amounts).

use super::{AnalysisContext, Analyzer};
use crate::rules::{AnalyzerResult, RuleCatalog, RuleCategory, RuleDef, RuleMatch};
use crate::text;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use std::collections::HashSet;

const RULES: &[RuleDef] = &[
    RuleDef::new(
        "EMPTY_BODY",
        "Message body is empty or nearly empty",
        0.5,
        RuleCategory::Content,
    ),
    RuleDef::new(
        "HTML_ONLY",
        "HTML body without a text alternative",
        0.5,
        RuleCategory::Structure,
    ),
    RuleDef::new(
        "SUBJECT_EMPTY",
        "Subject is empty",
        0.3,
        RuleCategory::Content,
    ),
    RuleDef::new(
        "SUBJECT_ALL_CAPS",
        "Subject is written in capitals",
        1.5,
        RuleCategory::Formatting,
    ),
    RuleDef::new(
        "SUBJECT_PATTERN",
        "Subject matches a spam pattern",
        1.0,
        RuleCategory::Content,
    ),
    RuleDef::new(
        "SPAM_PHRASE",
        "Contains a known spam phrase",
        1.0,
        RuleCategory::Content,
    ),
    RuleDef::new(
        "SPAM_WORD",
        "Contains a spam-associated word",
        0.5,
        RuleCategory::Content,
    ),
    RuleDef::new(
        "HAM_PHRASE",
        "Contains legitimate correspondence phrasing",
        -0.3,
        RuleCategory::Content,
    ),
    RuleDef::new(
        "EXCESSIVE_CAPS",
        "Body is largely uppercase",
        1.0,
        RuleCategory::Formatting,
    ),
    RuleDef::new(
        "EXCESSIVE_SPECIAL_CHARS",
        "High ratio of special characters",
        1.0,
        RuleCategory::Formatting,
    ),
    RuleDef::new(
        "EXCESSIVE_EXCLAMATION",
        "Too many exclamation marks",
        1.0,
        RuleCategory::Formatting,
    ),
    RuleDef::new(
        "MONEY_AMOUNTS",
        "Many money amounts mentioned",
        1.0,
        RuleCategory::Content,
    ),
];

const MIN_BODY_CHARS: usize = 10;
const SUBJECT_CAPS_MIN_LETTERS: usize = 5;
const SUBJECT_CAPS_RATIO: f64 = 0.8;
const BODY_CAPS_RATIO: f64 = 0.3;
const BODY_CAPS_MIN_WORDS: usize = 20;
const SPECIAL_CHAR_RATIO: f64 = 0.15;
const MAX_EXCLAMATIONS: usize = 5;
const MAX_MONEY_AMOUNTS: usize = 3;

lazy_static! {
    static ref MONEY_AMOUNT: Regex = Regex::new(
        r"(?i)\$\s?\d[\d,]*(?:\.\d+)?|\b\d[\d,]*(?:\.\d+)?\s?(?:dollars|usd|eur|gbp)\b"
    )
    .unwrap();
}

pub struct ContentAnalyzer {
    rules: RuleCatalog,
}

impl Default for ContentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentAnalyzer {
    pub fn new() -> Self {
        Self {
            rules: RuleCatalog::new(RULES),
        }
    }

    fn analyze_structure(&self, ctx: &AnalysisContext<'_>) -> Vec<RuleMatch> {
        let email = ctx.email;
        let mut matches = Vec::new();

        if ctx.body.trim().chars().count() < MIN_BODY_CHARS {
            matches.extend(self.rules.hit("EMPTY_BODY"));
        }
        if !email.html_body.trim().is_empty() && email.text_body.trim().is_empty() {
            matches.extend(self.rules.hit("HTML_ONLY"));
        }
        if email.subject.trim().is_empty() {
            matches.extend(self.rules.hit("SUBJECT_EMPTY"));
        }
        matches
    }

    fn analyze_subject(&self, ctx: &AnalysisContext<'_>) -> Vec<RuleMatch> {
        let subject = &ctx.email.subject;
        let mut matches = Vec::new();

        let (upper, letters) = letter_case_counts(subject);
        if letters > SUBJECT_CAPS_MIN_LETTERS && ratio(upper, letters) > SUBJECT_CAPS_RATIO {
            matches.extend(self.rules.hit("SUBJECT_ALL_CAPS"));
        }

        // Every matching pattern contributes; there is no first-match cutoff.
        for pattern in ctx.dataset.subject_patterns() {
            if let Some(found) = pattern.regex.find(subject) {
                matches.extend(
                    self.rules
                        .hit_scored("SUBJECT_PATTERN", pattern.score)
                        .map(|m| {
                            m.with_details(pattern.label.clone())
                                .with_evidence([found.as_str()])
                        }),
                );
            }
        }
        matches
    }

    fn analyze_phrases(&self, ctx: &AnalysisContext<'_>, normalized: &str) -> Vec<RuleMatch> {
        let data = ctx.dataset.data();
        let mut matches = Vec::new();

        for phrase in &data.spam_phrases {
            if phrase.phrase.trim().is_empty() {
                continue;
            }
            let found = if phrase.case_sensitive {
                ctx.combined.contains(&phrase.phrase)
            } else {
                normalized.contains(&text::normalize(&phrase.phrase))
            };
            if found {
                matches.extend(
                    self.rules
                        .hit_scored("SPAM_PHRASE", phrase.score)
                        .map(|m| m.with_details(phrase.phrase.clone())),
                );
            }
        }

        for (phrase, adjustment) in &data.ham_phrase_adjustments {
            let needle = text::normalize(phrase);
            if !needle.is_empty() && normalized.contains(&needle) {
                matches.extend(
                    self.rules
                        .hit_scored("HAM_PHRASE", *adjustment)
                        .map(|m| m.with_details(phrase.clone())),
                );
            }
        }
        matches
    }

    fn analyze_words(&self, ctx: &AnalysisContext<'_>, normalized: &str) -> Vec<RuleMatch> {
        let scores = &ctx.dataset.data().spam_single_word_scores;
        let mut credited = HashSet::new();
        let mut matches = Vec::new();

        for token in normalized.split_whitespace() {
            let word = token.trim_matches(|c: char| !c.is_alphanumeric());
            if word.is_empty() {
                continue;
            }
            if let Some(score) = scores.get(word) {
                if credited.insert(word) {
                    matches.extend(
                        self.rules
                            .hit_scored("SPAM_WORD", *score)
                            .map(|m| m.with_details(word)),
                    );
                }
            }
        }
        matches
    }

    fn analyze_formatting(
        &self,
        ctx: &AnalysisContext<'_>,
    ) -> (Vec<RuleMatch>, serde_json::Map<String, serde_json::Value>) {
        let body = &ctx.body;
        let mut matches = Vec::new();
        let mut stats = serde_json::Map::new();

        let (upper, letters) = letter_case_counts(body);
        let word_count = text::word_count(body);
        let caps_ratio = ratio(upper, letters);
        if caps_ratio > BODY_CAPS_RATIO && word_count > BODY_CAPS_MIN_WORDS {
            matches.extend(
                self.rules
                    .hit("EXCESSIVE_CAPS")
                    .map(|m| m.with_details(format!("{:.0}% uppercase", caps_ratio * 100.0))),
            );
        }

        let total_chars = body.chars().count();
        let special = body.chars().filter(|c| is_special(*c)).count();
        let special_ratio = ratio(special, total_chars);
        if special_ratio > SPECIAL_CHAR_RATIO {
            let details = format!("{:.0}% special characters", special_ratio * 100.0);
            matches.extend(
                self.rules
                    .hit("EXCESSIVE_SPECIAL_CHARS")
                    .map(|m| m.with_details(details)),
            );
        }

        let exclamations = ctx.combined.matches('!').count();
        if exclamations > MAX_EXCLAMATIONS {
            matches.extend(
                self.rules
                    .hit("EXCESSIVE_EXCLAMATION")
                    .map(|m| m.with_details(format!("{} exclamation marks", exclamations))),
            );
        }

        let amounts: Vec<&str> = MONEY_AMOUNT
            .find_iter(&ctx.combined)
            .map(|m| m.as_str())
            .collect();
        if amounts.len() > MAX_MONEY_AMOUNTS {
            matches.extend(
                self.rules
                    .hit("MONEY_AMOUNTS")
                    .map(|m| {
                        m.with_details(format!("{} amounts", amounts.len()))
                            .with_evidence(amounts.iter().copied())
                    }),
            );
        }

        stats.insert("wordCount".into(), json!(word_count));
        stats.insert("uppercaseRatio".into(), json!(caps_ratio));
        stats.insert("specialCharRatio".into(), json!(special_ratio));
        stats.insert("exclamationCount".into(), json!(exclamations));
        stats.insert("moneyAmountCount".into(), json!(amounts.len()));
        (matches, stats)
    }
}

/// `(uppercase letters, all letters)`.
fn letter_case_counts(s: &str) -> (usize, usize) {
    s.chars()
        .filter(|c| c.is_alphabetic())
        .fold((0, 0), |(upper, letters), c| {
            (upper + usize::from(c.is_uppercase()), letters + 1)
        })
}

fn is_special(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace() && !".,!?'\"-:;()".contains(c)
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

impl Analyzer for ContentAnalyzer {
    fn name(&self) -> &str {
        "content"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalyzerResult {
        let normalized = text::normalize(&ctx.combined);
        let mut matches = Vec::new();

        matches.extend(self.analyze_structure(ctx));
        matches.extend(self.analyze_subject(ctx));
        matches.extend(self.analyze_phrases(ctx, &normalized));
        matches.extend(self.analyze_words(ctx, &normalized));
        let (formatting, mut metadata) = self.analyze_formatting(ctx);
        matches.extend(formatting);

        metadata.insert("language".into(), json!(ctx.dataset.language()));
        metadata.insert("bodyLength".into(), json!(ctx.body.chars().count()));

        AnalyzerResult::from_matches(self.name(), self.rules.max_score(), matches, metadata)
    }

    fn catalog(&self) -> &RuleCatalog {
        &self.rules
    }
}
