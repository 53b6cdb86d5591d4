//! Bayesian Analyzer
//!
//! Robinson-Fisher combination over the dataset's token frequency table. The
//! aggregate probability is mapped onto the shared score scale; per-token
//! spam/ham matches are reported for explanation only.

use super::{AnalysisContext, Analyzer};
use crate::rules::{AnalyzerResult, RuleCatalog, RuleCategory, RuleDef, RuleMatch};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;

const RULES: &[RuleDef] = &[
    RuleDef::new(
        "BAYES_SPAM",
        "Statistical token analysis indicates spam",
        4.0,
        RuleCategory::Statistical,
    ),
    RuleDef::new(
        "BAYES_HAM",
        "Statistical token analysis indicates ham",
        -2.0,
        RuleCategory::Statistical,
    ),
    RuleDef::new(
        "BAYES_SPAM_TOKENS",
        "Contains spam-associated tokens",
        2.0,
        RuleCategory::Statistical,
    ),
    RuleDef::new(
        "BAYES_HAM_TOKENS",
        "Contains ham-associated tokens",
        -1.5,
        RuleCategory::Statistical,
    ),
];

const MIN_TOKEN_CHARS: usize = 3;
const MAX_TOKEN_CHARS: usize = 20;
const REPEAT_THRESHOLD: usize = 3;
const INTERESTING_TOKENS: usize = 15;
const NEUTRAL: f64 = 0.5;
const SPAM_TOKEN_PROBABILITY: f64 = 0.7;
const HAM_TOKEN_PROBABILITY: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenProbability {
    pub token: String,
    pub probability: f64,
}

/// Lowercased word tokens of 3-20 characters, each kept once, plus a second
/// copy for tokens seen at least three times.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '\'' || c == '-' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order = Vec::new();
    for word in cleaned.split_whitespace() {
        let len = word.chars().count();
        if !(MIN_TOKEN_CHARS..=MAX_TOKEN_CHARS).contains(&len) {
            continue;
        }
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    let mut tokens = Vec::with_capacity(order.len());
    for word in order {
        tokens.push(word.to_string());
        if counts[word] >= REPEAT_THRESHOLD {
            tokens.push(word.to_string());
        }
    }
    tokens
}

/// The most opinionated known tokens, furthest from 0.5 first.
pub fn interesting_tokens(known: &[TokenProbability]) -> Vec<TokenProbability> {
    let mut sorted = known.to_vec();
    // Stable sort keeps first-seen order among equally strong tokens.
    sorted.sort_by(|a, b| {
        let da = (a.probability - NEUTRAL).abs();
        let db = (b.probability - NEUTRAL).abs();
        db.total_cmp(&da)
    });
    sorted.truncate(INTERESTING_TOKENS);
    sorted
}

/// Robinson-Fisher combination; neutral when nothing is known.
pub fn combine(tokens: &[TokenProbability]) -> f64 {
    if tokens.is_empty() {
        return NEUTRAL;
    }
    let product_spam: f64 = tokens.iter().map(|t| t.probability).product();
    let product_ham: f64 = tokens.iter().map(|t| 1.0 - t.probability).product();
    let denominator = product_spam + product_ham;
    if denominator <= 0.0 || !denominator.is_finite() {
        return NEUTRAL;
    }
    (product_spam / denominator).clamp(0.0, 1.0)
}

fn percent(probability: f64) -> String {
    format!("{:.1}% spam probability", probability * 100.0)
}

/// Map a spam probability onto the score scale. Ham side can go negative.
pub fn probability_score(probability: f64) -> f64 {
    if probability > 0.9 {
        4.0
    } else if probability > 0.8 {
        3.0
    } else if probability > 0.7 {
        2.0
    } else if probability > 0.6 {
        1.0
    } else if probability > 0.5 {
        0.5
    } else if probability < 0.2 {
        -2.0
    } else if probability < 0.3 {
        -1.0
    } else {
        0.0
    }
}

pub struct BayesianAnalyzer {
    rules: RuleCatalog,
}

impl Default for BayesianAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl BayesianAnalyzer {
    pub fn new() -> Self {
        Self {
            rules: RuleCatalog::new(RULES),
        }
    }

    fn token_matches(&self, known: &[TokenProbability]) -> Vec<RuleMatch> {
        let mut spam_tokens: Vec<&str> = Vec::new();
        let mut ham_tokens: Vec<&str> = Vec::new();
        for t in known {
            let list = if t.probability > SPAM_TOKEN_PROBABILITY {
                &mut spam_tokens
            } else if t.probability < HAM_TOKEN_PROBABILITY {
                &mut ham_tokens
            } else {
                continue;
            };
            if !list.contains(&t.token.as_str()) {
                list.push(&t.token);
            }
        }

        let mut matches = Vec::new();
        if !spam_tokens.is_empty() {
            let score = (spam_tokens.len() as f64 * 0.3).min(2.0);
            matches.extend(self.rules.hit_scored("BAYES_SPAM_TOKENS", score).map(|m| {
                m.with_details(format!("{} spam tokens", spam_tokens.len()))
                    .with_evidence(spam_tokens.iter().copied())
                    .explanatory()
            }));
        }
        if !ham_tokens.is_empty() {
            let score = -(ham_tokens.len() as f64 * 0.2).min(1.5);
            matches.extend(self.rules.hit_scored("BAYES_HAM_TOKENS", score).map(|m| {
                m.with_details(format!("{} ham tokens", ham_tokens.len()))
                    .with_evidence(ham_tokens.iter().copied())
                    .explanatory()
            }));
        }
        matches
    }
}

impl Analyzer for BayesianAnalyzer {
    fn name(&self) -> &str {
        "bayesian"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalyzerResult {
        let tokens = tokenize(&ctx.combined);
        let known: Vec<TokenProbability> = tokens
            .iter()
            .filter_map(|token| {
                ctx.dataset
                    .token_probability(token)
                    .map(|probability| TokenProbability {
                        token: token.clone(),
                        probability,
                    })
            })
            .collect();

        let top = interesting_tokens(&known);
        let probability = combine(&top);
        let mapped = probability_score(probability);

        let mut matches = Vec::new();
        if !tokens.is_empty() {
            if probability > SPAM_TOKEN_PROBABILITY {
                matches.extend(
                    self.rules
                        .hit_scored("BAYES_SPAM", mapped)
                        .map(|m| m.with_details(percent(probability))),
                );
            } else if probability < HAM_TOKEN_PROBABILITY {
                matches.extend(
                    self.rules
                        .hit_scored("BAYES_HAM", mapped)
                        .map(|m| m.with_details(percent(probability))),
                );
            }
            matches.extend(self.token_matches(&known));
        }

        log::debug!(
            "bayesian: {} tokens, {} known, p={:.4}, score={}",
            tokens.len(),
            known.len(),
            probability,
            mapped
        );

        let mut metadata = serde_json::Map::new();
        metadata.insert("spamProbability".into(), json!(probability));
        metadata.insert("tokenCount".into(), json!(tokens.len()));
        metadata.insert("knownTokenCount".into(), json!(known.len()));
        metadata.insert("topTokens".into(), json!(top));

        // Token matches explain the verdict but do not add to it.
        AnalyzerResult::with_score(self.name(), mapped, self.rules.max_score(), matches, metadata)
    }

    fn catalog(&self) -> &RuleCatalog {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::testing::{run, text_email};

    fn tp(token: &str, probability: f64) -> TokenProbability {
        TokenProbability {
            token: token.to_string(),
            probability,
        }
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("Don't MISS this: e-mail me, me, ok? a-b-c-d go go go go");
        assert_eq!(tokens, vec!["don't", "miss", "this", "e-mail", "a-b-c-d"]);

        let repeated = tokenize("spam spam spam eggs eggs");
        assert_eq!(repeated, vec!["spam", "spam", "eggs"]);

        let long = "x".repeat(21);
        assert!(tokenize(&long).is_empty());
        assert_eq!(tokenize("straße ünïcode"), vec!["straße", "ünïcode"]);
    }

    #[test]
    fn test_combine() {
        assert_eq!(combine(&[]), 0.5);
        assert!(combine(&[tp("a", 0.99), tp("b", 0.9)]) > 0.99);
        assert!(combine(&[tp("a", 0.01), tp("b", 0.1)]) < 0.01);
        // Certain spam and certain ham cancel out to neutral.
        assert_eq!(combine(&[tp("a", 1.0), tp("b", 0.0)]), 0.5);
    }

    #[test]
    fn test_interesting_tokens_limits_and_orders() {
        let known: Vec<_> = (0..20)
            .map(|i| tp(&format!("t{}", i), 0.5 + i as f64 / 50.0))
            .collect();
        let top = interesting_tokens(&known);
        assert_eq!(top.len(), 15);
        assert_eq!(top[0].token, "t19");
        assert!(top.iter().all(|t| t.token != "t0"));
    }

    #[test]
    fn test_probability_score_boundaries() {
        assert_eq!(probability_score(0.95), 4.0);
        assert_eq!(probability_score(0.9), 3.0);
        assert_eq!(probability_score(0.75), 2.0);
        assert_eq!(probability_score(0.7), 1.0);
        assert_eq!(probability_score(0.6), 0.5);
        assert_eq!(probability_score(0.5), 0.0);
        assert_eq!(probability_score(0.3), 0.0);
        assert_eq!(probability_score(0.25), -1.0);
        assert_eq!(probability_score(0.2), -1.0);
        assert_eq!(probability_score(0.1), -2.0);
    }

    #[test]
    fn test_empty_input_is_neutral() {
        let result = run(&BayesianAnalyzer::new(), &text_email("", ""));
        assert_eq!(result.score, 0.0);
        assert_eq!(result.metadata["spamProbability"], json!(0.5));
        assert!(result.matches.is_empty());
    }

    #[test]
    fn test_unknown_tokens_are_neutral() {
        let result = run(&BayesianAnalyzer::new(), &text_email("zzqx", "blorp fnord quux"));
        assert_eq!(result.metadata["spamProbability"], json!(0.5));
        assert_eq!(result.score, 0.0);
        assert!(result.matches.is_empty());
    }

    #[test]
    fn test_spam_text() {
        let email = text_email("", "V1AGRA CIALIS free money act now!!! urgent urgent urgent");
        let result = run(&BayesianAnalyzer::new(), &email);
        assert_eq!(result.score, 4.0);
        assert_eq!(result.find("BAYES_SPAM").unwrap().score(), 4.0);
        let tokens = result.find("BAYES_SPAM_TOKENS").unwrap();
        assert!(tokens.evidence.contains(&"v1agra".to_string()));
        assert!(tokens.score() <= 2.0);
        assert!(tokens.explanatory);
        assert!(!result.find("BAYES_SPAM").unwrap().explanatory);
    }

    #[test]
    fn test_ham_text_floors_score() {
        let email = text_email(
            "Project meeting agenda",
            "Thanks team, attached is the report for tomorrow's meeting. Regards",
        );
        let result = run(&BayesianAnalyzer::new(), &email);
        assert_eq!(result.score, 0.0);
        let verdict = result.find("BAYES_HAM").unwrap();
        assert!(verdict.score() < 0.0);
        assert!(result.find("BAYES_HAM_TOKENS").unwrap().score() >= -1.5);
    }
}
