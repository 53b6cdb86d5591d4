//! Pattern Analyzer
//!
//! A fixed catalog of regex rules for obfuscation, formatting, scam phrasing,
//! structure and encoding tricks, plus a handful of computed checks that a
//! single regex cannot express: greeting heuristics, script mixing, word salad,
//! duplicated sentences, high-entropy footers and urgency vocabulary density.

use super::{AnalysisContext, Analyzer};
use crate::language::LanguageDetector;
use crate::rules::RuleCategory::{
    Content, Encoding, Formatting, Obfuscation, Statistical, Structure,
};
use crate::rules::{AnalyzerResult, RuleCatalog, RuleCategory, RuleDef, RuleMatch};
use crate::text;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use std::collections::{HashMap, HashSet};

/// Which text a catalog rule is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Subject and body.
    Combined,
    /// The selected body only.
    Body,
    /// First non-empty line of the body.
    BodyStart,
    /// Raw text and HTML bodies, markup included.
    Raw,
}

#[derive(Debug, Clone)]
pub struct PatternRule {
    pub def: RuleDef,
    pub regex: Regex,
    pub target: Target,
    pub min_matches: usize,
}

const fn rule(
    name: &'static str,
    description: &'static str,
    score: f64,
    category: RuleCategory,
) -> RuleDef {
    RuleDef::new(name, description, score, category)
}

/// Regex-backed catalog: definition, pattern, target, minimum match count.
const CATALOG: &[(RuleDef, &str, Target, usize)] = &[
    (
        rule(
            "SPACED_LETTERS",
            "Words spelled out with separated letters",
            1.5,
            Obfuscation,
        ),
        r"(?i)\b[a-z](?:[ ._*-][a-z]){4,}\b",
        Target::Combined,
        1,
    ),
    (
        rule(
            "SYMBOL_SUBSTITUTION",
            "Currency symbols used in place of letters",
            1.5,
            Obfuscation,
        ),
        r"(?i)\b[a-z]+[$€£][a-z]+\b",
        Target::Combined,
        1,
    ),
    (
        rule(
            "ZERO_WIDTH_CHARS",
            "Zero-width characters inside text",
            1.0,
            Obfuscation,
        ),
        r"[\u{200B}\u{200C}\u{200D}]",
        Target::Combined,
        1,
    ),
    (
        rule(
            "HOMOGRAPH_MIX",
            "Latin and Cyrillic letters mixed inside a word",
            2.0,
            Obfuscation,
        ),
        r"\p{Latin}\p{Cyrillic}|\p{Cyrillic}\p{Latin}",
        Target::Combined,
        1,
    ),
    (
        rule(
            "EXCESSIVE_PUNCTUATION",
            "Runs of exclamation or question marks",
            1.0,
            Formatting,
        ),
        r"[!?]{3,}",
        Target::Combined,
        1,
    ),
    (
        rule(
            "ALL_CAPS_BLOCK",
            "Block of consecutive all-caps words",
            1.0,
            Formatting,
        ),
        r"\b[A-Z]{2,}(?:[ \t]+[A-Z]{2,}){4,}\b",
        Target::Combined,
        1,
    ),
    (
        rule(
            "ALTERNATING_CASE",
            "Alternating upper and lower case",
            1.0,
            Formatting,
        ),
        r"\b(?:[a-z][A-Z]){3,}[a-z]?\b|\b(?:[A-Z][a-z]){3,}[A-Z]\b",
        Target::Combined,
        1,
    ),
    (
        rule("CURRENCY_MENTION", "Mentions money amounts", 0.3, Content),
        r"[$€£]\s?\d",
        Target::Combined,
        1,
    ),
    (
        rule(
            "LARGE_MONEY",
            "Mentions very large sums of money",
            2.0,
            Content,
        ),
        r"(?i)[$€£]\s?\d{1,3}(?:,\d{3}){2,}|[$€£]\s?\d{7,}|\b\d+(?:\.\d+)?\s*(?:million|billion)\b|[$€£]\s?\d+(?:\.\d+)?\s*m\b",
        Target::Combined,
        1,
    ),
    (
        rule(
            "PERCENTAGE_CLAIM",
            "Percentage discount or return claim",
            1.0,
            Content,
        ),
        r"(?i)\b\d{2,3}\s?%\s?(?:off|free|guaranteed|discount|savings?|returns?|profit|interest)\b",
        Target::Combined,
        1,
    ),
    (
        rule(
            "PHONE_CTA",
            "Asks the reader to call or text a number",
            1.0,
            Content,
        ),
        r"(?i)\b(?:call|text|dial|phone|whatsapp)\b(?:[ \t]+\w+){0,3}[ \t]*:?[ \t]*\+?\(?\d{1,4}\)?[ .-]?\d{3}[ .-]?\d{3,4}\b",
        Target::Combined,
        1,
    ),
    (
        rule(
            "FAKE_TRACKING_NUMBER",
            "Parcel tracking number bait",
            1.0,
            Content,
        ),
        r"(?i)\b(?:tracking|parcel|shipment|package|consignment)\s*(?:number|no\.?|id|#)?\s*:?\s*[a-z]{2}\d{8,12}[a-z]{0,2}\b",
        Target::Combined,
        1,
    ),
    (
        rule(
            "LOTTERY_REFERENCE",
            "Lottery style reference or batch code",
            2.0,
            Content,
        ),
        r"(?i)\b(?:ref(?:erence)?|batch|ticket|serial)\s*(?:no\.?|number|#)?\s*:?\s*[a-z0-9]{2,}(?:[/-][a-z0-9]{2,}){2,}|\bwinning (?:numbers?|tickets?|notification)\b",
        Target::Combined,
        1,
    ),
    (
        rule("SCAM_419", "Advance-fee fraud terminology", 2.5, Content),
        r"(?i)\b(?:next of kin|beneficiary|barrister|diplomatic (?:bag|courier)|trust fund|inheritance fund|late client|consignment box|transfer of (?:the )?funds?|foreign partner|unclaimed (?:funds?|inheritance|deposit))\b",
        Target::Combined,
        2,
    ),
    (
        rule("URGENCY_CAPS", "Shouted urgency words", 1.0, Formatting),
        r"\b(?:URGENT|IMMEDIATELY|ACT NOW|LAST CHANCE|FINAL NOTICE|LIMITED TIME|EXPIRES?|HURRY|ASAP|WARNING|ATTENTION)\b",
        Target::Combined,
        1,
    ),
    (
        rule("CRYPTO_SCAM", "Cryptocurrency scam phrasing", 2.0, Content),
        r"(?i)\b(?:bitcoin|btc|ethereum|eth|crypto(?:currency)?|usdt)\b.{0,60}\b(?:double|guaranteed|profit|giveaway|wallet (?:address|recovery)|investment opportunity)\b|\b(?:double your|send (?:your )?)(?:bitcoin|btc|crypto|eth)\b",
        Target::Combined,
        1,
    ),
    (
        rule("ROMANCE_SCAM", "Romance scam phrasing", 1.5, Content),
        r"(?i)\b(?:my (?:dear|darling) (?:love|friend)|lonely (?:woman|girl|lady|widow)|looking for (?:a )?(?:serious relationship|true love|my soulmate)|i saw your profile|beautiful (?:girl|woman) from)\b",
        Target::Combined,
        1,
    ),
    (
        rule(
            "VERY_SHORT_BODY",
            "Body is a single very short line",
            0.5,
            Structure,
        ),
        r"\A\s*\S[^\n]{0,19}\s*\z",
        Target::Body,
        1,
    ),
    (
        rule("GENERIC_GREETING", "Impersonal greeting", 1.0, Content),
        r"(?i)^\s*(?:dear (?:customer|valued customer|user|member|client|account holder|sir(?:/| or )madam|friend|beneficiary)|hello dear|attention:? (?:customer|user))\b",
        Target::BodyStart,
        1,
    ),
    (
        rule("LINK_HEAVY", "Many links in the text", 0.5, Structure),
        r"(?i)https?://",
        Target::Combined,
        6,
    ),
    (
        rule(
            "URL_ONLY_BODY",
            "Body is nothing but a link",
            1.5,
            Structure,
        ),
        r"(?i)\A\s*(?:https?://|www\.)\S+\s*\z",
        Target::Body,
        1,
    ),
    (
        rule(
            "CSS_HIDING",
            "Markup hides content with CSS",
            1.0,
            Obfuscation,
        ),
        r"(?i)display\s*:\s*none|visibility\s*:\s*hidden|font-size\s*:\s*0(?:px|pt|em)?\s*[;'\x22]",
        Target::Raw,
        1,
    ),
    (
        rule(
            "PERCENT_ENCODED",
            "Heavily percent-encoded content",
            1.0,
            Encoding,
        ),
        r"%[0-9A-Fa-f]{2}",
        Target::Raw,
        10,
    ),
    (
        rule(
            "HTML_ENTITIES",
            "Excessive numeric HTML entities",
            1.0,
            Encoding,
        ),
        r"&#(?:x[0-9A-Fa-f]+|\d+);",
        Target::Raw,
        15,
    ),
];

/// Rules evaluated in code rather than by a single catalog regex.
const COMPUTED_RULES: &[RuleDef] = &[
    rule(
        "LETTER_DIGIT_SUBSTITUTION",
        "Digits or symbols substituted for letters in spam words",
        2.0,
        Obfuscation,
    ),
    rule(
        "REPEATED_CHARACTERS",
        "Letter repeated many times",
        0.5,
        Formatting,
    ),
    rule("LONG_BASE64", "Long base64 encoded block", 1.0, Encoding),
    rule(
        "NO_GREETING",
        "Prose body without a greeting",
        0.3,
        Structure,
    ),
    rule(
        "GENERIC_GREETING_LOCALIZED",
        "Impersonal greeting in the message language",
        1.0,
        Content,
    ),
    rule(
        "INVISIBLE_CHARACTERS",
        "Invisible formatting characters in text",
        1.0,
        Obfuscation,
    ),
    rule(
        "MIXED_SCRIPTS",
        "Latin text mixed with Cyrillic or Greek",
        1.0,
        Obfuscation,
    ),
    rule("WORD_SALAD", "Many random-looking words", 1.5, Statistical),
    rule(
        "DUPLICATE_SENTENCES",
        "Sentences repeated many times",
        1.0,
        Statistical,
    ),
    rule(
        "HIGH_ENTROPY_FOOTER",
        "Random-looking footer after blank padding",
        1.0,
        Statistical,
    ),
    rule("URGENCY_LANGUAGE", "Dense urgency vocabulary", 1.0, Content),
];

/// Words that spammers disguise with digit and symbol substitutions.
const DISGUISED_WORDS: &[&str] = &[
    "viagra", "cialis", "free", "money", "credit", "loan", "prize", "winner", "bitcoin",
    "password", "account", "offer", "discount", "cash", "casino", "lottery", "sex", "porn",
    "pharmacy", "click", "verify", "bank", "sale", "deal",
];

const INVISIBLE_CHARS: &[char] = &[
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}',
];

const GREETING_SHORT_LINE: usize = 50;
const SALAD_MIN_WORD_CHARS: usize = 5;
const SALAD_MAX_WORDS: usize = 100;
const SALAD_MIN_WORDS: usize = 20;
const SALAD_ENTROPY: f64 = 4.5;
const SALAD_RATIO: f64 = 0.4;
const SENTENCE_MIN_CHARS: usize = 20;
const SENTENCE_MIN_COUNT: usize = 5;
const DUPLICATE_RATIO: f64 = 0.3;
const FOOTER_MIN_CHARS: usize = 100;
const FOOTER_ENTROPY: f64 = 5.0;
const URGENCY_MIN_MATCHES: usize = 3;

lazy_static! {
    static ref REPEATED_CHARACTERS: Regex = {
        let alternation = ('a'..='z')
            .map(|c| format!("{}{{5,}}", c))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!("(?i)(?:{})", alternation)).unwrap()
    };
    static ref DISGUISE_CANDIDATE: Regex = Regex::new(r"[A-Za-z0-9@$!|]{3,}").unwrap();
    static ref BASE64_RUN: Regex = Regex::new(r"[A-Za-z0-9+/]{100,}={0,2}").unwrap();
    static ref REPLY_SUBJECT: Regex =
        Regex::new(r"(?i)^\s*(?:re|fwd?|aw|tr|sv|wg)\s*:|\[[^\]]+\]").unwrap();
    static ref AUTOMATED_FIRST_LINE: Regex = Regex::new(
        r"(?i)^(?:your (?:order|invoice|receipt|ticket|password|account|subscription|verification code)|order (?:#|no\.?|number|confirmation)|invoice|receipt|ticket|password|security (?:alert|notice|code)|(?:daily|weekly|monthly) (?:digest|summary|report)|digest|summary|\[?(?:commit|pull request|pr|merge request)\b|new (?:comment|commit|pull request|sign-in|login)|hi\b)"
    )
    .unwrap();
    static ref SENTENCE_SPLIT: Regex = Regex::new(r"[.!?]+").unwrap();
    static ref BLANK_PADDING: Regex = Regex::new(r"\n(?:[ \t]*\n){3,}").unwrap();
    static ref BASE64_ENGINE: GeneralPurpose = GeneralPurpose::new(
        &alphabet::STANDARD,
        GeneralPurposeConfig::new()
            .with_decode_padding_mode(DecodePaddingMode::Indifferent)
            .with_decode_allow_trailing_bits(true),
    );
}

pub struct PatternAnalyzer {
    rules: RuleCatalog,
    patterns: Vec<PatternRule>,
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternAnalyzer {
    pub fn new() -> Self {
        let patterns: Vec<PatternRule> = CATALOG
            .iter()
            .filter_map(|(def, pattern, target, min_matches)| match Regex::new(pattern) {
                Ok(regex) => Some(PatternRule {
                    def: *def,
                    regex,
                    target: *target,
                    min_matches: *min_matches,
                }),
                Err(e) => {
                    log::warn!("Skipping pattern rule {}: {}", def.name, e);
                    None
                }
            })
            .collect();

        let defs: Vec<RuleDef> = CATALOG
            .iter()
            .map(|(def, ..)| *def)
            .chain(COMPUTED_RULES.iter().copied())
            .collect();

        Self {
            rules: RuleCatalog::new(&defs),
            patterns,
        }
    }

    pub fn patterns(&self) -> &[PatternRule] {
        &self.patterns
    }

    fn analyze_catalog(&self, ctx: &AnalysisContext<'_>, raw: &str) -> Vec<RuleMatch> {
        let first_line = text::first_line(&ctx.body);
        let mut matches = Vec::new();

        for pattern in &self.patterns {
            let haystack = match pattern.target {
                Target::Combined => ctx.combined.as_str(),
                Target::Body => ctx.body.as_str(),
                Target::BodyStart => first_line,
                Target::Raw => raw,
            };
            let found: Vec<&str> = pattern
                .regex
                .find_iter(haystack)
                .map(|m| m.as_str())
                .collect();
            if !found.is_empty() && found.len() >= pattern.min_matches {
                matches.extend(self.rules.hit(pattern.def.name).map(|m| {
                    let m = m.with_evidence(found.iter().copied());
                    if pattern.min_matches > 1 {
                        m.with_details(format!("{} occurrences", found.len()))
                    } else {
                        m
                    }
                }));
            }
        }
        matches
    }

    fn analyze_obfuscation(&self, ctx: &AnalysisContext<'_>, raw: &str) -> Vec<RuleMatch> {
        let mut matches = Vec::new();

        let disguised = find_disguised_words(&ctx.combined);
        if !disguised.is_empty() {
            matches.extend(
                self.rules
                    .hit("LETTER_DIGIT_SUBSTITUTION")
                    .map(|m| m.with_evidence(disguised)),
            );
        }

        if let Some(run) = REPEATED_CHARACTERS.find(&ctx.combined) {
            matches.extend(
                self.rules
                    .hit("REPEATED_CHARACTERS")
                    .map(|m| m.with_evidence([run.as_str()])),
            );
        }

        if let Some(block) = BASE64_RUN
            .find_iter(raw)
            .map(|m| m.as_str())
            .find(|candidate| is_base64_block(candidate))
        {
            let preview: String = block.chars().take(40).collect();
            matches.extend(
                self.rules
                    .hit("LONG_BASE64")
                    .map(|m| {
                        m.with_details(format!("{} chars", block.len()))
                            .with_evidence([preview])
                    }),
            );
        }

        let invisible: HashSet<String> = ctx
            .combined
            .chars()
            .filter(|c| INVISIBLE_CHARS.contains(c))
            .map(|c| format!("U+{:04X}", c as u32))
            .collect();
        if !invisible.is_empty() {
            let mut codes: Vec<String> = invisible.into_iter().collect();
            codes.sort();
            matches.extend(
                self.rules
                    .hit("INVISIBLE_CHARACTERS")
                    .map(|m| m.with_evidence(codes)),
            );
        }

        if LanguageDetector::contains_latin(&ctx.combined)
            && (LanguageDetector::contains_russian(&ctx.combined)
                || LanguageDetector::contains_greek(&ctx.combined))
        {
            matches.extend(
                self.rules
                    .hit("MIXED_SCRIPTS")
                    .map(|m| m.with_details(LanguageDetector::scripts(&ctx.combined).join("+"))),
            );
        }
        matches
    }

    fn analyze_greeting(&self, ctx: &AnalysisContext<'_>) -> Vec<RuleMatch> {
        let mut matches = Vec::new();
        let first_line = text::first_line(&ctx.body);
        if first_line.is_empty() {
            return matches;
        }

        if !greeting_exempt(ctx, first_line) {
            matches.extend(
                self.rules
                    .hit("NO_GREETING")
                    .map(|m| m.with_evidence([truncate(first_line, 60)])),
            );
        }

        if let Some(found) = ctx
            .dataset
            .generic_greeting_pattern()
            .and_then(|re| re.find(first_line))
        {
            matches.extend(self.rules.hit("GENERIC_GREETING_LOCALIZED").map(|m| {
                m.with_details(ctx.dataset.language())
                    .with_evidence([found.as_str().trim()])
            }));
        }
        matches
    }

    fn analyze_statistics(&self, ctx: &AnalysisContext<'_>) -> Vec<RuleMatch> {
        let mut matches = Vec::new();

        if let Some(ratio) = word_salad_ratio(&ctx.combined) {
            matches.extend(
                self.rules
                    .hit("WORD_SALAD")
                    .map(|m| m.with_details(format!("{:.0}% high-entropy words", ratio * 100.0))),
            );
        }

        if let Some(ratio) = duplicate_sentence_ratio(&ctx.combined) {
            matches.extend(
                self.rules
                    .hit("DUPLICATE_SENTENCES")
                    .map(|m| m.with_details(format!("{:.0}% duplicated", ratio * 100.0))),
            );
        }

        if let Some(entropy) = footer_entropy(&ctx.body) {
            matches.extend(
                self.rules
                    .hit("HIGH_ENTROPY_FOOTER")
                    .map(|m| m.with_details(format!("entropy {:.2}", entropy))),
            );
        }

        if let Some(urgency) = ctx.dataset.urgency_pattern() {
            let found: Vec<&str> = urgency.find_iter(&ctx.combined).map(|m| m.as_str()).collect();
            if found.len() >= URGENCY_MIN_MATCHES {
                matches.extend(self.rules.hit("URGENCY_LANGUAGE").map(|m| {
                    m.with_details(format!("{} urgency words", found.len()))
                        .with_evidence(found.iter().copied())
                }));
            }
        }
        matches
    }
}

/// Tokens that turn into a known spam word once digits and symbols are read as letters.
fn find_disguised_words(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for candidate in DISGUISE_CANDIDATE.find_iter(content).map(|m| m.as_str()) {
        let has_letter = candidate.chars().any(|c| c.is_ascii_alphabetic());
        let has_substitute = candidate.chars().any(|c| !c.is_ascii_alphabetic());
        if !has_letter || !has_substitute {
            continue;
        }
        let lower = candidate.to_lowercase();
        let hit = ['i', 'l'].iter().any(|one| {
            let decoded = unleet(&lower, *one);
            DISGUISED_WORDS.contains(&decoded.as_str())
        });
        if hit && seen.insert(lower) {
            found.push(candidate.to_string());
        }
    }
    found
}

fn unleet(word: &str, one: char) -> String {
    word.chars()
        .map(|c| match c {
            '0' => 'o',
            '1' => one,
            '3' => 'e',
            '4' | '@' => 'a',
            '5' | '$' => 's',
            '7' => 't',
            '8' => 'b',
            '!' => 'i',
            '|' => 'l',
            other => other,
        })
        .collect()
}

/// A long run only counts as base64 when it mixes character classes and decodes.
fn is_base64_block(candidate: &str) -> bool {
    let has_upper = candidate.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = candidate.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = candidate.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return false;
    }
    let body = candidate.trim_end_matches('=');
    let usable = body.len() - body.len() % 4;
    BASE64_ENGINE.decode(&body[..usable]).is_ok()
}

fn greeting_exempt(ctx: &AnalysisContext<'_>, first_line: &str) -> bool {
    if REPLY_SUBJECT.is_match(&ctx.email.subject) {
        return true;
    }
    if first_line.starts_with('@') {
        return true;
    }
    if AUTOMATED_FIRST_LINE.is_match(first_line) {
        return true;
    }
    if ctx
        .dataset
        .greeting_pattern()
        .map(|re| re.is_match(first_line))
        .unwrap_or(false)
    {
        return true;
    }
    // Short comma-free lines read as titles rather than prose.
    first_line.chars().count() < GREETING_SHORT_LINE && !first_line.contains(',')
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Share of high-entropy words when the text qualifies as word salad.
fn word_salad_ratio(content: &str) -> Option<f64> {
    let words: Vec<&str> = content
        .split_whitespace()
        .filter(|w| w.chars().count() > SALAD_MIN_WORD_CHARS)
        .take(SALAD_MAX_WORDS)
        .collect();
    if words.len() <= SALAD_MIN_WORDS {
        return None;
    }
    let noisy = words
        .iter()
        .filter(|w| text::shannon_entropy(w) > SALAD_ENTROPY)
        .count();
    let ratio = noisy as f64 / words.len() as f64;
    (ratio > SALAD_RATIO).then_some(ratio)
}

fn duplicate_sentence_ratio(content: &str) -> Option<f64> {
    let sentences: Vec<String> = SENTENCE_SPLIT
        .split(content)
        .map(text::normalize)
        .filter(|s| s.chars().count() > SENTENCE_MIN_CHARS)
        .collect();
    if sentences.len() <= SENTENCE_MIN_COUNT {
        return None;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for sentence in &sentences {
        *counts.entry(sentence.as_str()).or_insert(0) += 1;
    }
    let duplicates = sentences.len() - counts.len();
    let ratio = duplicates as f64 / sentences.len() as f64;
    (ratio > DUPLICATE_RATIO).then_some(ratio)
}

fn footer_entropy(body: &str) -> Option<f64> {
    let segments: Vec<&str> = BLANK_PADDING.split(body).collect();
    if segments.len() < 2 {
        return None;
    }
    let footer = segments.last()?.trim();
    if footer.chars().count() <= FOOTER_MIN_CHARS {
        return None;
    }
    let entropy = text::shannon_entropy(footer);
    (entropy > FOOTER_ENTROPY).then_some(entropy)
}

impl Analyzer for PatternAnalyzer {
    fn name(&self) -> &str {
        "pattern"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalyzerResult {
        let raw = format!("{}\n{}", ctx.email.text_body, ctx.email.html_body);
        let mut matches = Vec::new();

        matches.extend(self.analyze_catalog(ctx, &raw));
        matches.extend(self.analyze_obfuscation(ctx, &raw));
        matches.extend(self.analyze_greeting(ctx));
        matches.extend(self.analyze_statistics(ctx));

        let mut metadata = serde_json::Map::new();
        metadata.insert("language".into(), json!(ctx.dataset.language()));
        metadata.insert("scripts".into(), json!(LanguageDetector::scripts(&ctx.combined)));
        metadata.insert("rulesEvaluated".into(), json!(self.rules.len()));

        AnalyzerResult::from_matches(self.name(), self.rules.max_score(), matches, metadata)
    }

    fn catalog(&self) -> &RuleCatalog {
        &self.rules
    }
}
