//! Small text helpers shared by the analyzers: link and address extraction,
//! HTML flattening, normalization and entropy.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

lazy_static! {
    static ref URL_REGEX: Regex =
        Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"'`{}|\\^\[\]]+"#).unwrap();
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").unwrap();
    static ref HREF_REGEX: Regex =
        Regex::new(r#"(?i)\b(?:href|src)\s*=\s*["']?((?:https?://|www\.)[^"'\s>]+)"#).unwrap();
    static ref SCRIPT_STYLE: Regex =
        Regex::new(r"(?is)<(script|style|head)\b[^>]*>.*?</(?:script|style|head)\s*>").unwrap();
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref BLOCK_BREAK: Regex =
        Regex::new(r"(?i)<\s*(?:br|/p|/div|/tr|/li|/h[1-6]|/table)\b[^>]*>").unwrap();
    static ref TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
    static ref NUMERIC_ENTITY: Regex = Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap();
    static ref INLINE_SPACE: Regex = Regex::new(r"[ \t\u{00A0}]+").unwrap();
    static ref BLANK_RUN: Regex = Regex::new(r"\n\s*\n\s*\n+").unwrap();
}

/// Extract http(s) and `www.` links from free text, in order of appearance.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_REGEX
        .find_iter(text)
        .map(|m| trim_url(m.as_str()))
        .filter(|u| u.len() > 4)
        .collect()
}

/// Extract link targets from `href`/`src` attributes of raw HTML.
pub fn extract_html_urls(html: &str) -> Vec<String> {
    HREF_REGEX
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| trim_url(&decode_entities(m.as_str())))
        .collect()
}

pub fn extract_emails(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    EMAIL_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|e| seen.insert(e.clone()))
        .collect()
}

fn trim_url(url: &str) -> String {
    url.trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '\'', '"'])
        .to_string()
}

/// Render HTML to readable text: drops scripts, styles and comments, turns
/// block boundaries into newlines and decodes common entities.
pub fn html_to_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let text = SCRIPT_STYLE.replace_all(html, " ");
    let text = COMMENT.replace_all(&text, " ");
    let text = BLOCK_BREAK.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, " ");
    let text = decode_entities(&text);
    let text = INLINE_SPACE.replace_all(&text, " ");

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    BLANK_RUN.replace_all(&joined, "\n\n").trim().to_string()
}

pub fn decode_entities(text: &str) -> String {
    let named = [
        ("&nbsp;", " "),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
    ];
    let mut result = text.to_string();
    for (entity, replacement) in &named {
        result = result.replace(entity, replacement);
    }
    let result = NUMERIC_ENTITY.replace_all(&result, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    });
    // &amp; last so that "&amp;lt;" stays literal
    result.replace("&amp;", "&")
}

/// Lowercase and collapse every whitespace run to a single space.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Shannon entropy in bits per character.
pub fn shannon_entropy(text: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for ch in text.chars() {
        *counts.entry(ch).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// First non-empty line, trimmed.
pub fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}
