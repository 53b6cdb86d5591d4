//! URL Analyzer
//!
//! Extracts links from every body representation, parses them and applies
//! per-root-domain penalties (IP hosts, suspicious TLDs, shorteners, phishing
//! lookalikes, suspicious paths). Anchors whose visible text names a different
//! host than their target are flagged separately.

use super::{AnalysisContext, Analyzer};
use crate::domain_utils::DomainUtils;
use crate::rules::{AnalyzerResult, RuleCatalog, RuleCategory, RuleDef, RuleMatch};
use crate::text;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use std::collections::HashSet;
use url::Url;

const MAX_URLS: usize = 50;
const MANY_URLS: usize = 10;
const MAX_LABELS: usize = 4;
const MAX_LABEL_LEN: usize = 20;
const MAX_PERCENT_ESCAPES: usize = 3;

const RULES: &[RuleDef] = &[
    RuleDef::new(
        "MANY_URLS",
        "Message contains many links",
        1.0,
        RuleCategory::Url,
    ),
    RuleDef::new(
        "IP_ADDRESS_URL",
        "Link points at a bare IP address",
        2.5,
        RuleCategory::Url,
    ),
    RuleDef::new(
        "SUSPICIOUS_TLD",
        "Link uses a TLD common in abuse",
        1.5,
        RuleCategory::Url,
    ),
    RuleDef::new(
        "URL_SHORTENER",
        "Link uses a URL shortening service",
        1.0,
        RuleCategory::Url,
    ),
    RuleDef::new(
        "NON_STANDARD_PORT",
        "Link uses a non-standard port",
        1.0,
        RuleCategory::Url,
    ),
    RuleDef::new(
        "PHISHING_DOMAIN",
        "Link domain imitates a known brand",
        2.5,
        RuleCategory::Url,
    ),
    RuleDef::new(
        "SUSPICIOUS_PATH",
        "Link path looks malicious",
        1.5,
        RuleCategory::Url,
    ),
    RuleDef::new(
        "EXCESSIVE_SUBDOMAINS",
        "Link host has many subdomains",
        1.0,
        RuleCategory::Url,
    ),
    RuleDef::new(
        "LONG_SUBDOMAIN",
        "Link host has an unusually long label",
        1.0,
        RuleCategory::Url,
    ),
    RuleDef::new(
        "URL_ENCODING",
        "Link is heavily percent-encoded",
        0.8,
        RuleCategory::Obfuscation,
    ),
    RuleDef::new(
        "MISMATCHED_LINK_TEXT",
        "Link text shows a different address than its target",
        2.0,
        RuleCategory::Url,
    ),
];

const SUSPICIOUS_TLDS: &[&str] = &[
    "tk", "ml", "ga", "cf", "gq", "xyz", "top", "click", "link", "work", "loan", "download",
    "racing", "win", "bid", "stream", "review", "country", "kim", "party", "science", "zip",
    "mov", "rest", "cam",
];

const SHORTENERS: &[&str] = &[
    "bit.ly", "tinyurl.com", "goo.gl", "t.co", "ow.ly", "is.gd", "buff.ly", "adf.ly", "bit.do",
    "cutt.ly", "rebrand.ly", "shorturl.at", "tiny.cc", "rb.gy", "t.ly",
];

/// Root domains that never draw URL penalties.
const ALLOWLIST: &[&str] = &[
    "google.com", "googleapis.com", "gstatic.com", "youtube.com", "microsoft.com",
    "microsoftonline.com", "office.com", "live.com", "outlook.com", "apple.com", "icloud.com",
    "amazon.com", "amazonaws.com", "paypal.com", "github.com", "githubusercontent.com",
    "linkedin.com", "facebook.com", "twitter.com", "wikipedia.org", "mozilla.org", "w3.org",
    "dropbox.com", "slack.com", "zoom.us",
];

lazy_static! {
    static ref PHISHING_PATTERNS: Vec<(&'static str, Regex)> = vec![
        (
            "brand typosquat",
            Regex::new(
                r"(?i)(?:paypa1|paypai|app1e|appie|amaz0n|arnazon|micros0ft|rnicrosoft|g00gle|faceb00k|netf1ix|llnkedin)",
            )
            .unwrap(),
        ),
        (
            "brand domain embedded in hostname",
            Regex::new(
                r"(?i)(?:paypal|apple|amazon|microsoft|google|facebook|netflix|ebay|chase|wellsfargo)\.(?:com|net|org)[.-]",
            )
            .unwrap(),
        ),
        (
            "brand with account qualifier",
            Regex::new(
                r"(?i)(?:paypal|apple|amazon|microsoft|google|facebook|netflix|ebay|chase|wellsfargo)-(?:secure|login|verify|account|support|update|security|billing)|(?:secure|login|verify|account|support|update|security|billing)-(?:paypal|apple|amazon|microsoft|google|facebook|netflix|ebay|chase|wellsfargo)",
            )
            .unwrap(),
        ),
        (
            "credential lure subdomain",
            Regex::new(
                r"(?i)(?:verify|confirm|update|secure)[.-](?:account|login|billing|payment)",
            )
            .unwrap(),
        ),
    ];
    static ref SUSPICIOUS_PATHS: Vec<(&'static str, Regex)> = vec![
        (
            "executable download",
            Regex::new(r"(?i)\.(?:exe|scr|bat|cmd|pif|vbs|jar|msi|apk|dll|ps1|hta)(?:$|\?)")
                .unwrap(),
        ),
        (
            "WordPress exploit path",
            Regex::new(r"(?i)/wp-(?:content|includes|admin)/[^?]*\.(?:php|html?)").unwrap(),
        ),
        (
            "credential harvesting script",
            Regex::new(
                r"(?i)/(?:login|signin|verify|account|update|secure|webscr|banking)[^/?]*\.php",
            )
            .unwrap(),
        ),
        ("encoded control characters", Regex::new(r"(?i)%(?:0[0-9a-f]|1[0-9a-f])").unwrap()),
        ("double slash", Regex::new(r"//").unwrap()),
    ];
    static ref PERCENT_ESCAPE: Regex = Regex::new(r"%[0-9A-Fa-f]{2}").unwrap();
    static ref ANCHOR: Regex =
        Regex::new(r#"(?is)<a\s[^>]*href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#).unwrap();
}

/// One extracted and parsed link.
#[derive(Debug, Clone)]
pub struct ParsedUrl {
    pub raw: String,
    pub domain: String,
    pub root_domain: String,
    pub tld: String,
    pub path: String,
    pub query: String,
    pub is_ip_address: bool,
    pub is_suspicious_tld: bool,
    pub has_non_standard_port: bool,
    pub is_shortener: bool,
    pub percent_escapes: usize,
}

impl ParsedUrl {
    /// Parse a raw link, assuming `http://` when no scheme is present.
    pub fn parse(raw: &str) -> Option<Self> {
        let url = parse_with_default_scheme(raw)?;
        let domain = url.host_str()?.trim_end_matches('.').to_lowercase();
        if domain.is_empty() {
            return None;
        }

        let is_ip_address = DomainUtils::is_ip_literal(&domain);
        let tld = if is_ip_address {
            String::new()
        } else {
            DomainUtils::tld(&domain)
        };

        Some(Self {
            raw: raw.to_string(),
            root_domain: DomainUtils::root_domain(&domain),
            is_suspicious_tld: SUSPICIOUS_TLDS.contains(&tld.as_str()),
            has_non_standard_port: url.port().map(|p| p != 80 && p != 443).unwrap_or(false),
            is_shortener: DomainUtils::matches_domain_list(&domain, SHORTENERS),
            percent_escapes: PERCENT_ESCAPE.find_iter(raw).count(),
            path: url.path().to_string(),
            query: url.query().unwrap_or("").to_string(),
            is_ip_address,
            tld,
            domain,
        })
    }

    fn labels(&self) -> Vec<&str> {
        self.domain.split('.').collect()
    }
}

fn parse_with_default_scheme(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.contains("://") {
        Url::parse(trimmed).ok()
    } else {
        Url::parse(&format!("http://{}", trimmed)).ok()
    }
}

/// Distinct links from the plain body, the raw HTML and the rendered HTML text,
/// in first-seen order and capped at [`MAX_URLS`].
pub fn collect_urls(ctx: &AnalysisContext<'_>) -> Vec<String> {
    let email = ctx.email;
    let mut seen = HashSet::new();
    text::extract_urls(&email.text_body)
        .into_iter()
        .chain(text::extract_html_urls(&email.html_body))
        .chain(text::extract_urls(&text::decode_entities(&email.html_body)))
        .chain(text::extract_urls(&ctx.html_text))
        .filter(|u| seen.insert(u.clone()))
        .take(MAX_URLS)
        .collect()
}

pub struct UrlAnalyzer {
    rules: RuleCatalog,
}

impl Default for UrlAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlAnalyzer {
    pub fn new() -> Self {
        Self {
            rules: RuleCatalog::new(RULES),
        }
    }

    fn is_allowlisted(root_domain: &str) -> bool {
        ALLOWLIST.contains(&root_domain)
    }

    /// Per-URL checks. `flagged` holds `(root domain, rule)` pairs already reported.
    fn analyze_url(
        &self,
        url: &ParsedUrl,
        flagged: &mut HashSet<(String, &'static str)>,
    ) -> Vec<RuleMatch> {
        let mut matches = Vec::new();
        let mut flag = |rule: &'static str, details: String, matches: &mut Vec<RuleMatch>| {
            if flagged.insert((url.root_domain.clone(), rule)) {
                matches.extend(
                    self.rules
                        .hit(rule)
                        .map(|m| m.with_details(details).with_evidence([url.raw.as_str()])),
                );
            }
        };

        if url.is_ip_address {
            flag("IP_ADDRESS_URL", url.domain.clone(), &mut matches);
        }
        if url.is_suspicious_tld {
            flag("SUSPICIOUS_TLD", format!(".{}", url.tld), &mut matches);
        }
        if url.is_shortener {
            flag("URL_SHORTENER", url.domain.clone(), &mut matches);
        }
        if url.has_non_standard_port {
            flag("NON_STANDARD_PORT", url.domain.clone(), &mut matches);
        }

        if !url.is_ip_address {
            if let Some((label, _)) = PHISHING_PATTERNS
                .iter()
                .find(|(_, re)| re.is_match(&url.domain))
            {
                flag("PHISHING_DOMAIN", format!("{}: {}", label, url.domain), &mut matches);
            }

            let labels = url.labels();
            if labels.len() > MAX_LABELS {
                flag(
                    "EXCESSIVE_SUBDOMAINS",
                    format!("{} labels", labels.len()),
                    &mut matches,
                );
            }
            if let Some(long) = labels[..labels.len().saturating_sub(1)]
                .iter()
                .find(|label| label.len() > MAX_LABEL_LEN)
            {
                flag("LONG_SUBDOMAIN", long.to_string(), &mut matches);
            }
        }

        let target = if url.query.is_empty() {
            url.path.clone()
        } else {
            format!("{}?{}", url.path, url.query)
        };
        if let Some((label, _)) = SUSPICIOUS_PATHS.iter().find(|(_, re)| re.is_match(&target)) {
            flag("SUSPICIOUS_PATH", label.to_string(), &mut matches);
        }

        if url.percent_escapes > MAX_PERCENT_ESCAPES {
            flag(
                "URL_ENCODING",
                format!("{} escapes", url.percent_escapes),
                &mut matches,
            );
        }
        matches
    }

    /// One match per anchor whose URL-looking text disagrees with its target host.
    fn analyze_anchors(&self, html: &str) -> Vec<RuleMatch> {
        let mut matches = Vec::new();
        for caps in ANCHOR.captures_iter(html) {
            let href = text::decode_entities(&caps[1]);
            let shown = text::html_to_text(&caps[2]);
            let shown = shown.trim();
            let lower = shown.to_lowercase();
            let looks_like_url = lower.starts_with("http://")
                || lower.starts_with("https://")
                || lower.starts_with("www.")
                || lower.contains(".com");
            if !looks_like_url {
                continue;
            }

            let Some(target) = parse_with_default_scheme(&href) else {
                continue;
            };
            let Some(target_host) = target.host_str().map(DomainUtils::canonicalize_domain) else {
                continue;
            };
            if Self::is_allowlisted(&DomainUtils::root_domain(&target_host)) {
                continue;
            }

            let shown_host = parse_with_default_scheme(shown)
                .and_then(|u| u.host_str().map(DomainUtils::canonicalize_domain));
            let mismatched = match &shown_host {
                None => true,
                Some(host) => {
                    host != &target_host && !target_host.ends_with(&format!(".{}", host))
                }
            };
            if mismatched {
                matches.extend(self.rules.hit("MISMATCHED_LINK_TEXT").map(|m| {
                    m.with_details(format!(
                        "shows {} but links to {}",
                        shown_host.as_deref().unwrap_or(shown),
                        target_host
                    ))
                    .with_evidence([href.as_str()])
                }));
            }
        }
        matches
    }
}

impl Analyzer for UrlAnalyzer {
    fn name(&self) -> &str {
        "url"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalyzerResult {
        let raw_urls = collect_urls(ctx);
        let parsed: Vec<ParsedUrl> = raw_urls.iter().filter_map(|u| ParsedUrl::parse(u)).collect();
        let mut matches = Vec::new();

        if parsed.len() > MANY_URLS {
            matches.extend(
                self.rules
                    .hit("MANY_URLS")
                    .map(|m| m.with_details(format!("{} links", parsed.len()))),
            );
        }

        let mut flagged = HashSet::new();
        let mut skipped = 0usize;
        for url in &parsed {
            if Self::is_allowlisted(&url.root_domain) {
                skipped += 1;
                continue;
            }
            matches.extend(self.analyze_url(url, &mut flagged));
        }

        if !ctx.email.html_body.is_empty() {
            matches.extend(self.analyze_anchors(&ctx.email.html_body));
        }

        let roots: HashSet<&str> = parsed.iter().map(|u| u.root_domain.as_str()).collect();
        let mut metadata = serde_json::Map::new();
        metadata.insert("urlCount".into(), json!(parsed.len()));
        metadata.insert("uniqueDomains".into(), json!(roots.len()));
        metadata.insert("allowlistedUrls".into(), json!(skipped));
        metadata.insert(
            "urls".into(),
            json!(parsed.iter().take(10).map(|u| u.raw.as_str()).collect::<Vec<_>>()),
        );

        AnalyzerResult::from_matches(self.name(), self.rules.max_score() * 3.0, matches, metadata)
    }

    fn catalog(&self) -> &RuleCatalog {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::testing::{html_email, run, text_email};

    #[test]
    fn test_parse_url_defaults_scheme() {
        let url = ParsedUrl::parse("www.example.co.uk/path?q=1").unwrap();
        assert_eq!(url.domain, "www.example.co.uk");
        assert_eq!(url.root_domain, "example.co.uk");
        assert_eq!(url.tld, "uk");
        assert_eq!(url.path, "/path");
        assert_eq!(url.query, "q=1");
        assert!(!url.has_non_standard_port);
    }

    #[test]
    fn test_parse_url_flags() {
        let ip = ParsedUrl::parse("http://192.168.1.1/login").unwrap();
        assert!(ip.is_ip_address);
        let port = ParsedUrl::parse("https://example.com:8443/").unwrap();
        assert!(port.has_non_standard_port);
        let short = ParsedUrl::parse("https://bit.ly/abc").unwrap();
        assert!(short.is_shortener);
        assert!(ParsedUrl::parse("http://").is_none());
    }

    #[test]
    fn test_ip_url_and_many_urls() {
        let mut body = String::from("Login at http://192.168.1.1/login\n");
        for i in 0..11 {
            body.push_str(&format!("https://site{}.example{}.org/page\n", i, i));
        }
        let result = run(&UrlAnalyzer::new(), &text_email("links", &body));
        assert!(result.has_match("IP_ADDRESS_URL"));
        assert!(result.has_match("MANY_URLS"));
        assert_eq!(result.metadata["urlCount"], json!(12));
    }

    #[test]
    fn test_entity_encoded_hrefs_count_once() {
        let html: String = (0..6)
            .map(|i| {
                format!(r#"<a href="https://news{i}.example{i}.org/r?a=1&amp;b=2">Read</a>"#)
            })
            .collect();
        let result = run(&UrlAnalyzer::new(), &html_email(&html));
        assert_eq!(result.metadata["urlCount"], json!(6));
        assert!(!result.has_match("MANY_URLS"));
    }

    #[test]
    fn test_url_cap_bounds_suspicious_tld_hits() {
        let body: Vec<String> = (0..60)
            .map(|i| format!("http://site{i}.example{i}.tk/"))
            .collect();
        let result = run(&UrlAnalyzer::new(), &text_email("links", &body.join("\n")));
        assert_eq!(result.metadata["urlCount"], json!(MAX_URLS));
        assert_eq!(result.match_count("SUSPICIOUS_TLD"), MAX_URLS);
        assert!(result.has_match("MANY_URLS"));
    }

    #[test]
    fn test_shortener_and_port_rules() {
        let body = "Get it at https://bit.ly/3xYz or http://portal.example9.net:8443/home";
        let result = run(&UrlAnalyzer::new(), &text_email("offer", body));
        assert_eq!(
            result.find("URL_SHORTENER").unwrap().details.as_deref(),
            Some("bit.ly")
        );
        assert_eq!(
            result.find("NON_STANDARD_PORT").unwrap().details.as_deref(),
            Some("portal.example9.net")
        );
    }

    #[test]
    fn test_repeated_url_is_deduplicated() {
        let analyzer = UrlAnalyzer::new();
        let link = "http://promo.example.tk/claim.exe";
        let once = run(&analyzer, &text_email("x", link));
        let repeated = run(&analyzer, &text_email("x", &vec![link; 10].join(" ")));
        assert_eq!(once.score, repeated.score);
        assert!(once.has_match("SUSPICIOUS_TLD"));
        assert!(once.has_match("SUSPICIOUS_PATH"));
    }

    #[test]
    fn test_root_domain_dedup_across_paths() {
        let body = "http://a.example.tk/one http://b.example.tk/two http://example.tk/three";
        let result = run(&UrlAnalyzer::new(), &text_email("x", body));
        assert_eq!(result.match_count("SUSPICIOUS_TLD"), 1);
    }

    #[test]
    fn test_allowlisted_domain_is_skipped() {
        let body = "https://www.google.com:8080/wp-admin/x.php https://docs.github.com/%41%42%43%44%45";
        let result = run(&UrlAnalyzer::new(), &text_email("x", body));
        assert!(result.matches.is_empty(), "{:?}", result.matches);
        assert_eq!(result.metadata["allowlistedUrls"], json!(2));
    }

    #[test]
    fn test_phishing_domain_first_pattern_wins() {
        let body = "http://paypal.com.secure-paypal.evil.ru/webscr";
        let result = run(&UrlAnalyzer::new(), &text_email("x", body));
        assert_eq!(result.match_count("PHISHING_DOMAIN"), 1);
        assert!(result
            .find("PHISHING_DOMAIN")
            .unwrap()
            .details
            .as_deref()
            .unwrap()
            .starts_with("brand domain embedded"));
        assert!(result.has_match("EXCESSIVE_SUBDOMAINS"));
    }

    #[test]
    fn test_structure_rules() {
        let body = "http://averyveryverylongsubdomainlabel.example.net/a%20b%20c%20d%20e \
                    http://files.example.org//etc";
        let result = run(&UrlAnalyzer::new(), &text_email("x", body));
        assert!(result.has_match("LONG_SUBDOMAIN"));
        assert!(result.has_match("URL_ENCODING"));
        assert_eq!(
            result.find("SUSPICIOUS_PATH").unwrap().details.as_deref(),
            Some("double slash")
        );
    }

    #[test]
    fn test_mismatched_link_text() {
        let html = r#"<p><a href="http://evil.example.ru/login">https://www.mybank.com/</a>
            <a href="https://www.mybank.com/account">www.mybank.com</a>
            <a href="https://news.mybank.com/">mybank.com</a>
            <a href="http://tracker.example.net/">Visit mybank.com today</a>
            <a href="http://tracker.example.net/">Read more</a></p>"#;
        let result = run(&UrlAnalyzer::new(), &html_email(html));
        assert_eq!(result.match_count("MISMATCHED_LINK_TEXT"), 2);
    }

    #[test]
    fn test_no_urls() {
        let result = run(&UrlAnalyzer::new(), &text_email("hello", "no links at all"));
        assert_eq!(result.score, 0.0);
        assert!(result.max_score > 0.0);
    }
}
