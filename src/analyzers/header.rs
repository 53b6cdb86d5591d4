//! Header / Authentication Analyzer
//!
//! Looks at envelope and authentication headers: SPF, DKIM and DMARC
//! verdicts, structural anomalies (missing or malformed From/Date/Message-ID),
//! the Received chain, sender/reply alignment and sender domain reputation
//! lists. Every check is independent and additive.

use super::{AnalysisContext, Analyzer};
use crate::domain_utils::DomainUtils;
use crate::email::EmailRecord;
use crate::rules::{AnalyzerResult, RuleCatalog, RuleCategory, RuleDef, RuleMatch};
use chrono::Duration;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

const MAX_RECEIVED_HOPS: usize = 15;

const RULES: &[RuleDef] = &[
    RuleDef::new(
        "SPF_FAIL",
        "SPF check failed",
        2.5,
        RuleCategory::Authentication,
    ),
    RuleDef::new(
        "SPF_SOFTFAIL",
        "SPF soft fail",
        1.0,
        RuleCategory::Authentication,
    ),
    RuleDef::new(
        "SPF_NONE",
        "No SPF result available",
        0.1,
        RuleCategory::Authentication,
    ),
    RuleDef::new(
        "DKIM_FAIL",
        "DKIM signature verification failed",
        2.0,
        RuleCategory::Authentication,
    ),
    RuleDef::new(
        "DKIM_NONE",
        "Message is not DKIM signed",
        0.0,
        RuleCategory::Authentication,
    ),
    RuleDef::new(
        "DMARC_FAIL",
        "DMARC policy check failed",
        2.0,
        RuleCategory::Authentication,
    ),
    RuleDef::new("MISSING_FROM", "No From header", 0.4, RuleCategory::Header),
    RuleDef::new("MISSING_DATE", "No Date header", 0.1, RuleCategory::Header),
    RuleDef::new(
        "FUTURE_DATE",
        "Date is more than a day in the future",
        1.5,
        RuleCategory::Header,
    ),
    RuleDef::new(
        "OLD_DATE",
        "Date is more than a year in the past",
        1.0,
        RuleCategory::Header,
    ),
    RuleDef::new(
        "MISSING_MESSAGE_ID",
        "No Message-ID header",
        0.1,
        RuleCategory::Header,
    ),
    RuleDef::new(
        "INVALID_MESSAGE_ID",
        "Malformed Message-ID",
        1.0,
        RuleCategory::Header,
    ),
    RuleDef::new(
        "EXCESSIVE_HOPS",
        "Unusually long Received chain",
        1.0,
        RuleCategory::Header,
    ),
    RuleDef::new(
        "FORGED_RECEIVED",
        "Received hop mixes a private IP with a public hostname",
        2.0,
        RuleCategory::Header,
    ),
    RuleDef::new(
        "REPLY_TO_MISMATCH",
        "Reply-To domain differs from From domain",
        1.5,
        RuleCategory::Header,
    ),
    RuleDef::new(
        "RETURN_PATH_MISMATCH",
        "Return-Path domain differs from From domain",
        0.8,
        RuleCategory::Header,
    ),
    RuleDef::new(
        "BULK_MAILER",
        "Sent with a bulk mailing tool",
        1.0,
        RuleCategory::Header,
    ),
    RuleDef::new(
        "DISPOSABLE_EMAIL",
        "Sender uses a disposable email domain",
        2.0,
        RuleCategory::Header,
    ),
    RuleDef::new(
        "FREEMAIL_SENDER",
        "Sender uses a free email provider",
        0.3,
        RuleCategory::Header,
    ),
    RuleDef::new(
        "NO_VALID_RECIPIENT",
        "No valid To recipient",
        0.3,
        RuleCategory::Header,
    ),
    RuleDef::new(
        "UNDISCLOSED_RECIPIENTS",
        "Recipients are undisclosed",
        0.2,
        RuleCategory::Header,
    ),
    RuleDef::new(
        "HIGH_PRIORITY",
        "Message flagged as high priority",
        0.5,
        RuleCategory::Header,
    ),
];

const BULK_MAILER_SIGNATURES: &[&str] = &[
    "mass mail",
    "bulk mail",
    "email blast",
    "newsletter",
    "phpmailer",
    "swiftmailer",
];

const DISPOSABLE_DOMAINS: &[&str] = &[
    "mailinator.com",
    "guerrillamail.com",
    "guerrillamail.net",
    "10minutemail.com",
    "tempmail.com",
    "temp-mail.org",
    "throwawaymail.com",
    "yopmail.com",
    "trashmail.com",
    "getnada.com",
    "dispostable.com",
    "sharklasers.com",
    "maildrop.cc",
    "fakeinbox.com",
    "mintemail.com",
    "mohmal.com",
];

const FREEMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "yahoo.com",
    "yahoo.co.uk",
    "hotmail.com",
    "outlook.com",
    "live.com",
    "msn.com",
    "aol.com",
    "icloud.com",
    "me.com",
    "mail.com",
    "gmx.com",
    "gmx.de",
    "web.de",
    "yandex.ru",
    "mail.ru",
    "protonmail.com",
    "proton.me",
    "zoho.com",
];

lazy_static! {
    static ref MESSAGE_ID: Regex = Regex::new(r"^<[^<>@\s]+@[^<>@\s]+>$").unwrap();
    static ref PRIVATE_IP: Regex = Regex::new(
        r"\b(?:10\.\d{1,3}\.\d{1,3}\.\d{1,3}|192\.168\.\d{1,3}\.\d{1,3}|172\.(?:1[6-9]|2\d|3[01])\.\d{1,3}\.\d{1,3})\b"
    )
    .unwrap();
    static ref PUBLIC_SUFFIX: Regex =
        Regex::new(r"(?i)[a-z0-9-]\.(?:com|net|org|info|biz|io|co|us|uk|de|ru|cn)\b").unwrap();
}

pub struct HeaderAnalyzer {
    rules: RuleCatalog,
}

impl Default for HeaderAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderAnalyzer {
    pub fn new() -> Self {
        Self {
            rules: RuleCatalog::new(RULES),
        }
    }

    fn analyze_spf(&self, email: &EmailRecord) -> Option<RuleMatch> {
        let spf = email.header("received-spf").unwrap_or("").trim().to_lowercase();

        if spf.contains("softfail") {
            self.rules.hit("SPF_SOFTFAIL")
        } else if spf.contains("fail") {
            self.rules.hit("SPF_FAIL")
        } else if spf.is_empty() || spf.contains("none") {
            self.rules.hit("SPF_NONE")
        } else {
            None
        }
    }

    fn analyze_dkim(&self, email: &EmailRecord) -> Option<RuleMatch> {
        let signature = email.header("dkim-signature");
        if signature.map(looks_like_dkim_signature).unwrap_or(false) {
            return None;
        }

        let auth_results = email.header("authentication-results").unwrap_or("").to_lowercase();
        if auth_results.contains("dkim=fail") {
            self.rules.hit("DKIM_FAIL")
        } else if signature.is_none() {
            self.rules.hit("DKIM_NONE")
        } else {
            None
        }
    }

    fn analyze_dmarc(&self, email: &EmailRecord) -> Option<RuleMatch> {
        let auth_results = email.header("authentication-results").unwrap_or("").to_lowercase();
        if auth_results.contains("dmarc=fail") {
            self.rules.hit("DMARC_FAIL")
        } else {
            None
        }
    }

    fn analyze_date(&self, ctx: &AnalysisContext<'_>) -> Vec<RuleMatch> {
        let mut matches = Vec::new();
        match ctx.email.date {
            None => matches.extend(self.rules.hit("MISSING_DATE")),
            Some(date) => {
                if date > ctx.now + Duration::days(1) {
                    matches.extend(
                        self.rules
                            .hit("FUTURE_DATE")
                            .map(|m| m.with_details(date.to_rfc3339())),
                    );
                }
                if date < ctx.now - Duration::days(365) {
                    matches.extend(
                        self.rules
                            .hit("OLD_DATE")
                            .map(|m| m.with_details(date.to_rfc3339())),
                    );
                }
            }
        }
        matches
    }

    fn analyze_message_id(&self, email: &EmailRecord) -> Option<RuleMatch> {
        match email.message_id.as_deref().map(str::trim) {
            None | Some("") => self.rules.hit("MISSING_MESSAGE_ID"),
            Some(id) if !MESSAGE_ID.is_match(id) => self
                .rules
                .hit("INVALID_MESSAGE_ID")
                .map(|m| m.with_evidence([id])),
            Some(_) => None,
        }
    }

    fn analyze_received(&self, email: &EmailRecord) -> Vec<RuleMatch> {
        let mut matches = Vec::new();
        let hops = email
            .received_chain
            .len()
            .max(email.header_values("received").len());
        if hops > MAX_RECEIVED_HOPS {
            matches.extend(
                self.rules
                    .hit("EXCESSIVE_HOPS")
                    .map(|m| m.with_details(format!("{} hops", hops))),
            );
        }

        // One flag per email: stop at the first forged-looking hop.
        if let Some(hop) = email
            .received_chain
            .iter()
            .find(|hop| PRIVATE_IP.is_match(&hop.from) && PUBLIC_SUFFIX.is_match(&hop.from))
        {
            matches.extend(
                self.rules
                    .hit("FORGED_RECEIVED")
                    .map(|m| m.with_evidence([hop.from.as_str()])),
            );
        }
        matches
    }

    fn analyze_alignment(&self, email: &EmailRecord) -> Vec<RuleMatch> {
        let mut matches = Vec::new();
        let Some(from) = &email.from else {
            return matches;
        };

        if let Some(reply_to) = &email.reply_to {
            if !reply_to.domain.eq_ignore_ascii_case(&from.domain) {
                matches.extend(
                    self.rules
                        .hit("REPLY_TO_MISMATCH")
                        .map(|m| m.with_details(format!("{} vs {}", from.domain, reply_to.domain))),
                );
            }
        }

        if let Some(return_domain) = email
            .return_path
            .as_deref()
            .and_then(DomainUtils::extract_domain)
        {
            if !return_domain.eq_ignore_ascii_case(&from.domain) {
                matches.extend(
                    self.rules
                        .hit("RETURN_PATH_MISMATCH")
                        .map(|m| m.with_details(format!("{} vs {}", from.domain, return_domain))),
                );
            }
        }
        matches
    }

    fn analyze_mailer(&self, email: &EmailRecord) -> Option<RuleMatch> {
        let mailer = email.header("x-mailer")?.to_lowercase();
        let signature = BULK_MAILER_SIGNATURES
            .iter()
            .find(|sig| mailer.contains(*sig))?;
        self.rules
            .hit("BULK_MAILER")
            .map(|m| m.with_details(*signature))
    }

    fn analyze_sender_domain(&self, email: &EmailRecord) -> Option<RuleMatch> {
        let domain = &email.from.as_ref()?.domain;
        if DomainUtils::matches_domain_list(domain, DISPOSABLE_DOMAINS) {
            self.rules
                .hit("DISPOSABLE_EMAIL")
                .map(|m| m.with_details(domain.clone()))
        } else if FREEMAIL_DOMAINS.contains(&domain.as_str()) {
            self.rules
                .hit("FREEMAIL_SENDER")
                .map(|m| m.with_details(domain.clone()))
        } else {
            None
        }
    }

    fn analyze_recipients(&self, email: &EmailRecord) -> Option<RuleMatch> {
        if !email.to.iter().any(|addr| addr.is_valid()) {
            self.rules.hit("NO_VALID_RECIPIENT")
        } else if email
            .header_values("to")
            .iter()
            .any(|to| to.contains("undisclosed"))
        {
            self.rules.hit("UNDISCLOSED_RECIPIENTS")
        } else {
            None
        }
    }

    fn analyze_priority(&self, email: &EmailRecord) -> Option<RuleMatch> {
        let x_priority = email
            .header("x-priority")
            .and_then(|p| p.split_whitespace().next())
            .unwrap_or("");
        let importance = email.header("importance").unwrap_or("").trim();

        if x_priority == "1" || importance.eq_ignore_ascii_case("high") {
            self.rules.hit("HIGH_PRIORITY")
        } else {
            None
        }
    }
}

/// A signature with both a signing domain and a signature value.
fn looks_like_dkim_signature(signature: &str) -> bool {
    let compact: String = signature.split_whitespace().collect();
    let has_tag = |tag: &str| {
        compact
            .split(';')
            .any(|part| part.starts_with(tag) && part.len() > tag.len())
    };
    has_tag("d=") && has_tag("b=")
}

impl Analyzer for HeaderAnalyzer {
    fn name(&self) -> &str {
        "header"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalyzerResult {
        let email = ctx.email;
        let mut matches = Vec::new();

        matches.extend(self.analyze_spf(email));
        matches.extend(self.analyze_dkim(email));
        matches.extend(self.analyze_dmarc(email));
        if email.from.is_none() {
            matches.extend(self.rules.hit("MISSING_FROM"));
        }
        matches.extend(self.analyze_date(ctx));
        matches.extend(self.analyze_message_id(email));
        matches.extend(self.analyze_received(email));
        matches.extend(self.analyze_alignment(email));
        matches.extend(self.analyze_mailer(email));
        matches.extend(self.analyze_sender_domain(email));
        matches.extend(self.analyze_recipients(email));
        matches.extend(self.analyze_priority(email));

        let mut metadata = serde_json::Map::new();
        metadata.insert("headerCount".into(), json!(email.headers.len()));
        metadata.insert("receivedHops".into(), json!(email.received_chain.len()));
        metadata.insert(
            "fromDomain".into(),
            json!(email.from.as_ref().map(|f| f.domain.clone())),
        );

        AnalyzerResult::from_matches(self.name(), self.rules.max_score(), matches, metadata)
    }

    fn catalog(&self) -> &RuleCatalog {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::testing::run;
    use crate::email::{Address, ReceivedHop};
    use chrono::{DateTime, Utc};

    fn clean_email() -> EmailRecord {
        EmailRecord {
            from: Some(Address::new("alice", "example.org")),
            to: vec![Address::new("bob", "example.net")],
            message_id: Some("<abc123@example.org>".to_string()),
            date: Some("2025-01-15T08:00:00Z".parse::<DateTime<Utc>>().unwrap()),
            ..Default::default()
        }
        .with_header("received-spf", "pass")
        .with_header("dkim-signature", "v=1; a=rsa-sha256; d=example.org; s=sel; b=abcdef")
    }

    #[test]
    fn test_clean_email_has_no_matches() {
        let result = run(&HeaderAnalyzer::new(), &clean_email());
        assert!(result.matches.is_empty(), "{:?}", result.matches);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_spf_fail_without_dkim() {
        let email = EmailRecord::default().with_header("received-spf", "fail");
        let result = run(&HeaderAnalyzer::new(), &email);
        assert!(result.has_match("SPF_FAIL"));
        assert!(result.has_match("DKIM_NONE"));
        assert_eq!(result.find("DKIM_NONE").unwrap().score(), 0.0);
        assert!(result.score >= 2.5);
    }

    #[test]
    fn test_spf_verdicts_are_exclusive() {
        let analyzer = HeaderAnalyzer::new();
        let soft_email = EmailRecord::default().with_header("received-spf", "SoftFail (domain)");
        let soft = run(&analyzer, &soft_email);
        assert!(soft.has_match("SPF_SOFTFAIL"));
        assert!(!soft.has_match("SPF_FAIL"));
        assert!(!soft.has_match("SPF_NONE"));

        let none = run(&analyzer, &EmailRecord::default());
        assert!(none.has_match("SPF_NONE"));
        let pass = run(&analyzer, &EmailRecord::default().with_header("received-spf", "pass"));
        assert!(!pass.has_match("SPF_NONE"));
    }

    #[test]
    fn test_dkim_fail_and_valid_signature_suppression() {
        let analyzer = HeaderAnalyzer::new();
        let failed = EmailRecord::default()
            .with_header("authentication-results", "mx; dkim=fail; dmarc=fail");
        let result = run(&analyzer, &failed);
        assert!(result.has_match("DKIM_FAIL"));
        assert!(!result.has_match("DKIM_NONE"));
        assert!(result.has_match("DMARC_FAIL"));

        let signed = failed.with_header("dkim-signature", "v=1; d=example.org; b=xyz");
        let result = run(&analyzer, &signed);
        assert!(!result.has_match("DKIM_FAIL"));
        assert!(!result.has_match("DKIM_NONE"));
    }

    #[test]
    fn test_date_rules() {
        let analyzer = HeaderAnalyzer::new();
        let mut email = clean_email();
        email.date = Some("2025-01-20T00:00:00Z".parse().unwrap());
        assert!(run(&analyzer, &email).has_match("FUTURE_DATE"));

        email.date = Some("2020-01-01T00:00:00Z".parse().unwrap());
        let result = run(&analyzer, &email);
        assert!(result.has_match("OLD_DATE"));
        assert!(!result.has_match("FUTURE_DATE"));

        email.date = None;
        assert!(run(&analyzer, &email).has_match("MISSING_DATE"));
    }

    #[test]
    fn test_message_id_missing_vs_malformed() {
        let analyzer = HeaderAnalyzer::new();
        let mut email = clean_email();
        email.message_id = Some("no-brackets".to_string());
        let result = run(&analyzer, &email);
        assert!(result.has_match("INVALID_MESSAGE_ID"));
        assert!(!result.has_match("MISSING_MESSAGE_ID"));

        email.message_id = None;
        let result = run(&analyzer, &email);
        assert!(result.has_match("MISSING_MESSAGE_ID"));
        assert!(!result.has_match("INVALID_MESSAGE_ID"));
    }

    #[test]
    fn test_received_chain_rules() {
        let analyzer = HeaderAnalyzer::new();
        let mut email = clean_email();
        email.received_chain = (0..16)
            .map(|i| ReceivedHop::parse(&format!("from relay{}.example.net by mx", i)))
            .collect();
        email.received_chain.push(ReceivedHop::parse(
            "from mail.bank-secure.com (unknown [192.168.4.20]) by mx.example.net",
        ));
        email.received_chain.push(ReceivedHop::parse(
            "from evil.com ([10.0.0.1]) by mx.example.net",
        ));

        let result = run(&analyzer, &email);
        assert!(result.has_match("EXCESSIVE_HOPS"));
        assert_eq!(result.match_count("FORGED_RECEIVED"), 1);
    }

    #[test]
    fn test_alignment_rules() {
        let analyzer = HeaderAnalyzer::new();
        let mut email = clean_email();
        email.reply_to = Some(Address::new("x", "Other.COM"));
        email.return_path = Some("<bounce@mailer.net>".to_string());
        let result = run(&analyzer, &email);
        assert!(result.has_match("REPLY_TO_MISMATCH"));
        assert!(result.has_match("RETURN_PATH_MISMATCH"));

        email.reply_to = Some(Address::new("x", "EXAMPLE.org"));
        email.return_path = Some("<bounce@example.org>".to_string());
        let result = run(&analyzer, &email);
        assert!(!result.has_match("REPLY_TO_MISMATCH"));
        assert!(!result.has_match("RETURN_PATH_MISMATCH"));
    }

    #[test]
    fn test_bulk_mailer_and_priority() {
        let email = clean_email()
            .with_header("x-mailer", "PHPMailer 6.0")
            .with_header("x-priority", "1 (Highest)");
        let result = run(&HeaderAnalyzer::new(), &email);
        assert_eq!(result.find("BULK_MAILER").unwrap().details.as_deref(), Some("phpmailer"));
        assert!(result.has_match("HIGH_PRIORITY"));

        let email = clean_email().with_header("importance", "HIGH");
        assert!(run(&HeaderAnalyzer::new(), &email).has_match("HIGH_PRIORITY"));
    }

    #[test]
    fn test_disposable_checked_before_freemail() {
        let analyzer = HeaderAnalyzer::new();
        let mut email = clean_email();
        email.from = Some(Address::new("x", "mailinator.com"));
        let result = run(&analyzer, &email);
        assert!(result.has_match("DISPOSABLE_EMAIL"));
        assert!(!result.has_match("FREEMAIL_SENDER"));

        email.from = Some(Address::new("x", "gmail.com"));
        let result = run(&analyzer, &email);
        assert!(result.has_match("FREEMAIL_SENDER"));
        assert!(!result.has_match("DISPOSABLE_EMAIL"));
    }

    #[test]
    fn test_recipient_rules() {
        let analyzer = HeaderAnalyzer::new();
        let mut email = clean_email();
        email.to.clear();
        let result = run(&analyzer, &email);
        assert!(result.has_match("NO_VALID_RECIPIENT"));
        assert!(!result.has_match("UNDISCLOSED_RECIPIENTS"));

        let email = clean_email().with_header("to", "undisclosed-recipients:; bob@example.net");
        let result = run(&analyzer, &email);
        assert!(result.has_match("UNDISCLOSED_RECIPIENTS"));
        assert!(!result.has_match("NO_VALID_RECIPIENT"));

        // Case-sensitive substring match on the raw header.
        let email = clean_email().with_header("to", "Undisclosed recipients:; bob@example.net");
        assert!(!run(&analyzer, &email).has_match("UNDISCLOSED_RECIPIENTS"));
    }

    #[test]
    fn test_missing_from() {
        let mut email = clean_email();
        email.from = None;
        assert!(run(&HeaderAnalyzer::new(), &email).has_match("MISSING_FROM"));
    }
}
