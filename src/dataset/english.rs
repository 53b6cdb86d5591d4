//! Built-in English dataset. This is the default and the fallback for every
//! language without its own dataset.

use super::{LanguageDataset, SpamPhrase, SubjectPattern, TokenFrequency};

const SPAM_PHRASES: &[(&str, f64)] = &[
    ("act now", 1.0),
    ("free money", 1.5),
    ("click here", 0.8),
    ("click below", 0.6),
    ("limited time offer", 1.0),
    ("risk free", 0.8),
    ("100% free", 1.0),
    ("100% guaranteed", 1.0),
    ("no credit check", 1.5),
    ("you have been selected", 1.5),
    ("you have won", 2.0),
    ("claim your prize", 2.0),
    ("cash bonus", 1.2),
    ("double your income", 1.5),
    ("earn money fast", 1.5),
    ("make money online", 1.2),
    ("work from home", 1.0),
    ("lose weight fast", 1.5),
    ("miracle cure", 1.5),
    ("meet singles", 1.5),
    ("no strings attached", 0.8),
    ("once in a lifetime", 1.0),
    ("verify your account", 1.5),
    ("confirm your identity", 1.5),
    ("account has been suspended", 2.0),
    ("unusual activity", 1.0),
    ("wire transfer", 1.0),
    ("western union", 1.5),
    ("bank account details", 1.5),
    ("dear beneficiary", 2.0),
    ("million dollars", 1.5),
    ("this is not spam", 2.0),
    ("order now", 0.8),
    ("buy now", 0.8),
    ("special promotion", 0.8),
    ("urgent response", 1.2),
    ("lowest price", 0.8),
    ("online pharmacy", 2.0),
    ("no prescription", 2.0),
    ("be your own boss", 1.0),
    ("financial freedom", 1.0),
    ("100% satisfied", 0.6),
];

const CASE_SENSITIVE_PHRASES: &[(&str, f64)] = &[
    ("ACT NOW", 0.8),
    ("URGENT:", 0.8),
    ("$$$", 1.0),
    ("FREE!", 0.8),
];

const SPAM_WORDS: &[(&str, f64)] = &[
    ("viagra", 2.0),
    ("v1agra", 2.0),
    ("cialis", 2.0),
    ("levitra", 2.0),
    ("pharmacy", 0.5),
    ("pills", 0.6),
    ("casino", 1.5),
    ("lottery", 1.5),
    ("jackpot", 1.0),
    ("winner", 0.8),
    ("prize", 0.7),
    ("bitcoin", 0.5),
    ("crypto", 0.5),
    ("inheritance", 1.0),
    ("beneficiary", 0.8),
    ("urgent", 0.5),
    ("guaranteed", 0.5),
    ("unsecured", 0.8),
    ("refinance", 0.7),
    ("payday", 1.0),
    ("replica", 1.2),
    ("rolex", 0.8),
    ("xxx", 1.5),
    ("porn", 1.5),
    ("free", 0.3),
    ("money", 0.3),
    ("cash", 0.5),
    ("cheap", 0.5),
    ("bonus", 0.4),
    ("earn", 0.3),
    ("million", 0.5),
    ("billion", 0.5),
    ("congratulations", 0.6),
    ("claim", 0.4),
    ("suspended", 0.8),
    ("unsubscribe", 0.1),
];

const HAM_PHRASES: &[(&str, f64)] = &[
    ("please find attached", -0.5),
    ("as discussed", -0.5),
    ("let me know", -0.3),
    ("thanks for your", -0.3),
    ("looking forward to", -0.3),
    ("best regards", -0.3),
    ("kind regards", -0.3),
    ("per our conversation", -0.5),
    ("meeting notes", -0.5),
    ("pull request", -0.5),
    ("code review", -0.5),
    ("see you tomorrow", -0.3),
    ("the agenda", -0.3),
    ("your order has shipped", -0.3),
];

const SUBJECT_PATTERNS: &[(&str, f64, &str)] = &[
    (r"(?i)\byou(?:'ve| have)? (?:won|been selected)\b", 2.0, "winner announcement"),
    (
        r"(?i)\b(?:urgent|important|action required)\b.*\b(?:account|payment|verify|verification)\b",
        1.5,
        "urgent account action",
    ),
    (r"[$€£]\s?\d+", 1.0, "money amount in subject"),
    (r"(?i)\b\d{2,3}\s?% off\b", 0.8, "percent-off discount"),
    (r"(?i)\bfree\b.*!", 1.0, "free offer with exclamation"),
    (r"!{2,}", 1.0, "multiple exclamation marks"),
    (r"(?i)\b(?:viagra|cialis|pharmacy|pills)\b", 2.0, "pharmacy spam"),
    (
        r"(?i)\b(?:your|the) (?:account|password) (?:has been|will be|is) (?:suspended|locked|disabled|expired)\b",
        2.0,
        "account suspension notice",
    ),
    (r"(?i)^\s*(?:re|fwd?):\s*(?:re|fwd?):\s*(?:re|fwd?):", 0.5, "stacked reply prefixes"),
];

const TOKENS: &[(&str, f64, f64)] = &[
    // spam-leaning
    ("viagra", 950.0, 5.0),
    ("v1agra", 500.0, 1.0),
    ("cialis", 900.0, 5.0),
    ("free", 600.0, 250.0),
    ("money", 500.0, 200.0),
    ("urgent", 400.0, 150.0),
    ("winner", 450.0, 30.0),
    ("prize", 420.0, 40.0),
    ("lottery", 480.0, 10.0),
    ("claim", 300.0, 120.0),
    ("click", 500.0, 200.0),
    ("offer", 400.0, 200.0),
    ("guaranteed", 380.0, 60.0),
    ("cash", 420.0, 90.0),
    ("loan", 320.0, 100.0),
    ("inheritance", 250.0, 10.0),
    ("beneficiary", 260.0, 15.0),
    ("million", 350.0, 60.0),
    ("bitcoin", 280.0, 80.0),
    ("casino", 400.0, 15.0),
    ("cheap", 350.0, 60.0),
    ("act", 250.0, 150.0),
    ("now", 400.0, 300.0),
    ("congratulations", 300.0, 60.0),
    ("verify", 300.0, 120.0),
    ("suspended", 220.0, 30.0),
    ("dollars", 300.0, 80.0),
    ("wire", 200.0, 60.0),
    ("pharmacy", 300.0, 20.0),
    ("pills", 350.0, 15.0),
    ("income", 250.0, 70.0),
    ("bonus", 300.0, 80.0),
    ("exclusive", 250.0, 120.0),
    ("unsubscribe", 400.0, 250.0),
    ("limited", 300.0, 200.0),
    ("discount", 300.0, 150.0),
    ("opportunity", 280.0, 110.0),
    // neutral-ish
    ("account", 400.0, 350.0),
    ("please", 300.0, 450.0),
    ("order", 300.0, 300.0),
    ("invoice", 150.0, 200.0),
    ("hello", 150.0, 300.0),
    ("call", 150.0, 250.0),
    // ham-leaning
    ("meeting", 20.0, 400.0),
    ("project", 30.0, 420.0),
    ("attached", 80.0, 400.0),
    ("thanks", 100.0, 500.0),
    ("regards", 60.0, 450.0),
    ("schedule", 40.0, 300.0),
    ("agenda", 10.0, 250.0),
    ("review", 60.0, 320.0),
    ("team", 90.0, 400.0),
    ("report", 70.0, 330.0),
    ("tomorrow", 60.0, 350.0),
    ("discuss", 30.0, 300.0),
    ("lunch", 20.0, 200.0),
    ("deadline", 60.0, 250.0),
    ("document", 80.0, 300.0),
    ("question", 70.0, 280.0),
    ("github", 10.0, 200.0),
    ("commit", 5.0, 180.0),
    ("deploy", 10.0, 190.0),
    ("family", 80.0, 200.0),
    ("weekend", 60.0, 220.0),
];

const URGENCY_WORDS: &[&str] = &[
    "urgent",
    "urgently",
    "immediately",
    "act now",
    "hurry",
    "expires",
    "expiring",
    "asap",
    "today only",
    "last chance",
    "final notice",
    "right away",
    "don't miss",
    "within 24 hours",
];

const GREETING_WORDS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "dear",
    "good morning",
    "good afternoon",
    "good evening",
    "greetings",
    "howdy",
];

const GENERIC_GREETINGS: &[&str] = &[
    "dear customer",
    "dear valued customer",
    "dear user",
    "dear account holder",
    "dear sir/madam",
    "dear sir or madam",
    "dear friend",
    "dear beneficiary",
    "dear member",
    "dear client",
    "hello dear",
];

pub fn dataset() -> LanguageDataset {
    let spam_phrases = SPAM_PHRASES
        .iter()
        .map(|(phrase, score)| (phrase, score, false))
        .chain(
            CASE_SENSITIVE_PHRASES
                .iter()
                .map(|(phrase, score)| (phrase, score, true)),
        )
        .map(|(phrase, score, case_sensitive)| SpamPhrase {
            phrase: phrase.to_string(),
            score: *score,
            case_sensitive,
        })
        .collect();

    LanguageDataset {
        language: "en".to_string(),
        spam_phrases,
        spam_single_word_scores: SPAM_WORDS
            .iter()
            .map(|(word, score)| (word.to_string(), *score))
            .collect(),
        spam_subject_patterns: SUBJECT_PATTERNS
            .iter()
            .map(|(pattern, score, description)| SubjectPattern {
                pattern: pattern.to_string(),
                score: *score,
                description: Some(description.to_string()),
            })
            .collect(),
        ham_phrase_adjustments: HAM_PHRASES
            .iter()
            .map(|(phrase, adj)| (phrase.to_string(), *adj))
            .collect(),
        bayesian_token_probabilities: TOKENS
            .iter()
            .map(|(token, spam, ham)| {
                (
                    token.to_string(),
                    TokenFrequency {
                        spam: *spam,
                        ham: *ham,
                    },
                )
            })
            .collect(),
        urgency_words: to_strings(URGENCY_WORDS),
        greeting_words: to_strings(GREETING_WORDS),
        generic_greeting_phrases: to_strings(GENERIC_GREETINGS),
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
