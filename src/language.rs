//! Script detection and a lightweight stopword-based language guess used to
//! pick the dataset variant for an email.

use serde::Serialize;

/// Minimum number of words before a stopword guess is attempted.
const MIN_WORDS: usize = 5;
/// Only the head of long emails is inspected.
const MAX_WORDS: usize = 500;

const STOPWORDS: &[(&str, &[&str])] = &[
    (
        "en",
        &[
            "the", "and", "you", "your", "for", "with", "this", "that", "are", "have", "from",
            "will", "our", "not", "please", "here", "is", "of", "to", "we",
        ],
    ),
    (
        "de",
        &[
            "der", "die", "das", "und", "ist", "nicht", "sie", "ihr", "ihre", "mit", "für", "auf",
            "wir", "ein", "eine", "bitte", "sehr", "zu", "von", "den",
        ],
    ),
    (
        "fr",
        &[
            "le", "la", "les", "et", "est", "vous", "votre", "pour", "avec", "des", "une", "nous",
            "dans", "sur", "pas", "qui", "que", "du", "au", "merci",
        ],
    ),
    (
        "es",
        &[
            "el", "los", "las", "y", "es", "usted", "su", "para", "con", "una", "por", "que",
            "del", "nosotros", "gracias", "está", "como", "pero", "muy", "más",
        ],
    ),
    (
        "pt",
        &[
            "o", "os", "e", "é", "você", "seu", "sua", "para", "com", "uma", "não", "que", "do",
            "da", "obrigado", "está", "como", "mas", "muito", "em",
        ],
    ),
    (
        "it",
        &[
            "il", "lo", "gli", "e", "è", "lei", "suo", "per", "con", "una", "non", "che", "del",
            "della", "grazie", "sono", "come", "ma", "molto", "di",
        ],
    ),
    (
        "nl",
        &[
            "de", "het", "een", "en", "is", "niet", "u", "uw", "voor", "met", "wij", "op", "van",
            "dat", "bedankt", "zijn", "maar", "heel", "naar", "ook",
        ],
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageGuess {
    pub code: String,
    pub confidence: f64,
}

impl LanguageGuess {
    fn fallback() -> Self {
        Self {
            code: "en".to_string(),
            confidence: 0.0,
        }
    }
}

pub struct LanguageDetector;

impl LanguageDetector {
    /// Guess the dominant language. Confidence is the share of stopword hits
    /// that belong to the winning language; short or stopword-free texts
    /// come back as English with zero confidence.
    pub fn detect(text: &str) -> LanguageGuess {
        if Self::contains_russian(text) && !Self::contains_latin(text) {
            return LanguageGuess {
                code: "ru".to_string(),
                confidence: 0.9,
            };
        }

        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
            .take(MAX_WORDS)
            .map(str::to_lowercase)
            .collect();
        if words.len() < MIN_WORDS {
            return LanguageGuess::fallback();
        }

        let mut hits: Vec<(&str, usize)> = STOPWORDS
            .iter()
            .map(|(code, list)| {
                let count = words.iter().filter(|w| list.contains(&w.as_str())).count();
                (*code, count)
            })
            .collect();
        let total: usize = hits.iter().map(|(_, c)| c).sum();
        if total == 0 {
            return LanguageGuess::fallback();
        }

        // Stable order keeps ties deterministic (declaration order wins).
        hits.sort_by(|a, b| b.1.cmp(&a.1));
        let (code, best) = hits[0];
        LanguageGuess {
            code: code.to_string(),
            confidence: best as f64 / total as f64,
        }
    }

    pub fn contains_latin(text: &str) -> bool {
        text.chars().any(|c| c.is_ascii_alphabetic())
            || text.chars().any(|c| {
                matches!(c,
                    '\u{00C0}'..='\u{00FF}' |  // Latin-1 Supplement letters
                    '\u{0100}'..='\u{024F}'    // Latin Extended-A/B
                ) && c.is_alphabetic()
            })
    }

    pub fn contains_russian(text: &str) -> bool {
        text.chars().any(|c| {
            // Cyrillic: U+0400–U+04FF
            // Cyrillic Supplement: U+0500–U+052F
            matches!(c,
                '\u{0400}'..='\u{04FF}' |  // Cyrillic
                '\u{0500}'..='\u{052F}'    // Cyrillic Supplement
            )
        })
    }

    pub fn contains_greek(text: &str) -> bool {
        text.chars().any(|c| {
            // Greek and Coptic: U+0370–U+03FF
            matches!(c, '\u{0370}'..='\u{03FF}') && c.is_alphabetic()
        })
    }

    pub fn contains_cjk(text: &str) -> bool {
        text.chars().any(|c| {
            matches!(c,
                '\u{3040}'..='\u{309F}' |  // Hiragana
                '\u{30A0}'..='\u{30FF}' |  // Katakana
                '\u{4E00}'..='\u{9FAF}' |  // CJK Unified Ideographs
                '\u{3400}'..='\u{4DBF}' |  // CJK Extension A
                '\u{AC00}'..='\u{D7AF}'    // Hangul Syllables
            )
        })
    }

    pub fn contains_arabic(text: &str) -> bool {
        text.chars().any(|c| {
            matches!(c,
                '\u{0600}'..='\u{06FF}' |  // Arabic
                '\u{0750}'..='\u{077F}' |  // Arabic Supplement
                '\u{08A0}'..='\u{08FF}'    // Arabic Extended-A
            )
        })
    }

    pub fn contains_hebrew(text: &str) -> bool {
        text.chars().any(|c| matches!(c, '\u{0590}'..='\u{05FF}'))
    }

    /// Scripts present in the text, in a fixed order.
    pub fn scripts(text: &str) -> Vec<&'static str> {
        let checks: [(&str, fn(&str) -> bool); 6] = [
            ("latin", Self::contains_latin),
            ("cyrillic", Self::contains_russian),
            ("greek", Self::contains_greek),
            ("cjk", Self::contains_cjk),
            ("arabic", Self::contains_arabic),
            ("hebrew", Self::contains_hebrew),
        ];
        checks
            .iter()
            .filter(|(_, check)| check(text))
            .map(|(name, _)| *name)
            .collect()
    }
}
