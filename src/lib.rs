pub mod analyzers;
pub mod config;
pub mod dataset;
pub mod domain_utils;
pub mod email;
pub mod error;
pub mod language;
pub mod rules;
pub mod scorer;
pub mod text;

pub use config::{AppConfig, ScoringConfig};
pub use email::EmailRecord;
pub use error::{Result, SpamlensError};
pub use language::LanguageDetector;
pub use scorer::{BatchReport, Classification, SpamAnalysisResult, SpamScorer};
