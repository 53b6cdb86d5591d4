#![allow(clippy::uninlined_format_args)]

use spamlens::{EmailRecord, ScoringConfig, SpamScorer};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("Testing a phishing example against the scorer...");

    // Parsed form of a typical credential-phishing message
    let record = r#"{
  "headers": {
    "from": ["\"PayPal Security\" <security@paypal-verify-account.top>"],
    "reply-to": ["support@randomhost.ru"],
    "received-spf": ["fail (domain of paypal-verify-account.top does not designate 203.0.113.9 as permitted sender)"],
    "x-priority": ["1 (Highest)"]
  },
  "subject": "URGENT: Your account has been SUSPENDED!!!",
  "to": [],
  "textBody": "Dear Customer,\n\nWe detected unusual activity. Verify your account within 24 hours or it will be closed.\n\nClick here: http://192.168.10.5/paypal/login.php\n\nPayPal Security Team",
  "htmlBody": "<p>Dear Customer,</p><p>Verify now: <a href=\"http://192.168.10.5/paypal/login.php\">https://www.paypal.com</a></p><div style=\"display:none\">free money winner lottery</div><img src=\"http://tracker.example.net/o.gif\" width=\"1\" height=\"1\">"
}"#;

    let email = EmailRecord::from_json_str(record)?;
    let scorer = SpamScorer::new();
    let config = ScoringConfig {
        enable_debug: true,
        ..Default::default()
    };
    let result = scorer.analyze_with(&email, &config);

    println!();
    println!("Score: {:.2} (threshold {:.1})", result.score, result.threshold);
    println!("Classification: {}", result.classification);
    println!("Confidence: {:.2}", result.confidence);
    println!();
    for analyzer in &result.analyzer_results {
        println!(
            "  {:<10} {:>5.2}  {} matches",
            analyzer.analyzer_name,
            analyzer.score,
            analyzer.matches.len()
        );
    }
    println!();
    println!("Top reasons:");
    for reason in &result.top_reasons {
        println!("  • {}", reason);
    }

    if result.is_spam {
        println!("\n✅ Phishing example classified as spam");
    } else {
        println!("\n❌ Phishing example was NOT classified as spam");
    }

    Ok(())
}
