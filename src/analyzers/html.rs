//! HTML Analyzer
//!
//! Structural checks over the raw HTML body: concealed text, image-heavy
//! layouts, tracking pixels, active content and markup noise.

use super::{AnalysisContext, Analyzer};
use crate::rules::{AnalyzerResult, RuleCatalog, RuleCategory, RuleDef, RuleMatch};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

const RULES: &[RuleDef] = &[
    RuleDef::new(
        "HIDDEN_TEXT",
        "CSS used to hide text",
        2.5,
        RuleCategory::Html,
    ),
    RuleDef::new(
        "TINY_FONT",
        "Text rendered at an unreadable size",
        1.5,
        RuleCategory::Html,
    ),
    RuleDef::new(
        "INVISIBLE_TEXT",
        "Text color matches its background",
        2.0,
        RuleCategory::Html,
    ),
    RuleDef::new(
        "EXCESSIVE_IMAGES",
        "Too many images",
        1.0,
        RuleCategory::Html,
    ),
    RuleDef::new(
        "IMAGE_ONLY",
        "Message is images with almost no text",
        2.0,
        RuleCategory::Html,
    ),
    RuleDef::new(
        "REMOTE_IMAGES",
        "Loads images from remote servers",
        0.5,
        RuleCategory::Html,
    ),
    RuleDef::new(
        "TRACKING_PIXEL",
        "Contains a 1x1 tracking image",
        1.0,
        RuleCategory::Html,
    ),
    RuleDef::new(
        "EMBEDDED_IMAGE",
        "Contains base64-embedded images",
        0.5,
        RuleCategory::Html,
    ),
    RuleDef::new(
        "HTML_FORM",
        "Contains an HTML form",
        2.0,
        RuleCategory::Html,
    ),
    RuleDef::new(
        "JAVASCRIPT",
        "Contains scripts or event handlers",
        2.5,
        RuleCategory::Html,
    ),
    RuleDef::new("IFRAME", "Contains an iframe", 2.0, RuleCategory::Html),
    RuleDef::new(
        "OBJECT_EMBED",
        "Contains object or embed elements",
        2.0,
        RuleCategory::Html,
    ),
    RuleDef::new(
        "COMMENT_STUFFING",
        "Padded with HTML comments",
        1.5,
        RuleCategory::Obfuscation,
    ),
    RuleDef::new(
        "EXCESSIVE_TABLES",
        "Table-heavy spam layout",
        0.5,
        RuleCategory::Structure,
    ),
    RuleDef::new(
        "MALFORMED_HTML",
        "Open and close tags do not balance",
        1.0,
        RuleCategory::Structure,
    ),
];

const MAX_IMAGES: usize = 10;
const IMAGE_ONLY_TEXT_CHARS: usize = 50;
const MAX_COMMENTS: usize = 10;
const MAX_COMMENT_CHARS: usize = 1000;
const MAX_TABLES: usize = 5;
const MALFORMED_RATIO: f64 = 0.3;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

lazy_static! {
    static ref HIDING_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("display:none", Regex::new(r"(?i)display\s*:\s*none").unwrap()),
        ("visibility:hidden", Regex::new(r"(?i)visibility\s*:\s*hidden").unwrap()),
        ("opacity:0", Regex::new(r#"(?i)opacity\s*:\s*0(?:\.0+)?\s*(?:[;"'}]|$)"#).unwrap()),
        (
            "height:0",
            Regex::new(r#"(?i)(?:^|[^-\w])height\s*:\s*0(?:px)?\s*(?:[;"'}]|$)"#).unwrap(),
        ),
        (
            "font-size:0",
            Regex::new(r#"(?i)font-size\s*:\s*0(?:px|pt|em)?\s*(?:[;"'}]|$)"#).unwrap(),
        ),
    ];
    static ref TINY_FONT: Regex = Regex::new(
        r#"(?i)font-size\s*:\s*[0-4](?:\.\d+)?\s*(?:px|pt|em)\b|<font\b[^>]*\bsize\s*=\s*["']?1\b"#
    )
    .unwrap();
    static ref STYLE_ATTR: Regex =
        Regex::new(r#"(?i)\bstyle\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
    static ref CSS_COLOR: Regex = Regex::new(r"(?i)(?:^|[;\s])color\s*:\s*([^;]+)").unwrap();
    static ref CSS_BACKGROUND: Regex =
        Regex::new(r"(?i)(?:^|[;\s])background(?:-color)?\s*:\s*([^;]+)").unwrap();
    static ref BODY_BGCOLOR: Regex =
        Regex::new(r#"(?i)<body\b[^>]*\bbgcolor\s*=\s*["']?([#\w]+)"#).unwrap();
    static ref FONT_COLOR: Regex =
        Regex::new(r#"(?i)<font\b[^>]*\bcolor\s*=\s*["']?([#\w]+)"#).unwrap();
    static ref IMG_TAG: Regex = Regex::new(r"(?i)<img\b[^>]*>").unwrap();
    static ref REMOTE_SRC: Regex = Regex::new(r#"(?i)\bsrc\s*=\s*["']?https?://"#).unwrap();
    static ref ATTR_WIDTH_1: Regex =
        Regex::new(r#"(?i)\swidth\s*=\s*["']?1(?:px)?(?:["'\s/>]|$)"#).unwrap();
    static ref ATTR_HEIGHT_1: Regex =
        Regex::new(r#"(?i)\sheight\s*=\s*["']?1(?:px)?(?:["'\s/>]|$)"#).unwrap();
    static ref STYLE_WIDTH_1: Regex = Regex::new(r#"(?i)(?:^|[;"'\s])width\s*:\s*1px"#).unwrap();
    static ref STYLE_HEIGHT_1: Regex = Regex::new(r#"(?i)(?:^|[;"'\s])height\s*:\s*1px"#).unwrap();
    static ref DATA_IMAGE: Regex = Regex::new(r#"(?i)\bsrc\s*=\s*["']?data:image/"#).unwrap();
    static ref FORM: Regex = Regex::new(r"(?i)<form\b").unwrap();
    static ref SCRIPT_INDICATORS: Vec<(&'static str, Regex)> = vec![
        ("script tag", Regex::new(r"(?i)<script\b").unwrap()),
        ("event handler", Regex::new(r"(?i)\son[a-z]+\s*=").unwrap()),
        ("javascript: URI", Regex::new(r"(?i)javascript\s*:").unwrap()),
    ];
    static ref IFRAME: Regex = Regex::new(r"(?i)<iframe\b").unwrap();
    static ref OBJECT_EMBED: Regex = Regex::new(r"(?i)<(?:object|embed)\b").unwrap();
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--(.*?)-->").unwrap();
    static ref TABLE: Regex = Regex::new(r"(?i)<table\b").unwrap();
    static ref OPEN_TAG: Regex = Regex::new(r"<([a-zA-Z][a-zA-Z0-9]*)\b[^>]*>").unwrap();
    static ref CLOSE_TAG: Regex = Regex::new(r"</([a-zA-Z][a-zA-Z0-9]*)\s*>").unwrap();
}

pub struct HtmlAnalyzer {
    rules: RuleCatalog,
}

impl Default for HtmlAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlAnalyzer {
    pub fn new() -> Self {
        Self {
            rules: RuleCatalog::new(RULES),
        }
    }

    fn analyze_concealment(&self, html: &str) -> Vec<RuleMatch> {
        let mut matches = Vec::new();

        // One flag no matter how many hiding techniques appear.
        let hiding: Vec<&str> = HIDING_PATTERNS
            .iter()
            .filter(|(_, re)| re.is_match(html))
            .map(|(label, _)| *label)
            .collect();
        if !hiding.is_empty() {
            matches.extend(self.rules.hit("HIDDEN_TEXT").map(|m| m.with_evidence(hiding)));
        }

        if let Some(found) = TINY_FONT.find(html) {
            matches.extend(self.rules.hit("TINY_FONT").map(|m| m.with_evidence([found.as_str()])));
        }

        if let Some(pair) = find_invisible_ink(html) {
            matches.extend(self.rules.hit("INVISIBLE_TEXT").map(|m| m.with_details(pair)));
        }
        matches
    }

    fn analyze_images(
        &self,
        html: &str,
        visible_text: &str,
        metadata: &mut serde_json::Map<String, serde_json::Value>,
    ) -> Vec<RuleMatch> {
        let mut matches = Vec::new();
        let images: Vec<&str> = IMG_TAG.find_iter(html).map(|m| m.as_str()).collect();

        if images.len() > MAX_IMAGES {
            matches.extend(
                self.rules
                    .hit("EXCESSIVE_IMAGES")
                    .map(|m| m.with_details(format!("{} images", images.len()))),
            );
        }
        if !images.is_empty() && visible_text.trim().chars().count() < IMAGE_ONLY_TEXT_CHARS {
            matches.extend(self.rules.hit("IMAGE_ONLY"));
        }

        let remote = images.iter().filter(|tag| REMOTE_SRC.is_match(tag)).count();
        if remote > 0 {
            matches.extend(
                self.rules
                    .hit("REMOTE_IMAGES")
                    .map(|m| m.with_details(format!("{} remote images", remote))),
            );
        }

        if let Some(pixel) = images.iter().find(|tag| is_tracking_pixel(tag)) {
            matches.extend(self.rules.hit("TRACKING_PIXEL").map(|m| m.with_evidence([*pixel])));
        }

        if images.iter().any(|tag| DATA_IMAGE.is_match(tag)) {
            matches.extend(self.rules.hit("EMBEDDED_IMAGE"));
        }

        metadata.insert("imageCount".into(), json!(images.len()));
        metadata.insert("remoteImageCount".into(), json!(remote));
        matches
    }

    fn analyze_active_content(&self, html: &str) -> Vec<RuleMatch> {
        let mut matches = Vec::new();

        if FORM.is_match(html) {
            matches.extend(self.rules.hit("HTML_FORM"));
        }

        let scripts: Vec<&str> = SCRIPT_INDICATORS
            .iter()
            .filter(|(_, re)| re.is_match(html))
            .map(|(label, _)| *label)
            .collect();
        if !scripts.is_empty() {
            matches.extend(self.rules.hit("JAVASCRIPT").map(|m| m.with_evidence(scripts)));
        }

        if IFRAME.is_match(html) {
            matches.extend(self.rules.hit("IFRAME"));
        }
        if OBJECT_EMBED.is_match(html) {
            matches.extend(self.rules.hit("OBJECT_EMBED"));
        }
        matches
    }

    fn analyze_markup(
        &self,
        html: &str,
        metadata: &mut serde_json::Map<String, serde_json::Value>,
    ) -> Vec<RuleMatch> {
        let mut matches = Vec::new();

        let (comment_count, comment_chars) = COMMENT
            .captures_iter(html)
            .fold((0usize, 0usize), |(count, chars), c| {
                (count + 1, chars + c.get(1).map_or(0, |m| m.as_str().chars().count()))
            });
        if comment_count > MAX_COMMENTS || comment_chars > MAX_COMMENT_CHARS {
            matches.extend(self.rules.hit("COMMENT_STUFFING").map(|m| {
                m.with_details(format!("{} comments, {} chars", comment_count, comment_chars))
            }));
        }

        let tables = TABLE.find_iter(html).count();
        if tables > MAX_TABLES {
            matches.extend(
                self.rules
                    .hit("EXCESSIVE_TABLES")
                    .map(|m| m.with_details(format!("{} tables", tables))),
            );
        }

        // Comments may contain markup of their own.
        let stripped = COMMENT.replace_all(html, "");
        let open = OPEN_TAG
            .captures_iter(&stripped)
            .filter(|c| {
                let name = c[1].to_lowercase();
                !VOID_ELEMENTS.contains(&name.as_str()) && !c[0].ends_with("/>")
            })
            .count();
        let close = CLOSE_TAG.find_iter(&stripped).count();
        let diff = open.abs_diff(close);
        if open > 0 && diff as f64 > open as f64 * MALFORMED_RATIO {
            matches.extend(
                self.rules
                    .hit("MALFORMED_HTML")
                    .map(|m| m.with_details(format!("{} open, {} close", open, close))),
            );
        }

        metadata.insert("commentCount".into(), json!(comment_count));
        metadata.insert("tableCount".into(), json!(tables));
        metadata.insert("openTags".into(), json!(open));
        metadata.insert("closeTags".into(), json!(close));
        matches
    }
}

fn is_tracking_pixel(tag: &str) -> bool {
    (ATTR_WIDTH_1.is_match(tag) && ATTR_HEIGHT_1.is_match(tag))
        || (STYLE_WIDTH_1.is_match(tag) && STYLE_HEIGHT_1.is_match(tag))
}

/// Collapse common spellings of white and black; other colors are not compared.
fn normalize_color(raw: &str) -> Option<&'static str> {
    let value: String = raw
        .to_lowercase()
        .replace("!important", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    match value.as_str() {
        "white" | "#fff" | "#ffffff" | "rgb(255,255,255)" => Some("white"),
        "black" | "#000" | "#000000" | "rgb(0,0,0)" => Some("black"),
        _ => None,
    }
}

/// `"<color> on <color>"` for the first element whose text matches its background.
fn find_invisible_ink(html: &str) -> Option<String> {
    for caps in STYLE_ATTR.captures_iter(html) {
        let style = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        let fg = CSS_COLOR
            .captures(style)
            .and_then(|c| normalize_color(&c[1]));
        let bg = CSS_BACKGROUND
            .captures(style)
            .and_then(|c| normalize_color(&c[1]));
        if let (Some(fg), Some(bg)) = (fg, bg) {
            if fg == bg {
                return Some(format!("{} on {}", fg, bg));
            }
        }
    }

    let bg = BODY_BGCOLOR
        .captures(html)
        .and_then(|c| normalize_color(&c[1]))?;
    FONT_COLOR
        .captures_iter(html)
        .filter_map(|c| normalize_color(&c[1]))
        .find(|fg| *fg == bg)
        .map(|fg| format!("{} on {}", fg, bg))
}

impl Analyzer for HtmlAnalyzer {
    fn name(&self) -> &str {
        "html"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalyzerResult {
        let html = ctx.email.html_body.as_str();
        if html.trim().is_empty() {
            return AnalyzerResult::empty(self.name(), self.rules.max_score());
        }

        let mut metadata = serde_json::Map::new();
        let mut matches = Vec::new();
        matches.extend(self.analyze_concealment(html));
        matches.extend(self.analyze_images(html, &ctx.html_text, &mut metadata));
        matches.extend(self.analyze_active_content(html));
        matches.extend(self.analyze_markup(html, &mut metadata));
        metadata.insert("textLength".into(), json!(ctx.html_text.chars().count()));

        AnalyzerResult::from_matches(self.name(), self.rules.max_score(), matches, metadata)
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
    fn test_no_html_is_empty_result() {
        let result = run(&HtmlAnalyzer::new(), &text_email("hi", "plain text"));
        assert_eq!(result.score, 0.0);
        assert!(result.matches.is_empty());
        assert!(result.metadata.is_empty());
    }

    #[test]
    fn test_hidden_text_single_flag() {
        let email = html_email(r#"<div style="display:none">x</div><p>Hello</p>"#);
        let result = run(&HtmlAnalyzer::new(), &email);
        assert_eq!(result.match_count("HIDDEN_TEXT"), 1);
        assert_eq!(result.find("HIDDEN_TEXT").unwrap().score(), 2.5);
        assert!(!result.has_match("MALFORMED_HTML"));

        let many = html_email(
            r#"<div style="display:none">a</div><span style="visibility:hidden;opacity:0">b</span>"#,
        );
        let result = run(&HtmlAnalyzer::new(), &many);
        assert_eq!(result.match_count("HIDDEN_TEXT"), 1);
        assert_eq!(result.find("HIDDEN_TEXT").unwrap().evidence.len(), 3);
    }

    #[test]
    fn test_line_height_is_not_hidden_text() {
        let email = html_email(r#"<p style="line-height:0;">text</p>"#);
        assert!(!run(&HtmlAnalyzer::new(), &email).has_match("HIDDEN_TEXT"));
    }

    #[test]
    fn test_tiny_font() {
        let analyzer = HtmlAnalyzer::new();
        let tiny = html_email(r#"<span style="font-size: 2px">buy</span>"#);
        assert!(run(&analyzer, &tiny).has_match("TINY_FONT"));
        let normal = html_email(r#"<span style="font-size: 14px">hello</span>"#);
        assert!(!run(&analyzer, &normal).has_match("TINY_FONT"));
    }

    #[test]
    fn test_invisible_ink() {
        let analyzer = HtmlAnalyzer::new();
        let email = html_email(r##"<p style="color: #FFFFFF; background-color: white">salad</p>"##);
        let result = run(&analyzer, &email);
        assert_eq!(
            result.find("INVISIBLE_TEXT").unwrap().details.as_deref(),
            Some("white on white")
        );

        let legacy = html_email(r##"<body bgcolor="#000000"><font color="black">x</font></body>"##);
        assert!(run(&analyzer, &legacy).has_match("INVISIBLE_TEXT"));

        let readable = html_email(r#"<p style="color: black; background: white">ok</p>"#);
        assert!(!run(&analyzer, &readable).has_match("INVISIBLE_TEXT"));
    }

    #[test]
    fn test_image_rules() {
        let mut html = String::from("<div>");
        for i in 0..11 {
            html.push_str(&format!(r#"<img src="https://cdn.example.com/{}.png">"#, i));
        }
        html.push_str(r#"<img src="http://t.example.com/o.gif" width="1" height="1">"#);
        html.push_str(r#"<img src="data:image/png;base64,AAAA"></div>"#);

        let result = run(&HtmlAnalyzer::new(), &html_email(&html));
        assert!(result.has_match("EXCESSIVE_IMAGES"));
        assert!(result.has_match("IMAGE_ONLY"));
        assert!(result.has_match("REMOTE_IMAGES"));
        assert!(result.has_match("TRACKING_PIXEL"));
        assert!(result.has_match("EMBEDDED_IMAGE"));
        assert_eq!(result.metadata["remoteImageCount"], json!(12));
    }

    #[test]
    fn test_style_tracking_pixel() {
        assert!(is_tracking_pixel(r#"<img src="x" style="width:1px;height:1px">"#));
        assert!(!is_tracking_pixel(r#"<img src="x" width="10" height="1">"#));
    }

    #[test]
    fn test_active_content() {
        let html = r#"<form action="x"><input></form><a href="javascript:go()" onclick="go()">x</a>
                      <iframe src="x"></iframe><embed src="y">"#;
        let result = run(&HtmlAnalyzer::new(), &html_email(html));
        assert!(result.has_match("HTML_FORM"));
        assert_eq!(result.match_count("JAVASCRIPT"), 1);
        assert!(result.has_match("IFRAME"));
        assert!(result.has_match("OBJECT_EMBED"));
    }

    #[test]
    fn test_markup_noise() {
        let mut html = String::new();
        for _ in 0..12 {
            html.push_str("<!-- filler -->");
        }
        for _ in 0..6 {
            html.push_str("<table><tr><td>cell</td></tr></table>");
        }
        let result = run(&HtmlAnalyzer::new(), &html_email(&html));
        assert!(result.has_match("COMMENT_STUFFING"));
        assert!(result.has_match("EXCESSIVE_TABLES"));
        assert!(!result.has_match("MALFORMED_HTML"));
    }

    #[test]
    fn test_malformed_html() {
        let html = "<div><div><p><span>unclosed everywhere<b>bold</b>";
        assert!(run(&HtmlAnalyzer::new(), &html_email(html)).has_match("MALFORMED_HTML"));
        let ok = "<div><p>one<br>two</p><img src=x /></div>";
        assert!(!run(&HtmlAnalyzer::new(), &html_email(ok)).has_match("MALFORMED_HTML"));
    }
}
