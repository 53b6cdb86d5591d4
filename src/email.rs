//! Normalized email record consumed by every analyzer.
//!
//! Records normally arrive from an upstream MIME parser. When a record is
//! decoded from JSON, any derived field the producer left out is filled in
//! from the raw headers by [`EmailRecord::complete`]. After that the record is
//! treated as an immutable snapshot.

use crate::error::{Result, SpamlensError};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

lazy_static! {
    static ref RECEIVED_FROM: Regex =
        Regex::new(r"(?is)\bfrom\s+(.*?)(?:\s+by\s|\s+with\s|\s+id\s|\s+for\s|;|$)").unwrap();
    static ref RECEIVED_BY: Regex =
        Regex::new(r"(?is)\bby\s+(.*?)(?:\s+with\s|\s+id\s|\s+for\s|;|$)").unwrap();
    static ref RECEIVED_WITH: Regex = Regex::new(r"(?i)\bwith\s+([A-Za-z0-9_-]+)").unwrap();
    static ref TRAILING_COMMENT: Regex = Regex::new(r"\s*\([^)]*\)\s*$").unwrap();
}

/// A parsed mailbox address. The domain is always lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub display_name: Option<String>,
    pub local: String,
    pub domain: String,
}

impl Address {
    pub fn new(local: &str, domain: &str) -> Self {
        Self {
            display_name: None,
            local: local.to_string(),
            domain: domain.to_lowercase(),
        }
    }

    /// Parse `Name <local@domain>`, `<local@domain>` or `local@domain`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (display_name, addr) = match (raw.find('<'), raw.rfind('>')) {
            (Some(open), Some(close)) if open < close => {
                let name = raw[..open].trim().trim_matches('"').trim();
                let name = if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                };
                (name, raw[open + 1..close].trim())
            }
            _ => (None, raw),
        };

        let at = addr.rfind('@')?;
        let local = addr[..at].trim();
        let domain = addr[at + 1..].trim().trim_end_matches('.');
        if local.is_empty() || domain.is_empty() || domain.contains(char::is_whitespace) {
            return None;
        }

        Some(Self {
            display_name,
            local: local.to_string(),
            domain: domain.to_lowercase(),
        })
    }

    /// Parse a comma separated address list, honouring quoted display names.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut in_angle = false;

        for ch in raw.chars() {
            match ch {
                '"' => in_quotes = !in_quotes,
                '<' if !in_quotes => in_angle = true,
                '>' if !in_quotes => in_angle = false,
                ',' | ';' if !in_quotes && !in_angle => {
                    parts.push(std::mem::take(&mut current));
                    continue;
                }
                _ => {}
            }
            current.push(ch);
        }
        parts.push(current);

        parts.iter().filter_map(|part| Self::parse(part)).collect()
    }

    pub fn is_valid(&self) -> bool {
        !self.local.is_empty() && self.domain.contains('.') && !self.domain.starts_with('.')
    }
}

/// One `Received:` hop. Order in the chain only defines hop count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReceivedHop {
    #[serde(deserialize_with = "de_nullable_string")]
    pub from: String,
    #[serde(deserialize_with = "de_nullable_string")]
    pub by: String,
    #[serde(deserialize_with = "de_nullable_string")]
    pub with: String,
    #[serde(deserialize_with = "de_date")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "de_nullable_string")]
    pub raw: String,
}

impl ReceivedHop {
    pub fn parse(raw: &str) -> Self {
        let unfolded = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        let capture = |re: &Regex| {
            re.captures(&unfolded)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default()
        };

        let timestamp = unfolded
            .rfind(';')
            .and_then(|pos| parse_date(&unfolded[pos + 1..]));

        Self {
            from: capture(&RECEIVED_FROM),
            by: capture(&RECEIVED_BY),
            with: capture(&RECEIVED_WITH),
            timestamp,
            raw: raw.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmailRecord {
    /// Lowercased header name to its values in source order.
    #[serde(deserialize_with = "de_headers")]
    pub headers: HashMap<String, Vec<String>>,
    #[serde(deserialize_with = "de_nullable_string")]
    pub subject: String,
    #[serde(deserialize_with = "de_address_opt")]
    pub from: Option<Address>,
    #[serde(deserialize_with = "de_address_opt", alias = "reply_to")]
    pub reply_to: Option<Address>,
    #[serde(deserialize_with = "de_address_list")]
    pub to: Vec<Address>,
    #[serde(alias = "return_path")]
    pub return_path: Option<String>,
    #[serde(alias = "message_id")]
    pub message_id: Option<String>,
    #[serde(deserialize_with = "de_date")]
    pub date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "de_nullable_string", alias = "text_body", alias = "text")]
    pub text_body: String,
    #[serde(deserialize_with = "de_nullable_string", alias = "html_body", alias = "html")]
    pub html_body: String,
    #[serde(alias = "received_chain")]
    pub received_chain: Vec<ReceivedHop>,
}

impl EmailRecord {
    /// Decode a record from a JSON value. Anything that is not an object is rejected.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(SpamlensError::InvalidRecord(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }
        let record: EmailRecord = serde_json::from_value(value)?;
        Ok(record.complete())
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(input)?;
        Self::from_json(value)
    }

    /// Fill derived fields that are still absent from the raw headers.
    /// Fields that already carry a value are left untouched.
    pub fn complete(mut self) -> Self {
        if self.subject.is_empty() {
            if let Some(subject) = self.header("subject") {
                self.subject = subject.to_string();
            }
        }
        if self.from.is_none() {
            self.from = self.header("from").and_then(Address::parse);
        }
        if self.reply_to.is_none() {
            self.reply_to = self.header("reply-to").and_then(Address::parse);
        }
        if self.to.is_empty() {
            self.to = self
                .header_values("to")
                .iter()
                .flat_map(|v| Address::parse_list(v))
                .collect();
        }
        if self.return_path.is_none() {
            self.return_path = self.header("return-path").map(str::to_string);
        }
        if self.message_id.is_none() {
            self.message_id = self.header("message-id").map(str::to_string);
        }
        if self.date.is_none() {
            self.date = self.header("date").and_then(parse_date);
        }
        if self.received_chain.is_empty() {
            self.received_chain = self
                .header_values("received")
                .iter()
                .map(|raw| ReceivedHop::parse(raw))
                .collect();
        }
        self
    }

    /// First value of a header, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).first().map(String::as_str)
    }

    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Builder-style helper used mostly by tests and the CLI.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .entry(name.to_lowercase())
            .or_default()
            .push(value.to_string());
        self
    }
}

/// Parse RFC 3339 or RFC 2822 timestamps, ignoring a trailing `(UTC)` style comment.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    let without_comment = TRAILING_COMMENT.replace(trimmed, "");
    DateTime::parse_from_rfc2822(without_comment.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HeaderValue {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AddressRepr {
    Raw(String),
    Parts {
        #[serde(default, alias = "displayName", alias = "name")]
        display_name: Option<String>,
        #[serde(default, alias = "localPart", alias = "local_part")]
        local: String,
        #[serde(default)]
        domain: String,
        #[serde(default)]
        address: Option<String>,
    },
}

impl AddressRepr {
    fn into_address(self) -> Option<Address> {
        match self {
            AddressRepr::Raw(raw) => Address::parse(&raw),
            AddressRepr::Parts {
                display_name,
                local,
                domain,
                address,
            } => {
                let mut parsed = if !local.is_empty() && !domain.is_empty() {
                    Address::new(&local, &domain)
                } else {
                    Address::parse(address.as_deref().unwrap_or(""))?
                };
                if display_name.is_some() {
                    parsed.display_name = display_name;
                }
                Some(parsed)
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AddressListRepr {
    Raw(String),
    Many(Vec<Option<AddressRepr>>),
}

fn de_headers<'de, D>(
    deserializer: D,
) -> std::result::Result<HashMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, Option<HeaderValue>>> = Option::deserialize(deserializer)?;
    let mut headers: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in raw.unwrap_or_default() {
        let values = match value {
            Some(HeaderValue::One(v)) => vec![v],
            Some(HeaderValue::Many(vs)) => vs,
            None => Vec::new(),
        };
        headers.entry(name.to_lowercase()).or_default().extend(values);
    }
    Ok(headers)
}

fn de_nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn de_address_opt<'de, D>(deserializer: D) -> std::result::Result<Option<Address>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr: Option<AddressRepr> = Option::deserialize(deserializer)?;
    Ok(repr.and_then(AddressRepr::into_address))
}

fn de_address_list<'de, D>(deserializer: D) -> std::result::Result<Vec<Address>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr: Option<AddressListRepr> = Option::deserialize(deserializer)?;
    Ok(match repr {
        Some(AddressListRepr::Raw(raw)) => Address::parse_list(&raw),
        Some(AddressListRepr::Many(items)) => items
            .into_iter()
            .flatten()
            .filter_map(AddressRepr::into_address)
            .collect(),
        None => Vec::new(),
    })
}

fn de_date<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_date))
}
