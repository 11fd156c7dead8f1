//! Request and response shapes of the scraping gateway's realtime API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON body POSTed to the gateway for one page.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayRequest<'a> {
    pub source: &'static str,
    pub url: &'a str,
    /// `"html"` asks the gateway to render JavaScript before extraction.
    pub render: &'static str,
    pub parse: bool,
    pub parsing_instructions: Value,
}

/// Top-level gateway response.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayResponse {
    #[serde(default)]
    pub results: Vec<GatewayResult>,
}

/// One scraped page.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayResult {
    /// Extracted fields when parsing succeeded; raw HTML string otherwise.
    #[serde(default)]
    pub content: Value,
    /// HTTP status the target site answered with.
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Fields extracted by a [`crate::recipe::ParsingRecipe`], keyed by field name.
///
/// Values are strings (HTML fragments or text nodes), arrays of strings, or
/// `null` when the selector matched nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedContent {
    fields: Map<String, Value>,
}

impl ParsedContent {
    /// Wraps gateway `content`. Anything other than a JSON object (e.g. the
    /// raw HTML string returned when parsing failed) yields empty content.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }

    /// `true` when no field carries a usable value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields
            .keys()
            .all(|k| k.starts_with('_') || self.list(k).is_empty())
    }

    /// First non-blank string for `field`, trimmed.
    #[must_use]
    pub fn text(&self, field: &str) -> Option<String> {
        self.list(field).into_iter().next()
    }

    /// Every non-blank string for `field`, trimmed, in document order.
    #[must_use]
    pub fn list(&self, field: &str) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(value) = self.fields.get(field) {
            collect_strings(value, &mut out);
        }
        out
    }
}

impl From<Value> for ParsedContent {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_owned());
            }
        }
        Value::Number(n) => out.push(n.to_string()),
        Value::Array(items) => {
            for item in items {
                collect_strings(item, out);
            }
        }
        Value::Null | Value::Bool(_) | Value::Object(_) => {}
    }
}
