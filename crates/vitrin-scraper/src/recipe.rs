//! Parsing recipes sent to the scraping gateway.
//!
//! A recipe names the fields the gateway should extract from the rendered
//! page and the selector for each. The gateway runs the selectors and returns
//! a JSON object keyed by field name; see [`crate::types::ParsedContent`].
//!
//! ## Wire format
//!
//! ```text
//! {
//!   "title":  {"_fns": [{"_fn": "xpath_one", "_args": ["//h1//text()"]}]},
//!   "images": {"_fns": [{"_fn": "xpath",     "_args": ["//img/@src"]}]}
//! }
//! ```

use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    /// First XPath match.
    XPathOne,
    /// Every XPath match.
    XPath,
    /// First CSS match.
    CssOne,
    /// Every CSS match.
    Css,
}

impl SelectorKind {
    fn function_name(self) -> &'static str {
        match self {
            SelectorKind::XPathOne => "xpath_one",
            SelectorKind::XPath => "xpath",
            SelectorKind::CssOne => "css_one",
            SelectorKind::Css => "css",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    pub field: &'static str,
    pub kind: SelectorKind,
    pub expression: &'static str,
}

/// Ordered set of fields to extract from one kind of page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsingRecipe {
    fields: Vec<FieldSelector>,
}

impl ParsingRecipe {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn xpath_one(self, field: &'static str, expression: &'static str) -> Self {
        self.with(field, SelectorKind::XPathOne, expression)
    }

    #[must_use]
    pub fn xpath(self, field: &'static str, expression: &'static str) -> Self {
        self.with(field, SelectorKind::XPath, expression)
    }

    #[must_use]
    pub fn css_one(self, field: &'static str, expression: &'static str) -> Self {
        self.with(field, SelectorKind::CssOne, expression)
    }

    #[must_use]
    pub fn css(self, field: &'static str, expression: &'static str) -> Self {
        self.with(field, SelectorKind::Css, expression)
    }

    /// Adds a field, replacing any earlier selector for the same field name.
    #[must_use]
    pub fn with(mut self, field: &'static str, kind: SelectorKind, expression: &'static str) -> Self {
        self.fields.retain(|f| f.field != field);
        self.fields.push(FieldSelector {
            field,
            kind,
            expression,
        });
        self
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldSelector] {
        &self.fields
    }

    /// Renders the recipe as the gateway's `parsing_instructions` object.
    #[must_use]
    pub fn to_instructions(&self) -> Value {
        let mut map = Map::new();
        for f in &self.fields {
            map.insert(
                f.field.to_owned(),
                json!({
                    "_fns": [{
                        "_fn": f.kind.function_name(),
                        "_args": [f.expression],
                    }]
                }),
            );
        }
        Value::Object(map)
    }
}
