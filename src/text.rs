//! Styled, clickable chat text.
//!
//! [`RText`] is the message type handed to command sources and broadcasts.
//! It is a flat list of segments, each either literal text or a translation
//! key with named arguments, plus optional hover text and click action.
//! Translation keys stay unresolved until the text is rendered for a
//! concrete recipient locale.
//!
//! ```text
//! [Default] Click to search "foo bar"   ← plain rendering
//!  └─bold─┘                              hover: "Open the search page"
//!                                        click: open_url https://x/foo%20bar
//! ```

use serde_json::{json, Map, Value};

/// Resolves translation keys for a locale.
pub trait Translator {
    /// Look up `key` for `locale`, returning `None` when no translation exists.
    fn translate(&self, locale: &str, key: &str) -> Option<String>;
}

/// A translator that knows nothing; every key renders as itself.
pub struct NoTranslations;

impl Translator for NoTranslations {
    fn translate(&self, _locale: &str, _key: &str) -> Option<String> {
        None
    }
}

/// Text style flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RStyle {
    Bold,
    Underlined,
}

/// Action performed when the text is clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    OpenUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Literal(String),
    Translation {
        key: String,
        args: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub content: Content,
    pub styles: Vec<RStyle>,
}

/// A message made of literal and translated segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RText {
    segments: Vec<Segment>,
    hover: Option<Box<RText>>,
    click: Option<ClickAction>,
}

impl RText {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::from_content(Content::Literal(text.into()))
    }

    /// A translated segment. `args` fill `{name}` placeholders of the resolved string.
    pub fn translation(key: impl Into<String>, args: &[(&str, &str)]) -> Self {
        Self::from_content(Content::Translation {
            key: key.into(),
            args: args
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }

    fn from_content(content: Content) -> Self {
        Self {
            segments: vec![Segment {
                content,
                styles: Vec::new(),
            }],
            hover: None,
            click: None,
        }
    }

    /// Apply `style` to every segment.
    pub fn styled(mut self, style: RStyle) -> Self {
        for seg in &mut self.segments {
            if !seg.styles.contains(&style) {
                seg.styles.push(style);
            }
        }
        self
    }

    /// Concatenate `other`'s segments. Hover and click of `other` are dropped.
    pub fn append(mut self, other: RText) -> Self {
        self.segments.extend(other.segments);
        self
    }

    pub fn hover(mut self, text: RText) -> Self {
        self.hover = Some(Box::new(text));
        self
    }

    pub fn click(mut self, action: ClickAction) -> Self {
        self.click = Some(action);
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn hover_text(&self) -> Option<&RText> {
        self.hover.as_deref()
    }

    pub fn click_action(&self) -> Option<&ClickAction> {
        self.click.as_ref()
    }

    /// Target of an `OpenUrl` click action, if any.
    pub fn click_url(&self) -> Option<&str> {
        match &self.click {
            Some(ClickAction::OpenUrl(url)) => Some(url),
            None => None,
        }
    }

    /// Render to plain text, resolving translations for `locale`.
    pub fn to_plain(&self, translator: &dyn Translator, locale: &str) -> String {
        self.segments
            .iter()
            .map(|seg| resolve_segment(seg, translator, locale))
            .collect()
    }

    /// Render to a raw JSON text component.
    pub fn to_json(&self, translator: &dyn Translator, locale: &str) -> Value {
        let extra: Vec<Value> = self
            .segments
            .iter()
            .map(|seg| {
                let mut obj = Map::new();
                obj.insert(
                    "text".to_string(),
                    Value::String(resolve_segment(seg, translator, locale)),
                );
                for style in &seg.styles {
                    let name = match style {
                        RStyle::Bold => "bold",
                        RStyle::Underlined => "underlined",
                    };
                    obj.insert(name.to_string(), Value::Bool(true));
                }
                Value::Object(obj)
            })
            .collect();

        let mut root = Map::new();
        root.insert("text".to_string(), Value::String(String::new()));
        root.insert("extra".to_string(), Value::Array(extra));
        if let Some(hover) = &self.hover {
            root.insert(
                "hoverEvent".to_string(),
                json!({
                    "action": "show_text",
                    "contents": hover.to_json(translator, locale),
                }),
            );
        }
        if let Some(ClickAction::OpenUrl(url)) = &self.click {
            root.insert(
                "clickEvent".to_string(),
                json!({ "action": "open_url", "value": url }),
            );
        }
        Value::Object(root)
    }
}

impl From<&str> for RText {
    fn from(s: &str) -> Self {
        RText::literal(s)
    }
}

impl From<String> for RText {
    fn from(s: String) -> Self {
        RText::literal(s)
    }
}

fn resolve_segment(seg: &Segment, translator: &dyn Translator, locale: &str) -> String {
    match &seg.content {
        Content::Literal(text) => text.clone(),
        Content::Translation { key, args } => match translator.translate(locale, key) {
            Some(template) => fill_placeholders(&template, args),
            None => key.clone(),
        },
    }
}

/// Substitute `{name}` placeholders. Unknown placeholders are left as-is.
pub fn fill_placeholders(template: &str, args: &[(String, String)]) -> String {
    let mut out = template.to_string();
    for (name, value) in args {
        out = out.replace(&format!("{{{}}}", name), value);
    }
    out
}
