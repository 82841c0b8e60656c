//! Keyword search: command layout and URL template expansion.
//!
//! A scheme's command grammar is fully determined by its metadata, so it
//! is computed here as a plain value ([`CommandLayout`]) before any
//! handler is attached. The only runtime choice is [`Delivery`]: reply to
//! the invoker, or broadcast to everyone. The flag literal always selects
//! the opposite of the scheme's default.
//!
//! # Layouts
//!
//! ```text
//! default_broadcast = false          default_broadcast = true
//! <prefix>            → help         <prefix>            → help
//! <prefix> <kw>       → reply        <prefix> <kw>       → broadcast
//! <prefix> -a <kw>    → broadcast    <prefix> -s <kw>    → reply
//! ```

use anyhow::{bail, Result};

use crate::metadata::SchemeMetadata;

/// Where search results go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Reply,
    Broadcast,
}

impl Delivery {
    pub fn inverted(self) -> Self {
        match self {
            Delivery::Reply => Delivery::Broadcast,
            Delivery::Broadcast => Delivery::Reply,
        }
    }

    /// Literal that selects this delivery when it is not the default.
    pub fn flag(self) -> &'static str {
        match self {
            Delivery::Broadcast => "-a",
            Delivery::Reply => "-s",
        }
    }
}

/// Declarative shape of one scheme's command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLayout {
    pub prefix: String,
    pub permission: u8,
    /// Delivery for `<prefix> <keyword>`.
    pub default_delivery: Delivery,
    /// Delivery for `<prefix> <flag> <keyword>`.
    pub flagged_delivery: Delivery,
    pub flag: &'static str,
}

impl CommandLayout {
    /// The command a scheme registers, or `None` when it is disabled.
    pub fn from_metadata(meta: &SchemeMetadata) -> Option<Self> {
        if !meta.enabled {
            return None;
        }
        let default_delivery = if meta.default_broadcast {
            Delivery::Broadcast
        } else {
            Delivery::Reply
        };
        let flagged_delivery = default_delivery.inverted();
        Some(Self {
            prefix: meta.command_prefix.clone(),
            permission: meta.permission,
            default_delivery,
            flagged_delivery,
            flag: flagged_delivery.flag(),
        })
    }
}

/// Percent-encode a keyword for embedding in a URL.
///
/// Every byte outside the unreserved set is escaped except `/`, which is
/// kept so path-style keywords stay readable. A literal `%` always becomes
/// `%25`, so the only `%2F` in the encoded form comes from a slash.
pub fn encode_keyword(keyword: &str) -> String {
    urlencoding::encode(keyword).replace("%2F", "/")
}

/// Substitute `keyword` into `template`.
///
/// `{keyword}` is replaced, `{{` and `}}` produce literal braces. Any other
/// placeholder or a lone brace is an error. A template without a
/// placeholder is returned unchanged.
pub fn expand_template(template: &str, keyword: &str) -> Result<String> {
    let mut out = String::with_capacity(template.len() + keyword.len());
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => bail!("Unclosed '{{' in URL template: {}", template),
                    }
                }
                if name != "keyword" {
                    bail!("Unknown placeholder '{{{}}}' in URL template: {}", name, template);
                }
                out.push_str(keyword);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => bail!("Single '}}' in URL template: {}", template),
            c => out.push(c),
        }
    }

    Ok(out)
}

/// Resolve every URL template of `meta` for `keyword`, in persisted order.
///
/// Fails as a whole if any template is malformed.
pub fn resolve_urls(meta: &SchemeMetadata, keyword: &str) -> Result<Vec<(String, String)>> {
    let encoded = encode_keyword(keyword);
    meta.url
        .iter()
        .map(|(id, template)| Ok((id.clone(), expand_template(template, &encoded)?)))
        .collect()
}
