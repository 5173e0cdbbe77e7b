//! Post-serialization fixes for the filter importer.
//!
//! The importer only accepts single-quoted attributes and rejects the
//! self-closing form on every element except the extension `property`. The
//! serializer cannot express that, so its output is rewritten line by line
//! here. The pass is not idempotent and runs exactly once: `adjust` consumes a
//! `SerializedXml` and hands back an `AdjustedXml`, which cannot be adjusted
//! again.

use crate::feed_xml::{APPS_PREFIX, SerializedXml};
use std::borrow::Cow;
use std::fmt;

/// Marker the serializer uses for empty elements.
const SELF_CLOSING: &str = " />";

/// Text ready to be written for the importer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustedXml(String);

impl AdjustedXml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for AdjustedXml {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AdjustedXml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the self-closing rule table.
///
/// The first rule whose `applies` accepts the tag name rewrites the line.
pub struct ClosingRule {
    pub name: &'static str,
    pub applies: fn(&str) -> bool,
    pub rewrite: fn(&str, &str) -> String,
}

impl fmt::Debug for ClosingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosingRule").field("name", &self.name).finish()
    }
}

/// Rules for lines ending in ` />`, checked in order.
pub const CLOSING_RULES: [ClosingRule; 2] = [
    ClosingRule {
        name: "tight extension property",
        applies: is_extension_property,
        rewrite: tighten_self_close,
    },
    ClosingRule {
        name: "explicit close",
        applies: any_tag,
        rewrite: expand_self_close,
    },
];

fn is_extension_property(tag: &str) -> bool {
    tag.strip_prefix(APPS_PREFIX)
        .and_then(|rest| rest.strip_prefix(':'))
        == Some("property")
}

fn any_tag(_tag: &str) -> bool {
    true
}

fn tighten_self_close(body: &str, _tag: &str) -> String {
    format!("{}/>", body)
}

fn expand_self_close(body: &str, tag: &str) -> String {
    format!("{}></{}>", body, tag)
}

/// Tag name of a serialized line: trimmed, `<` removed, first whitespace token.
pub fn tag_name(line: &str) -> &str {
    let trimmed = line.trim().trim_start_matches('<');
    trimmed.split_whitespace().next().unwrap_or("")
}

fn single_quote(line: &str) -> Cow<'_, str> {
    if line.contains('"') {
        Cow::Owned(line.replace('"', "'"))
    } else {
        Cow::Borrowed(line)
    }
}

/// Adjusts a single line without its terminator.
///
/// Returns the line unchanged when no rule applies.
pub fn adjust_line(line: &str) -> Cow<'_, str> {
    let quoted = single_quote(line);

    let rewritten = quoted.strip_suffix(SELF_CLOSING).and_then(|body| {
        let tag = tag_name(body);
        CLOSING_RULES
            .iter()
            .find(|rule| (rule.applies)(tag))
            .map(|rule| (rule.rewrite)(body, tag))
    });

    match rewritten {
        Some(line) => Cow::Owned(line),
        None => quoted,
    }
}

/// Runs the importer fixes over serializer output.
pub fn adjust(xml: SerializedXml) -> AdjustedXml {
    let text = xml.into_inner();
    let mut out = String::with_capacity(text.len() + text.len() / 8);

    for raw in text.split_inclusive('\n') {
        let (line, terminator) = match raw.strip_suffix('\n') {
            Some(line) => match line.strip_suffix('\r') {
                Some(line) => (line, "\r\n"),
                None => (line, "\n"),
            },
            None => (raw, ""),
        };
        out.push_str(&adjust_line(line));
        out.push_str(terminator);
    }

    AdjustedXml(out)
}
