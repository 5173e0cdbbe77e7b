//! Atom filter feed reader and writer.
//!
//! Reading uses `quick-xml`'s namespace-aware reader so elements are matched by
//! namespace URI rather than by whatever prefix the file happens to bind.
//! Writing is done by hand: one element per line, one indentation unit per
//! depth, double-quoted attributes and ` />` for empty elements. That layout is
//! what the `adjuster` pass expects to receive.

use crate::error::ParseError;
use crate::filter_document::{FeedAuthor, FeedHeader, FilterDocument, FilterEntry, FilterProperty};
use quick_xml::NsReader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use std::fmt;
use tracing::debug;

/// Default (Atom) namespace of the feed.
pub const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";
/// Extension namespace carrying filter properties.
pub const APPS_NAMESPACE: &str = "http://schemas.google.com/apps/2006";
/// Prefix bound to `APPS_NAMESPACE` on output.
pub const APPS_PREFIX: &str = "apps";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Serializer output that has not been through the adjuster yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedXml(String);

impl SerializedXml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for SerializedXml {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SerializedXml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Reading
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ns {
    Atom,
    Apps,
    Other,
}

impl Ns {
    fn classify(resolved: &ResolveResult) -> Self {
        match resolved {
            ResolveResult::Bound(Namespace(uri)) if *uri == ATOM_NAMESPACE.as_bytes() => Ns::Atom,
            ResolveResult::Bound(Namespace(uri)) if *uri == APPS_NAMESPACE.as_bytes() => Ns::Apps,
            _ => Ns::Other,
        }
    }
}

#[derive(Debug)]
struct Node {
    ns: Ns,
    name: String,
}

impl Node {
    fn is(&self, ns: Ns, name: &str) -> bool {
        self.ns == ns && self.name == name
    }
}

/// Where the element being opened or closed sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Feed,
    Entry,
    Author,
    Other,
}

#[derive(Debug, Default)]
struct EntryBuilder {
    category: Option<String>,
    title: Option<String>,
    id: Option<String>,
    updated: Option<String>,
    properties: Vec<FilterProperty>,
}

impl EntryBuilder {
    fn finish(self, entry: usize) -> Result<FilterEntry, ParseError> {
        let missing = |element| ParseError::MissingElement { entry, element };
        Ok(FilterEntry {
            category: self.category.ok_or_else(|| missing("category"))?,
            title: self.title.ok_or_else(|| missing("title"))?,
            id: self.id.ok_or_else(|| missing("id"))?,
            updated: self.updated.ok_or_else(|| missing("updated"))?,
            properties: self.properties,
        })
    }
}

#[derive(Debug, Default)]
struct FeedParser {
    stack: Vec<Node>,
    text: String,
    root_seen: bool,
    header: FeedHeader,
    entries: Vec<FilterEntry>,
    current: Option<EntryBuilder>,
}

impl FeedParser {
    fn context(&self) -> Context {
        match self.stack.as_slice() {
            [_] => Context::Feed,
            [_, parent] if parent.is(Ns::Atom, "entry") => Context::Entry,
            [_, parent] if parent.is(Ns::Atom, "author") => Context::Author,
            _ => Context::Other,
        }
    }

    /// 1-based number of the entry being built.
    fn entry_number(&self) -> usize {
        self.entries.len() + 1
    }

    fn open(&mut self, ns: Ns, e: &BytesStart, position: usize) -> Result<(), ParseError> {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

        if self.stack.is_empty() {
            if self.root_seen {
                return Err(malformed(position, "multiple root elements"));
            }
            if !(ns == Ns::Atom && name == "feed") {
                return Err(malformed(
                    position,
                    format!("root element must be an Atom <feed>, found <{}>", name),
                ));
            }
            self.root_seen = true;
        }

        let entry = self.entry_number();
        match (self.context(), ns, name.as_str()) {
            (Context::Feed, Ns::Atom, "entry") => {
                self.current = Some(EntryBuilder::default());
            }
            (Context::Feed, Ns::Atom, "author") => {
                self.header.author.get_or_insert_with(FeedAuthor::default);
            }
            (Context::Entry, Ns::Atom, "category") => {
                let term = required_attribute(e, entry, "category", "term", position)?;
                if let Some(builder) = self.current.as_mut() {
                    builder.category.get_or_insert(term);
                }
            }
            (Context::Entry, Ns::Apps, "property") => {
                let name = attribute(e, "name", position)?.unwrap_or_default();
                let value = attribute(e, "value", position)?.unwrap_or_default();
                if let Some(builder) = self.current.as_mut() {
                    builder.properties.push(FilterProperty { name, value });
                }
            }
            _ => {}
        }

        self.text.clear();
        self.stack.push(Node { ns, name });
        Ok(())
    }

    fn close(&mut self, position: usize) -> Result<(), ParseError> {
        let node = self
            .stack
            .pop()
            .ok_or_else(|| malformed(position, "closing tag without a matching open tag"))?;
        let text = std::mem::take(&mut self.text);

        match (self.context(), node.ns, node.name.as_str()) {
            (Context::Feed, Ns::Atom, "entry") => {
                let entry = self.entry_number();
                let builder = self.current.take().unwrap_or_default();
                self.entries.push(builder.finish(entry)?);
            }
            (Context::Entry, Ns::Atom, field @ ("title" | "id" | "updated")) => {
                if let Some(builder) = self.current.as_mut() {
                    let slot = match field {
                        "title" => &mut builder.title,
                        "id" => &mut builder.id,
                        _ => &mut builder.updated,
                    };
                    slot.get_or_insert(text);
                }
            }
            (Context::Feed, Ns::Atom, field @ ("title" | "id" | "updated")) => {
                let slot = match field {
                    "title" => &mut self.header.title,
                    "id" => &mut self.header.id,
                    _ => &mut self.header.updated,
                };
                slot.get_or_insert(text);
            }
            (Context::Author, Ns::Atom, field @ ("name" | "email")) => {
                if let Some(author) = self.header.author.as_mut() {
                    let slot = if field == "name" {
                        &mut author.name
                    } else {
                        &mut author.email
                    };
                    slot.get_or_insert(text);
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn push_text(&mut self, text: &str, position: usize) -> Result<(), ParseError> {
        if self.stack.is_empty() {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(malformed(position, "text outside the root element"));
        }
        self.text.push_str(text);
        Ok(())
    }

    fn finish(self, end: usize) -> Result<FilterDocument, ParseError> {
        if let Some(open) = self.stack.last() {
            return Err(malformed(
                end,
                format!("unexpected end of document: <{}> is not closed", open.name),
            ));
        }
        if !self.root_seen {
            return Err(malformed(end, "document has no root element"));
        }
        Ok(FilterDocument::from_parts(self.header, self.entries))
    }
}

fn malformed(position: usize, message: impl fmt::Display) -> ParseError {
    ParseError::Malformed {
        position,
        message: message.to_string(),
    }
}

/// Unescaped value of attribute `name`, if present.
fn attribute(e: &BytesStart, name: &str, position: usize) -> Result<Option<String>, ParseError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| malformed(position, err))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr.unescape_value().map_err(|err| malformed(position, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn required_attribute(
    e: &BytesStart,
    entry: usize,
    element: &'static str,
    attribute_name: &'static str,
    position: usize,
) -> Result<String, ParseError> {
    attribute(e, attribute_name, position)?.ok_or(ParseError::MissingAttribute {
        entry,
        element,
        attribute: attribute_name,
    })
}

/// Parses a filter feed into a document. Nothing is returned on failure.
pub(crate) fn parse_feed(source: &str) -> Result<FilterDocument, ParseError> {
    let mut reader = NsReader::from_str(source);

    let mut parser = FeedParser::default();
    let mut buf = Vec::new();

    loop {
        let position = reader.buffer_position();
        {
            let (resolved, event) = match reader.read_resolved_event_into(&mut buf) {
                Ok(pair) => pair,
                Err(e) => return Err(malformed(position, e)),
            };
            let ns = Ns::classify(&resolved);

            match event {
                Event::Start(ref e) => parser.open(ns, e, position)?,
                Event::Empty(ref e) => {
                    parser.open(ns, e, position)?;
                    parser.close(position)?;
                }
                Event::End(_) => parser.close(position)?,
                Event::Text(ref t) => {
                    let text = t.unescape().map_err(|e| malformed(position, e))?;
                    parser.push_text(&text, position)?;
                }
                Event::CData(ref c) => {
                    parser.push_text(&String::from_utf8_lossy(c), position)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }
        buf.clear();
    }

    let document = parser.finish(source.len())?;
    debug!(entries = document.len(), "parsed filter feed");
    Ok(document)
}

// ============================================================================
// Writing
// ============================================================================

struct FeedWriter<'a> {
    out: String,
    indent: &'a str,
}

impl FeedWriter<'_> {
    fn line(&mut self, depth: usize, content: &str) {
        for _ in 0..depth {
            self.out.push_str(self.indent);
        }
        self.out.push_str(content);
        self.out.push('\n');
    }

    fn text_element(&mut self, depth: usize, tag: &str, text: &str) {
        if text.is_empty() {
            self.line(depth, &format!("<{} />", tag));
        } else {
            self.line(depth, &format!("<{tag}>{}</{tag}>", escape_text(text)));
        }
    }

    fn empty_element(&mut self, depth: usize, tag: &str, attributes: &[(&str, &str)]) {
        let mut content = format!("<{}", tag);
        for (key, value) in attributes {
            content.push_str(&format!(" {}=\"{}\"", key, escape_attribute(value)));
        }
        content.push_str(" />");
        self.line(depth, &content);
    }

    fn header(&mut self, header: &FeedHeader) {
        if let Some(title) = &header.title {
            self.text_element(1, "title", title);
        }
        if let Some(id) = &header.id {
            self.text_element(1, "id", id);
        }
        if let Some(updated) = &header.updated {
            self.text_element(1, "updated", updated);
        }
        if let Some(author) = &header.author {
            if author.name.is_none() && author.email.is_none() {
                self.line(1, "<author />");
            } else {
                self.line(1, "<author>");
                if let Some(name) = &author.name {
                    self.text_element(2, "name", name);
                }
                if let Some(email) = &author.email {
                    self.text_element(2, "email", email);
                }
                self.line(1, "</author>");
            }
        }
    }

    fn entry(&mut self, entry: &FilterEntry) {
        let property_tag = format!("{}:property", APPS_PREFIX);

        self.line(1, "<entry>");
        self.empty_element(2, "category", &[("term", &entry.category)]);
        self.text_element(2, "title", &entry.title);
        self.text_element(2, "id", &entry.id);
        self.text_element(2, "updated", &entry.updated);
        self.text_element(2, "content", "");
        for property in &entry.properties {
            self.empty_element(
                2,
                &property_tag,
                &[("name", &property.name), ("value", &property.value)],
            );
        }
        self.line(1, "</entry>");
    }
}

/// Writes the document as an indented feed with an XML declaration.
pub(crate) fn write_feed(document: &FilterDocument, indent: &str) -> SerializedXml {
    let mut writer = FeedWriter {
        out: String::new(),
        indent,
    };
    writer.line(0, XML_DECLARATION);

    let root = format!(
        "feed xmlns=\"{}\" xmlns:{}=\"{}\"",
        ATOM_NAMESPACE, APPS_PREFIX, APPS_NAMESPACE
    );
    let header = document.header();

    if document.is_empty() && *header == FeedHeader::default() {
        writer.line(0, &format!("<{} />", root));
    } else {
        writer.line(0, &format!("<{}>", root));
        writer.header(header);
        for entry in document.entries() {
            writer.entry(entry);
        }
        writer.line(0, "</feed>");
    }

    SerializedXml(writer.out)
}

/// Escapes element content.
///
/// `quick_xml::escape::escape` covers both quote characters, so the only
/// literal `"` in serialized output is an attribute delimiter. Carriage
/// returns become character references so line endings survive a re-read.
fn escape_text(s: &str) -> String {
    escape(s).replace('\r', "&#13;")
}

/// Escapes an attribute value.
///
/// Line breaks and tabs are written as character references: a literal one
/// would be normalized to a space by conforming readers, and a newline would
/// split the element across lines ahead of the adjuster.
fn escape_attribute(s: &str) -> String {
    escape(s)
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version='1.0' encoding='UTF-8'?><feed xmlns='http://www.w3.org/2005/Atom' xmlns:apps='http://schemas.google.com/apps/2006'>
	<title>Mail Filters</title>
	<id>tag:mail.google.com,2008:filters:z0000001</id>
	<updated>2024-05-01T12:00:00Z</updated>
	<author>
		<name>Jo Example</name>
		<email>jo@example.com</email>
	</author>
	<entry>
		<category term='filter'></category>
		<title>Mail Filter</title>
		<id>tag:mail.google.com,2008:filter:z0000001</id>
		<updated>2024-05-01T12:00:00Z</updated>
		<content></content>
		<apps:property name='from' value='news@example.com'/>
		<apps:property name='label' value='News'/>
		<apps:property name='shouldArchive' value='true'/>
	</entry>
	<entry>
		<category term='filter'></category>
		<title>Mail Filter</title>
		<id>tag:mail.google.com,2008:filter:z0000002</id>
		<updated>2024-05-01T12:00:00Z</updated>
		<content></content>
		<apps:property name='hasTheWord' value='&quot;quarterly report&quot; OR Q&amp;A'/>
		<apps:property name='shouldStar' value='true'/>
	</entry>
</feed>"#;

    fn entry_with(properties: &[(&str, &str)]) -> FilterEntry {
        FilterEntry {
            category: "filter".to_string(),
            title: "Mail Filter".to_string(),
            id: "tag:mail.google.com,2008:filter:z1".to_string(),
            updated: "2024-05-01T12:00:00Z".to_string(),
            properties: properties
                .iter()
                .map(|(n, v)| FilterProperty::new(*n, *v))
                .collect(),
        }
    }

    #[test]
    fn test_parse_sample_feed() {
        let document = parse_feed(SAMPLE).unwrap();

        assert_eq!(document.len(), 2);
        let first = &document.entries()[0];
        assert_eq!(first.category, "filter");
        assert_eq!(first.title, "Mail Filter");
        assert_eq!(first.id, "tag:mail.google.com,2008:filter:z0000001");
        assert_eq!(first.properties.len(), 3);
        assert_eq!(first.property("label"), Some("News"));

        let second = &document.entries()[1];
        assert_eq!(
            second.property("hasTheWord"),
            Some("\"quarterly report\" OR Q&A")
        );
    }

    #[test]
    fn test_parse_keeps_feed_header() {
        let document = parse_feed(SAMPLE).unwrap();
        let header = document.header();

        assert_eq!(header.title.as_deref(), Some("Mail Filters"));
        assert_eq!(
            header.id.as_deref(),
            Some("tag:mail.google.com,2008:filters:z0000001")
        );
        let author = header.author.as_ref().unwrap();
        assert_eq!(author.name.as_deref(), Some("Jo Example"));
        assert_eq!(author.email.as_deref(), Some("jo@example.com"));
    }

    #[test]
    fn test_parse_matches_namespace_not_prefix() {
        let source = r#"<a:feed xmlns:a="http://www.w3.org/2005/Atom" xmlns:g="http://schemas.google.com/apps/2006">
  <a:entry>
    <a:category term="filter"/>
    <a:title>t</a:title>
    <a:id>i</a:id>
    <a:updated>u</a:updated>
    <g:property name="to" value="me@example.com"/>
    <a:property name="ignored" value="x"/>
  </a:entry>
</a:feed>"#;

        let document = parse_feed(source).unwrap();
        assert_eq!(document.entries()[0].properties, vec![FilterProperty::new("to", "me@example.com")]);
    }

    #[test]
    fn test_parse_missing_required_element() {
        let source = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <category term="filter"/>
    <title>t</title>
    <updated>u</updated>
  </entry>
</feed>"#;

        assert_eq!(
            parse_feed(source),
            Err(ParseError::MissingElement {
                entry: 1,
                element: "id"
            })
        );
    }

    #[test]
    fn test_parse_category_without_term() {
        let source = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><category/><title>t</title><id>i</id><updated>u</updated></entry>
</feed>"#;

        assert!(matches!(
            parse_feed(source),
            Err(ParseError::MissingAttribute {
                entry: 1,
                attribute: "term",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_xml() {
        let mismatched = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry></feed>"#;
        let unclosed = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>"#;
        let wrong_root = r#"<rules xmlns="http://www.w3.org/2005/Atom"></rules>"#;

        assert!(matches!(parse_feed(mismatched), Err(ParseError::Malformed { .. })));
        assert!(matches!(parse_feed(unclosed), Err(ParseError::Malformed { .. })));
        assert!(matches!(parse_feed(wrong_root), Err(ParseError::Malformed { .. })));
        assert!(matches!(parse_feed(""), Err(ParseError::Malformed { .. })));
    }

    #[test]
    fn test_write_layout() {
        let document = FilterDocument::from_parts(
            FeedHeader::default(),
            vec![entry_with(&[("from", "a@b.com")])],
        );
        let xml = write_feed(&document, "\t");
        let lines: Vec<&str> = xml.as_str().lines().collect();

        assert_eq!(lines[0], r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        assert_eq!(
            lines[1],
            r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:apps="http://schemas.google.com/apps/2006">"#
        );
        assert_eq!(lines[2], "\t<entry>");
        assert_eq!(lines[3], "\t\t<category term=\"filter\" />");
        assert_eq!(lines[4], "\t\t<title>Mail Filter</title>");
        assert_eq!(lines[5], "\t\t<id>tag:mail.google.com,2008:filter:z1</id>");
        assert_eq!(lines[6], "\t\t<updated>2024-05-01T12:00:00Z</updated>");
        assert_eq!(lines[7], "\t\t<content />");
        assert_eq!(
            lines[8],
            "\t\t<apps:property name=\"from\" value=\"a@b.com\" />"
        );
        assert_eq!(lines[9], "\t</entry>");
        assert_eq!(lines[10], "</feed>");
    }

    #[test]
    fn test_write_escapes_quotes() {
        let document = FilterDocument::from_parts(
            FeedHeader::default(),
            vec![entry_with(&[("hasTheWord", "\"a\" 'b' <c>")])],
        );
        let xml = write_feed(&document, "  ");

        assert!(xml.as_str().contains(
            "value=\"&quot;a&quot; &apos;b&apos; &lt;c&gt;\""
        ));
    }

    #[test]
    fn test_write_keeps_attribute_line_breaks_escaped() {
        let document = FilterDocument::from_parts(
            FeedHeader::default(),
            vec![entry_with(&[("hasTheWord", "line1\nline2\r\tend")])],
        );
        let xml = write_feed(&document, "\t");

        assert!(xml.as_str().contains("value=\"line1&#10;line2&#13;&#9;end\" />\n"));
        assert_eq!(parse_feed(xml.as_str()).unwrap(), document);
    }

    #[test]
    fn test_parse_property_without_name_or_value() {
        let source = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:apps="http://schemas.google.com/apps/2006">
  <entry><category term="filter"/><title>t</title><id>i</id><updated>u</updated>
    <apps:property value="orphan"/>
    <apps:property name="shouldArchive"/>
  </entry>
</feed>"#;

        let document = parse_feed(source).unwrap();
        let properties = &document.entries()[0].properties;
        assert_eq!(
            properties,
            &vec![
                FilterProperty::new("", "orphan"),
                FilterProperty::new("shouldArchive", ""),
            ]
        );
    }

    #[test]
    fn test_write_empty_document() {
        let xml = write_feed(&FilterDocument::new(), "\t");
        assert!(xml.as_str().lines().nth(1).unwrap().ends_with(" />"));
        assert_eq!(parse_feed(xml.as_str()).unwrap(), FilterDocument::new());
    }

    #[test]
    fn test_round_trip_preserves_entries_and_header() {
        let document = parse_feed(SAMPLE).unwrap();
        let reparsed = parse_feed(write_feed(&document, "\t").as_str()).unwrap();

        assert_eq!(reparsed, document);
    }
}
