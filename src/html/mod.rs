//! Lightweight markup scanner for the site's server-rendered pages.
//!
//! The pages are plain WordPress output, so a regex tag scanner recovers
//! element nesting, classes and links without pulling in a DOM crate.
//!
//! # Overview
//!
//! [`Document::parse`] walks the source once and records every element with
//! its decoded attributes and the byte span of its content. Nesting follows
//! from spans: an element is a descendant of another when it starts inside
//! the other's inner span. Queries return [`NodeId`]s into the element table.
//!
//! # Example
//!
//! ```
//! use litaudio_core::html::Document;
//!
//! let doc = Document::parse(r#"<div class="entry-content"><a href="/x.html">X</a></div>"#);
//! let entry = doc.find("div", Some("entry-content")).unwrap();
//! let link = doc.find_in(entry, "a", None).unwrap();
//! assert_eq!(doc.element(link).attr("href"), Some("/x.html"));
//! assert_eq!(doc.text(link), "X");
//! ```

mod entities;

pub use entities::decode_entities;

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::text::{compile_static_regex, normalize_whitespace};

/// Index of an element inside a [`Document`].
pub type NodeId = usize;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?s)<!--.*?-->|<(/?)([a-zA-Z][a-zA-Z0-9:-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#,
    )
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"([^\s=/>"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
});

static RAW_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?is)<(?:script|style|ins)\b.*?</(?:script|style|ins)\s*>")
});

static ANY_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?s)<!--.*?-->|</?([a-zA-Z][a-zA-Z0-9]*)[^>]*>")
});

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2", "h3", "h4",
    "h5", "h6", "header", "hr", "li", "ol", "p", "section", "table", "td", "th", "tr", "ul",
];

/// One element recorded by the scanner.
#[derive(Debug, Clone)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    start: usize,
    inner_start: usize,
    inner_end: usize,
    end: usize,
}

impl Element {
    /// Lower-cased tag name.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the decoded value of an attribute (names are lower-cased).
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates the whitespace-separated entries of the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    /// Returns true when the `class` attribute contains `class` as a whole word.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    fn matches(&self, tag: &str, class: Option<&str>) -> bool {
        (tag == "*" || self.tag == tag) && class.is_none_or(|c| self.has_class(c))
    }
}

/// A scanned page: the source text plus its element table in document order.
#[derive(Debug, Clone)]
pub struct Document<'a> {
    source: &'a str,
    elements: Vec<Element>,
}

impl<'a> Document<'a> {
    /// Scans `source` into an element table.
    ///
    /// Never fails: malformed markup degrades to best-effort nesting.
    #[must_use]
    pub fn parse(source: &'a str) -> Self {
        let mut elements: Vec<Element> = Vec::new();
        let mut open: Vec<NodeId> = Vec::new();
        let mut pos = 0;

        while let Some(caps) = TAG_RE.captures_at(source, pos) {
            let Some(whole) = caps.get(0) else { break };
            pos = whole.end();
            let Some(name) = caps.get(2) else {
                continue; // comment
            };
            let tag = name.as_str().to_ascii_lowercase();

            if caps.get(1).is_some_and(|m| !m.as_str().is_empty()) {
                if let Some(depth) = open.iter().rposition(|&id| elements[id].tag == tag) {
                    for (offset, id) in open.drain(depth..).enumerate() {
                        let element = &mut elements[id];
                        element.inner_end = whole.start();
                        element.end = if offset == 0 {
                            whole.end()
                        } else {
                            whole.start()
                        };
                    }
                }
                continue;
            }

            let raw_attrs = caps.get(3).map_or("", |m| m.as_str());
            let self_closing = raw_attrs.trim_end().ends_with('/');
            let is_void = VOID_ELEMENTS.contains(&tag.as_str());
            let is_raw_text = RAW_TEXT_ELEMENTS.contains(&tag.as_str());
            let id = elements.len();
            elements.push(Element {
                attrs: parse_attrs(raw_attrs),
                start: whole.start(),
                inner_start: whole.end(),
                inner_end: whole.end(),
                end: whole.end(),
                tag,
            });

            if self_closing || is_void {
                continue;
            }
            if is_raw_text {
                let closing = format!("</{}", elements[id].tag);
                let (inner_end, end) = match find_ascii_ci(source, pos, &closing) {
                    Some(at) => {
                        let end = source[at..].find('>').map_or(source.len(), |i| at + i + 1);
                        (at, end)
                    }
                    None => (source.len(), source.len()),
                };
                elements[id].inner_end = inner_end;
                elements[id].end = end;
                pos = end;
                continue;
            }
            open.push(id);
        }

        for id in open {
            elements[id].inner_end = source.len();
            elements[id].end = source.len();
        }

        Self { source, elements }
    }

    /// The raw source this document was scanned from.
    #[must_use]
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Returns the element for an id produced by this document.
    #[must_use]
    pub fn element(&self, id: NodeId) -> &Element {
        &self.elements[id]
    }

    /// All elements matching `tag` (`"*"` for any) and an optional class, in document order.
    #[must_use]
    pub fn find_all(&self, tag: &str, class: Option<&str>) -> Vec<NodeId> {
        (0..self.elements.len())
            .filter(|&id| self.elements[id].matches(tag, class))
            .collect()
    }

    /// First element matching `tag` and an optional class.
    #[must_use]
    pub fn find(&self, tag: &str, class: Option<&str>) -> Option<NodeId> {
        (0..self.elements.len()).find(|&id| self.elements[id].matches(tag, class))
    }

    /// All descendants of `scope` matching `tag` and an optional class.
    #[must_use]
    pub fn find_all_in(&self, scope: NodeId, tag: &str, class: Option<&str>) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|&id| self.elements[id].matches(tag, class))
            .collect()
    }

    /// First descendant of `scope` matching `tag` and an optional class.
    #[must_use]
    pub fn find_in(&self, scope: NodeId, tag: &str, class: Option<&str>) -> Option<NodeId> {
        self.descendants(scope)
            .find(|&id| self.elements[id].matches(tag, class))
    }

    /// Like [`find_all_in`](Self::find_all_in) but searches the whole document when `scope` is `None`.
    #[must_use]
    pub fn find_all_scoped(
        &self,
        scope: Option<NodeId>,
        tag: &str,
        class: Option<&str>,
    ) -> Vec<NodeId> {
        match scope {
            Some(scope) => self.find_all_in(scope, tag, class),
            None => self.find_all(tag, class),
        }
    }

    /// Returns true when `inner` is a descendant of `outer`.
    #[must_use]
    pub fn contains(&self, outer: NodeId, inner: NodeId) -> bool {
        let o = &self.elements[outer];
        let i = &self.elements[inner];
        inner > outer && i.start >= o.inner_start && i.start < o.inner_end
    }

    /// Raw markup between the element's start and end tags.
    #[must_use]
    pub fn inner_html(&self, id: NodeId) -> &'a str {
        let element = &self.elements[id];
        self.source
            .get(element.inner_start..element.inner_end)
            .unwrap_or("")
    }

    /// Visible text of an element with whitespace collapsed.
    #[must_use]
    pub fn text(&self, id: NodeId) -> String {
        html_to_text(self.inner_html(id))
    }

    /// Elements whose start tag lies inside `scope`'s content, in document order.
    fn descendants(&self, scope: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let element = &self.elements[scope];
        let (lo, hi) = (element.inner_start, element.inner_end);
        (scope + 1..self.elements.len())
            .take_while(move |&id| self.elements[id].start < hi)
            .filter(move |&id| self.elements[id].start >= lo)
    }
}

/// Converts a markup fragment to plain text.
///
/// Script and style bodies are dropped, block-level tags become word breaks,
/// inline tags vanish, entities are decoded and whitespace collapsed.
#[must_use]
pub fn html_to_text(fragment: &str) -> String {
    let without_raw = RAW_BLOCK_RE.replace_all(fragment, " ");
    let without_tags = ANY_TAG_RE.replace_all(&without_raw, |caps: &Captures<'_>| {
        let is_block = caps.get(1).is_some_and(|name| {
            BLOCK_ELEMENTS.contains(&name.as_str().to_ascii_lowercase().as_str())
        });
        if is_block || caps.get(1).is_none() {
            " "
        } else {
            ""
        }
    });
    normalize_whitespace(&decode_entities(&without_tags))
}

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            Some((name, decode_entities(value).into_owned()))
        })
        .collect()
}

fn find_ascii_ci(haystack: &str, from: usize, needle: &str) -> Option<usize> {
    haystack
        .get(from..)?
        .to_ascii_lowercase()
        .find(needle)
        .map(|i| from + i)
}
