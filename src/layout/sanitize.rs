//! Filesystem-safe names for folders and files.

use std::sync::LazyLock;

use regex::Regex;

use crate::item::WorkItem;
use crate::site::slug_from_url;
use crate::text::compile_static_regex;

/// Longest name produced, in characters.
pub const MAX_NAME_CHARS: usize = 180;

/// Name used when nothing usable is left.
pub const UNTITLED: &str = "untitled";

/// Stand-in for `:` while underscores are turned into spaces.
const COLON_TOKEN: &str = "\u{0}COLON\u{0}";

static FORBIDDEN_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r#"[<>:"/\\|?*\x00-\x1f]"#));

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?i)(?:^|-)version-?(\d+)(?:-|$)"));

/// Makes `name` safe as a single path component.
///
/// Underscores become spaces and a colon becomes an underscore, so
/// `Title: Subtitle` reads `Title_ Subtitle`. Forbidden characters are
/// dropped, whitespace collapsed, and long names cut at a word boundary.
///
/// ```
/// use litaudio_core::layout::sanitize_name;
///
/// assert_eq!(sanitize_name("Vingt mille lieues: tome_1"), "Vingt mille lieues_ tome 1");
/// assert_eq!(sanitize_name("  a/b?  "), "ab");
/// assert_eq!(sanitize_name("***"), "untitled");
/// ```
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    sanitize_name_within(name, MAX_NAME_CHARS)
}

/// [`sanitize_name`] with a custom length cap, for names that get a suffix.
#[must_use]
pub fn sanitize_name_within(name: &str, max_chars: usize) -> String {
    let swapped = name
        .replace(':', COLON_TOKEN)
        .replace('_', " ")
        .replace(COLON_TOKEN, "_");
    let cleaned = FORBIDDEN_RE.replace_all(&swapped, "");
    let mut out = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if out.chars().count() > max_chars {
        let cut: String = out.chars().take(max_chars).collect();
        out = match cut.rfind(' ') {
            Some(pos) => cut[..pos].to_string(),
            None => cut,
        };
    }
    if out.is_empty() || out.chars().all(|c| c == '.') {
        return UNTITLED.to_string();
    }
    out
}

/// Guards an already-sanitized folder name for use as one path component.
///
/// Context values (`collection_root`, `group_root`, `author_prefixed`) are
/// produced by [`sanitize_name`]; running that again would turn the `_` it
/// left for a colon into a space. This only drops separators and other
/// forbidden characters, so it leaves sanitized names untouched.
///
/// ```
/// use litaudio_core::layout::{path_component, sanitize_name};
///
/// let name = sanitize_name("Fables: Livre I");
/// assert_eq!(path_component(&name), "Fables_ Livre I");
/// assert_eq!(path_component("../x"), "..x");
/// ```
#[must_use]
pub fn path_component(name: &str) -> String {
    let cleaned = FORBIDDEN_RE.replace_all(name, "");
    let trimmed = cleaned.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        return UNTITLED.to_string();
    }
    trimmed.to_string()
}

/// Version number encoded in a work slug (`...-version-2.html`).
#[must_use]
pub fn version_marker(source_url: &str) -> Option<u32> {
    VERSION_RE
        .captures(&slug_from_url(source_url))?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

fn title_or_slug(item: &WorkItem, fallback: &str) -> String {
    let slug = slug_from_url(&item.source_url);
    let raw = item
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .or((!slug.is_empty()).then_some(slug.as_str()))
        .unwrap_or(fallback);
    sanitize_name(raw)
}

/// Folder name of an item: its title (else slug), plus a version suffix
/// (`Nana (Version 2 - Reader)`) for re-releases.
#[must_use]
pub fn item_name(item: &WorkItem) -> String {
    let base = title_or_slug(item, "work");
    match version_marker(&item.source_url) {
        Some(n) => match item.reader.as_deref().map(sanitize_name) {
            Some(reader) if reader != UNTITLED => format!("{base} (Version {n} - {reader})"),
            _ => format!("{base} (Version {n})"),
        },
        None => base,
    }
}

/// Folder name a collection hands down to its children as `collection_root`.
#[must_use]
pub fn collection_root_name(item: &WorkItem) -> String {
    title_or_slug(item, "collection")
}
