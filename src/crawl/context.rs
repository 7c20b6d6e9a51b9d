//! Side table of folder context keyed by normalized URL.
//!
//! Listing and collection expansion write a URL's context before the URL is
//! enqueued; the crawler reads it when the URL is dequeued. Every map keeps
//! the first value written for a URL.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::debug;

use crate::item::ItemContext;

#[derive(Debug, Default)]
pub struct ContextTable {
    group: HashMap<String, String>,
    collection: HashMap<String, String>,
    author_prefixed: HashMap<String, String>,
}

impl ContextTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the listing group of `url`. Returns false when one was already set.
    pub fn record_group(&mut self, url: &str, group_root: &str) -> bool {
        first_write(&mut self.group, "group_root", url, group_root)
    }

    /// Records the enclosing collection of `url`.
    pub fn record_collection(&mut self, url: &str, collection_root: &str) -> bool {
        first_write(&mut self.collection, "collection_root", url, collection_root)
    }

    /// Records the `Author - Project` folder of `url`.
    pub fn record_author_prefixed(&mut self, url: &str, author_prefixed: &str) -> bool {
        first_write(&mut self.author_prefixed, "author_prefixed", url, author_prefixed)
    }

    /// Context recorded for `url`; `skip_download` is never set here.
    #[must_use]
    pub fn context_for(&self, url: &str) -> ItemContext {
        ItemContext {
            collection_root: self.collection.get(url).cloned(),
            group_root: self.group.get(url).cloned(),
            author_prefixed: self.author_prefixed.get(url).cloned(),
            skip_download: false,
        }
    }
}

fn first_write(map: &mut HashMap<String, String>, key: &str, url: &str, value: &str) -> bool {
    match map.entry(url.to_string()) {
        Entry::Vacant(slot) => {
            slot.insert(value.to_string());
            true
        }
        Entry::Occupied(existing) => {
            if existing.get() != value {
                debug!(url, key, kept = %existing.get(), ignored = value, "context already set");
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.litteratureaudio.com/livre-audio-gratuit-mp3/conte.html";

    #[test]
    fn test_first_writer_wins() {
        let mut table = ContextTable::new();
        assert!(table.record_collection(URL, "Contes de Grimm"));
        assert!(!table.record_collection(URL, "Contes choisis"));
        assert_eq!(table.context_for(URL).collection_root.as_deref(), Some("Contes de Grimm"));
    }

    #[test]
    fn test_maps_are_independent() {
        let mut table = ContextTable::new();
        table.record_group(URL, "Grimm");
        table.record_author_prefixed(URL, "Grimm - Contes");
        let context = table.context_for(URL);
        assert_eq!(context.group_root.as_deref(), Some("Grimm"));
        assert_eq!(context.author_prefixed.as_deref(), Some("Grimm - Contes"));
        assert_eq!(context.collection_root, None);
        assert!(!context.skip_download);
    }

    #[test]
    fn test_unknown_url_has_empty_context() {
        assert_eq!(ContextTable::new().context_for(URL), ItemContext::default());
    }
}
