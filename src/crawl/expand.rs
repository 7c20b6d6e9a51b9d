//! Folder context a collection hands to its children.
//!
//! Precedence, first match wins:
//!
//! 1. various-authors collection: children get `<Author> - <Title>` and lose
//!    any inherited `group_root`
//! 2. single author, not from a listing, not nested: `<Author> - <Title>`
//! 3. nested in an author-prefixed collection: the same prefix, unchanged
//! 4. otherwise no prefix
//!
//! Children always get `collection_root` = the collection's own name, and the
//! collection itself becomes a metadata-only node rooted at that name.

use crate::item::{ItemContext, WorkItem};
use crate::layout::{collection_root_name, sanitize_name};

/// Author values that mean "several authors".
const VARIOUS_AUTHORS: &[&str] = &["various authors", "auteurs divers"];

/// Context for a collection node and for each of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Context of the collection item itself (`skip_download` set).
    pub collection: ItemContext,
    /// Context recorded for every child URL.
    pub child: ItemContext,
}

/// Returns true when `author` is the various-authors sentinel.
///
/// ```
/// use litaudio_core::crawl::is_various_authors;
///
/// assert!(is_various_authors("Auteurs divers"));
/// assert!(is_various_authors(" Various Authors "));
/// assert!(!is_various_authors("Victor Hugo"));
/// ```
#[must_use]
pub fn is_various_authors(author: &str) -> bool {
    let author = author.trim().to_lowercase();
    VARIOUS_AUTHORS.contains(&author.as_str())
}

/// Computes the contexts of a collection found with `inherited` context.
#[must_use]
pub fn expand_collection(item: &WorkItem, inherited: &ItemContext) -> Expansion {
    let root_name = collection_root_name(item);
    let author = item.author.as_deref().map(str::trim).filter(|a| !a.is_empty());

    let mut group_root = inherited.group_root.clone();
    let author_prefixed = match author {
        Some(author) if is_various_authors(author) => {
            group_root = None;
            Some(prefixed_name(author, &root_name))
        }
        Some(author) if inherited.group_root.is_none() && inherited.author_prefixed.is_none() => {
            Some(prefixed_name(author, &root_name))
        }
        _ => inherited.author_prefixed.clone(),
    };

    let child = ItemContext {
        collection_root: Some(root_name.clone()),
        group_root: group_root.clone(),
        author_prefixed: author_prefixed.clone(),
        skip_download: false,
    };
    let collection = ItemContext {
        collection_root: Some(root_name),
        group_root,
        author_prefixed,
        skip_download: true,
    };
    Expansion { collection, child }
}

fn prefixed_name(author: &str, root_name: &str) -> String {
    format!("{} - {root_name}", sanitize_name(author))
}
