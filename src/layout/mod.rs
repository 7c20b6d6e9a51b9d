//! Output folder layout.
//!
//! # Overview
//!
//! [`resolve`] maps an item's propagated [`ItemContext`] plus its own author
//! and title to three directories: the root it hangs under, the collection
//! folder (when it belongs to one) and its own folder. It is a pure function:
//! nothing is created on disk here.
//!
//! | Context | `item_dir` |
//! |---|---|
//! | author-prefixed, collection root | `out/Author - Project` |
//! | author-prefixed, nested collection root | `out/Author - Project/Nested` |
//! | author-prefixed, child | `out/Author - Project[/Nested]/Item` |
//! | lone item with an author | `out/Author - Item` |
//! | from a listing | `out/Group[/Collection]/Item` |
//! | otherwise | `out[/Collection]/Item` |
//!
//! Collection roots (`skip_download`) use their collection folder as item folder.
//! Context values arrive sanitized and are joined as they are.

mod sanitize;

pub use sanitize::{
    MAX_NAME_CHARS, UNTITLED, collection_root_name, item_name, path_component, sanitize_name,
    sanitize_name_within, version_marker,
};

use std::path::{Path, PathBuf};

use crate::item::{ItemContext, WorkItem};

/// Directories an item's files are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderPaths {
    pub root_dir: PathBuf,
    pub collection_dir: Option<PathBuf>,
    pub item_dir: PathBuf,
}

impl FolderPaths {
    /// Every directory to create, outermost first.
    #[must_use]
    pub fn dirs(&self) -> Vec<&Path> {
        let mut dirs = vec![self.root_dir.as_path()];
        if let Some(collection) = &self.collection_dir {
            dirs.push(collection);
        }
        dirs.push(&self.item_dir);
        dirs
    }
}

/// Resolves the folders of `item` under `output_root`.
#[must_use]
pub fn resolve(item: &WorkItem, output_root: &Path) -> FolderPaths {
    resolve_named(item, &item_name(item), output_root)
}

/// Same as [`resolve`] with a precomputed item name.
#[must_use]
pub fn resolve_named(item: &WorkItem, name: &str, output_root: &Path) -> FolderPaths {
    let ItemContext {
        collection_root,
        group_root,
        author_prefixed,
        skip_download,
    } = &item.context;
    let collection_root = collection_root.as_deref();
    let skip = *skip_download;

    if let Some(prefixed) = author_prefixed.as_deref() {
        let parent = output_root.join(path_component(prefixed));
        let nested = collection_root.filter(|root| !prefixed.ends_with(&format!(" - {root}")));

        let (collection_dir, item_dir) = match (skip, nested) {
            (true, Some(inner)) => {
                let dir = parent.join(path_component(inner));
                (dir.clone(), dir)
            }
            (true, None) => (parent.clone(), parent),
            (false, Some(inner)) => {
                let dir = parent.join(path_component(inner));
                let item_dir = dir.join(name);
                (dir, item_dir)
            }
            (false, None) => {
                let item_dir = parent.join(name);
                (parent, item_dir)
            }
        };
        return FolderPaths {
            root_dir: output_root.to_path_buf(),
            collection_dir: Some(collection_dir),
            item_dir,
        };
    }

    if collection_root.is_none()
        && group_root.is_none()
        && !skip
        && let Some(author) = item.author.as_deref().filter(|a| !a.trim().is_empty())
    {
        return FolderPaths {
            root_dir: output_root.to_path_buf(),
            collection_dir: None,
            item_dir: output_root.join(format!("{} - {name}", sanitize_name(author))),
        };
    }

    let root_dir = match group_root.as_deref() {
        Some(group) => output_root.join(path_component(group)),
        None => output_root.to_path_buf(),
    };
    match collection_root {
        Some(collection) => {
            let collection_dir = root_dir.join(path_component(collection));
            let item_dir = if skip {
                collection_dir.clone()
            } else {
                collection_dir.join(name)
            };
            FolderPaths {
                root_dir,
                collection_dir: Some(collection_dir),
                item_dir,
            }
        }
        None => FolderPaths {
            item_dir: root_dir.join(name),
            root_dir,
            collection_dir: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.litteratureaudio.com/livre-audio-gratuit-mp3";

    fn item(slug: &str, title: &str) -> WorkItem {
        let mut item = WorkItem::new(format!("{BASE}/{slug}.html"));
        item.title = Some(title.to_string());
        item
    }

    fn ctx(collection: Option<&str>, group: Option<&str>, prefixed: Option<&str>, skip: bool) -> ItemContext {
        ItemContext {
            collection_root: collection.map(str::to_string),
            group_root: group.map(str::to_string),
            author_prefixed: prefixed.map(str::to_string),
            skip_download: skip,
        }
    }

    #[test]
    fn test_author_prefixed_collection_root() {
        let out = Path::new("/out");
        let mut root = item("doyle-sherlock", "Sherlock Holmes");
        root.context = ctx(Some("Sherlock Holmes"), None, Some("Arthur Conan Doyle - Sherlock Holmes"), true);
        let paths = resolve(&root, out);
        assert_eq!(paths.root_dir, out);
        assert_eq!(paths.item_dir, out.join("Arthur Conan Doyle - Sherlock Holmes"));
        assert_eq!(paths.collection_dir.as_deref(), Some(paths.item_dir.as_path()));
    }

    #[test]
    fn test_author_prefixed_regular_child() {
        let out = Path::new("/out");
        let mut child = item("doyle-etude", "Une étude en rouge");
        child.context = ctx(Some("Sherlock Holmes"), None, Some("Arthur Conan Doyle - Sherlock Holmes"), false);
        let paths = resolve(&child, out);
        assert_eq!(paths.item_dir, out.join("Arthur Conan Doyle - Sherlock Holmes/Une étude en rouge"));
    }

    #[test]
    fn test_nested_collection_root_and_child_do_not_double_nest() {
        let out = Path::new("/out");
        let prefix = Some("Arthur Conan Doyle - Sherlock Holmes");
        let mut nested_root = item("doyle-vallee", "La Vallée de la peur");
        nested_root.context = ctx(Some("La Vallée de la peur"), None, prefix, true);
        let root_paths = resolve(&nested_root, out);
        let expected = out.join("Arthur Conan Doyle - Sherlock Holmes/La Vallée de la peur");
        assert_eq!(root_paths.item_dir, expected);
        assert_eq!(root_paths.collection_dir.as_deref(), Some(expected.as_path()));

        let mut episode = item("doyle-vallee-01", "Épisode 1");
        episode.context = ctx(Some("La Vallée de la peur"), None, prefix, false);
        let paths = resolve(&episode, out);
        assert_eq!(paths.collection_dir.as_deref(), Some(expected.as_path()));
        assert_eq!(paths.item_dir, expected.join("Épisode 1"));
    }

    #[test]
    fn test_lone_item_with_author_goes_to_author_dash_title() {
        let out = Path::new("/out");
        let mut lone = item("maupassant-le-horla", "Le Horla");
        lone.author = Some("Guy de Maupassant".into());
        let paths = resolve(&lone, out);
        assert_eq!(paths.item_dir, out.join("Guy de Maupassant - Le Horla"));
        assert_eq!(paths.collection_dir, None);
    }

    #[test]
    fn test_listing_group_with_and_without_collection() {
        let out = Path::new("/out");
        let mut work = item("zola-nana", "Nana");
        work.author = Some("Émile Zola".into());
        work.context = ctx(None, Some("Émile Zola"), None, false);
        assert_eq!(resolve(&work, out).item_dir, out.join("Émile Zola/Nana"));

        let mut root = item("zola-rougon", "Les Rougon-Macquart");
        root.context = ctx(Some("Les Rougon-Macquart"), Some("Émile Zola"), None, true);
        let paths = resolve(&root, out);
        assert_eq!(paths.root_dir, out.join("Émile Zola"));
        assert_eq!(paths.item_dir, out.join("Émile Zola/Les Rougon-Macquart"));

        let mut child = item("zola-assommoir", "L'Assommoir");
        child.context = ctx(Some("Les Rougon-Macquart"), Some("Émile Zola"), None, false);
        assert_eq!(resolve(&child, out).item_dir, out.join("Émile Zola/Les Rougon-Macquart/L'Assommoir"));
    }

    #[test]
    fn test_no_context_without_author() {
        let out = Path::new("/out");
        let mut work = item("anonyme-conte", "Conte");
        assert_eq!(resolve(&work, out).item_dir, out.join("Conte"));
        work.context = ctx(Some("Contes"), None, None, false);
        assert_eq!(resolve(&work, out).item_dir, out.join("Contes/Conte"));
    }

    #[test]
    fn test_versions_resolve_to_distinct_dirs() {
        let out = Path::new("/out");
        let mut a = item("zola-emile-nana", "Nana");
        a.context = ctx(None, Some("Émile Zola"), None, false);
        let mut b = item("zola-emile-nana-version-2", "Nana");
        b.reader = Some("Reader X".into());
        b.context = a.context.clone();
        let (pa, pb) = (resolve(&a, out), resolve(&b, out));
        assert_ne!(pa.item_dir, pb.item_dir);
        assert_eq!(pb.item_dir, out.join("Émile Zola/Nana (Version 2 - Reader X)"));
    }

    #[test]
    fn test_colon_marker_survives_in_context_folders() {
        let out = Path::new("/out");
        let root_name = sanitize_name("Fables: Livre I");
        let prefixed = format!("Jean de La Fontaine - {root_name}");
        let mut child = item("la-fontaine-corbeau", "Le Corbeau");
        child.context = ctx(Some(&root_name), None, Some(&prefixed), false);
        assert_eq!(
            resolve(&child, out).item_dir,
            out.join("Jean de La Fontaine - Fables_ Livre I/Le Corbeau")
        );

        let mut grouped = item("la-fontaine-loup", "Le Loup");
        grouped.context = ctx(Some(&root_name), Some("Fables_ choisies"), None, false);
        assert_eq!(resolve(&grouped, out).item_dir, out.join("Fables_ choisies/Fables_ Livre I/Le Loup"));
    }

    #[test]
    fn test_dirs_lists_outermost_first() {
        let paths = FolderPaths {
            root_dir: PathBuf::from("/o"),
            collection_dir: Some(PathBuf::from("/o/c")),
            item_dir: PathBuf::from("/o/c/i"),
        };
        assert_eq!(paths.dirs(), vec![Path::new("/o"), Path::new("/o/c"), Path::new("/o/c/i")]);
    }
}
