//! Shortcuts to folders that were already downloaded (`--no-duplicates`).
//!
//! On Unix a relative symlink is created so the tree stays movable. Where
//! symlinks are unavailable, or creating one fails, a `<name>.redirect.txt`
//! note records where the files are.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::info;

/// Suffix of the fallback note.
pub const REDIRECT_SUFFIX: &str = ".redirect.txt";

/// What [`create_shortcut`] left on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortcut {
    Symlink(PathBuf),
    Redirect(PathBuf),
    /// Something already occupies the shortcut path; nothing was written.
    AlreadyExists(PathBuf),
}

/// Creates `shortcut_dir/name` pointing at `target`.
///
/// # Errors
///
/// Returns the I/O error when neither a symlink nor the redirect note could
/// be written.
pub fn create_shortcut(target: &Path, shortcut_dir: &Path, name: &str) -> io::Result<Shortcut> {
    fs::create_dir_all(shortcut_dir)?;
    let link = shortcut_dir.join(name);
    if link.exists() || link.symlink_metadata().is_ok() {
        return Ok(Shortcut::AlreadyExists(link));
    }
    let relative = relative_path(target, shortcut_dir)?;

    #[cfg(unix)]
    {
        match std::os::unix::fs::symlink(&relative, &link) {
            Ok(()) => {
                info!(target = %target.display(), link = %link.display(), "symlink created");
                return Ok(Shortcut::Symlink(link));
            }
            Err(error) => {
                tracing::warn!(link = %link.display(), error = %error, "symlink failed, writing redirect note");
            }
        }
    }

    let note = shortcut_dir.join(format!("{name}{REDIRECT_SUFFIX}"));
    let absolute = std::path::absolute(target)?;
    fs::write(
        &note,
        format!(
            "This album already exists elsewhere.\nRelative path: {}\nAbsolute path: {}\n",
            relative.display(),
            absolute.display()
        ),
    )?;
    info!(target = %target.display(), note = %note.display(), "redirect note created");
    Ok(Shortcut::Redirect(note))
}

/// Path of `target` relative to the directory `base`.
///
/// Both are made absolute first; `..` and `.` components are folded
/// lexically.
///
/// # Errors
///
/// Returns the error of [`std::path::absolute`] (e.g. an empty path).
pub fn relative_path(target: &Path, base: &Path) -> io::Result<PathBuf> {
    let target = lexical(&std::path::absolute(target)?);
    let base = lexical(&std::path::absolute(base)?);

    let common = target
        .components()
        .zip(base.components())
        .take_while(|(a, b)| a == b)
        .count();
    let mut out = PathBuf::new();
    for _ in base.components().skip(common) {
        out.push("..");
    }
    for part in target.components().skip(common) {
        out.push(part);
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    Ok(out)
}

fn lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
