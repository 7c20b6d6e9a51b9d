//! File naming for downloads: header parsing, URL fallbacks and collision handling.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use url::Url;

use crate::layout::{MAX_NAME_CHARS, UNTITLED, sanitize_name, sanitize_name_within};

/// Largest `(n)` suffix tried before giving up and reusing the base name.
const MAX_COLLISION_SUFFIX: usize = 1000;

/// Filename from a `Content-Disposition` header.
///
/// Handles `filename="a.mp3"`, `filename=a.mp3` and the RFC 5987
/// `filename*=UTF-8''a%20b.mp3` form, which wins when both are present.
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + "filename*=".len()..].trim();
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            let encoded = encoded[..end].trim().trim_matches('"');
            if let Ok(decoded) = urlencoding::decode(encoded) {
                return Some(decoded.into_owned());
            }
        }
    }

    let pos = header.find("filename=")?;
    let value = header[pos + "filename=".len()..].trim();
    let name = if let Some(quoted) = value.strip_prefix('"') {
        &quoted[..quoted.find('"')?]
    } else {
        value[..value.find(';').unwrap_or(value.len())].trim()
    };
    (!name.is_empty()).then(|| name.to_string())
}

/// Percent-decoded last path segment of a URL.
pub(crate) fn filename_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(last).map_or_else(|_| last.to_string(), |d| d.into_owned());
    Some(decoded)
}

/// Cover image extension from a `Content-Type` header.
pub(crate) fn cover_extension(content_type: &str) -> &'static str {
    let mime = content_type.to_ascii_lowercase();
    if mime.contains("png") {
        "png"
    } else if mime.contains("webp") {
        "webp"
    } else {
        "jpg"
    }
}

/// Longest extension kept apart from the stem when capping a file name.
const MAX_EXTENSION_CHARS: usize = 8;

/// Sanitizes a download file name, capping the stem and keeping the extension.
///
/// ```
/// use litaudio_core::download::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("Chapitre: 1.mp3"), "Chapitre_ 1.mp3");
/// assert!(sanitize_file_name(&format!("{}.zip", "mot ".repeat(80))).ends_with(".zip"));
/// ```
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    match split_extension(name) {
        Some((stem, ext)) => {
            let stem = sanitize_name_within(stem, MAX_NAME_CHARS - ext.len() - 1);
            format!("{stem}.{ext}")
        }
        None => sanitize_name(name),
    }
}

fn split_extension(name: &str) -> Option<(&str, &str)> {
    let pos = name.rfind('.').filter(|&pos| pos > 0)?;
    let ext = &name[pos + 1..];
    let valid = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_CHARS
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| (&name[..pos], ext))
}

/// `dir/name` followed by `dir/stem (n).ext` for n = 1, 2, ...
fn candidates(dir: &Path, name: &str) -> impl Iterator<Item = PathBuf> {
    let name = sanitize_file_name(name);
    let (stem, ext) = match split_extension(&name) {
        Some((stem, ext)) => (stem.to_string(), format!(".{ext}")),
        None => (name.clone(), String::new()),
    };
    let base = dir.join(&name);
    let dir = dir.to_path_buf();
    std::iter::once(base)
        .chain((1..MAX_COLLISION_SUFFIX).map(move |i| dir.join(format!("{stem} ({i}){ext}"))))
}

/// `dir/name`, or `dir/stem (n).ext` with the first free `n` when taken.
///
/// `name` is sanitized first so it can never leave `dir`. The answer is
/// only a snapshot; writers use [`reserve`] to claim a name.
#[must_use]
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let mut all = candidates(dir, name);
    let base = all.next().unwrap_or_else(|| dir.join(UNTITLED));
    if !base.exists() && !part_path(&base).exists() {
        return base;
    }
    all.find(|candidate| !candidate.exists() && !part_path(candidate).exists())
        .unwrap_or(base)
}

/// A claimed download target: the final path and its open `.part` file.
#[derive(Debug)]
pub(crate) struct Reservation {
    pub path: PathBuf,
    pub part: PathBuf,
    pub file: File,
}

/// Claims the first free name for `name` in `dir`.
///
/// A name is claimed by creating its `.part` file with `create_new`, so two
/// concurrent writers can never hold the same target.
pub(crate) async fn reserve(dir: &Path, name: &str) -> io::Result<Reservation> {
    for path in candidates(dir, name) {
        if tokio::fs::try_exists(&path).await? {
            continue;
        }
        let part = part_path(&path);
        match OpenOptions::new().write(true).create_new(true).open(&part).await {
            Ok(file) => return Ok(Reservation { path, part, file }),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {name} in {}", dir.display()),
    ))
}

/// Moves a finished `.part` file to `path` without replacing an existing file.
///
/// Fails with [`io::ErrorKind::AlreadyExists`] when `path` is taken.
pub(crate) async fn persist(part: &Path, path: &Path) -> io::Result<()> {
    match tokio::fs::hard_link(part, path).await {
        Ok(()) => tokio::fs::remove_file(part).await,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e),
        Err(_) => {
            // no hard links on this filesystem
            if tokio::fs::try_exists(path).await? {
                return Err(io::Error::new(io::ErrorKind::AlreadyExists, path.display().to_string()));
            }
            tokio::fs::rename(part, path).await
        }
    }
}

/// In-progress path for a final download path (`name.ext.part`).
pub(crate) fn part_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(super::constants::PART_SUFFIX);
    PathBuf::from(os)
}
