//! Non-clobbering output paths: `song.mid` becomes `song_v1.mid`, then `song_v2.mid`.

use std::path::{Path, PathBuf};

/// First free path derived from `path`.
///
/// Returns `path` itself if nothing exists there. Otherwise a trailing `_vN`
/// on the stem is bumped, or `_v1` is appended, until an unused name is found.
pub fn versioned_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let (base, mut version) = split_version(&stem);

    loop {
        version += 1;
        let candidate = path.with_file_name(format!("{base}_v{version}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }
}

/// `("song", 3)` for `song_v3`, `("song", 0)` for `song`.
fn split_version(stem: &str) -> (&str, u32) {
    if let Some((base, digits)) = stem.rsplit_once("_v") {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = digits.parse() {
                return (base, n);
            }
        }
    }
    (stem, 0)
}
