//! Audio file discovery
//!
//! One finite directory scan per batch invocation; the next batch
//! re-scans, so files that were skipped or arrived late are simply
//! picked up then.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Extensions accepted as audio input.
const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "oga", "opus", "m4a", "aac", "wav", "wv", "aiff",
];

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            AUDIO_EXTENSIONS.iter().any(|candidate| *candidate == ext)
        })
        .unwrap_or(false)
}

/// List the audio files under `dir`.
///
/// A missing directory yields an empty list rather than an error:
/// there is simply nothing to ingest yet. Unreadable entries are
/// logged and skipped; hidden files and directories are ignored.
pub fn scan_audio_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "library directory missing, nothing to ingest");
        return Vec::new();
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                if has_audio_extension(entry.path()) {
                    files.push(entry.into_path());
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
            }
        }
    }

    tracing::debug!(dir = %dir.display(), count = files.len(), "directory scan complete");
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_audio_files_recursively() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("b.FLAC"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/c.ogg"), b"x").unwrap();

        let mut found: Vec<String> = scan_audio_files(dir.path())
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        found.sort();

        assert_eq!(found, vec!["a.mp3", "b.FLAC", "c.ogg"]);
    }

    #[test]
    fn skips_hidden_files_and_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(".hidden.mp3"), b"x").unwrap();
        std::fs::create_dir(dir.path().join(".cache")).unwrap();
        std::fs::write(dir.path().join(".cache/d.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("visible.mp3"), b"x").unwrap();

        let found = scan_audio_files(dir.path());
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("visible.mp3"));
    }

    #[test]
    fn missing_directory_yields_empty_list() {
        assert!(scan_audio_files(Path::new("/nonexistent/downloads")).is_empty());
    }

    #[test]
    fn files_without_extension_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("README"), b"x").unwrap();
        assert!(scan_audio_files(dir.path()).is_empty());
    }
}
