use super::error::ArchiveError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use xscan_rules::logging::codes;
use xscan_rules::{log_debug, log_error};

/// Bounds applied while opening and reading an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveLimits {
    pub max_entries: usize,
    pub max_entry_size: u64,
    pub max_total_size: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: 50_000,
            max_entry_size: 64 * 1024 * 1024,
            max_total_size: 512 * 1024 * 1024,
        }
    }
}

/// Central directory record of one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub index: usize,
    pub name: String,
    pub is_dir: bool,
    /// Declared uncompressed size
    pub size: u64,
}

/// A non-directory entry with its content
#[derive(Debug, Clone)]
pub struct ArchiveFile {
    pub entry: ArchiveEntry,
    pub content: Vec<u8>,
}

/// Read-only view of a zip package
///
/// The entry table is read and checked once at open. Content is read on
/// demand, one entry at a time. The file handle is released by [`close`] or
/// when the reader is dropped.
///
/// [`close`]: ArchiveReader::close
#[derive(Debug)]
pub struct ArchiveReader {
    path: PathBuf,
    archive: zip::ZipArchive<BufReader<File>>,
    entries: Vec<ArchiveEntry>,
    limits: ArchiveLimits,
    bytes_read: u64,
}

impl ArchiveReader {
    pub fn open(path: impl AsRef<Path>, limits: ArchiveLimits) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();
        let not_found = || ArchiveError::NotFound { path: path.clone() };

        if !path.is_file() {
            return Err(not_found());
        }
        let file = File::open(&path).map_err(|_| not_found())?;

        let corrupt = |reason: String| ArchiveError::Corrupt {
            path: path.clone(),
            reason,
        };

        let mut archive =
            zip::ZipArchive::new(BufReader::new(file)).map_err(|e| corrupt(e.to_string()))?;

        if archive.len() > limits.max_entries {
            return Err(corrupt(format!(
                "{} entries exceeds the limit of {}",
                archive.len(),
                limits.max_entries
            )));
        }

        let mut entries = Vec::with_capacity(archive.len());
        let mut declared_total: u64 = 0;
        for index in 0..archive.len() {
            let file = archive
                .by_index_raw(index)
                .map_err(|e| corrupt(format!("entry {}: {}", index, e)))?;

            if !is_safe_entry_name(file.name()) {
                log_error!(codes::archive::UNSAFE_ENTRY_PATH, "Archive entry escapes the archive root",
                    "archive" => path.display(),
                    "entry" => file.name()
                );
                return Err(corrupt(format!("unsafe entry name \"{}\"", file.name())));
            }

            declared_total = declared_total.saturating_add(file.size());
            entries.push(ArchiveEntry {
                index,
                name: file.name().to_string(),
                is_dir: file.is_dir(),
                size: file.size(),
            });
        }

        if declared_total > limits.max_total_size {
            return Err(corrupt(format!(
                "declared size {} exceeds the limit of {}",
                declared_total, limits.max_total_size
            )));
        }

        log_debug!("Archive opened",
            "archive" => path.display(),
            "entries" => entries.len(),
            "declared_size" => declared_total
        );

        Ok(Self {
            path,
            archive,
            entries,
            limits,
            bytes_read: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in central directory order, directories included
    pub fn entries(&self) -> impl Iterator<Item = &ArchiveEntry> + '_ {
        self.entries.iter()
    }

    pub fn read_content(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>, ArchiveError> {
        let max = self.limits.max_entry_size;
        let too_large = |size: u64| ArchiveError::EntryTooLarge {
            name: entry.name.clone(),
            size,
            max,
        };
        if entry.size > max {
            return Err(too_large(entry.size));
        }

        let read_error = |reason: String| ArchiveError::EntryRead {
            name: entry.name.clone(),
            reason,
        };
        let file = self
            .archive
            .by_index(entry.index)
            .map_err(|e| read_error(e.to_string()))?;

        // declared sizes are not trusted; read at most one byte past the limit
        let mut content = Vec::new();
        file.take(max.saturating_add(1))
            .read_to_end(&mut content)
            .map_err(|e| read_error(e.to_string()))?;
        let size = content.len() as u64;
        if size > max {
            return Err(too_large(size));
        }

        self.bytes_read = self.bytes_read.saturating_add(size);
        if self.bytes_read > self.limits.max_total_size {
            return Err(ArchiveError::Corrupt {
                path: self.path.clone(),
                reason: format!(
                    "uncompressed content exceeds the limit of {}",
                    self.limits.max_total_size
                ),
            });
        }

        Ok(content)
    }

    /// Non-directory entries with content
    ///
    /// A failing entry yields an error and iteration continues with the next
    /// one. An archive-level error is yielded once and ends the iteration.
    pub fn files(&mut self) -> impl Iterator<Item = Result<ArchiveFile, ArchiveError>> + '_ {
        let mut halted = false;
        (0..self.entries.len()).filter_map(move |position| {
            let entry = self.entries[position].clone();
            if halted || entry.is_dir {
                return None;
            }
            let file = self
                .read_content(&entry)
                .map(|content| ArchiveFile { entry, content });
            halted = matches!(&file, Err(error) if !error.is_entry_error());
            Some(file)
        })
    }

    pub fn close(self) {
        log_debug!("Archive closed",
            "archive" => self.path.display(),
            "bytes_read" => self.bytes_read
        );
    }
}

/// Relative names without `..` components, NUL bytes or drive prefixes
pub fn is_safe_entry_name(name: &str) -> bool {
    if name.is_empty() || name.contains('\0') {
        return false;
    }
    let normalized = name.replace('\\', "/");
    if normalized.starts_with('/') {
        return false;
    }
    let bytes = normalized.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return false;
    }
    !normalized.split('/').any(|segment| segment == "..")
}

/// Decode entry content as UTF-8, replacing invalid sequences with U+FFFD
///
/// The flag reports whether any replacement happened.
pub fn decode_content(bytes: &[u8]) -> (Cow<'_, str>, bool) {
    let text = String::from_utf8_lossy(bytes);
    let replaced = matches!(text, Cow::Owned(_));
    (text, replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    fn write_zip(dir: &TempDir, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.path().join(name);
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        for (entry, content) in entries {
            if entry.ends_with('/') {
                writer.add_directory(*entry, FileOptions::default()).unwrap();
            } else {
                writer.start_file(*entry, FileOptions::default()).unwrap();
                writer.write_all(content).unwrap();
            }
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn test_open_missing_and_corrupt() {
        let dir = TempDir::new().unwrap();
        assert_matches!(
            ArchiveReader::open(dir.path().join("missing.zip"), ArchiveLimits::default()),
            Err(ArchiveError::NotFound { .. })
        );
        assert_matches!(
            ArchiveReader::open(dir.path(), ArchiveLimits::default()),
            Err(ArchiveError::NotFound { .. })
        );

        let garbage = dir.path().join("garbage.zip");
        std::fs::write(&garbage, b"not a zip file at all").unwrap();
        assert_matches!(
            ArchiveReader::open(&garbage, ArchiveLimits::default()),
            Err(ArchiveError::Corrupt { .. })
        );
    }

    #[test]
    fn test_files_skip_directories_and_entries_restart() {
        let dir = TempDir::new().unwrap();
        let path = write_zip(
            &dir,
            "pkg.xpi",
            &[
                ("manifest.json", b"{}"),
                ("content/", b""),
                ("content/script.js", b"eval(x)"),
            ],
        );

        let mut reader = ArchiveReader::open(&path, ArchiveLimits::default()).unwrap();
        let names: Vec<_> = reader.entries().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["manifest.json", "content/", "content/script.js"]);
        assert_eq!(reader.entries().count(), 3);

        let files: Vec<_> = reader.files().collect::<Result<_, _>>().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].entry.name, "content/script.js");
        assert_eq!(files[1].content, b"eval(x)");
        reader.close();
    }

    #[test]
    fn test_oversize_entry_is_an_entry_error() {
        let dir = TempDir::new().unwrap();
        let big = vec![b'a'; 64];
        let path = write_zip(&dir, "pkg.zip", &[("big.js", &big), ("small.js", b"ok")]);
        let limits = ArchiveLimits {
            max_entry_size: 16,
            ..ArchiveLimits::default()
        };

        let mut reader = ArchiveReader::open(&path, limits).unwrap();
        let results: Vec<_> = reader.files().collect();
        assert_eq!(results.len(), 2);
        assert_matches!(&results[0], Err(e) if e.is_entry_error());
        assert_matches!(&results[1], Ok(file) if file.content == b"ok");
    }

    #[test]
    fn test_entry_count_limit() {
        let dir = TempDir::new().unwrap();
        let path = write_zip(&dir, "pkg.zip", &[("a", b"1"), ("b", b"2"), ("c", b"3")]);
        let limits = ArchiveLimits {
            max_entries: 2,
            ..ArchiveLimits::default()
        };
        assert_matches!(ArchiveReader::open(&path, limits), Err(ArchiveError::Corrupt { .. }));
    }

    #[test]
    fn test_unsafe_names_make_archive_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = write_zip(&dir, "evil.zip", &[("../../etc/passwd", b"x")]);
        assert_matches!(
            ArchiveReader::open(&path, ArchiveLimits::default()),
            Err(ArchiveError::Corrupt { .. })
        );

        assert!(is_safe_entry_name("content/a..b.js"));
        assert!(!is_safe_entry_name("/abs/path"));
        assert!(!is_safe_entry_name("C:\\windows"));
        assert!(!is_safe_entry_name("a\\..\\b"));
    }

    #[test]
    fn test_decode_content_reports_replacement() {
        let (text, replaced) = decode_content(b"plain");
        assert_eq!(text, "plain");
        assert!(!replaced);

        let (text, replaced) = decode_content(b"ab\xFFcd");
        assert_eq!(text, "ab\u{FFFD}cd");
        assert!(replaced);
    }
}
