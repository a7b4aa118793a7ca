//! ZIP extraction next to the archive.

use std::fs::File;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;
use zip::ZipArchive;

use super::classify::{self, MediaKind};
use super::resolver::{LibraryRoot, ResolveError};

/// Errors that can occur while extracting an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The requested path resolves outside the root.
    #[error("access denied: {0}")]
    AccessDenied(#[from] ResolveError),

    /// The archive does not exist or is not a regular file.
    #[error("archive not found: {0}")]
    NotFound(PathBuf),

    /// The file does not have a `.zip` extension.
    #[error("not a zip file: {0}")]
    NotAZip(PathBuf),

    /// The archive is corrupt or contains unsafe entry names.
    #[error("extraction failed: {0}")]
    Extract(#[from] zip::result::ZipError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// Absolute path of the output directory.
    pub directory: PathBuf,
    /// Root-anchored path of the output directory.
    pub relative_path: String,
    /// Number of archive entries written.
    pub entries: usize,
}

/// Extract `requested` into a directory named after the archive's stem,
/// alongside the archive.
///
/// Blocking; call from `spawn_blocking` in async contexts. Existing files in
/// the output directory are overwritten.
pub fn extract_zip(root: &LibraryRoot, requested: &str) -> Result<Extracted, ArchiveError> {
    let archive_path = root.resolve(Some(requested))?;

    if !archive_path.is_file() {
        return Err(ArchiveError::NotFound(archive_path));
    }

    let name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if classify::classify(&name) != Some(MediaKind::Zip) {
        return Err(ArchiveError::NotAZip(archive_path));
    }

    let stem = archive_path
        .file_stem()
        .map(|s| s.to_os_string())
        .ok_or_else(|| ArchiveError::NotAZip(archive_path.clone()))?;
    let parent = archive_path
        .parent()
        .ok_or_else(|| ArchiveError::NotFound(archive_path.clone()))?;
    let directory = parent.join(stem);

    let mut archive = ZipArchive::new(File::open(&archive_path)?)?;
    let entries = archive.len();

    std::fs::create_dir_all(&directory)?;
    archive.extract(&directory)?;

    let relative_path = root.to_relative(&directory)?;
    info!(
        archive = %archive_path.display(),
        output = %directory.display(),
        entries,
        "Extracted archive"
    );

    Ok(Extracted {
        directory,
        relative_path,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &std::path::Path, files: &[(&str, &[u8])]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default();
        for (name, content) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
    }

    fn setup() -> (TempDir, LibraryRoot) {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("downloads")).unwrap();
        write_zip(
            &temp_dir.path().join("downloads/photos.ZIP"),
            &[("a.jpg", b"jpg".as_slice()), ("nested/b.txt", b"text".as_slice())],
        );
        fs::write(temp_dir.path().join("downloads/notes.txt"), "x").unwrap();
        let root = LibraryRoot::new(temp_dir.path()).unwrap();
        (temp_dir, root)
    }

    #[test]
    fn test_extract_next_to_archive() {
        let (_temp_dir, root) = setup();
        let extracted = extract_zip(&root, "/downloads/photos.ZIP").unwrap();

        assert_eq!(extracted.relative_path, "/downloads/photos");
        assert_eq!(extracted.entries, 2);
        assert_eq!(
            fs::read(extracted.directory.join("nested/b.txt")).unwrap(),
            b"text"
        );
        assert!(extracted.directory.join("a.jpg").is_file());
    }

    #[test]
    fn test_extract_twice_overwrites() {
        let (_temp_dir, root) = setup();
        extract_zip(&root, "/downloads/photos.ZIP").unwrap();
        let again = extract_zip(&root, "/downloads/photos.ZIP").unwrap();
        assert_eq!(fs::read(again.directory.join("a.jpg")).unwrap(), b"jpg");
    }

    #[test]
    fn test_extract_errors() {
        let (_temp_dir, root) = setup();

        assert!(matches!(
            extract_zip(&root, "/../outside.zip"),
            Err(ArchiveError::AccessDenied(_))
        ));
        assert!(matches!(
            extract_zip(&root, "/downloads/missing.zip"),
            Err(ArchiveError::NotFound(_))
        ));
        assert!(matches!(
            extract_zip(&root, "/downloads"),
            Err(ArchiveError::NotFound(_))
        ));
        assert!(matches!(
            extract_zip(&root, "/downloads/notes.txt"),
            Err(ArchiveError::NotAZip(_))
        ));
    }

    #[test]
    fn test_corrupt_archive() {
        let (temp_dir, root) = setup();
        fs::write(temp_dir.path().join("broken.zip"), "not a zip").unwrap();

        assert!(matches!(
            extract_zip(&root, "/broken.zip"),
            Err(ArchiveError::Extract(_))
        ));
    }

    #[test]
    fn test_entry_escaping_output_not_written() {
        let (temp_dir, root) = setup();
        write_zip(
            &temp_dir.path().join("downloads/evil.zip"),
            &[("../../escaped.txt", b"bad".as_slice())],
        );

        let _ = extract_zip(&root, "/downloads/evil.zip");
        assert!(!temp_dir.path().join("escaped.txt").exists());
        assert!(!temp_dir.path().join("downloads/escaped.txt").exists());
    }
}
