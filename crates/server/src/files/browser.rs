//! Directory reading and entry classification.
//!
//! This module reads one directory level, stats each child and turns it into
//! a [`DirectoryEntry`]. Ordering is left to the listing module; entries come
//! out in filesystem enumeration order.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use protocol::listing::{FileItem, FolderItem, ItemDto};
use thiserror::Error;
use tracing::debug;

use super::classify::{self, FileKinds};
use super::resolver::{LibraryRoot, ResolveError};

/// Maximum number of preview images collected per folder.
pub const MAX_PREVIEW_IMAGES: usize = 4;

/// Errors that can occur during directory browsing.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The requested path does not exist or could not be stat'ed.
    #[error("path not found: {path}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested path is not a directory.
    #[error("path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A path could not be mapped back inside the root.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// IO error while enumerating.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file inside a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Root-anchored path.
    pub relative_path: String,
    /// Absolute path. Never leaves the server.
    pub absolute_path: PathBuf,
    /// Extension-derived category flags.
    pub kinds: FileKinds,
    /// Last modified timestamp.
    pub modified: SystemTime,
}

/// A folder inside a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Root-anchored path.
    pub relative_path: String,
    /// Absolute path. Never leaves the server.
    pub absolute_path: PathBuf,
    /// Root-anchored paths of up to four images directly inside the folder.
    pub preview_images: Vec<String>,
    /// Last modified timestamp.
    pub modified: SystemTime,
}

/// A directory child: either a file or a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEntry {
    File(FileEntry),
    Folder(FolderEntry),
}

impl DirectoryEntry {
    /// Entry name.
    pub fn name(&self) -> &str {
        match self {
            DirectoryEntry::File(f) => &f.name,
            DirectoryEntry::Folder(f) => &f.name,
        }
    }

    /// Last modified timestamp.
    pub fn modified(&self) -> SystemTime {
        match self {
            DirectoryEntry::File(f) => f.modified,
            DirectoryEntry::Folder(f) => f.modified,
        }
    }

    /// Root-anchored path.
    pub fn relative_path(&self) -> &str {
        match self {
            DirectoryEntry::File(f) => &f.relative_path,
            DirectoryEntry::Folder(f) => &f.relative_path,
        }
    }

    /// Whether this entry is a folder.
    pub fn is_folder(&self) -> bool {
        matches!(self, DirectoryEntry::Folder(_))
    }

    /// Convert to the wire representation, dropping the absolute path.
    pub fn to_protocol(&self) -> ItemDto {
        match self {
            DirectoryEntry::File(f) => ItemDto::File(FileItem {
                name: f.name.clone(),
                path: f.relative_path.clone(),
                is_image: f.kinds.is_image,
                is_video: f.kinds.is_video,
                is_audio: f.kinds.is_audio,
                is_zip: f.kinds.is_zip,
                modified_date: DateTime::<Utc>::from(f.modified),
            }),
            DirectoryEntry::Folder(f) => ItemDto::Folder(FolderItem {
                name: f.name.clone(),
                path: f.relative_path.clone(),
                preview_images: f.preview_images.clone(),
                modified_date: DateTime::<Utc>::from(f.modified),
            }),
        }
    }
}

/// Reads directories under a library root.
pub struct DirectoryLister<'a> {
    root: &'a LibraryRoot,
}

impl<'a> DirectoryLister<'a> {
    /// Create a lister for the given root.
    pub fn new(root: &'a LibraryRoot) -> Self {
        Self { root }
    }

    /// List the direct children of `dir`, unsorted.
    ///
    /// `dir` must already be resolved inside the root. Children whose
    /// metadata cannot be read are skipped.
    pub fn list(&self, dir: &Path) -> Result<Vec<DirectoryEntry>, BrowserError> {
        let metadata = fs::metadata(dir).map_err(|source| BrowserError::NotFound {
            path: dir.to_path_buf(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(BrowserError::NotADirectory(dir.to_path_buf()));
        }

        let mut results = Vec::new();

        for entry_result in fs::read_dir(dir)? {
            let entry = match entry_result {
                Ok(e) => e,
                Err(e) => {
                    debug!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().to_string();
            let absolute_path = entry.path();

            // Follows symlinks, so a link to a directory lists as a folder.
            let metadata = match fs::metadata(&absolute_path) {
                Ok(m) => m,
                Err(e) => {
                    debug!(path = %absolute_path.display(), error = %e, "Skipping entry without metadata");
                    continue;
                }
            };

            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let relative_path = self.root.to_relative(&absolute_path)?;

            if metadata.is_dir() {
                let preview_images = self.preview_images(&absolute_path);
                results.push(DirectoryEntry::Folder(FolderEntry {
                    name,
                    relative_path,
                    absolute_path,
                    preview_images,
                    modified,
                }));
            } else {
                results.push(DirectoryEntry::File(FileEntry {
                    kinds: classify::file_kinds(&name),
                    name,
                    relative_path,
                    absolute_path,
                    modified,
                }));
            }
        }

        Ok(results)
    }

    /// Up to [`MAX_PREVIEW_IMAGES`] image files directly inside `folder`, in
    /// enumeration order. Any error yields an empty list.
    fn preview_images(&self, folder: &Path) -> Vec<String> {
        let Ok(entries) = fs::read_dir(folder) else {
            return Vec::new();
        };

        entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|entry| classify::is_image(&entry.file_name().to_string_lossy()))
            .take(MAX_PREVIEW_IMAGES)
            .filter_map(|entry| self.root.to_relative(&entry.path()).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_structure(dir: &Path) {
        fs::create_dir_all(dir.join("gallery")).unwrap();
        fs::create_dir_all(dir.join("empty")).unwrap();
        fs::create_dir_all(dir.join("gallery/nested")).unwrap();

        fs::write(dir.join("PHOTO.JPG"), "img").unwrap();
        fs::write(dir.join("archive.ZIP"), "zip").unwrap();
        fs::write(dir.join("song.mp3"), "mp3").unwrap();
        fs::write(dir.join("movie.mkv"), "mkv").unwrap();
        fs::write(dir.join("notes.txt"), "txt").unwrap();

        for i in 0..6 {
            fs::write(dir.join(format!("gallery/{i}.png")), "png").unwrap();
        }
        fs::write(dir.join("gallery/readme.md"), "md").unwrap();
    }

    fn setup() -> (TempDir, LibraryRoot) {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let root = LibraryRoot::new(temp_dir.path()).unwrap();
        (temp_dir, root)
    }

    fn find<'e>(entries: &'e [DirectoryEntry], name: &str) -> &'e DirectoryEntry {
        entries.iter().find(|e| e.name() == name).unwrap()
    }

    #[test]
    fn test_list_directory() {
        let (_temp_dir, root) = setup();
        let entries = DirectoryLister::new(&root).list(root.path()).unwrap();

        assert_eq!(entries.len(), 7);
        assert_eq!(entries.iter().filter(|e| e.is_folder()).count(), 2);
    }

    #[test]
    fn test_file_classification() {
        let (_temp_dir, root) = setup();
        let entries = DirectoryLister::new(&root).list(root.path()).unwrap();

        let DirectoryEntry::File(photo) = find(&entries, "PHOTO.JPG") else {
            panic!("PHOTO.JPG should be a file");
        };
        assert!(photo.kinds.is_image);
        assert!(!photo.kinds.is_video && !photo.kinds.is_audio && !photo.kinds.is_zip);
        assert_eq!(photo.relative_path, "/PHOTO.JPG");
        assert_eq!(photo.absolute_path, root.path().join("PHOTO.JPG"));

        let DirectoryEntry::File(zip) = find(&entries, "archive.ZIP") else {
            panic!("archive.ZIP should be a file");
        };
        assert!(zip.kinds.is_zip);

        let DirectoryEntry::File(notes) = find(&entries, "notes.txt") else {
            panic!("notes.txt should be a file");
        };
        assert_eq!(notes.kinds, FileKinds::default());
    }

    #[test]
    fn test_folder_previews() {
        let (_temp_dir, root) = setup();
        let entries = DirectoryLister::new(&root).list(root.path()).unwrap();

        let DirectoryEntry::Folder(gallery) = find(&entries, "gallery") else {
            panic!("gallery should be a folder");
        };
        assert_eq!(gallery.preview_images.len(), MAX_PREVIEW_IMAGES);
        for preview in &gallery.preview_images {
            assert!(preview.starts_with("/gallery/"));
            assert!(preview.ends_with(".png"));
        }

        let DirectoryEntry::Folder(empty) = find(&entries, "empty") else {
            panic!("empty should be a folder");
        };
        assert!(empty.preview_images.is_empty());
    }

    #[test]
    fn test_previews_skip_image_named_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("album/cover.jpg")).unwrap();
        let root = LibraryRoot::new(temp_dir.path()).unwrap();

        let entries = DirectoryLister::new(&root).list(root.path()).unwrap();
        let DirectoryEntry::Folder(album) = find(&entries, "album") else {
            panic!("album should be a folder");
        };
        assert!(album.preview_images.is_empty());
    }

    #[test]
    fn test_nested_listing_paths() {
        let (_temp_dir, root) = setup();
        let gallery = root.path().join("gallery");
        let entries = DirectoryLister::new(&root).list(&gallery).unwrap();

        let nested = find(&entries, "nested");
        assert!(nested.is_folder());
        assert_eq!(nested.relative_path(), "/gallery/nested");
    }

    #[test]
    fn test_not_a_directory() {
        let (_temp_dir, root) = setup();
        let result = DirectoryLister::new(&root).list(&root.path().join("notes.txt"));
        assert!(matches!(result, Err(BrowserError::NotADirectory(_))));
    }

    #[test]
    fn test_not_found() {
        let (_temp_dir, root) = setup();
        let result = DirectoryLister::new(&root).list(&root.path().join("missing"));
        assert!(matches!(result, Err(BrowserError::NotFound { .. })));
    }

    #[test]
    fn test_hidden_entries_listed() {
        let (temp_dir, root) = setup();
        fs::write(temp_dir.path().join(".hidden"), "x").unwrap();

        let entries = DirectoryLister::new(&root).list(root.path()).unwrap();
        assert!(entries.iter().any(|e| e.name() == ".hidden"));
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_skipped() {
        let (temp_dir, root) = setup();
        std::os::unix::fs::symlink(
            temp_dir.path().join("does-not-exist"),
            temp_dir.path().join("dangling"),
        )
        .unwrap();

        let entries = DirectoryLister::new(&root).list(root.path()).unwrap();
        assert!(entries.iter().all(|e| e.name() != "dangling"));
        assert_eq!(entries.len(), 7);
    }

    #[test]
    fn test_entry_to_protocol() {
        let entry = DirectoryEntry::File(FileEntry {
            name: "clip.mp4".to_string(),
            relative_path: "/videos/clip.mp4".to_string(),
            absolute_path: PathBuf::from("/srv/videos/clip.mp4"),
            kinds: classify::file_kinds("clip.mp4"),
            modified: SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_704_067_200),
        });

        let ItemDto::File(item) = entry.to_protocol() else {
            panic!("expected a file item");
        };
        assert_eq!(item.path, "/videos/clip.mp4");
        assert!(item.is_video);
        assert_eq!(item.modified_date.timestamp(), 1_704_067_200);

        let json = serde_json::to_string(&entry.to_protocol()).unwrap();
        assert!(!json.contains("/srv"));
    }
}
