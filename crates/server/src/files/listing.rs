//! Directory listing pipeline: resolve, read, sort, paginate.
//!
//! Everything is recomputed from the live filesystem on each call. There is
//! no cache; two identical requests read the directory twice.

use std::cmp::Ordering;

use protocol::listing::{ListingResponse, SortBy, SortOrder};
use thiserror::Error;
use tracing::debug;

use super::browser::{BrowserError, DirectoryEntry, DirectoryLister};
use super::classify;
use super::collate::NameCollator;
use super::resolver::{LibraryRoot, Location, ResolveError};

/// Errors that can occur while producing a listing.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The path resolves outside the root.
    #[error("access denied: {0}")]
    AccessDenied(#[source] ResolveError),

    /// The directory is missing, unreadable or not a directory.
    #[error("directory not found: {0}")]
    NotFound(#[source] BrowserError),
}

impl From<ResolveError> for ListingError {
    fn from(err: ResolveError) -> Self {
        ListingError::AccessDenied(err)
    }
}

impl From<BrowserError> for ListingError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::Resolve(e) => ListingError::AccessDenied(e),
            other => ListingError::NotFound(other),
        }
    }
}

/// Sort entries in place.
///
/// - `Name`: locale-aware comparison of whole names.
/// - `Type`: folders before files in either direction; files by lowercased
///   extension, then name; folders by name. `Desc` reverses only within
///   each group.
/// - `Date`: modification time.
///
/// The sort is stable. Entries that compare equal keep folders ahead of
/// files and otherwise stay in enumeration order.
pub fn sort_entries(
    entries: &mut [DirectoryEntry],
    sort_by: SortBy,
    sort_order: SortOrder,
    collator: &NameCollator,
) {
    // Folders first as the tie-breaking base order.
    entries.sort_by_key(|e| !e.is_folder());

    let directed = |ordering: Ordering| match sort_order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    };

    match sort_by {
        SortBy::Name => {
            entries.sort_by(|a, b| directed(collator.compare(a.name(), b.name())));
        }
        SortBy::Date => {
            entries.sort_by(|a, b| directed(a.modified().cmp(&b.modified())));
        }
        SortBy::Type => {
            entries.sort_by(|a, b| match (a, b) {
                (DirectoryEntry::Folder(_), DirectoryEntry::File(_)) => Ordering::Less,
                (DirectoryEntry::File(_), DirectoryEntry::Folder(_)) => Ordering::Greater,
                (DirectoryEntry::Folder(x), DirectoryEntry::Folder(y)) => {
                    directed(collator.compare(&x.name, &y.name))
                }
                (DirectoryEntry::File(x), DirectoryEntry::File(y)) => {
                    let ext_x = type_key(&x.name);
                    let ext_y = type_key(&y.name);
                    directed(
                        collator
                            .compare(&ext_x, &ext_y)
                            .then_with(|| collator.compare(&x.name, &y.name)),
                    )
                }
            });
        }
    }
}

/// Extension used by the type sort: lowercased, including the dot, empty if
/// there is none.
fn type_key(name: &str) -> String {
    classify::sort_extension(name)
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

/// A slice of a sorted sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items in `[offset, offset + limit)`.
    pub items: Vec<T>,
    /// Length of the full sequence.
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    /// `offset + limit < total`.
    pub has_more: bool,
}

/// Slice `[offset, offset + limit)` out of a sorted sequence.
///
/// An offset past the end gives an empty page, never an error.
pub fn paginate<T>(sorted: Vec<T>, offset: usize, limit: usize) -> Page<T> {
    let total = sorted.len();
    let end = offset.saturating_add(limit);
    let has_more = end < total;

    let items = sorted
        .into_iter()
        .skip(offset)
        .take(limit)
        .collect();

    Page {
        items,
        total,
        offset,
        limit,
        has_more,
    }
}

/// Parameters of one listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingRequest {
    /// Root-anchored path; `None` is the root.
    pub path: Option<String>,
    pub offset: usize,
    pub limit: usize,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

/// One sorted, paginated view of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub location: Location,
    pub page: Page<DirectoryEntry>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl ListingPage {
    /// Convert to the wire representation.
    pub fn to_protocol(&self) -> ListingResponse {
        ListingResponse {
            current_path: self.location.current.clone(),
            parent_path: self.location.parent.clone(),
            can_go_up: self.location.can_go_up,
            items: self.page.items.iter().map(DirectoryEntry::to_protocol).collect(),
            has_more: self.page.has_more,
            total: self.page.total,
            offset: self.page.offset,
            limit: self.page.limit,
            sort_by: self.sort_by,
            sort_order: self.sort_order,
        }
    }
}

/// The listing service.
pub struct DirectoryListing<'a> {
    root: &'a LibraryRoot,
    collator: &'a NameCollator,
}

impl<'a> DirectoryListing<'a> {
    /// Create a listing service over a root, ordering names with `collator`.
    pub fn new(root: &'a LibraryRoot, collator: &'a NameCollator) -> Self {
        Self { root, collator }
    }

    /// Resolve, read, sort and paginate one directory.
    pub fn page(&self, request: &ListingRequest) -> Result<ListingPage, ListingError> {
        let dir = self.root.resolve(request.path.as_deref())?;
        let mut entries = DirectoryLister::new(self.root).list(&dir)?;

        debug!(
            dir = %dir.display(),
            count = entries.len(),
            sort_by = %request.sort_by,
            sort_order = %request.sort_order,
            "Listed directory"
        );

        sort_entries(&mut entries, request.sort_by, request.sort_order, self.collator);
        let location = self.root.location(&dir)?;

        Ok(ListingPage {
            location,
            page: paginate(entries, request.offset, request.limit),
            sort_by: request.sort_by,
            sort_order: request.sort_order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    use crate::files::browser::{FileEntry, FolderEntry};
    use crate::files::classify::file_kinds;
    use tempfile::TempDir;

    fn collator() -> NameCollator {
        NameCollator::new("ja").unwrap()
    }

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn file(name: &str, modified: u64) -> DirectoryEntry {
        DirectoryEntry::File(FileEntry {
            name: name.to_string(),
            relative_path: format!("/{name}"),
            absolute_path: PathBuf::from("/root").join(name),
            kinds: file_kinds(name),
            modified: at(modified),
        })
    }

    fn folder(name: &str, modified: u64) -> DirectoryEntry {
        DirectoryEntry::Folder(FolderEntry {
            name: name.to_string(),
            relative_path: format!("/{name}"),
            absolute_path: PathBuf::from("/root").join(name),
            preview_images: Vec::new(),
            modified: at(modified),
        })
    }

    fn mixed() -> Vec<DirectoryEntry> {
        vec![
            file("b.txt", 30),
            folder("zeta", 10),
            file("a.mp3", 50),
            folder("alpha", 40),
            file("c.jpg", 20),
            file("README", 60),
        ]
    }

    fn names(entries: &[DirectoryEntry]) -> Vec<&str> {
        entries.iter().map(DirectoryEntry::name).collect()
    }

    #[test]
    fn test_sort_by_name_mixes_folders_and_files() {
        let mut entries = mixed();
        sort_entries(&mut entries, SortBy::Name, SortOrder::Asc, &collator());
        assert_eq!(
            names(&entries),
            vec!["a.mp3", "alpha", "b.txt", "c.jpg", "README", "zeta"]
        );

        sort_entries(&mut entries, SortBy::Name, SortOrder::Desc, &collator());
        assert_eq!(
            names(&entries),
            vec!["zeta", "README", "c.jpg", "b.txt", "alpha", "a.mp3"]
        );
    }

    #[test]
    fn test_name_sort_is_not_natural() {
        let mut entries = vec![file("file10.txt", 0), file("file2.txt", 0), file("file1.txt", 0)];
        sort_entries(&mut entries, SortBy::Name, SortOrder::Asc, &collator());
        assert_eq!(names(&entries), vec!["file1.txt", "file10.txt", "file2.txt"]);
    }

    #[test]
    fn test_sort_by_date() {
        let mut entries = mixed();
        sort_entries(&mut entries, SortBy::Date, SortOrder::Asc, &collator());
        assert_eq!(
            names(&entries),
            vec!["zeta", "c.jpg", "b.txt", "alpha", "a.mp3", "README"]
        );

        sort_entries(&mut entries, SortBy::Date, SortOrder::Desc, &collator());
        assert_eq!(
            names(&entries),
            vec!["README", "a.mp3", "alpha", "b.txt", "c.jpg", "zeta"]
        );
    }

    #[test]
    fn test_sort_by_type() {
        let mut entries = mixed();
        sort_entries(&mut entries, SortBy::Type, SortOrder::Asc, &collator());
        // No extension sorts first among files.
        assert_eq!(
            names(&entries),
            vec!["alpha", "zeta", "README", "c.jpg", "a.mp3", "b.txt"]
        );
    }

    #[test]
    fn test_sort_by_type_desc_keeps_folders_first() {
        let mut entries = mixed();
        sort_entries(&mut entries, SortBy::Type, SortOrder::Desc, &collator());
        assert_eq!(
            names(&entries),
            vec!["zeta", "alpha", "b.txt", "a.mp3", "c.jpg", "README"]
        );
    }

    #[test]
    fn test_type_sort_folders_always_first() {
        let mut entries: Vec<DirectoryEntry> = (0..20)
            .map(|i| {
                if i % 3 == 0 {
                    folder(&format!("dir{i}"), i)
                } else {
                    file(&format!("file{i}.{}", ["txt", "png", "mp4"][i as usize % 3]), i)
                }
            })
            .collect();

        for order in [SortOrder::Asc, SortOrder::Desc] {
            sort_entries(&mut entries, SortBy::Type, order, &collator());
            let first_file = entries.iter().position(|e| !e.is_folder()).unwrap();
            assert!(entries[first_file..].iter().all(|e| !e.is_folder()));
            assert!(entries[..first_file].iter().all(DirectoryEntry::is_folder));
        }
    }

    #[test]
    fn test_type_sort_same_extension_by_name() {
        let mut entries = vec![file("b.PNG", 0), file("a.png", 0), file("c.jpg", 0)];
        sort_entries(&mut entries, SortBy::Type, SortOrder::Asc, &collator());
        assert_eq!(names(&entries), vec!["c.jpg", "a.png", "b.PNG"]);
    }

    #[test]
    fn test_equal_keys_keep_folders_first() {
        let mut entries = vec![file("x", 5), folder("y", 5)];
        sort_entries(&mut entries, SortBy::Date, SortOrder::Asc, &collator());
        assert_eq!(names(&entries), vec!["y", "x"]);
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (0..10).collect();

        let page = paginate(items.clone(), 0, 4);
        assert_eq!(page.items, vec![0, 1, 2, 3]);
        assert!(page.has_more);
        assert_eq!(page.total, 10);

        let page = paginate(items.clone(), 8, 4);
        assert_eq!(page.items, vec![8, 9]);
        assert!(!page.has_more);

        let page = paginate(items.clone(), 6, 4);
        assert_eq!(page.items, vec![6, 7, 8, 9]);
        assert!(!page.has_more);
    }

    #[test]
    fn test_paginate_out_of_range() {
        let page = paginate((0..3).collect::<Vec<u32>>(), 10, 5);
        assert!(page.items.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.total, 3);

        let page = paginate((0..3).collect::<Vec<u32>>(), usize::MAX, usize::MAX);
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn test_paginate_zero_limit() {
        let page = paginate((0..3).collect::<Vec<u32>>(), 0, 0);
        assert!(page.items.is_empty());
        assert!(page.has_more);
    }

    #[test]
    fn test_pages_reassemble_full_listing() {
        let mut entries = mixed();
        sort_entries(&mut entries, SortBy::Name, SortOrder::Asc, &collator());
        let expected = names(&entries).into_iter().map(String::from).collect::<Vec<_>>();

        for k in 1..=7 {
            let mut collected = Vec::new();
            let mut offset = 0;
            loop {
                let page = paginate(entries.clone(), offset, k);
                collected.extend(page.items.iter().map(|e| e.name().to_string()));
                if !page.has_more {
                    break;
                }
                offset += k;
            }
            assert_eq!(collected, expected, "page size {k}");
        }
    }

    fn library() -> (TempDir, LibraryRoot) {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("music/albums")).unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            fs::write(temp_dir.path().join(name), name).unwrap();
        }
        fs::write(temp_dir.path().join("music/track.mp3"), "mp3").unwrap();
        let root = LibraryRoot::new(temp_dir.path()).unwrap();
        (temp_dir, root)
    }

    #[test]
    fn test_service_root_page() {
        let (_temp_dir, root) = library();
        let collator = collator();
        let listing = DirectoryListing::new(&root, &collator);

        let page = listing
            .page(&ListingRequest {
                path: None,
                offset: 0,
                limit: 2,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(page.page.total, 4);
        assert_eq!(page.page.items.len(), 2);
        assert!(page.page.has_more);
        assert!(!page.location.can_go_up);
        assert_eq!(page.location.current, "/");

        let response = page.to_protocol();
        assert_eq!(response.current_path, "/");
        assert_eq!(response.items[0].name(), "a.txt");
        assert_eq!(response.limit, 2);
    }

    #[test]
    fn test_service_child_can_go_up() {
        let (_temp_dir, root) = library();
        let collator = collator();
        let listing = DirectoryListing::new(&root, &collator);

        let page = listing
            .page(&ListingRequest {
                path: Some("/music".to_string()),
                limit: 50,
                ..Default::default()
            })
            .unwrap();

        assert!(page.location.can_go_up);
        assert_eq!(page.location.parent, "/");
        assert_eq!(page.page.total, 2);
        let response = page.to_protocol();
        assert_eq!(response.items[0].path(), "/music/albums");
        assert_eq!(response.items[1].path(), "/music/track.mp3");
    }

    #[test]
    fn test_service_errors() {
        let (_temp_dir, root) = library();
        let collator = collator();
        let listing = DirectoryListing::new(&root, &collator);

        let denied = listing.page(&ListingRequest {
            path: Some("/../..".to_string()),
            limit: 10,
            ..Default::default()
        });
        assert!(matches!(denied, Err(ListingError::AccessDenied(_))));

        let missing = listing.page(&ListingRequest {
            path: Some("/nope".to_string()),
            limit: 10,
            ..Default::default()
        });
        assert!(matches!(missing, Err(ListingError::NotFound(_))));

        let not_dir = listing.page(&ListingRequest {
            path: Some("/a.txt".to_string()),
            limit: 10,
            ..Default::default()
        });
        assert!(matches!(not_dir, Err(ListingError::NotFound(_))));
    }
}
