//! Library filesystem access: path resolution, listing and streaming.
//!
//! # Security
//!
//! Every client-supplied path goes through [`LibraryRoot::resolve`] before
//! it touches the filesystem. Paths that normalize to a location outside the
//! root are rejected and logged.

pub mod archive;
pub mod browser;
pub mod classify;
pub mod collate;
pub mod listing;
pub mod resolver;
pub mod thumbnail;
pub mod transfer;

pub use archive::{extract_zip, ArchiveError, Extracted};
pub use browser::{BrowserError, DirectoryEntry, DirectoryLister, FileEntry, FolderEntry};
pub use classify::{AllowList, FileKinds, MediaKind};
pub use collate::{CollateError, NameCollator};
pub use listing::{
    paginate, sort_entries, DirectoryListing, ListingError, ListingPage, ListingRequest, Page,
};
pub use resolver::{LibraryRoot, Location, ResolveError};
pub use transfer::{FileStreamer, OpenFile, TransferError};
