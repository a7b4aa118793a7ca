//! Directory listing wire types.
//!
//! These are the JSON shapes exchanged with the browser client. They carry
//! root-anchored relative paths only; absolute filesystem paths never cross
//! this boundary.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Listing sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Locale-aware comparison of entry names.
    #[default]
    Name,
    /// Folders first, then files by extension and name.
    Type,
    /// Modification time. Also accepted as `modified`.
    #[serde(alias = "modified")]
    Date,
}

impl SortBy {
    /// Wire name of this key.
    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::Name => "name",
            SortBy::Type => "type",
            SortBy::Date => "date",
        }
    }
}

impl FromStr for SortBy {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(SortBy::Name),
            "type" => Ok(SortBy::Type),
            "date" | "modified" => Ok(SortBy::Date),
            _ => Err(ProtocolError::InvalidSortBy(s.to_string())),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    /// Wire name of this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(ProtocolError::InvalidSortOrder(s.to_string())),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query string of the listing endpoint.
///
/// Sort parameters are kept as raw strings so that an unknown value can be
/// reported as an invalid parameter rather than a generic decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingQuery {
    /// Root-anchored directory path. Absent means the root.
    pub path: Option<String>,
    /// Index of the first item to return.
    pub offset: Option<usize>,
    /// Maximum number of items to return.
    pub limit: Option<usize>,
    /// Sort key (`name`, `type`, `date`, `modified`).
    pub sort_by: Option<String>,
    /// Sort direction (`asc`, `desc`).
    pub sort_order: Option<String>,
}

impl ListingQuery {
    /// Parse the sort key, defaulting to [`SortBy::Name`].
    pub fn sort_by(&self) -> Result<SortBy, ProtocolError> {
        self.sort_by
            .as_deref()
            .filter(|s| !s.is_empty())
            .map_or(Ok(SortBy::default()), str::parse)
    }

    /// Parse the sort direction, defaulting to [`SortOrder::Asc`].
    pub fn sort_order(&self) -> Result<SortOrder, ProtocolError> {
        self.sort_order
            .as_deref()
            .filter(|s| !s.is_empty())
            .map_or(Ok(SortOrder::default()), str::parse)
    }
}

/// A file in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    /// Entry name.
    pub name: String,
    /// Root-anchored path.
    pub path: String,
    pub is_image: bool,
    pub is_video: bool,
    pub is_audio: bool,
    pub is_zip: bool,
    /// Last modification time.
    pub modified_date: DateTime<Utc>,
}

/// A folder in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderItem {
    /// Entry name.
    pub name: String,
    /// Root-anchored path.
    pub path: String,
    /// Up to four root-anchored image paths found directly inside the folder.
    pub preview_images: Vec<String>,
    /// Last modification time.
    pub modified_date: DateTime<Utc>,
}

/// One listing item, tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemDto {
    File(FileItem),
    Folder(FolderItem),
}

impl ItemDto {
    /// Entry name.
    pub fn name(&self) -> &str {
        match self {
            ItemDto::File(f) => &f.name,
            ItemDto::Folder(f) => &f.name,
        }
    }

    /// Root-anchored path.
    pub fn path(&self) -> &str {
        match self {
            ItemDto::File(f) => &f.path,
            ItemDto::Folder(f) => &f.path,
        }
    }

    /// Whether this item is a folder.
    pub fn is_folder(&self) -> bool {
        matches!(self, ItemDto::Folder(_))
    }
}

/// One page of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    /// Root-anchored path of the listed directory.
    pub current_path: String,
    /// Root-anchored path of its parent (equal to `current_path` at the root).
    pub parent_path: String,
    /// Whether navigating to the parent stays inside the root.
    pub can_go_up: bool,
    /// Items of this page, in sort order.
    pub items: Vec<ItemDto>,
    /// Whether more items follow this page.
    pub has_more: bool,
    /// Total number of items in the directory.
    pub total: usize,
    /// Offset this page starts at.
    pub offset: usize,
    /// Page size that was applied.
    pub limit: usize,
    /// Sort key that was applied.
    pub sort_by: SortBy,
    /// Sort direction that was applied.
    pub sort_order: SortOrder,
}

/// Result of a ZIP extraction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub success: bool,
    pub message: String,
    /// Root-anchored path of the directory the archive was extracted into.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_to: Option<String>,
}
