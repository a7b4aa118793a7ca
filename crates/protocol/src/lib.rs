//! # Shelfview Protocol Library
//!
//! This crate provides the wire types and pure protocol logic shared by the
//! Shelfview server and its tests.
//!
//! ## Overview
//!
//! - **Listing Types**: JSON shapes of the directory listing endpoint, sort keys
//!   and directions
//! - **Error Codes**: the closed set of failures a client can observe, with
//!   their HTTP status mapping
//! - **Range Planning**: `Range` header parsing and the full/partial response
//!   decision used for media streaming
//!
//! Nothing in this crate touches the filesystem.
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::range::RangePlan;
//!
//! let plan = RangePlan::from_header(1000, Some("bytes=-100"));
//! assert_eq!(plan.status(), 206);
//! assert_eq!(plan.content_range().as_deref(), Some("bytes 900-999/1000"));
//! ```
//!
//! ## Modules
//!
//! - [`listing`]: Listing query/response types
//! - [`range`]: Range header parser and response planner
//! - [`error`]: Error types and codes

pub mod error;
pub mod listing;
pub mod range;

pub use error::{ErrorBody, ErrorCode, ProtocolError, Result};
pub use listing::{
    ExtractResponse, FileItem, FolderItem, ItemDto, ListingQuery, ListingResponse, SortBy,
    SortOrder, DEFAULT_PAGE_SIZE,
};
pub use range::{parse_range_header, ByteRange, RangePlan};
