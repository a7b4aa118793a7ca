//! # Shelfview Server Library
//!
//! Core of the shelfview file browser: a read-mostly HTTP service that lists
//! and streams files below a single configured root directory.
//!
//! ## Overview
//!
//! - **Path resolution**: every client path is root-anchored and checked for
//!   containment before it reaches the filesystem
//! - **Listing**: classified directory entries, sorted and paginated
//! - **Streaming**: media and downloads with single-range `Range` support
//! - **Extras**: image thumbnails and ZIP extraction next to the archive
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Server (orchestrator)                  │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │                 Router (axum)                       │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │  ┌────────────┐ ┌────────────┐ ┌───────────┐ ┌────────┐  │
//! │  │  Listing   │ │  Streamer  │ │ Thumbnail │ │Archive │  │
//! │  └────────────┘ └────────────┘ └───────────┘ └────────┘  │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │          LibraryRoot (path resolution)             │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use server::{Config, Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::load_default()?;
//!     config.apply_env_overrides();
//!     config.validate()?;
//!
//!     let server = Server::new(config)?;
//!     let token = server.shutdown_token();
//!     tokio::spawn(async move {
//!         server::orchestrator::wait_for_shutdown_signal().await;
//!         token.cancel();
//!     });
//!     server.run().await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`files`]: Path resolution, listing, streaming, thumbnails, archives
//! - [`router`]: HTTP routes and error mapping
//! - [`orchestrator`]: Bind, serve and shut down

pub mod config;
pub mod files;
pub mod orchestrator;
pub mod router;

// Re-export protocol for convenience
pub use protocol;

// Re-export config types for convenience
pub use config::Config;

// Re-export files types for convenience
pub use files::{
    DirectoryEntry, DirectoryListing, FileStreamer, LibraryRoot, ListingRequest, NameCollator,
};

// Re-export router types for convenience
pub use router::{build_router, ApiError, AppState};

// Re-export orchestrator types for convenience
pub use orchestrator::Server;
