//! File streaming with byte-range support.
//!
//! A file is opened once, validated against an endpoint's allow-list and then
//! streamed in bounded chunks. Only the requested range is ever read.

use std::io::SeekFrom;
use std::path::PathBuf;

use protocol::range::RangePlan;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::classify::AllowList;
use super::resolver::{LibraryRoot, ResolveError};

/// Chunk size of streamed bodies (64KB).
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Errors that can occur while opening or streaming a file.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The requested path resolves outside the root.
    #[error("access denied: {0}")]
    AccessDenied(#[from] ResolveError),

    /// The requested file does not exist or cannot be stat'ed.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// The requested path is not a regular file.
    #[error("not a file: {0}")]
    NotAFile(PathBuf),

    /// The extension is not accepted by the endpoint.
    #[error("extension not allowed by {endpoint} endpoint: {path}")]
    UnsupportedExtension {
        endpoint: &'static str,
        path: PathBuf,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Body stream of a planned response.
pub type FileStream = ReaderStream<Take<File>>;

/// A validated, open file ready to be streamed.
#[derive(Debug)]
pub struct OpenFile {
    file: File,
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Final path component.
    pub name: String,
    /// Size in bytes at open time.
    pub size: u64,
    /// Content type from the endpoint's allow-list.
    pub content_type: &'static str,
}

impl OpenFile {
    /// Plan a response for an optional `Range` header value.
    pub fn plan(&self, range_header: Option<&str>) -> RangePlan {
        RangePlan::from_header(self.size, range_header)
    }

    /// Seek to the start of the plan and stream exactly its bytes.
    pub async fn stream(mut self, plan: &RangePlan) -> Result<FileStream, TransferError> {
        let offset = plan.offset();
        if offset > 0 {
            self.file.seek(SeekFrom::Start(offset)).await?;
        }

        debug!(
            path = %self.path.display(),
            offset,
            length = plan.content_length(),
            partial = plan.is_partial(),
            "Streaming file"
        );

        let limited = self.file.take(plan.content_length());
        Ok(ReaderStream::with_capacity(limited, STREAM_CHUNK_SIZE))
    }

    /// Read the whole file into memory.
    ///
    /// Only used for images that are about to be re-encoded.
    pub async fn read_all(mut self) -> Result<Vec<u8>, TransferError> {
        let mut buf = Vec::with_capacity(usize::try_from(self.size).unwrap_or(0));
        self.file.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

/// Opens files under a library root for streaming.
pub struct FileStreamer<'a> {
    root: &'a LibraryRoot,
}

impl<'a> FileStreamer<'a> {
    /// Create a streamer over a root.
    pub fn new(root: &'a LibraryRoot) -> Self {
        Self { root }
    }

    /// Validate and open a file.
    ///
    /// Checks, in order: containment, existence, regular file, allow-list.
    pub async fn open(
        &self,
        requested: &str,
        allow_list: &AllowList,
    ) -> Result<OpenFile, TransferError> {
        let path = self.root.resolve(Some(requested))?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|_| TransferError::NotFound(path.clone()))?;

        if !metadata.is_file() {
            return Err(TransferError::NotAFile(path));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(content_type) = allow_list.content_type(&name) else {
            return Err(TransferError::UnsupportedExtension {
                endpoint: allow_list.name,
                path,
            });
        };

        let file = File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TransferError::NotFound(path.clone())
            } else {
                TransferError::Io(e)
            }
        })?;

        Ok(OpenFile {
            file,
            path,
            name,
            size: metadata.len(),
            content_type,
        })
    }
}
