//! Extension-based file classification and per-endpoint allow-lists.
//!
//! All knowledge about extensions lives in the tables below. Adding a
//! category or a format means adding a row, not a branch.

/// Media category a file belongs to, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Zip,
}

/// Lowercase extensions per category. The sets are disjoint.
const KIND_TABLE: &[(MediaKind, &[&str])] = &[
    (MediaKind::Image, &["jpg", "jpeg", "png", "gif", "webp", "svg"]),
    (MediaKind::Video, &["mp4", "webm", "mov", "avi", "mkv"]),
    (MediaKind::Audio, &["mp3", "wav", "ogg", "aac", "flac", "m4a"]),
    (MediaKind::Zip, &["zip"]),
];

/// Classification flags of a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileKinds {
    pub is_image: bool,
    pub is_video: bool,
    pub is_audio: bool,
    pub is_zip: bool,
}

impl From<Option<MediaKind>> for FileKinds {
    fn from(kind: Option<MediaKind>) -> Self {
        Self {
            is_image: kind == Some(MediaKind::Image),
            is_video: kind == Some(MediaKind::Video),
            is_audio: kind == Some(MediaKind::Audio),
            is_zip: kind == Some(MediaKind::Zip),
        }
    }
}

/// Lowercased substring after the last dot, or `None` if there is no dot.
///
/// A name that is only a dot and an extension (`.jpg`) still has one.
pub fn extension(name: &str) -> Option<String> {
    let dot = name.rfind('.')?;
    Some(name[dot + 1..].to_lowercase())
}

/// Like [`extension`], but a leading dot marks a hidden file, not an
/// extension (`.bashrc` has none). Used for ordering by type.
pub fn sort_extension(name: &str) -> Option<String> {
    match name.rfind('.') {
        Some(0) | None => None,
        Some(dot) => Some(name[dot + 1..].to_lowercase()),
    }
}

/// Category of a file name, if any.
pub fn classify(name: &str) -> Option<MediaKind> {
    let ext = extension(name)?;
    KIND_TABLE
        .iter()
        .find(|(_, exts)| exts.contains(&ext.as_str()))
        .map(|(kind, _)| *kind)
}

/// Classification flags of a file name.
pub fn file_kinds(name: &str) -> FileKinds {
    classify(name).into()
}

/// Whether a file name is an image.
pub fn is_image(name: &str) -> bool {
    classify(name) == Some(MediaKind::Image)
}

/// Extensions an endpoint accepts, with the content type each is served as.
#[derive(Debug, Clone, Copy)]
pub struct AllowList {
    /// Endpoint name, for logging.
    pub name: &'static str,
    entries: &'static [(&'static str, &'static str)],
    /// Content type for extensions not in `entries`. `None` rejects them.
    fallback: Option<&'static str>,
}

impl AllowList {
    /// Images served inline by the image endpoint.
    pub const IMAGE: AllowList = AllowList {
        name: "image",
        entries: &[
            ("jpg", "image/jpeg"),
            ("jpeg", "image/jpeg"),
            ("png", "image/png"),
            ("gif", "image/gif"),
            ("webp", "image/webp"),
            ("svg", "image/svg+xml"),
        ],
        fallback: None,
    };

    /// Audio served inline by the audio endpoint.
    pub const AUDIO: AllowList = AllowList {
        name: "audio",
        entries: &[
            ("mp3", "audio/mpeg"),
            ("wav", "audio/wav"),
            ("aac", "audio/aac"),
            ("flac", "audio/flac"),
            ("m4a", "audio/mp4"),
            ("ogg", "audio/ogg"),
        ],
        fallback: None,
    };

    /// Video served inline by the video endpoint. Ogg containers are
    /// accepted here too, even though listings classify them as audio.
    pub const VIDEO: AllowList = AllowList {
        name: "video",
        entries: &[
            ("mp4", "video/mp4"),
            ("webm", "video/webm"),
            ("ogg", "video/ogg"),
            ("mov", "video/quicktime"),
            ("avi", "video/x-msvideo"),
            ("mkv", "video/x-matroska"),
        ],
        fallback: None,
    };

    /// Generic downloads. Every extension is accepted.
    pub const DOWNLOAD: AllowList = AllowList {
        name: "file",
        entries: &[
            ("txt", "text/plain"),
            ("pdf", "application/pdf"),
            ("doc", "application/msword"),
            (
                "docx",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ),
            ("xls", "application/vnd.ms-excel"),
            (
                "xlsx",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            ("zip", "application/zip"),
            ("rar", "application/x-rar-compressed"),
            ("7z", "application/x-7z-compressed"),
            ("json", "application/json"),
            ("xml", "application/xml"),
            ("csv", "text/csv"),
        ],
        fallback: Some("application/octet-stream"),
    };

    /// Content type for a file name, or `None` if the endpoint rejects it.
    pub fn content_type(&self, name: &str) -> Option<&'static str> {
        let ext = extension(name);
        ext.as_deref()
            .and_then(|ext| {
                self.entries
                    .iter()
                    .find(|(e, _)| *e == ext)
                    .map(|(_, content_type)| *content_type)
            })
            .or(self.fallback)
    }
}
