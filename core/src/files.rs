//! Which files can be attached to an ask, and how they get uploaded.

use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

pub const TEXT_MIME_TYPES: &[&str] = &[
    "text/x-csharp",
    "text/x-java",
    "text/x-sh",
    "text/x-typescript",
    "application/pdf",
    "text/plain",
    "application/json",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/msword",
    "text/javascript",
    "text/x-c",
    "text/x-ruby",
    "text/x-c++",
    "text/x-tex",
    "text/x-php",
    "application/x-latext",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/html",
    "text/x-script.python",
    "text/markdown",
];

pub const IMAGE_MIME_TYPES: &[&str] = &["image/png", "image/webp", "image/jpeg", "image/gif"];

/// Coarse category shown next to an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum FileCategory {
    Code,
    #[strum(serialize = "PDF Document")]
    PdfDocument,
    #[strum(serialize = "Plain Text")]
    PlainText,
    #[strum(serialize = "Office Document")]
    OfficeDocument,
    Markdown,
    Image,
    Others,
}

pub fn is_accepted_mime_type(mime_type: &str) -> bool {
    TEXT_MIME_TYPES.contains(&mime_type) || IMAGE_MIME_TYPES.contains(&mime_type)
}

pub fn is_supported_image(mime_type: &str) -> bool {
    IMAGE_MIME_TYPES.contains(&mime_type)
}

pub fn file_category(mime_type: &str) -> FileCategory {
    match mime_type {
        "application/pdf" => FileCategory::PdfDocument,
        "text/plain" => FileCategory::PlainText,
        "text/markdown" => FileCategory::Markdown,
        "application/msword"
        | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        | "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
            FileCategory::OfficeDocument
        }
        _ if is_supported_image(mime_type) => FileCategory::Image,
        _ if TEXT_MIME_TYPES.contains(&mime_type) => FileCategory::Code,
        _ => FileCategory::Others,
    }
}

/// MIME type guessed from the file extension.
pub fn guess_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// The `use_case` the blob store expects for a given MIME type.
pub fn upload_use_case(mime_type: &str) -> &'static str {
    if is_supported_image(mime_type) {
        "multimodal"
    } else {
        "my_files"
    }
}

/// Server-side policy for attachments on `openai_web` conversations.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UploadStrategy {
    DisableUpload,
    #[default]
    ServerUploadOnly,
    BrowserUploadOnly,
    BrowserUploadWhenFileSizeExceed,
}

/// Where a file's bytes go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadRoute {
    /// Multipart upload to the backend, which forwards it.
    Server,
    /// Start on the backend, PUT straight to the blob store, then complete.
    Direct,
}

impl UploadStrategy {
    /// Picks the route for a file of `size` bytes, or `None` when uploads
    /// are disabled.
    pub fn route(self, size: u64, size_threshold: u64) -> Option<UploadRoute> {
        match self {
            UploadStrategy::DisableUpload => None,
            UploadStrategy::ServerUploadOnly => Some(UploadRoute::Server),
            UploadStrategy::BrowserUploadOnly => Some(UploadRoute::Direct),
            UploadStrategy::BrowserUploadWhenFileSizeExceed if size > size_threshold => {
                Some(UploadRoute::Direct)
            }
            UploadStrategy::BrowserUploadWhenFileSizeExceed => Some(UploadRoute::Server),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn categories_follow_mime_type() {
        assert_eq!(file_category("text/x-script.python"), FileCategory::Code);
        assert_eq!(file_category("application/pdf").to_string(), "PDF Document");
        assert_eq!(file_category("image/webp"), FileCategory::Image);
        assert_eq!(file_category("application/zip").to_string(), "Others");
    }

    #[test]
    fn accepts_known_types_only() {
        assert!(is_accepted_mime_type("text/markdown"));
        assert!(is_accepted_mime_type("image/gif"));
        assert!(!is_accepted_mime_type("image/bmp"));
        assert!(!is_supported_image("image/svg+xml"));
    }

    #[test]
    fn guesses_from_extension() {
        assert_eq!(guess_mime_type(Path::new("notes.pdf")), "application/pdf");
        assert_eq!(guess_mime_type(Path::new("photo.PNG")), "image/png");
        assert_eq!(
            guess_mime_type(Path::new("blob.unknownext")),
            "application/octet-stream"
        );
    }

    #[test]
    fn size_threshold_switches_route() {
        let strategy = UploadStrategy::BrowserUploadWhenFileSizeExceed;
        assert_eq!(strategy.route(10, 100), Some(UploadRoute::Server));
        assert_eq!(strategy.route(101, 100), Some(UploadRoute::Direct));
        assert_eq!(UploadStrategy::DisableUpload.route(1, 100), None);
        assert_eq!(
            "browser_upload_only".parse::<UploadStrategy>().ok(),
            Some(UploadStrategy::BrowserUploadOnly)
        );
    }
}
