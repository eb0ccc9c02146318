//! Client side of batch image uploads.
//!
//! A [`BatchUploadController`] owns two lists that are only loosely coupled: the
//! ephemeral queue of [`UploadedImage`]s and the committed list of [`ImageInfo`]
//! references. Uploads run concurrently and reconcile into the committed list by
//! key, so completion order does not matter.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

mod controller;
pub mod dimensions;
pub mod uploader;

pub use controller::BatchUploadController;
pub use uploader::HttpUploader;

/// A successfully uploaded image, as handed back to the owner of the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
    Square,
}

impl ImageInfo {
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => Some((width, height)),
            _ => None,
        }
    }

    /// Width over height, when both are known.
    pub fn aspect_ratio(&self) -> Option<f64> {
        self.dimensions()
            .map(|(width, height)| width as f64 / height as f64)
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.dimensions().map(|(width, height)| match width.cmp(&height) {
            std::cmp::Ordering::Greater => Orientation::Landscape,
            std::cmp::Ordering::Less => Orientation::Portrait,
            std::cmp::Ordering::Equal => Orientation::Square,
        })
    }
}

/// A file picked by the user, fully read into memory.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Arc<Vec<u8>>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: Arc::new(bytes),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    Uploading,
    Success,
    Error,
}

impl UploadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadStatus::Success | UploadStatus::Error)
    }
}

/// Opaque reference to the local preview of a queued file.
///
/// Previews stay live until the file leaves the queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    pub(crate) fn for_image(id: &str) -> Self {
        Self(format!("preview://{id}"))
    }
}

/// One entry of the ephemeral upload queue.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub id: String,
    pub file: SelectedFile,
    pub preview: PreviewHandle,
    pub status: UploadStatus,
    pub progress: u8,
    pub key: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct BatchUploadOptions {
    pub max_files: usize,
    pub max_file_size_mb: u64,
    /// Key prefix sent with every upload
    pub prefix: String,
    /// Pause before each upload starts, so a large selection does not fire all at once
    pub schedule_delay: Duration,
}

impl Default for BatchUploadOptions {
    fn default() -> Self {
        Self {
            max_files: 10,
            max_file_size_mb: 10,
            prefix: "batch".to_string(),
            schedule_delay: Duration::from_millis(100),
        }
    }
}

impl BatchUploadOptions {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

/// Why a single file was kept out of the queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileRejection {
    #[error("{name}: not an image file")]
    NotAnImage { name: String },
    #[error("{name}: image must be at most {max_mb}MB")]
    TooLarge { name: String, max_mb: u64 },
}

/// Why a whole selection was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchRejection {
    #[error("At most {max_files} images can be uploaded ({current} already selected, {incoming} more requested)")]
    TooManyFiles {
        max_files: usize,
        current: usize,
        incoming: usize,
    },
}

/// Transient user-facing error message, the equivalent of a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    StatusChanged { id: String, status: UploadStatus },
    /// The full committed list after a change, never just the delta
    CommittedChanged(Vec<ImageInfo>),
    Notice(Notice),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(width: Option<u32>, height: Option<u32>) -> ImageInfo {
        ImageInfo {
            key: "k".to_string(),
            width,
            height,
        }
    }

    #[test]
    fn test_orientation() {
        assert_eq!(
            info(Some(2000), Some(1000)).orientation(),
            Some(Orientation::Landscape)
        );
        assert_eq!(
            info(Some(800), Some(1200)).orientation(),
            Some(Orientation::Portrait)
        );
        assert_eq!(
            info(Some(500), Some(500)).orientation(),
            Some(Orientation::Square)
        );
        assert_eq!(info(None, Some(500)).orientation(), None);
    }

    #[test]
    fn test_aspect_ratio() {
        assert_eq!(info(Some(2000), Some(1000)).aspect_ratio(), Some(2.0));
        assert_eq!(info(Some(10), Some(0)).aspect_ratio(), None);
    }

    #[test]
    fn test_image_info_json_omits_unknown_dimensions() {
        let json = serde_json::to_string(&info(None, None)).unwrap();
        assert_eq!(json, r#"{"key":"k"}"#);

        let parsed: ImageInfo = serde_json::from_str(r#"{"key":"a","width":3,"height":4}"#).unwrap();
        assert_eq!(parsed.dimensions(), Some((3, 4)));
    }
}
