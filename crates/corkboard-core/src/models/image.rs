//! Canvas image placement model

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::hash::{ContentHash, ContentHasher};

/// Geometric placement of an image on a board canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees, clockwise
    pub rotation: f64,
    /// Paint order; higher values draw on top
    pub z_index: i32,
}

/// Metadata sent alongside image bytes on upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

/// Remote location of a stored image blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLocation {
    pub location: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// An image placed on a board.
///
/// Remote copies only carry the content hash; `data` holds the raw bytes for
/// offline rendering and is never serialized.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasImageRef {
    pub id: String,
    pub hash: ContentHash,
    pub placement: Placement,
    pub is_pinned: bool,
    pub natural_width: u32,
    pub natural_height: u32,
    #[serde(default)]
    pub mime_type: String,
    #[serde(skip)]
    pub data: Option<Vec<u8>>,
}

impl CanvasImageRef {
    /// Create a placement for raw image bytes, hashing them with `hasher`.
    pub fn from_bytes(
        bytes: Vec<u8>,
        mime_type: impl Into<String>,
        natural_width: u32,
        natural_height: u32,
        hasher: &ContentHasher,
    ) -> Result<Self> {
        let mime_type = mime_type.into().trim().to_string();
        if bytes.is_empty() {
            return Err(Error::InvalidInput("Image bytes cannot be empty".to_string()));
        }
        if !mime_type.starts_with("image/") {
            return Err(Error::InvalidInput(format!(
                "Unsupported image mime_type: {mime_type}"
            )));
        }

        Ok(Self {
            id: uuid::Uuid::now_v7().to_string(),
            hash: hasher.hash(&bytes),
            placement: Placement {
                width: f64::from(natural_width),
                height: f64::from(natural_height),
                ..Placement::default()
            },
            is_pinned: false,
            natural_width,
            natural_height,
            mime_type,
            data: Some(bytes),
        })
    }

    /// Upload metadata for this image.
    pub fn metadata(&self) -> ImageMetadata {
        ImageMetadata {
            mime_type: self.mime_type.clone(),
            width: self.natural_width,
            height: self.natural_height,
        }
    }

    /// Copy of this reference without embedded bytes.
    #[must_use]
    pub fn without_data(&self) -> Self {
        Self {
            data: None,
            ..self.clone()
        }
    }
}

impl fmt::Debug for CanvasImageRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CanvasImageRef")
            .field("id", &self.id)
            .field("hash", &self.hash)
            .field("placement", &self.placement)
            .field("is_pinned", &self.is_pinned)
            .field("natural_width", &self.natural_width)
            .field("natural_height", &self.natural_height)
            .field("mime_type", &self.mime_type)
            .field("data_len", &self.data.as_ref().map(Vec::len))
            .finish()
    }
}
