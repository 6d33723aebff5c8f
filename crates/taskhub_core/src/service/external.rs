//! Contracts for external collaborators: identity tokens and image storage.
//!
//! Adapters live outside core. Implementations must bound every remote
//! call with a timeout and report it as `CollaboratorError::Timeout`.

use crate::model::user::VerifiedClaims;
use crate::model::validation::ValidationErrors;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Largest accepted profile picture.
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

const IMAGE_FIELD: &str = "profile_picture";

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The collaborator answered and refused the input.
    Rejected(String),
    /// No answer within the configured bound.
    Timeout(String),
    /// Transport or collaborator-side failure.
    Unavailable(String),
}

impl CollaboratorError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }
}

impl Display for CollaboratorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(message) => write!(f, "rejected: {message}"),
            Self::Timeout(message) => write!(f, "timed out: {message}"),
            Self::Unavailable(message) => write!(f, "unavailable: {message}"),
        }
    }
}

impl Error for CollaboratorError {}

/// Verifies externally-issued identity tokens (social login).
pub trait IdentityTokenVerifier: Send + Sync {
    /// Returns verified claims, or `Rejected` for an invalid token.
    fn verify(&self, token: &str) -> Result<VerifiedClaims, CollaboratorError>;
}

/// Persists profile pictures and hands back opaque references.
pub trait ImageStorage: Send + Sync {
    fn store(&self, bytes: &[u8], format: ImageFormat) -> Result<String, CollaboratorError>;
    /// Removes a stored image. References the storage does not own are
    /// ignored.
    fn delete(&self, reference: &str) -> Result<(), CollaboratorError>;
}

/// Accepted profile picture formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }

    /// Detects the format from leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else {
            None
        }
    }

    fn from_mime(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }
}

/// Uploaded image as received by an outer surface.
#[derive(Debug, Clone, Default)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    /// Content type declared by the client, if any.
    pub content_type: Option<String>,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            bytes,
            content_type,
        }
    }

    /// Checks size and type; content is trusted over the declared type.
    pub fn validate(&self) -> Result<ImageFormat, ValidationErrors> {
        if self.bytes.is_empty() {
            return Err(ValidationErrors::single(
                IMAGE_FIELD,
                "The profile picture must be an image.",
            ));
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(ValidationErrors::single(
                IMAGE_FIELD,
                format!(
                    "The profile picture may not be greater than {} kilobytes.",
                    MAX_IMAGE_BYTES / 1024
                ),
            ));
        }

        let sniffed = ImageFormat::sniff(&self.bytes);
        let declared_ok = self.content_type.as_deref().map_or(true, |value| {
            is_generic_mime(value) || ImageFormat::from_mime(value).is_some()
        });
        match sniffed {
            Some(format) if declared_ok => Ok(format),
            _ => Err(ValidationErrors::single(
                IMAGE_FIELD,
                "The profile picture must be a file of type: jpeg, png, gif.",
            )),
        }
    }
}

/// Types clients send when they do not know better.
fn is_generic_mime(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("application/octet-stream")
}
