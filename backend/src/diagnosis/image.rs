use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use sha2::{Digest, Sha256};

use super::InputError;

pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// A validated plant photo ready to be sent as `inline_data`.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    bytes: Vec<u8>,
    mime_type: &'static str,
    file_name: Option<String>,
}

impl ImageUpload {
    /// Validates size and format. The format is sniffed from the bytes; the declared
    /// content type is only trusted when sniffing fails.
    pub fn new(
        bytes: Vec<u8>,
        declared_mime: Option<&str>,
        file_name: Option<String>,
    ) -> Result<Self, InputError> {
        if bytes.is_empty() {
            return Err(InputError::MissingImage);
        }
        if bytes.len() > MAX_IMAGE_SIZE {
            return Err(InputError::ImageTooLarge);
        }

        let mime_type = image::guess_format(&bytes)
            .ok()
            .and_then(mime_for_format)
            .or_else(|| declared_mime.and_then(normalize_mime))
            .ok_or(InputError::UnsupportedImage)?;

        Ok(Self {
            bytes,
            mime_type,
            file_name,
        })
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// Hex SHA-256 of the image bytes.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }
}

fn mime_for_format(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        _ => None,
    }
}

fn normalize_mime(mime: &str) -> Option<&'static str> {
    match mime.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("image/jpeg"),
        "image/png" => Some("image/png"),
        "image/webp" => Some("image/webp"),
        "image/gif" => Some("image/gif"),
        _ => None,
    }
}
