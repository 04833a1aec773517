use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;

use crate::error::AppError;

const DEFAULT_MIME: &str = "image/jpeg";

#[derive(Error, Debug, PartialEq)]
pub enum ImagePayloadError {
    #[error("Missing imageBase64")]
    Missing,

    #[error("imageBase64 is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("Malformed data URL")]
    MalformedDataUrl,

    #[error("Unsupported content type: {0}")]
    UnsupportedType(String),
}

impl From<ImagePayloadError> for AppError {
    fn from(err: ImagePayloadError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// A validated image ready to be forwarded to the vision model.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub mime_type: String,
    /// Canonical base64, whitespace removed.
    pub base64: String,
    pub byte_len: usize,
}

impl ImagePayload {
    pub fn from_bytes(bytes: &[u8], declared_mime: Option<&str>) -> Result<Self, ImagePayloadError> {
        if bytes.is_empty() {
            return Err(ImagePayloadError::Missing);
        }

        let mime_type = pick_mime(None, declared_mime, bytes)?;

        Ok(Self {
            mime_type,
            base64: STANDARD.encode(bytes),
            byte_len: bytes.len(),
        })
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Accepts a bare base64 string or a `data:<mime>;base64,<data>` URL.
pub fn parse_image_payload(
    raw: &str,
    declared_mime: Option<&str>,
) -> Result<ImagePayload, ImagePayloadError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ImagePayloadError::Missing);
    }

    let (url_mime, data) = match raw.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest
                .split_once(',')
                .ok_or(ImagePayloadError::MalformedDataUrl)?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or(ImagePayloadError::MalformedDataUrl)?;
            (Some(mime).filter(|m| !m.is_empty()), data)
        }
        None => (None, raw),
    };

    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(ImagePayloadError::Missing);
    }

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ImagePayloadError::InvalidBase64(e.to_string()))?;

    let mime_type = pick_mime(url_mime, declared_mime, &bytes)?;

    Ok(ImagePayload {
        mime_type,
        byte_len: bytes.len(),
        base64: compact,
    })
}

fn pick_mime(
    url_mime: Option<&str>,
    declared_mime: Option<&str>,
    bytes: &[u8],
) -> Result<String, ImagePayloadError> {
    let explicit = url_mime
        .or(declared_mime)
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty() && m != "application/octet-stream");

    let mime = match explicit {
        Some(m) => m,
        None => sniff_mime(bytes).unwrap_or(DEFAULT_MIME).to_string(),
    };

    if !mime.starts_with("image/") {
        return Err(ImagePayloadError::UnsupportedType(mime));
    }

    Ok(mime)
}

/// Recognizes the formats the vision model accepts by their magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}
