//! Inline image payloads (`data:image/<type>;base64,<payload>`).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{MediaError, MediaResult};

/// Prefix identifying a string value as an inline image.
pub const INLINE_IMAGE_PREFIX: &str = "data:image/";

pub fn is_inline_image(value: &str) -> bool {
    value.starts_with(INLINE_IMAGE_PREFIX)
}

/// A decoded inline image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InlineImage {
    /// Decode a `data:` URI. The media type is everything between `data:`
    /// and the `;base64` marker; the payload is standard base64.
    pub fn parse(uri: &str) -> MediaResult<Self> {
        let (header, payload) = uri
            .split_once(',')
            .ok_or_else(|| MediaError::MalformedDataUri("missing ',' separator".to_string()))?;
        let mime_type = header
            .strip_prefix("data:")
            .and_then(|rest| rest.strip_suffix(";base64"))
            .ok_or_else(|| MediaError::MalformedDataUri(format!("unsupported header {header:?}")))?;
        if mime_type.is_empty() {
            return Err(MediaError::MalformedDataUri("empty media type".to_string()));
        }
        let data = STANDARD.decode(payload.trim())?;
        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }

    /// File name for this image: `stem` plus the extension for its media type.
    pub fn file_name(&self, stem: &str) -> String {
        match extension_for(&self.mime_type) {
            Some(ext) => format!("{stem}.{ext}"),
            None => stem.to_string(),
        }
    }
}

/// Preferred file extension for an image media type.
pub fn extension_for(mime_type: &str) -> Option<&'static str> {
    let ext = match mime_type.to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/avif" => "avif",
        "image/bmp" => "bmp",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        "image/tiff" => "tiff",
        _ => return None,
    };
    Some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_png_payload() {
        let image = InlineImage::parse("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, b"hello");
        assert_eq!(image.file_name("abc"), "abc.png");
    }

    #[test]
    fn unknown_types_get_no_extension() {
        let image = InlineImage::parse("data:image/x-custom;base64,aGk=").unwrap();
        assert_eq!(image.file_name("abc"), "abc");
    }

    #[test]
    fn detects_inline_images() {
        assert!(is_inline_image("data:image/jpeg;base64,AAAA"));
        assert!(!is_inline_image("data:text/plain;base64,AAAA"));
        assert!(!is_inline_image("https://cdn.example.com/a.png"));
    }

    #[test]
    fn rejects_malformed_uris() {
        assert!(matches!(
            InlineImage::parse("data:image/png;base64"),
            Err(MediaError::MalformedDataUri(_))
        ));
        assert!(matches!(
            InlineImage::parse("data:image/png,aGk="),
            Err(MediaError::MalformedDataUri(_))
        ));
        assert!(matches!(
            InlineImage::parse("data:image/png;base64,***"),
            Err(MediaError::Decode(_))
        ));
    }
}
