//! Inline image encoding for vision requests.

use std::path::Path;

use base64::Engine;
use image::ImageFormat;

use crate::types::{PictoError, PictoResult};

/// Read an image file and encode it as a `data:` URL.
pub fn encode_data_url(path: &Path) -> PictoResult<String> {
    if !path.exists() {
        return Err(PictoError::InvalidInput(format!(
            "Image file not found: {}",
            path.display()
        )));
    }
    let bytes = std::fs::read(path)?;
    Ok(data_url(&bytes))
}

/// Encode raw image bytes as a `data:` URL, sniffing the MIME type.
pub fn data_url(bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{};base64,{encoded}", sniff_mime(bytes))
}

/// MIME type from the file signature; JPEG when unrecognised.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::Tiff) => "image/tiff",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    #[test]
    fn test_sniff_mime() {
        assert_eq!(sniff_mime(PNG_SIGNATURE), "image/png");
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_mime(b"????"), "image/jpeg");
    }

    #[test]
    fn test_data_url_encodes_bytes() {
        assert_eq!(data_url(&[0xFF, 0xD8, 0xFF]), "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn test_encode_missing_file() {
        let err = encode_data_url(Path::new("/nonexistent/photo.jpg")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_encode_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, PNG_SIGNATURE).unwrap();
        let url = encode_data_url(&path).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }
}
