//! Image type detection from magic bytes (file signatures).
//!
//! The upload pipeline trusts only what is in the bytes; client-declared
//! content types and file extensions are never consulted. The allow-list is
//! closed: anything that is not JPEG, PNG, GIF, or WebP is rejected upstream.

/// The image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageType {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageType::Jpeg => "image/jpeg",
            ImageType::Png => "image/png",
            ImageType::Gif => "image/gif",
            ImageType::Webp => "image/webp",
        }
    }
}

/// Detect the image type from the leading bytes of a file.
///
/// Returns `Some(type)` for recognized signatures, `None` otherwise.
/// Based on the well-known magic byte sequences for each format.
pub fn detect_image(data: &[u8]) -> Option<ImageType> {
    if data.len() < 4 {
        return None;
    }

    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(ImageType::Jpeg);
    }
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(ImageType::Png);
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some(ImageType::Gif);
    }
    // RIFF container: bytes 8..12 distinguish WebP from WAV/AVI
    if data.starts_with(b"RIFF") && data.len() >= 12 && &data[8..12] == b"WEBP" {
        return Some(ImageType::Webp);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_data(header: &[u8], total: usize) -> Vec<u8> {
        let mut d = header.to_vec();
        d.resize(total, 0);
        d
    }

    #[test]
    fn test_jpeg() {
        assert_eq!(
            detect_image(&make_data(&[0xFF, 0xD8, 0xFF, 0xE0], 16)),
            Some(ImageType::Jpeg)
        );
    }

    #[test]
    fn test_png() {
        assert_eq!(
            detect_image(&make_data(
                &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
                16
            )),
            Some(ImageType::Png)
        );
    }

    #[test]
    fn test_gif() {
        assert_eq!(
            detect_image(b"GIF89a\x00\x00\x00\x00"),
            Some(ImageType::Gif)
        );
        assert_eq!(
            detect_image(b"GIF87a\x00\x00\x00\x00"),
            Some(ImageType::Gif)
        );
    }

    #[test]
    fn test_webp() {
        let mut d = b"RIFF".to_vec();
        d.extend_from_slice(&[0; 4]); // size
        d.extend_from_slice(b"WEBP");
        assert_eq!(detect_image(&d), Some(ImageType::Webp));
    }

    #[test]
    fn test_riff_but_not_webp() {
        let mut d = b"RIFF".to_vec();
        d.extend_from_slice(&[0; 4]);
        d.extend_from_slice(b"WAVE");
        assert_eq!(detect_image(&d), None);
    }

    #[test]
    fn test_plain_text_is_rejected() {
        assert_eq!(detect_image(b"hello, definitely not an image"), None);
    }

    #[test]
    fn test_disallowed_formats() {
        // BMP and PDF have recognizable magic bytes but are not on the
        // allow-list, so they must come back as None.
        assert_eq!(detect_image(&make_data(b"BM\x00\x00\x00\x00", 16)), None);
        assert_eq!(detect_image(b"%PDF-1.7\x00\x00\x00\x00"), None);
    }

    #[test]
    fn test_short_data() {
        assert_eq!(detect_image(&[0xFF, 0xD8]), None);
        assert_eq!(detect_image(&[0xFF, 0xD8, 0xFF]), None);
        assert_eq!(detect_image(&[]), None);
    }

    #[test]
    fn test_mime_type_strings() {
        assert_eq!(ImageType::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(ImageType::Png.mime_type(), "image/png");
        assert_eq!(ImageType::Gif.mime_type(), "image/gif");
        assert_eq!(ImageType::Webp.mime_type(), "image/webp");
    }
}
