use imagesize::ImageType;

use quill_core::ports::{DetectedImage, ImageProbe};

/// Recognises raster images from their header bytes with `imagesize`.
///
/// Accepted formats: gif, png, jpeg, webp, bmp, tiff and ico. A header that
/// parses but reports a zero dimension is treated as corrupt.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImagesizeProbe;

fn extension(kind: ImageType) -> Option<&'static str> {
    match kind {
        ImageType::Gif => Some("gif"),
        ImageType::Png => Some("png"),
        ImageType::Jpeg => Some("jpg"),
        ImageType::Webp => Some("webp"),
        ImageType::Bmp => Some("bmp"),
        ImageType::Tiff => Some("tiff"),
        ImageType::Ico => Some("ico"),
        _ => None,
    }
}

impl ImageProbe for ImagesizeProbe {
    fn probe(&self, bytes: &[u8]) -> Option<DetectedImage> {
        let extension = extension(imagesize::image_type(bytes).ok()?)?;
        let size = imagesize::blob_size(bytes).ok()?;
        if size.width == 0 || size.height == 0 {
            return None;
        }

        Some(DetectedImage {
            extension,
            width: size.width,
            height: size.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
    ];

    fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
        bytes
    }

    #[test]
    fn test_detects_gif() {
        let image = ImagesizeProbe.probe(SMALL_GIF).unwrap();
        assert_eq!(image.extension, "gif");
        assert_eq!((image.width, image.height), (2, 1));
    }

    #[test]
    fn test_detects_png() {
        let image = ImagesizeProbe.probe(&png_header(640, 480)).unwrap();
        assert_eq!(image.extension, "png");
        assert_eq!((image.width, image.height), (640, 480));
    }

    #[test]
    fn test_rejects_text_and_empty_input() {
        assert!(ImagesizeProbe.probe(b"just some text, not a picture").is_none());
        assert!(ImagesizeProbe.probe(b"").is_none());
    }

    #[test]
    fn test_rejects_zero_sized_header() {
        assert!(ImagesizeProbe.probe(&png_header(0, 10)).is_none());
    }
}
