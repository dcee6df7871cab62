use std::path::Path;

use image::{ImageReader, RgbaImage};

use crate::error::DecodeError;

/// Extensions the default decoder accepts (lowercase, no dot)
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp"];

/// A decoded bitmap plus the source dimensions
pub struct DecodedImage {
    /// Width of the source image in pixels
    pub width: u32,
    /// Height of the source image in pixels
    pub height: u32,
    /// Pixels, possibly downscaled to the requested maximum width
    pub pixels: RgbaImage,
}

/// Image decoding capability used by the command queue.
///
/// `decode` blocks; the queue runs it on a blocking worker and races it
/// against cancellation.
pub trait ImageDecoder: Send + Sync {
    fn supported_extensions(&self) -> &[&str];

    fn decode(&self, path: &Path, max_width: Option<u32>) -> Result<DecodedImage, DecodeError>;

    fn is_supported_format(&self, path: &Path) -> bool {
        has_extension(path, self.supported_extensions())
    }
}

/// Case-insensitive extension check
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Decoder backed by the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct FsImageDecoder;

impl ImageDecoder for FsImageDecoder {
    fn supported_extensions(&self) -> &[&str] {
        SUPPORTED_EXTENSIONS
    }

    fn decode(&self, path: &Path, max_width: Option<u32>) -> Result<DecodedImage, DecodeError> {
        if !self.is_supported_format(path) {
            return Err(DecodeError::Unsupported(path.to_path_buf()));
        }

        let reader = ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|source| DecodeError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let image = reader.decode().map_err(|source| DecodeError::Image {
            path: path.to_path_buf(),
            source,
        })?;

        let (width, height) = (image.width(), image.height());
        let image = match max_width {
            Some(max) if max > 0 && width > max => image.thumbnail(max, u32::MAX),
            _ => image,
        };

        Ok(DecodedImage {
            width,
            height,
            pixels: image.to_rgba8(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::path::PathBuf;

    #[test]
    fn test_extension_matching_ignores_case() {
        let decoder = FsImageDecoder;
        assert!(decoder.is_supported_format(Path::new("/a/b.PNG")));
        assert!(decoder.is_supported_format(Path::new("/a/b.jpeg")));
        assert!(!decoder.is_supported_format(Path::new("/a/b.txt")));
        assert!(!decoder.is_supported_format(Path::new("/a/png")));
    }

    #[test]
    fn test_decode_and_downscale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        RgbaImage::from_pixel(40, 10, Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let full = FsImageDecoder.decode(&path, None).unwrap();
        assert_eq!((full.width, full.height), (40, 10));
        assert_eq!(full.pixels.width(), 40);

        let small = FsImageDecoder.decode(&path, Some(20)).unwrap();
        assert_eq!((small.width, small.height), (40, 10));
        assert_eq!(small.pixels.width(), 20);
        assert_eq!(small.pixels.height(), 5);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(matches!(
            FsImageDecoder.decode(&path, None),
            Err(DecodeError::Image { .. })
        ));
    }

    #[test]
    fn test_decode_missing_file_fails() {
        let path = PathBuf::from("/definitely/not/here.png");
        assert!(matches!(
            FsImageDecoder.decode(&path, None),
            Err(DecodeError::Open { .. })
        ));
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        assert!(matches!(
            FsImageDecoder.decode(Path::new("/tmp/notes.txt"), None),
            Err(DecodeError::Unsupported(_))
        ));
    }
}
