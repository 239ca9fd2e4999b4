//! Image sources and decoding.
//!
//! Everything here runs synchronously; the engine calls it for the main
//! texture and the tile worker calls it on its own thread.

use std::fmt;
use std::path::PathBuf;

use image::RgbaImage;
use image::imageops::FilterType;

use crate::constants::MAIN_TEXTURE_MAX_DIM;
use crate::error::{Result, ViewerError};

/// Supported image file extensions.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff", "tif"];

/// Check if a filename has a supported image extension.
pub fn is_image_file(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Where an image comes from. Cloning copies the data, so a clone can be
/// handed to another thread without sharing anything.
#[derive(Clone, PartialEq)]
pub enum ImageSource {
    Path(PathBuf),
    /// An encoded file in memory (PNG, JPEG, ...).
    Encoded(Vec<u8>),
    /// Already decoded pixels.
    Pixels(RgbaImage),
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Path(path) => write!(f, "Path({:?})", path),
            ImageSource::Encoded(bytes) => write!(f, "Encoded({} bytes)", bytes.len()),
            ImageSource::Pixels(img) => write!(f, "Pixels({}x{})", img.width(), img.height()),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<RgbaImage> for ImageSource {
    fn from(img: RgbaImage) -> Self {
        ImageSource::Pixels(img)
    }
}

impl ImageSource {
    /// Decode to RGBA8 at full resolution.
    pub fn decode(&self) -> Result<RgbaImage> {
        let img = match self {
            ImageSource::Path(path) => image::open(path)
                .map_err(|e| ViewerError::ImageDecode(format!("{}: {}", path.display(), e)))?
                .to_rgba8(),
            ImageSource::Encoded(bytes) => image::load_from_memory(bytes)?.to_rgba8(),
            ImageSource::Pixels(img) => img.clone(),
        };
        if img.width() == 0 || img.height() == 0 {
            return Err(ViewerError::ImageDecode("image has no pixels".to_string()));
        }
        Ok(img)
    }
}

/// Pixels ready for the main texture.
#[derive(Debug, Clone)]
pub struct MainImage {
    pub pixels: RgbaImage,
    /// Dimensions the view lays out against: the caller's known size when
    /// given, else the decoded size.
    pub width: u32,
    pub height: u32,
    /// Decoded dimensions before any downscaling.
    pub decoded_width: u32,
    pub decoded_height: u32,
}

impl MainImage {
    /// The decoded data is smaller than the size it is displayed at.
    pub fn is_placeholder(&self) -> bool {
        self.decoded_width < self.width || self.decoded_height < self.height
    }
}

/// Decode `source` and shrink it to fit `max_dim` (and `MAIN_TEXTURE_MAX_DIM`).
pub fn load_main_image(
    source: &ImageSource,
    known_size: Option<(u32, u32)>,
    max_dim: u32,
) -> Result<MainImage> {
    let decoded = source.decode()?;
    let (decoded_width, decoded_height) = decoded.dimensions();
    let (width, height) = known_size
        .filter(|&(w, h)| w > 0 && h > 0)
        .unwrap_or((decoded_width, decoded_height));

    let pixels = fit_within(decoded, max_dim.min(MAIN_TEXTURE_MAX_DIM));
    log::debug!(
        "Main image: decoded {}x{}, texture {}x{}, layout {}x{}",
        decoded_width,
        decoded_height,
        pixels.width(),
        pixels.height(),
        width,
        height
    );

    Ok(MainImage {
        pixels,
        width,
        height,
        decoded_width,
        decoded_height,
    })
}

/// Downscale so neither side exceeds `max_dim`, keeping aspect ratio.
pub fn fit_within(img: RgbaImage, max_dim: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let max_dim = max_dim.max(1);
    if w <= max_dim && h <= max_dim {
        return img;
    }
    let ratio = f64::from(max_dim) / f64::from(w.max(h));
    let nw = ((f64::from(w) * ratio).round() as u32).clamp(1, max_dim);
    let nh = ((f64::from(h) * ratio).round() as u32).clamp(1, max_dim);
    image::imageops::resize(&img, nw, nh, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]))
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file("photo.JPG"));
        assert!(is_image_file("scan.tiff"));
        assert!(!is_image_file("notes.txt"));
    }

    #[test]
    fn test_fit_within_keeps_small_images() {
        let img = fit_within(solid(100, 50), 4096);
        assert_eq!(img.dimensions(), (100, 50));
    }

    #[test]
    fn test_fit_within_preserves_aspect() {
        let img = fit_within(solid(400, 100), 200);
        assert_eq!(img.dimensions(), (200, 50));
    }

    #[test]
    fn test_known_size_preferred_over_decoded() {
        let main = load_main_image(&solid(40, 30).into(), Some((4000, 3000)), 4096).unwrap();
        assert_eq!((main.width, main.height), (4000, 3000));
        assert_eq!((main.decoded_width, main.decoded_height), (40, 30));
        assert!(main.is_placeholder());
    }

    #[test]
    fn test_zero_known_size_ignored() {
        let main = load_main_image(&solid(40, 30).into(), Some((0, 0)), 4096).unwrap();
        assert_eq!((main.width, main.height), (40, 30));
        assert!(!main.is_placeholder());
    }

    #[test]
    fn test_encoded_png_decodes() {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(solid(8, 4))
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let img = ImageSource::Encoded(bytes).decode().unwrap();
        assert_eq!(img.dimensions(), (8, 4));
        assert_eq!(img.get_pixel(3, 2).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = ImageSource::Encoded(vec![1, 2, 3]).decode().unwrap_err();
        assert!(matches!(err, ViewerError::ImageDecode(_)));
    }

    #[test]
    fn test_missing_file_fails_to_decode() {
        let err = ImageSource::Path(PathBuf::from("/nonexistent/image.png"))
            .decode()
            .unwrap_err();
        assert!(matches!(err, ViewerError::ImageDecode(_)));
    }
}
