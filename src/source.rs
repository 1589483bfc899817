//! Reading source images and bringing them into an encodable pixel layout.

use std::path::Path;

use image::{DynamicImage, ImageFormat};

use crate::decoder::{BitstreamFeatures, Decoder};
use crate::error::{Error, Result};

/// Extensions accepted as conversion input, lowercase.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "gif"];

/// Returns true if the path carries one of the supported extensions,
/// compared case-insensitively.
pub fn is_supported_format(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

/// Decodes an in-memory image. WebP data is routed through libwebp,
/// everything else through `image` with format sniffing.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    if let Some(features) = BitstreamFeatures::new(bytes) {
        if features.has_animation() {
            return Err(Error::AnimatedWebP);
        }
        return Decoder::new(bytes)
            .decode()
            .and_then(|image| image.to_image())
            .ok_or(Error::WebPDecode);
    }

    Ok(image::load_from_memory(bytes)?)
}

/// Reads and decodes the file at `path`.
pub fn open(path: &Path) -> Result<DynamicImage> {
    decode(&read(path)?)
}

/// Reads, decodes and normalizes the file at `path`, ready for encoding.
pub fn load(path: &Path) -> Result<DynamicImage> {
    let bytes = read(path)?;
    let indexed = is_indexed(&bytes);
    Ok(normalize(decode(&bytes)?, indexed))
}

/// Converts to RGBA8 when the image carries alpha or came from a
/// palette-indexed source, RGB8 otherwise.
pub fn normalize(image: DynamicImage, indexed: bool) -> DynamicImage {
    match image {
        DynamicImage::ImageRgba8(_) => image,
        other if indexed || other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        DynamicImage::ImageRgb8(_) => image,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Sniffs whether the encoded data stores palette indices. Decoders expand
/// palettes, so this has to be read from the container header.
///
/// GIF is always indexed. PNG carries color type 3 in IHDR, BMP a bit depth
/// of 8 or less. Other containers report false.
pub fn is_indexed(bytes: &[u8]) -> bool {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Gif) => true,
        Ok(ImageFormat::Png) => bytes.get(25) == Some(&3),
        Ok(ImageFormat::Bmp) => {
            // BITMAPCOREHEADER is 12 bytes and stores the depth earlier.
            let header = bytes.get(14..18).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]));
            let offset = if header == Some(12) { 24 } else { 28 };
            bytes
                .get(offset..offset + 2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]) <= 8)
                .unwrap_or(false)
        }
        _ => false,
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|e| Error::io("failed to read", path, e))?;
    if bytes.is_empty() {
        return Err(Error::EmptySource);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ColorType, GrayAlphaImage, GrayImage, LumaA, Rgb, RgbImage};
    use std::io::Cursor;
    use std::path::PathBuf;

    fn encode_as(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, format).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_extension_filter_is_case_insensitive() {
        for name in ["a.jpg", "a.JPEG", "a.Png", "a.bmp", "a.TIFF", "a.tif", "a.gif"] {
            assert!(is_supported_format(&PathBuf::from(name)), "{name}");
        }
        for name in ["a.webp", "a.txt", "a", "png", "dir.png/file"] {
            assert!(!is_supported_format(&PathBuf::from(name)), "{name}");
        }
    }

    #[test]
    fn test_normalize_picks_layout_by_alpha() {
        let gray = DynamicImage::ImageLuma8(GrayImage::new(2, 2));
        assert_eq!(normalize(gray, false).color(), ColorType::Rgb8);

        let gray_alpha = DynamicImage::ImageLumaA8(GrayAlphaImage::from_pixel(2, 2, LumaA([9, 10])));
        assert_eq!(normalize(gray_alpha, false).color(), ColorType::Rgba8);

        let rgb16 = DynamicImage::new_rgb16(2, 2);
        assert_eq!(normalize(rgb16, false).color(), ColorType::Rgb8);
    }

    #[test]
    fn test_indexed_sources_always_become_rgba() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        assert_eq!(normalize(rgb, true).color(), ColorType::Rgba8);

        let gray = DynamicImage::ImageLuma8(GrayImage::new(2, 2));
        assert_eq!(normalize(gray, true).color(), ColorType::Rgba8);
    }

    #[test]
    fn test_png_color_type_decides_indexed() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(3, 2));
        let mut png = encode_as(&image, ImageFormat::Png);
        assert_eq!(png[25], 2, "truecolor IHDR");
        assert!(!is_indexed(&png));

        png[25] = 3;
        assert!(is_indexed(&png));
    }

    #[test]
    fn test_palette_bmp_loads_as_rgba() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("gray.bmp");
        GrayImage::from_fn(4, 4, |x, _| image::Luma([x as u8 * 60])).save(&path).unwrap();

        assert!(is_indexed(&std::fs::read(&path).unwrap()));
        assert_eq!(load(&path).unwrap().color(), ColorType::Rgba8);
    }

    #[test]
    fn test_truecolor_sources_stay_rgb() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])));
        let jpeg = encode_as(&image, ImageFormat::Jpeg);
        assert!(!is_indexed(&jpeg));
        assert!(!is_indexed(b"not an image"));
    }

    #[test]
    fn test_decodes_png_bytes() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])));
        let decoded = decode(&encode_as(&image, ImageFormat::Png)).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
    }

    #[test]
    fn test_gif_decodes_with_alpha() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([200, 10, 10])));
        let gif = encode_as(&image, ImageFormat::Gif);
        assert!(is_indexed(&gif));
        assert_eq!(normalize(decode(&gif).unwrap(), is_indexed(&gif)).color(), ColorType::Rgba8);
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, Error::Decode(_)), "{err:?}");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = open(Path::new("does/not/exist.png")).unwrap_err();
        assert_eq!(err.to_string(), "file not found");
    }
}
