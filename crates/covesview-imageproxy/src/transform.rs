use image::{DynamicImage, ImageFormat, imageops::FilterType};

use crate::error::{ImageProxyError, ImageProxyResult};
use crate::presets::{Fit, Preset};

/// Decode, resize per the preset's fit, and re-encode as JPEG.
pub fn transform(bytes: &[u8], preset: Preset) -> ImageProxyResult<Vec<u8>> {
    let image = image::load_from_memory(bytes).map_err(|e| ImageProxyError::Decode(e.to_string()))?;
    let resized = match preset.fit {
        Fit::Cover => cover(image, preset.width, preset.height),
        Fit::Contain => contain(image, preset.width, preset.height),
    };
    encode_jpeg(&resized)
}

/// Resize to fill the target box exactly, cropping whatever overhangs.
fn cover(image: DynamicImage, width: u32, height: u32) -> DynamicImage {
    image.resize_to_fill(width, height, FilterType::Lanczos3)
}

/// Resize to fit within the target box, never upscaling past the source's
/// own dimensions.
fn contain(image: DynamicImage, width: u32, height: u32) -> DynamicImage {
    if image.width() <= width && image.height() <= height {
        return image;
    }
    image.resize(width, height, FilterType::Lanczos3)
}

fn encode_jpeg(image: &DynamicImage) -> ImageProxyResult<Vec<u8>> {
    let mut out = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Jpeg)
        .map_err(|e| ImageProxyError::Encode(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let buf: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(width, height, Rgb([10, 20, 30]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(buf)
            .write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn cover_fit_produces_exact_target_dimensions() {
        let source = sample_png(2000, 1000);
        let out = transform(&source, crate::presets::BANNER).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.width(), crate::presets::BANNER.width);
        assert_eq!(decoded.height(), crate::presets::BANNER.height);
    }

    #[test]
    fn contain_fit_never_upscales_a_smaller_source() {
        let source = sample_png(100, 50);
        let out = transform(&source, crate::presets::CONTENT_PREVIEW).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.width(), 100);
        assert_eq!(decoded.height(), 50);
    }

    #[test]
    fn malformed_bytes_are_rejected() {
        assert!(transform(b"not an image", crate::presets::AVATAR).is_err());
    }
}
