//! Image preprocessing applied before every OCR call.
//!
//! Covers are photographed against busy artwork, so the contrast is pushed up
//! by a fixed factor and the result collapsed to a single luminance channel.

use std::path::Path;

use image::{DynamicImage, GrayImage, Luma, Pixel, Rgb, RgbImage};
use tracing::debug;

use crate::error::{CatalogError, Result};

/// Contrast multiplier used when no override is configured.
pub const DEFAULT_CONTRAST: f32 = 1.9;

/// Decode an image from disk.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| CatalogError::ImageLoad {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Raise contrast by `factor` and convert to 8-bit grayscale.
///
/// Contrast is blended against a flat grey image whose level is the rounded
/// mean luminance of the input, so `factor == 1.0` leaves the colours alone
/// and `factor == 0.0` yields a uniform grey. Luminance uses the ITU-R 601-2
/// weights throughout. The input is not mutated.
pub fn enhance(image: &DynamicImage, factor: f32) -> GrayImage {
    let rgb = image.to_rgb8();
    let mean = mean_luminance(&grayscale(&rgb));
    debug!(
        "Enhancing {}x{} image (mean luminance {:.0}, factor {})",
        rgb.width(),
        rgb.height(),
        mean,
        factor
    );

    let mut boosted = RgbImage::new(rgb.width(), rgb.height());
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let channels = pixel.channels();
        boosted.put_pixel(
            x,
            y,
            Rgb([
                blend(channels[0], mean, factor),
                blend(channels[1], mean, factor),
                blend(channels[2], mean, factor),
            ]),
        );
    }

    grayscale(&boosted)
}

/// ITU-R 601-2 luma: L = R * 299/1000 + G * 587/1000 + B * 114/1000.
fn luma601(r: u8, g: u8, b: u8) -> u8 {
    // 16.16 fixed point, rounded.
    ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as u8
}

fn grayscale(rgb: &RgbImage) -> GrayImage {
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([luma601(r, g, b)])
    })
}

fn mean_luminance(gray: &GrayImage) -> f32 {
    let count = gray.as_raw().len();
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = gray.as_raw().iter().map(|&v| v as u64).sum();
    (sum as f64 / count as f64).round() as f32
}

/// Blended level, truncated toward zero then clamped.
fn blend(channel: u8, mean: f32, factor: f32) -> u8 {
    let value = mean + factor * (channel as f32 - mean);
    value.clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tone() -> DynamicImage {
        // Left half dark grey, right half light grey: mean is 128.
        let mut img = GrayImage::new(4, 2);
        for (x, _, px) in img.enumerate_pixels_mut() {
            *px = if x < 2 { Luma([100]) } else { Luma([156]) };
        }
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_enhance_spreads_values_from_mean() {
        let out = enhance(&two_tone(), DEFAULT_CONTRAST);
        // 128 + 1.9 * (100 - 128) = 74.8 ; 128 + 1.9 * 28 = 181.2
        assert_eq!(out.get_pixel(0, 0), &Luma([74]));
        assert_eq!(out.get_pixel(3, 1), &Luma([181]));
    }

    #[test]
    fn test_identity_factor_keeps_levels() {
        let out = enhance(&two_tone(), 1.0);
        assert_eq!(out.get_pixel(1, 0), &Luma([100]));
        assert_eq!(out.get_pixel(2, 0), &Luma([156]));
    }

    #[test]
    fn test_clamps_to_valid_range() {
        let mut img = GrayImage::new(2, 1);
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(1, 0, Luma([255]));
        let out = enhance(&DynamicImage::ImageLuma8(img), 10.0);
        assert_eq!(out.get_pixel(0, 0), &Luma([0]));
        assert_eq!(out.get_pixel(1, 0), &Luma([255]));
    }

    #[test]
    fn test_color_input_becomes_single_channel() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([200, 40, 40])));
        let out = enhance(&img, DEFAULT_CONTRAST);
        assert_eq!(out.dimensions(), (3, 3));
        // Input left as it was.
        assert_eq!(img.to_rgb8().get_pixel(0, 0), &Rgb([200, 40, 40]));
    }

    #[test]
    fn test_grayscale_uses_601_weights() {
        let red = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([255, 0, 0])));
        assert_eq!(enhance(&red, 1.0).get_pixel(0, 0), &Luma([76]));

        let green = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([0, 255, 0])));
        assert_eq!(enhance(&green, 1.0).get_pixel(1, 1), &Luma([150]));

        let blue = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([0, 0, 255])));
        assert_eq!(enhance(&blue, 1.0).get_pixel(0, 1), &Luma([29]));
    }

    #[test]
    fn test_mean_follows_601_luma() {
        // Red (76) and white (255) halves: mean 165.5 rounds to 166.
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([255, 255, 255]));
        let out = enhance(&DynamicImage::ImageRgb8(img), 0.0);
        assert_eq!(out.get_pixel(0, 0), &Luma([166]));
        assert_eq!(out.get_pixel(1, 0), &Luma([166]));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, CatalogError::ImageLoad { .. }));
    }
}
