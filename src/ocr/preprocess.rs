use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::PreprocessError;

/// Largest crop allowed on any single side, in percent.
pub const MAX_CROP_PERCENT: f32 = 40.0;

/// Default raster width the image is scaled to before OCR.
pub const DEFAULT_TARGET_WIDTH: u32 = 1600;

/// Largest raster, in pixels, the rescale step may produce (about 256 MiB of RGBA).
pub const MAX_SCALED_PIXELS: u64 = 64 * 1024 * 1024;

/// Percentages trimmed from each edge of the rescaled image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropSettings {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl CropSettings {
    pub fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Checks every side against the 0-40% range and both axes against 100%.
    pub fn validate(&self) -> Result<(), PreprocessError> {
        for (side, value) in [
            ("top", self.top),
            ("right", self.right),
            ("bottom", self.bottom),
            ("left", self.left),
        ] {
            if !value.is_finite() || !(0.0..=MAX_CROP_PERCENT).contains(&value) {
                return Err(PreprocessError::CropOutOfRange { side, value });
            }
        }
        if self.left + self.right >= 100.0 {
            return Err(PreprocessError::CropTooLarge {
                axis: "width",
                first: self.left,
                second: self.right,
            });
        }
        if self.top + self.bottom >= 100.0 {
            return Err(PreprocessError::CropTooLarge {
                axis: "height",
                first: self.top,
                second: self.bottom,
            });
        }
        Ok(())
    }
}

/// Binarization heuristic applied after cropping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreprocessMode {
    #[default]
    Auto,
    HighContrast,
    ColoredText,
}

impl std::fmt::Display for PreprocessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessMode::Auto => write!(f, "auto"),
            PreprocessMode::HighContrast => write!(f, "high-contrast"),
            PreprocessMode::ColoredText => write!(f, "colored-text"),
        }
    }
}

impl std::str::FromStr for PreprocessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(PreprocessMode::Auto),
            "high-contrast" | "high_contrast" => Ok(PreprocessMode::HighContrast),
            "colored-text" | "colored_text" => Ok(PreprocessMode::ColoredText),
            other => Err(format!("unknown preprocess mode: {}", other)),
        }
    }
}

/// Produces a black/white copy of `img` tuned for OCR.
///
/// The image is scaled to `target_width` (aspect ratio kept), cropped by the
/// percentages in `crop`, and each pixel is forced to pure black or white
/// according to `mode`. Alpha is carried over unchanged. Sources whose
/// rescaled size would exceed [`MAX_SCALED_PIXELS`] are rejected.
pub fn preprocess(
    img: &RgbaImage,
    crop: &CropSettings,
    target_width: u32,
    mode: PreprocessMode,
) -> Result<RgbaImage, PreprocessError> {
    crop.validate()?;
    if target_width == 0 {
        return Err(PreprocessError::ZeroTargetWidth);
    }
    let (src_w, src_h) = img.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(PreprocessError::EmptySource);
    }

    let scaled_h = (src_h as f64 * target_width as f64 / src_w as f64).round().max(1.0);
    if target_width as f64 * scaled_h > MAX_SCALED_PIXELS as f64 {
        return Err(PreprocessError::TooLarge {
            width: target_width,
            height: scaled_h.min(u32::MAX as f64) as u32,
        });
    }
    let scaled_h = scaled_h as u32;
    let scaled = if (src_w, src_h) == (target_width, scaled_h) {
        img.clone()
    } else {
        imageops::resize(img, target_width, scaled_h, FilterType::Triangle)
    };

    let cropped = crop_region(&scaled, crop)?;
    Ok(binarize(&cropped, mode))
}

/// Crops the percentage margins in `crop` from `img`.
///
/// Fails instead of returning an empty image when the margins consume a
/// whole axis.
pub fn crop_region(img: &RgbaImage, crop: &CropSettings) -> Result<RgbaImage, PreprocessError> {
    crop.validate()?;
    let (w, h) = img.dimensions();

    // Margins round down, so a valid crop always keeps at least one pixel
    let x0 = ((crop.left / 100.0) * w as f32).floor() as u32;
    let y0 = ((crop.top / 100.0) * h as f32).floor() as u32;
    let x1 = w.saturating_sub(((crop.right / 100.0) * w as f32).floor() as u32);
    let y1 = h.saturating_sub(((crop.bottom / 100.0) * h as f32).floor() as u32);

    let width = x1.saturating_sub(x0);
    let height = y1.saturating_sub(y0);
    if width == 0 || height == 0 {
        return Err(PreprocessError::EmptyRegion { width, height });
    }

    Ok(imageops::crop_imm(img, x0, y0, width, height).to_image())
}

/// Applies the per-pixel threshold rule for `mode`.
pub fn binarize(img: &RgbaImage, mode: PreprocessMode) -> RgbaImage {
    let (width, height) = img.dimensions();
    let mut output: RgbaImage = ImageBuffer::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let value = if is_foreground_white(pixel, mode) {
            255u8
        } else {
            0u8
        };
        output.put_pixel(x, y, Rgba([value, value, value, pixel[3]]));
    }

    output
}

/// ITU-R BT.601 luma: 0.299*R + 0.587*G + 0.114*B
fn luminance(pixel: &Rgba<u8>) -> f32 {
    0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32
}

/// True when any pair of channels differs by more than 30.
fn is_colorful(pixel: &Rgba<u8>) -> bool {
    let [r, g, b] = [pixel[0] as i16, pixel[1] as i16, pixel[2] as i16];
    (r - g).abs() > 30 || (g - b).abs() > 30 || (r - b).abs() > 30
}

fn stretch(value: f32) -> f32 {
    value.clamp(0.0, 255.0)
}

fn is_foreground_white(pixel: &Rgba<u8>, mode: PreprocessMode) -> bool {
    let lum = luminance(pixel);
    let colorful = is_colorful(pixel);

    match mode {
        PreprocessMode::ColoredText => {
            if colorful {
                let max = pixel[0].max(pixel[1]).max(pixel[2]);
                let min = pixel[0].min(pixel[1]).min(pixel[2]);
                max - min > 50
            } else {
                lum > 150.0
            }
        }
        PreprocessMode::HighContrast => stretch((lum - 30.0) * 2.0) > 200.0,
        PreprocessMode::Auto => {
            let enhanced = stretch((lum - 50.0) * 1.5 + 50.0);
            let threshold = if colorful { 120.0 } else { 180.0 };
            enhanced > threshold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        ImageBuffer::from_pixel(width, height, Rgba(color))
    }

    #[test]
    fn test_preprocess_scales_to_target_width() {
        let img = solid(800, 400, [255, 255, 255, 255]);
        let out = preprocess(&img, &CropSettings::default(), 1600, PreprocessMode::Auto).unwrap();
        assert_eq!(out.dimensions(), (1600, 800));
    }

    #[test]
    fn test_crop_region() {
        // 100x200 image
        let img: RgbaImage =
            ImageBuffer::from_fn(100, 200, |x, y| Rgba([x as u8, y as u8, 0, 255]));

        let crop = CropSettings::new(25.0, 40.0, 10.0, 10.0);
        let cropped = crop_region(&img, &crop).unwrap();

        assert_eq!(cropped.dimensions(), (50, 130));
        // Top-left pixel should be (10, 50) from original
        assert_eq!(cropped.get_pixel(0, 0)[0], 10);
        assert_eq!(cropped.get_pixel(0, 0)[1], 50);
    }

    #[test]
    fn test_max_crop_still_leaves_image() {
        let img = solid(10, 10, [0, 0, 0, 255]);
        let crop = CropSettings::new(40.0, 40.0, 40.0, 40.0);
        let out = preprocess(&img, &crop, 10, PreprocessMode::Auto).unwrap();
        assert_eq!(out.dimensions(), (2, 2));
    }

    #[test]
    fn test_crop_out_of_range_rejected() {
        let img = solid(10, 10, [0, 0, 0, 255]);
        let crop = CropSettings::new(0.0, 0.0, 0.0, 45.0);
        let err = preprocess(&img, &crop, 10, PreprocessMode::Auto).unwrap_err();
        assert!(matches!(
            err,
            PreprocessError::CropOutOfRange { side: "left", .. }
        ));

        let negative = CropSettings::new(-1.0, 0.0, 0.0, 0.0);
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_tiny_image_survives_max_crop() {
        for size in 1..=6 {
            let img = solid(size, size, [0, 0, 0, 255]);
            let crop = CropSettings::new(40.0, 40.0, 40.0, 40.0);
            let out = preprocess(&img, &crop, size, PreprocessMode::Auto).unwrap();
            assert!(out.width() > 0 && out.height() > 0);
        }
    }

    #[test]
    fn test_first_invalid_side_reported() {
        // Sides are checked in order top, right, bottom, left
        let crop = CropSettings::new(0.0, 60.0, 0.0, 45.0);
        assert!(matches!(
            crop.validate(),
            Err(PreprocessError::CropOutOfRange { side: "right", .. })
        ));
    }

    #[test]
    fn test_zero_target_width_rejected() {
        let img = solid(4, 4, [0, 0, 0, 255]);
        let err = preprocess(&img, &CropSettings::default(), 0, PreprocessMode::Auto).unwrap_err();
        assert!(matches!(err, PreprocessError::ZeroTargetWidth));
    }

    #[test]
    fn test_oversized_rescale_rejected() {
        // A thin strip blown up to 1600 wide would be 1600x8000000
        let strip = solid(4, 20000, [255, 255, 255, 255]);
        let err = preprocess(&strip, &CropSettings::default(), 1600, PreprocessMode::Auto)
            .unwrap_err();
        assert!(matches!(
            err,
            PreprocessError::TooLarge {
                width: 1600,
                height: 8_000_000
            }
        ));

        let huge_target = solid(2, 2, [255, 255, 255, 255]);
        assert!(matches!(
            preprocess(&huge_target, &CropSettings::default(), u32::MAX, PreprocessMode::Auto),
            Err(PreprocessError::TooLarge { .. })
        ));

        // A long but ordinary screenshot stays within budget
        let tall = solid(400, 1000, [255, 255, 255, 255]);
        let out = preprocess(&tall, &CropSettings::default(), 1600, PreprocessMode::Auto).unwrap();
        assert_eq!(out.dimensions(), (1600, 4000));
    }

    #[test]
    fn test_auto_mode_thresholds() {
        let mut img: RgbaImage = ImageBuffer::new(4, 1);
        // Gray 200: (200-50)*1.5+50 = 275 -> 255 > 180 -> white
        img.put_pixel(0, 0, Rgba([200, 200, 200, 255]));
        // Gray 130: (130-50)*1.5+50 = 170 < 180 -> black
        img.put_pixel(1, 0, Rgba([130, 130, 130, 255]));
        // Colorful, L = 0.299*200 + 0.587*100 + 0.114*100 = 130.2 -> 170.3 > 120 -> white
        img.put_pixel(2, 0, Rgba([200, 100, 100, 255]));
        // Colorful dark, L = 0.299*60 + 0 + 0 = 17.94 -> 0 -> black
        img.put_pixel(3, 0, Rgba([60, 0, 0, 255]));

        let out = binarize(&img, PreprocessMode::Auto);
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(2, 0).0, [255, 255, 255, 255]);
        assert_eq!(out.get_pixel(3, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_high_contrast_mode() {
        let mut img: RgbaImage = ImageBuffer::new(2, 1);
        // (140-30)*2 = 220 > 200 -> white
        img.put_pixel(0, 0, Rgba([140, 140, 140, 255]));
        // (120-30)*2 = 180 -> black
        img.put_pixel(1, 0, Rgba([120, 120, 120, 255]));

        let out = binarize(&img, PreprocessMode::HighContrast);
        assert_eq!(out.get_pixel(0, 0)[0], 255);
        assert_eq!(out.get_pixel(1, 0)[0], 0);
    }

    #[test]
    fn test_colored_text_mode() {
        let mut img: RgbaImage = ImageBuffer::new(4, 1);
        // Saturated red: spread 200 > 50 -> white
        img.put_pixel(0, 0, Rgba([220, 20, 20, 255]));
        // Colorful but spread 40: |R-B| = 40 > 30, max-min = 40 -> black
        img.put_pixel(1, 0, Rgba([100, 80, 60, 255]));
        // Neutral bright: L = 160 > 150 -> white
        img.put_pixel(2, 0, Rgba([160, 160, 160, 255]));
        // Neutral dark: L = 140 -> black
        img.put_pixel(3, 0, Rgba([140, 140, 140, 255]));

        let out = binarize(&img, PreprocessMode::ColoredText);
        assert_eq!(out.get_pixel(0, 0)[0], 255);
        assert_eq!(out.get_pixel(1, 0)[0], 0);
        assert_eq!(out.get_pixel(2, 0)[0], 255);
        assert_eq!(out.get_pixel(3, 0)[0], 0);
    }

    #[test]
    fn test_alpha_preserved_and_source_untouched() {
        let img = solid(2, 2, [200, 200, 200, 17]);
        let before = img.clone();
        let out = preprocess(&img, &CropSettings::default(), 2, PreprocessMode::Auto).unwrap();

        assert_eq!(img, before);
        for pixel in out.pixels() {
            assert_eq!(pixel[3], 17);
            assert!(pixel[0] == 0 || pixel[0] == 255);
            assert_eq!(pixel[0], pixel[1]);
            assert_eq!(pixel[1], pixel[2]);
        }
    }

    #[test]
    fn test_mode_round_trips_through_str() {
        assert_eq!("colored-text".parse::<PreprocessMode>().unwrap(), PreprocessMode::ColoredText);
        assert_eq!(PreprocessMode::HighContrast.to_string(), "high-contrast");
        assert!("sepia".parse::<PreprocessMode>().is_err());
    }
}
