use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use imageproc::contrast::equalize_histogram;
use imageproc::definitions::Image;
use imageproc::filter::gaussian_blur_f32;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use log::{debug, warn};
use std::io::Cursor;
use std::path::PathBuf;
use uuid::Uuid;

const BLUR_SIGMA: f32 = 1.5;
const THRESHOLD_RADIUS: u32 = 5;
const THRESHOLD_OFFSET: i32 = 2;

/// Prepares camera and upload images for OCR: downscale, grayscale,
/// contrast equalization, smoothing and a local-mean threshold.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    max_dimension: u32,
    output_dir: Option<PathBuf>,
}

impl Preprocessor {
    /// Processed images are also written to `output_dir` when one is given.
    pub fn new(max_dimension: u32, output_dir: Option<PathBuf>) -> Preprocessor {
        Preprocessor {
            max_dimension,
            output_dir,
        }
    }

    /// Returns the processed image encoded as PNG.
    pub fn process(&self, data: &[u8]) -> Result<Vec<u8>, failure::Error> {
        let image = image::load_from_memory(data)
            .map_err(|e| format_err!("Unable to decode image: {}", e))?;
        debug!("Preprocessing {}x{} image", image.width(), image.height());

        let image = if image.width().max(image.height()) > self.max_dimension {
            image.resize(self.max_dimension, self.max_dimension, FilterType::Triangle)
        } else {
            image
        };
        let gray = equalize_histogram(&image.to_luma8());
        let smoothed = gaussian_blur_f32(&gray, BLUR_SIGMA);
        let processed = DynamicImage::ImageLuma8(adaptive_threshold(
            &smoothed,
            THRESHOLD_RADIUS,
            THRESHOLD_OFFSET,
        ));

        if let Some(dir) = &self.output_dir {
            let path = dir.join(format!("{}.png", Uuid::new_v4().simple()));
            if let Err(e) = processed.save(&path) {
                warn!("Error saving processed image to {:?}: {:?}", path, e);
            }
        }

        let mut png = Vec::new();
        processed.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }
}

/// Pixels darker than their neighbourhood mean minus `offset` go black.
fn adaptive_threshold(gray: &GrayImage, radius: u32, offset: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let integral: Image<Luma<u64>> = integral_image::<_, u64>(gray);
    GrayImage::from_fn(width, height, |x, y| {
        let (left, top) = (x.saturating_sub(radius), y.saturating_sub(radius));
        let right = (x + radius).min(width - 1);
        let bottom = (y + radius).min(height - 1);
        let area = u64::from((right - left + 1) * (bottom - top + 1));
        let [sum] = sum_image_pixels(&integral, left, top, right, bottom);
        let threshold = (sum / area) as i32 - offset;
        let value = i32::from(gray.get_pixel(x, y).0[0]);
        Luma([if value < threshold { 0 } else { 255 }])
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// A PNG with a dark band across a light background.
    pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_fn(width, height, |_, y| {
            if y > height / 3 && y < 2 * height / 3 {
                Rgb([20, 20, 20])
            } else {
                Rgb([230, 230, 230])
            }
        });
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        png
    }

    #[test]
    fn downscales_to_the_longest_side() {
        let out = Preprocessor::new(100, None)
            .process(&sample_png(400, 200))
            .unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 50));
    }

    #[test]
    fn leaves_small_images_at_their_size() {
        let out = Preprocessor::new(800, None)
            .process(&sample_png(64, 32))
            .unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 32));
    }

    #[test]
    fn output_is_binary() {
        let out = Preprocessor::new(800, None)
            .process(&sample_png(60, 30))
            .unwrap();
        let gray = image::load_from_memory(&out).unwrap().to_luma8();
        assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn rejects_undecodable_data() {
        assert!(Preprocessor::new(800, None)
            .process(b"definitely not an image")
            .is_err());
    }

    #[test]
    fn saves_a_copy_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        Preprocessor::new(800, Some(dir.path().to_path_buf()))
            .process(&sample_png(32, 16))
            .unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn threshold_separates_dark_from_light() {
        let mut gray = GrayImage::from_pixel(9, 9, Luma([200]));
        gray.put_pixel(4, 4, Luma([10]));
        let out = adaptive_threshold(&gray, 2, 2);
        assert_eq!(out.get_pixel(4, 4).0[0], 0);
        assert_eq!(out.get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn threshold_window_is_clipped_at_the_borders() {
        // Corner windows only cover pixels inside the image.
        let gray = GrayImage::from_fn(6, 4, |x, y| Luma([(x * 40 + y * 5) as u8]));
        let out = adaptive_threshold(&gray, 1, 0);
        for (x, y, pixel) in out.enumerate_pixels() {
            let (x1, y1) = (x.saturating_sub(1), y.saturating_sub(1));
            let (x2, y2) = ((x + 1).min(5), (y + 1).min(3));
            let mut sum = 0u32;
            for yy in y1..=y2 {
                for xx in x1..=x2 {
                    sum += u32::from(gray.get_pixel(xx, yy).0[0]);
                }
            }
            let mean = sum / ((x2 - x1 + 1) * (y2 - y1 + 1));
            let expected = if u32::from(gray.get_pixel(x, y).0[0]) < mean { 0 } else { 255 };
            assert_eq!(pixel.0[0], expected, "pixel ({}, {})", x, y);
        }
    }
}
