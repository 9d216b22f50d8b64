//! Structural similarity strategy.
//!
//! Both images are reduced to intensity and compared with the structural
//! similarity index (SSIM), averaged over every 7x7 window that lies fully
//! inside the image. Window statistics use the sample (N - 1) covariance and
//! are read off summed-area tables, so the cost is linear in the pixel count.
//!
//! The score is 1.0 for identical images and can go down to -1.0 for
//! inverted structure.

use facegate_core::constants::SSIM_WINDOW;
use image::RgbImage;

const DATA_RANGE: f64 = 255.0;
const C1: f64 = (0.01 * DATA_RANGE) * (0.01 * DATA_RANGE);
const C2: f64 = (0.03 * DATA_RANGE) * (0.03 * DATA_RANGE);

/// Intensity of every pixel, `0.299 R + 0.587 G + 0.114 B`, row-major.
///
/// Values are rounded to whole 8-bit grey levels, the same quantisation as
/// an 8-bit greyscale conversion.
pub fn intensity(image: &RgbImage) -> Vec<f64> {
    image
        .pixels()
        .map(|pixel| {
            let [r, g, b] = pixel.0;
            let grey = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
            grey.round().min(255.0)
        })
        .collect()
}

/// Summed-area table with a zero border row and column.
struct Integral {
    stride: usize,
    sums: Vec<f64>,
}

impl Integral {
    fn new(values: impl Iterator<Item = f64>, width: usize, height: usize) -> Self {
        let stride = width + 1;
        let mut sums = vec![0.0; stride * (height + 1)];
        let mut values = values;

        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += values.next().unwrap_or(0.0);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }

        Self { stride, sums }
    }

    /// Sum over the `size_x` by `size_y` block whose top-left pixel is `(x, y)`.
    fn block(&self, x: usize, y: usize, size_x: usize, size_y: usize) -> f64 {
        let s = self.stride;
        let (x1, y1) = (x + size_x, y + size_y);
        self.sums[y1 * s + x1] - self.sums[y * s + x1] - self.sums[y1 * s + x] + self.sums[y * s + x]
    }
}

/// Mean SSIM of two images of the same dimensions.
///
/// Images smaller than the window in either direction are treated as a
/// single window covering the whole image. Mismatched or empty images score
/// 0.0.
pub fn similarity(probe: &RgbImage, reference: &RgbImage) -> f64 {
    if probe.dimensions() != reference.dimensions() {
        return 0.0;
    }

    let (width, height) = (probe.width() as usize, probe.height() as usize);
    if width == 0 || height == 0 {
        return 0.0;
    }

    let a = intensity(probe);
    let b = intensity(reference);

    let window = SSIM_WINDOW as usize;
    let (win_x, win_y) = if width < window || height < window {
        (width, height)
    } else {
        (window, window)
    };

    let sum_a = Integral::new(a.iter().copied(), width, height);
    let sum_b = Integral::new(b.iter().copied(), width, height);
    let sum_aa = Integral::new(a.iter().map(|v| v * v), width, height);
    let sum_bb = Integral::new(b.iter().map(|v| v * v), width, height);
    let sum_ab = Integral::new(a.iter().zip(&b).map(|(x, y)| x * y), width, height);

    let n = (win_x * win_y) as f64;
    let cov_norm = if n > 1.0 { n / (n - 1.0) } else { 1.0 };

    let mut total = 0.0;
    let mut windows = 0usize;

    for y in 0..=height - win_y {
        for x in 0..=width - win_x {
            let mu_a = sum_a.block(x, y, win_x, win_y) / n;
            let mu_b = sum_b.block(x, y, win_x, win_y) / n;

            let var_a = cov_norm * (sum_aa.block(x, y, win_x, win_y) / n - mu_a * mu_a);
            let var_b = cov_norm * (sum_bb.block(x, y, win_x, win_y) / n - mu_b * mu_b);
            let cov = cov_norm * (sum_ab.block(x, y, win_x, win_y) / n - mu_a * mu_b);

            let numerator = (2.0 * mu_a * mu_b + C1) * (2.0 * cov + C2);
            let denominator = (mu_a * mu_a + mu_b * mu_b + C1) * (var_a + var_b + C2);

            total += numerator / denominator;
            windows += 1;
        }
    }

    total / windows as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rstest::rstest;

    fn checkerboard(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([230, 230, 230])
            } else {
                Rgb([20, 20, 20])
            }
        })
    }

    fn invert(image: &RgbImage) -> RgbImage {
        RgbImage::from_fn(image.width(), image.height(), |x, y| {
            Rgb(image.get_pixel(x, y).0.map(|v| 255 - v))
        })
    }

    #[rstest]
    #[case([100, 200, 50], 153.0)]
    #[case([10, 0, 0], 3.0)]
    #[case([0, 0, 3], 0.0)]
    #[case([0, 1, 0], 1.0)]
    #[case([255, 255, 255], 255.0)]
    fn test_intensity_grey_levels(#[case] rgb: [u8; 3], #[case] expected: f64) {
        let image = RgbImage::from_pixel(1, 1, Rgb(rgb));
        assert_eq!(intensity(&image)[0], expected);
    }

    #[test]
    fn test_identical_images_score_one() {
        let image = checkerboard(16, 12);
        assert!((similarity(&image, &image) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_inverted_structure_scores_negative() {
        let image = checkerboard(16, 16);
        assert!(similarity(&image, &invert(&image)) < 0.0);
    }

    #[test]
    fn test_flat_images_of_same_level_match() {
        let flat = RgbImage::from_pixel(10, 10, Rgb([90, 90, 90]));
        assert!((similarity(&flat, &flat) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_brightness_shift_lowers_score() {
        let dark = RgbImage::from_pixel(10, 10, Rgb([40, 40, 40]));
        let light = RgbImage::from_pixel(10, 10, Rgb([200, 200, 200]));
        let score = similarity(&dark, &light);
        assert!(score > 0.0 && score < 0.5, "score = {score}");
    }

    #[test]
    fn test_image_smaller_than_window() {
        let image = checkerboard(3, 5);
        assert!((similarity(&image, &image) - 1.0).abs() < 1e-9);
        assert!(similarity(&image, &invert(&image)) < 0.0);
    }

    #[test]
    fn test_single_pixel() {
        let image = RgbImage::from_pixel(1, 1, Rgb([128, 64, 32]));
        assert!((similarity(&image, &image) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mismatched_dimensions_score_zero() {
        assert_eq!(similarity(&checkerboard(8, 8), &checkerboard(9, 8)), 0.0);
    }

    #[test]
    fn test_window_sums_match_direct_sum() {
        let values: Vec<f64> = (0..20).map(f64::from).collect();
        let integral = Integral::new(values.iter().copied(), 5, 4);

        // Rows 1..3, columns 2..4 of a 5-wide ramp.
        let direct: f64 = (1..3)
            .flat_map(|y| (2..4).map(move |x| (y * 5 + x) as f64))
            .sum();
        assert_eq!(integral.block(2, 1, 2, 2), direct);
    }
}
