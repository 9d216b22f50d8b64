//! Joint colour histogram strategy.
//!
//! Each pixel falls into one cell of a `bins x bins x bins` RGB cube. With
//! the default 256 bins per channel the cube has 16.7M cells, so only the
//! occupied ones are stored, as a sorted list of `(cell, count)` pairs.
//!
//! Two histograms are compared with the Bhattacharyya distance
//!
//! ```text
//! d = sqrt(1 - sum(sqrt(h1[i] * h2[i])) / sqrt(sum(h1) * sum(h2)))
//! ```
//!
//! which is scale invariant, so raw counts need no prior normalization.

use image::RgbImage;
use std::cmp::Ordering;

/// Sparse joint RGB histogram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorHistogram {
    bins: u16,
    cells: Vec<(u32, u32)>,
    total: u64,
}

impl ColorHistogram {
    /// Build the histogram of `image` with `bins` per channel.
    ///
    /// `bins` is clamped to `1..=256`.
    pub fn from_image(image: &RgbImage, bins: u16) -> Self {
        let bins = bins.clamp(1, 256);
        let per_channel = u32::from(bins);

        let mut keys: Vec<u32> = image
            .pixels()
            .map(|pixel| {
                let [r, g, b] = pixel.0.map(|v| u32::from(v) * per_channel / 256);
                (r * per_channel + g) * per_channel + b
            })
            .collect();
        keys.sort_unstable();

        let mut cells: Vec<(u32, u32)> = Vec::new();
        for key in keys {
            match cells.last_mut() {
                Some((cell, count)) if *cell == key => *count += 1,
                _ => cells.push((key, 1)),
            }
        }

        Self {
            bins,
            cells,
            total: u64::from(image.width()) * u64::from(image.height()),
        }
    }

    pub fn bins(&self) -> u16 {
        self.bins
    }

    /// Number of pixels counted.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        self.cells.len()
    }

    /// Bhattacharyya distance to `other`, in `[0, 1]`.
    ///
    /// Histograms of different resolution, or an empty histogram, are
    /// maximally distant.
    pub fn bhattacharyya(&self, other: &Self) -> f64 {
        if self.bins != other.bins || self.total == 0 || other.total == 0 {
            return 1.0;
        }

        // Both cell lists are sorted, so the overlap is a merge join.
        let mut overlap = 0.0;
        let (mut i, mut j) = (0, 0);
        while i < self.cells.len() && j < other.cells.len() {
            let (a_cell, a_count) = self.cells[i];
            let (b_cell, b_count) = other.cells[j];
            match a_cell.cmp(&b_cell) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    overlap += (f64::from(a_count) * f64::from(b_count)).sqrt();
                    i += 1;
                    j += 1;
                }
            }
        }

        let norm = (self.total as f64 * other.total as f64).sqrt();
        (1.0 - overlap / norm).max(0.0).sqrt()
    }
}

/// Histogram similarity of two images, `1 - bhattacharyya`, in `[0, 1]`.
pub fn similarity(probe: &RgbImage, reference: &RgbImage, bins: u16) -> f64 {
    let probe = ColorHistogram::from_image(probe, bins);
    let reference = ColorHistogram::from_image(reference, bins);
    (1.0 - probe.bhattacharyya(&reference)).clamp(0.0, 1.0)
}
