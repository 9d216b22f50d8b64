//! Best-match selection over the reference set.

use crate::error::DataError;
use crate::{histogram, structural};
use facegate_core::constants::{
    DEFAULT_HISTOGRAM_BINS, DEFAULT_HISTOGRAM_THRESHOLD, DEFAULT_STRUCTURAL_THRESHOLD,
};
use facegate_core::{Identity, MatchResult};
use image::RgbImage;
use image::imageops::{self, FilterType};
use std::borrow::Cow;
use std::fmt;
use tracing::debug;

/// How a probe is scored against one reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Joint RGB histogram with `bins` per channel, Bhattacharyya similarity.
    Histogram { bins: u16 },

    /// Mean structural similarity over the intensity channel.
    Structural,
}

impl Strategy {
    /// Histogram strategy at the default resolution.
    pub fn histogram() -> Self {
        Self::Histogram {
            bins: DEFAULT_HISTOGRAM_BINS,
        }
    }

    /// Acceptance threshold used when none is configured.
    pub fn default_threshold(&self) -> f64 {
        match self {
            Self::Histogram { .. } => DEFAULT_HISTOGRAM_THRESHOLD,
            Self::Structural => DEFAULT_STRUCTURAL_THRESHOLD,
        }
    }

    /// Score `reference` against `probe`. Both must have the same dimensions.
    pub fn score(&self, probe: &RgbImage, reference: &RgbImage) -> f64 {
        match *self {
            Self::Histogram { bins } => histogram::similarity(probe, reference, bins),
            Self::Structural => structural::similarity(probe, reference),
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::histogram()
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Histogram { bins } => write!(f, "histogram ({bins} bins)"),
            Self::Structural => write!(f, "structural"),
        }
    }
}

/// One enrolled identity and its raster.
///
/// A reference whose file could not be decoded keeps the [`DataError`] in
/// place of the raster; scans skip it.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    identity: Identity,
    raster: Result<RgbImage, DataError>,
}

impl ReferenceImage {
    pub fn new(identity: Identity, raster: RgbImage) -> Self {
        Self {
            identity,
            raster: Ok(raster),
        }
    }

    /// A reference that failed to load.
    pub fn corrupt(identity: Identity, error: DataError) -> Self {
        Self {
            identity,
            raster: Err(error),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn raster(&self) -> Result<&RgbImage, &DataError> {
        self.raster.as_ref()
    }

    pub fn is_corrupt(&self) -> bool {
        self.raster.is_err()
    }
}

/// Score `probe` against every reference and select the best match.
///
/// - No usable probe (absent or zero-sized): [`MatchResult::no_probe`].
/// - No references: unknown with score 0.
/// - Corrupt references and non-finite scores are skipped.
///
/// Every reference is scored. Equal scores go to the lexicographically
/// smallest identity, so the outcome does not depend on reference order.
/// The best identity is accepted when its score is at least `threshold`.
pub fn evaluate(
    probe: Option<&RgbImage>,
    references: &[ReferenceImage],
    strategy: Strategy,
    threshold: f64,
) -> MatchResult {
    let Some(probe) = probe.filter(|p| p.width() > 0 && p.height() > 0) else {
        debug!("No usable probe image");
        return MatchResult::no_probe();
    };

    if references.is_empty() {
        debug!("Reference set is empty");
        return MatchResult::unknown(0.0);
    }

    let (width, height) = probe.dimensions();
    let mut best: Option<(&Identity, f64)> = None;

    for reference in references {
        let raster = match reference.raster() {
            Ok(raster) if raster.width() > 0 && raster.height() > 0 => raster,
            Ok(_) => {
                debug!("Skipping empty reference {}", reference.identity());
                continue;
            }
            Err(e) => {
                debug!("Skipping reference {}: {}", reference.identity(), e);
                continue;
            }
        };

        let resized = if raster.dimensions() == (width, height) {
            Cow::Borrowed(raster)
        } else {
            Cow::Owned(imageops::resize(raster, width, height, FilterType::Triangle))
        };

        let score = strategy.score(probe, &resized);
        if !score.is_finite() {
            debug!("Ignoring non-finite score for {}", reference.identity());
            continue;
        }
        debug!("{}: {:.4}", reference.identity(), score);

        let better = match best {
            None => true,
            Some((identity, best_score)) => {
                score > best_score || (score == best_score && reference.identity() < identity)
            }
        };
        if better {
            best = Some((reference.identity(), score));
        }
    }

    match best {
        Some((identity, score)) if score >= threshold => {
            MatchResult::identity(identity.clone(), score)
        }
        Some((_, score)) => MatchResult::unknown(score),
        None => MatchResult::unknown(0.0),
    }
}

/// Strategy and threshold for repeated evaluations.
///
/// Holds configuration only; nothing carries over between calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchEngine {
    strategy: Strategy,
    threshold: f64,
}

impl MatchEngine {
    /// Engine using the strategy's default threshold.
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            threshold: strategy.default_threshold(),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn evaluate(&self, probe: Option<&RgbImage>, references: &[ReferenceImage]) -> MatchResult {
        evaluate(probe, references, self.strategy, self.threshold)
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new(Strategy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facegate_core::MatchLabel;
    use image::Rgb;
    use rstest::rstest;

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    fn pattern(seed: u8) -> RgbImage {
        RgbImage::from_fn(12, 12, |x, y| {
            let v = (x as u8)
                .wrapping_mul(seed)
                .wrapping_add((y as u8).wrapping_mul(seed.wrapping_add(7)));
            Rgb([v, v.wrapping_add(seed), v ^ 0x55])
        })
    }

    fn corrupt(name: &str) -> ReferenceImage {
        ReferenceImage::corrupt(id(name), DataError::new(format!("db/{name}.jpg"), "bad data"))
    }

    #[rstest]
    #[case(Strategy::histogram())]
    #[case(Strategy::Structural)]
    fn test_identical_probe_is_accepted(#[case] strategy: Strategy) {
        let bob = pattern(3);
        let references = vec![
            ReferenceImage::new(id("alice"), pattern(11)),
            ReferenceImage::new(id("bob"), bob.clone()),
        ];

        let result = MatchEngine::new(strategy).evaluate(Some(&bob), &references);
        assert_eq!(result.matched(), Some(&id("bob")));
        assert!((result.score - 1.0).abs() < 1e-9);
    }

    #[rstest]
    #[case(Strategy::histogram())]
    #[case(Strategy::Structural)]
    fn test_empty_references_is_unknown(#[case] strategy: Strategy) {
        let result = evaluate(Some(&pattern(3)), &[], strategy, 0.0);
        assert_eq!(result.label, MatchLabel::Unknown);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_missing_probe() {
        let references = vec![ReferenceImage::new(id("bob"), pattern(3))];
        let result = MatchEngine::default().evaluate(None, &references);
        assert_eq!(result.label, MatchLabel::NoProbe);
    }

    #[test]
    fn test_zero_sized_probe() {
        let references = vec![ReferenceImage::new(id("bob"), pattern(3))];
        let empty = RgbImage::new(0, 4);
        let result = MatchEngine::default().evaluate(Some(&empty), &references);
        assert_eq!(result.label, MatchLabel::NoProbe);
    }

    #[test]
    fn test_no_probe_wins_over_empty_references() {
        let result = MatchEngine::default().evaluate(None, &[]);
        assert_eq!(result.label, MatchLabel::NoProbe);
    }

    #[test]
    fn test_below_threshold_is_unknown_with_best_score() {
        let red = RgbImage::from_pixel(4, 4, Rgb([255, 0, 0]));
        let half = RgbImage::from_fn(4, 4, |x, _| {
            if x < 2 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
        });
        let references = vec![ReferenceImage::new(id("half"), half)];

        let result = evaluate(Some(&red), &references, Strategy::histogram(), 0.6);
        assert_eq!(result.label, MatchLabel::Unknown);
        assert!(result.score > 0.0 && result.score < 0.6);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let image = pattern(5);
        let references = vec![ReferenceImage::new(id("bob"), image.clone())];
        let result = evaluate(Some(&image), &references, Strategy::histogram(), 1.0);
        assert!(result.is_match());
    }

    #[test]
    fn test_corrupt_reference_is_skipped() {
        let bob = pattern(3);
        let references = vec![
            corrupt("aaron"),
            ReferenceImage::new(id("bob"), bob.clone()),
            corrupt("zed"),
        ];

        let result = MatchEngine::default().evaluate(Some(&bob), &references);
        assert_eq!(result.matched(), Some(&id("bob")));
    }

    #[test]
    fn test_only_corrupt_references_is_unknown() {
        let references = vec![corrupt("aaron"), corrupt("zed")];
        let result = MatchEngine::default().evaluate(Some(&pattern(3)), &references);
        assert_eq!(result.label, MatchLabel::Unknown);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_reference_resized_to_probe() {
        let probe = RgbImage::from_pixel(8, 6, Rgb([10, 200, 90]));
        let reference = RgbImage::from_pixel(40, 30, Rgb([10, 200, 90]));
        let references = vec![ReferenceImage::new(id("bob"), reference)];

        for strategy in [Strategy::histogram(), Strategy::Structural] {
            let result = MatchEngine::new(strategy).evaluate(Some(&probe), &references);
            assert_eq!(result.matched(), Some(&id("bob")), "{strategy}");
        }
    }

    #[test]
    fn test_tie_goes_to_smallest_identity() {
        let image = pattern(9);
        let forward = vec![
            ReferenceImage::new(id("carol"), image.clone()),
            ReferenceImage::new(id("bob"), image.clone()),
        ];
        let backward: Vec<_> = forward.iter().rev().cloned().collect();

        for references in [forward, backward] {
            let result = MatchEngine::default().evaluate(Some(&image), &references);
            assert_eq!(result.matched(), Some(&id("bob")));
        }
    }

    #[test]
    fn test_default_thresholds() {
        assert_eq!(MatchEngine::new(Strategy::histogram()).threshold(), 0.6);
        assert_eq!(MatchEngine::new(Strategy::Structural).threshold(), 0.5);
        assert_eq!(
            MatchEngine::new(Strategy::Structural).with_threshold(0.8).threshold(),
            0.8
        );
    }
}
