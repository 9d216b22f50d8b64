//! Property tests for best-match selection.

use facegate_biometric::{ReferenceImage, Strategy as MatchStrategy, evaluate};
use facegate_core::{Identity, MatchLabel};
use image::{Rgb, RgbImage};
use proptest::prelude::*;

const SIDE: u32 = 6;

fn raster() -> impl Strategy<Value = RgbImage> {
    // A coarse palette keeps histogram overlaps (and therefore ties) likely.
    prop::collection::vec(0u8..4, (SIDE * SIDE * 3) as usize).prop_map(|values| {
        let bytes = values.into_iter().map(|v| v * 64).collect();
        RgbImage::from_raw(SIDE, SIDE, bytes).unwrap_or_else(|| RgbImage::new(SIDE, SIDE))
    })
}

fn references() -> impl Strategy<Value = Vec<ReferenceImage>> {
    prop::collection::vec(raster(), 1..6).prop_map(|rasters| {
        rasters
            .into_iter()
            .enumerate()
            .map(|(i, raster)| {
                ReferenceImage::new(Identity::new(format!("user{i}")).unwrap(), raster)
            })
            .collect()
    })
}

fn both_strategies() -> impl Strategy<Value = MatchStrategy> {
    prop_oneof![Just(MatchStrategy::histogram()), Just(MatchStrategy::Structural)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_order_does_not_change_result(
        probe in raster(),
        (refs, shuffled) in references().prop_flat_map(|refs| {
            let shuffled = Just(refs.clone()).prop_shuffle();
            (Just(refs), shuffled)
        }),
        strategy in both_strategies(),
        threshold in -1.0f64..1.0,
    ) {
        let a = evaluate(Some(&probe), &refs, strategy, threshold);
        let b = evaluate(Some(&probe), &shuffled, strategy, threshold);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_enrolled_probe_is_recognized(
        refs in references(),
        pick in any::<prop::sample::Index>(),
    ) {
        let enrolled = &refs[pick.index(refs.len())];
        let probe = enrolled.raster().unwrap().clone();

        let result = evaluate(Some(&probe), &refs, MatchStrategy::histogram(), 0.6);
        prop_assert!(result.is_match());
        prop_assert!((result.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn prop_histogram_score_in_unit_range(probe in raster(), refs in references()) {
        let result = evaluate(Some(&probe), &refs, MatchStrategy::histogram(), 2.0);
        prop_assert_eq!(result.label, MatchLabel::Unknown);
        prop_assert!((0.0..=1.0).contains(&result.score));
    }
}

#[test]
fn test_single_colour_probe_against_palette() {
    let probe = RgbImage::from_pixel(SIDE, SIDE, Rgb([64, 64, 64]));
    let references = vec![
        ReferenceImage::new(Identity::new("grey").unwrap(), probe.clone()),
        ReferenceImage::new(
            Identity::new("white").unwrap(),
            RgbImage::from_pixel(SIDE, SIDE, Rgb([192, 192, 192])),
        ),
    ];

    let result = evaluate(Some(&probe), &references, MatchStrategy::histogram(), 0.6);
    assert_eq!(result.matched().map(Identity::as_str), Some("grey"));
}
