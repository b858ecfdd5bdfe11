//! Quality ladder planner - which tiers to produce for a given source.

use mediaforge_core::models::QualityTier;

/// The static quality-ladder table, in descending resolution order.
pub const QUALITY_TIERS: [QualityTier; 3] = [
    QualityTier {
        quality: "1080p",
        width: 1920,
        height: 1080,
        video_bitrate_kbps: 5000,
        audio_bitrate_kbps: 192,
        label: "Full HD (1080p)",
    },
    QualityTier {
        quality: "720p",
        width: 1280,
        height: 720,
        video_bitrate_kbps: 2500,
        audio_bitrate_kbps: 128,
        label: "HD (720p)",
    },
    QualityTier {
        quality: "480p",
        width: 854,
        height: 480,
        video_bitrate_kbps: 1000,
        audio_bitrate_kbps: 96,
        label: "SD (480p)",
    },
];

/// Plan the ordered set of tiers to generate for a source of the given
/// dimensions. A tier qualifies when the source matches or exceeds it in
/// either dimension (covers both portrait and landscape sources).
///
/// Never empty: sources smaller than the smallest tier still get that
/// tier as a floor, even though that upscales them. Intentional, observed
/// behavior of the service this reimplements.
pub fn plan_ladder(width: u32, height: u32) -> Vec<&'static QualityTier> {
    let mut tiers: Vec<&'static QualityTier> = QUALITY_TIERS
        .iter()
        .filter(|tier| height >= tier.height || width >= tier.width)
        .collect();

    if tiers.is_empty() {
        tiers.push(&QUALITY_TIERS[QUALITY_TIERS.len() - 1]);
    }

    tiers
}

/// Compute the tier's output dimensions preserving the source aspect
/// ratio. Wider-than-tier sources fix width and derive height; taller
/// sources fix height and derive width. Both dimensions are rounded down
/// to even, which the codec requires.
pub fn target_dimensions(tier: &QualityTier, source_width: u32, source_height: u32) -> (u32, u32) {
    let aspect = source_width as f64 / source_height as f64;
    let tier_aspect = tier.width as f64 / tier.height as f64;

    let (width, height) = if aspect > tier_aspect {
        let derived = (tier.width as f64 / aspect).round() as u32;
        (tier.width, derived)
    } else {
        let derived = (tier.height as f64 * aspect).round() as u32;
        (derived, tier.height)
    };

    (width - width % 2, height - height % 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(quality: &str) -> &'static QualityTier {
        QUALITY_TIERS
            .iter()
            .find(|t| t.quality == quality)
            .unwrap()
    }

    #[test]
    fn test_full_hd_source_gets_all_tiers() {
        let plan = plan_ladder(1920, 1080);
        let qualities: Vec<&str> = plan.iter().map(|t| t.quality).collect();
        assert_eq!(qualities, vec!["1080p", "720p", "480p"]);
    }

    #[test]
    fn test_hd_source_skips_tiers_above_it() {
        let plan = plan_ladder(1280, 720);
        let qualities: Vec<&str> = plan.iter().map(|t| t.quality).collect();
        assert_eq!(qualities, vec!["720p", "480p"]);
    }

    #[test]
    fn test_portrait_source_qualifies_by_height() {
        // 1080x1920 portrait: height crosses every tier threshold.
        let plan = plan_ladder(1080, 1920);
        let qualities: Vec<&str> = plan.iter().map(|t| t.quality).collect();
        assert_eq!(qualities, vec!["1080p", "720p", "480p"]);
    }

    #[test]
    fn test_small_source_gets_floor_tier() {
        // 640x360 is below every threshold; the floor rule still emits 480p.
        let plan = plan_ladder(640, 360);
        let qualities: Vec<&str> = plan.iter().map(|t| t.quality).collect();
        assert_eq!(qualities, vec!["480p"]);

        assert_eq!(plan_ladder(0, 0).len(), 1);
    }

    #[test]
    fn test_planner_output_is_subset_with_qualifying_rule() {
        for (w, h) in [(3840, 2160), (854, 480), (1920, 800), (500, 2000)] {
            let plan = plan_ladder(w, h);
            assert!(!plan.is_empty());
            if plan.len() > 1 || plan[0].quality != "480p" {
                for t in &plan {
                    assert!(h >= t.height || w >= t.width);
                }
            }
        }
    }

    #[test]
    fn test_target_dimensions_match_tier_for_exact_aspect() {
        assert_eq!(target_dimensions(tier("720p"), 1920, 1080), (1280, 720));
        assert_eq!(target_dimensions(tier("1080p"), 3840, 2160), (1920, 1080));
    }

    #[test]
    fn test_wide_source_fixes_width() {
        // 2.4:1 source is wider than 16:9 tiers.
        let (w, h) = target_dimensions(tier("720p"), 1920, 800);
        assert_eq!(w, 1280);
        assert_eq!(h, 532); // 533.33 rounded, then floored to even
    }

    #[test]
    fn test_tall_source_fixes_height() {
        let (w, h) = target_dimensions(tier("480p"), 1080, 1920);
        assert_eq!(h, 480);
        assert_eq!(w, 270); // 270 is even already
    }

    #[test]
    fn test_dimensions_always_even_and_aspect_preserved() {
        for (sw, sh) in [(1919, 1079), (1280, 719), (853, 481), (701, 467)] {
            for t in &QUALITY_TIERS {
                let (w, h) = target_dimensions(t, sw, sh);
                assert_eq!(w % 2, 0, "{}x{} on {}", sw, sh, t.quality);
                assert_eq!(h % 2, 0, "{}x{} on {}", sw, sh, t.quality);

                let source_aspect = sw as f64 / sh as f64;
                let out_aspect = w as f64 / h as f64;
                // Within the slack introduced by rounding to even.
                assert!(
                    (source_aspect - out_aspect).abs() / source_aspect < 0.02,
                    "aspect drifted: {} vs {}",
                    source_aspect,
                    out_aspect
                );
            }
        }
    }
}
