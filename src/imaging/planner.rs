//! Pure calculation functions for output dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Candidate icon side lengths, smallest first. Ties during snapping go to
/// the earlier (smaller) candidate.
const ICO_SIZES: &[u32] = &[16, 32, 48, 64, 128, 256];

/// Compute output dimensions under optional max-width/max-height bounds,
/// preserving aspect ratio.
///
/// The bounds are applied in two stages, not solved jointly: the width bound
/// first, then the height bound on the already-scaled result. An image can
/// therefore end up narrower than `max_width` when the height bound binds
/// second — that asymmetry is contract, observable by callers, and must not
/// be "fixed" into a joint best-fit.
///
/// Never fails: outputs are rounded to the nearest integer with a floor of 1,
/// so even a degenerate 0×0 input yields 1×1.
///
/// # Examples
/// ```
/// # use pixpress::imaging::plan_dimensions;
/// // Width bound only: 1000x800 capped at 500 wide → 500x400
/// assert_eq!(plan_dimensions(1000, 800, Some(500), None), (500, 400));
///
/// // Height bound binds after the width bound, shrinking width below the cap
/// assert_eq!(plan_dimensions(1000, 100, Some(500), Some(10)), (50, 10));
/// ```
pub fn plan_dimensions(
    original_width: u32,
    original_height: u32,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> (u32, u32) {
    let mut width = original_width as f64;
    let mut height = original_height as f64;

    if let Some(max_w) = max_width
        && width > max_w as f64
    {
        let ratio = max_w as f64 / width;
        width = max_w as f64;
        height *= ratio;
    }

    if let Some(max_h) = max_height
        && height > max_h as f64
    {
        let ratio = max_h as f64 / height;
        height = max_h as f64;
        width *= ratio;
    }

    (
        (width.round() as u32).max(1),
        (height.round() as u32).max(1),
    )
}

/// Icon output dimensions: square, snapped to the nearest standard icon size.
///
/// The reference side is `min(width, height)` clamped to `[32, 256]`, then
/// snapped to the closest entry of `{16, 32, 48, 64, 128, 256}`. Overrides
/// [`plan_dimensions`] for ICO output only.
pub fn ico_dimensions(width: u32, height: u32) -> (u32, u32) {
    let side = width.min(height).clamp(32, 256);
    let snapped = ICO_SIZES
        .iter()
        .copied()
        .min_by_key(|candidate| candidate.abs_diff(side))
        .unwrap_or(256);
    (snapped, snapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // plan_dimensions tests
    // =========================================================================

    #[test]
    fn no_bounds_keeps_original() {
        assert_eq!(plan_dimensions(1920, 1080, None, None), (1920, 1080));
    }

    #[test]
    fn width_bound_scales_both_dimensions() {
        assert_eq!(plan_dimensions(1000, 800, Some(500), None), (500, 400));
    }

    #[test]
    fn height_bound_scales_both_dimensions() {
        assert_eq!(plan_dimensions(800, 1000, None, Some(500)), (400, 500));
    }

    #[test]
    fn bound_larger_than_image_is_ignored() {
        assert_eq!(plan_dimensions(400, 300, Some(800), Some(600)), (400, 300));
    }

    #[test]
    fn width_bound_then_height_bound_compound() {
        // Width bound first: 1000x100 → 500x50. Height bound on the result:
        // 500x50 → 50x10. Output is far narrower than max_width — the
        // documented two-stage behavior, not a jointly optimal fit.
        assert_eq!(plan_dimensions(1000, 100, Some(500), Some(10)), (50, 10));
    }

    #[test]
    fn aspect_ratio_preserved_within_rounding() {
        let (w, h) = plan_dimensions(3000, 2000, Some(1000), None);
        assert_eq!(w, 1000);
        let input_aspect = 3000.0 / 2000.0;
        let output_aspect = w as f64 / h as f64;
        assert!((input_aspect - output_aspect).abs() < 0.01);
    }

    #[test]
    fn rounding_to_nearest_integer() {
        // 999x500 capped at 500 wide: height = 500 * 500/999 = 250.25 → 250
        assert_eq!(plan_dimensions(999, 500, Some(500), None), (500, 250));
    }

    #[test]
    fn degenerate_zero_input_yields_one_by_one() {
        assert_eq!(plan_dimensions(0, 0, None, None), (1, 1));
        assert_eq!(plan_dimensions(0, 0, Some(100), Some(100)), (1, 1));
    }

    #[test]
    fn extreme_aspect_never_collapses_to_zero() {
        // 10000x1 capped at 10 wide would scale height to 0.001 → floor of 1
        assert_eq!(plan_dimensions(10_000, 1, Some(10), None), (10, 1));
        assert_eq!(plan_dimensions(1, 10_000, None, Some(10)), (1, 10));
    }

    #[test]
    fn outputs_always_positive() {
        for &(w, h) in &[(1u32, 1u32), (7, 5000), (5000, 7), (640, 480)] {
            for &bounds in &[(None, None), (Some(3), None), (Some(3), Some(2))] {
                let (ow, oh) = plan_dimensions(w, h, bounds.0, bounds.1);
                assert!(ow > 0 && oh > 0, "{w}x{h} with {bounds:?} → {ow}x{oh}");
            }
        }
    }

    // =========================================================================
    // ico_dimensions tests
    // =========================================================================

    #[test]
    fn ico_snaps_to_nearest_standard_size() {
        assert_eq!(ico_dimensions(100, 100), (128, 128));
        assert_eq!(ico_dimensions(50, 50), (48, 48));
        assert_eq!(ico_dimensions(1000, 800), (256, 256));
    }

    #[test]
    fn ico_uses_shorter_edge() {
        assert_eq!(ico_dimensions(1000, 60), (64, 64));
    }

    #[test]
    fn ico_clamps_small_inputs_to_32() {
        // min edge 10 clamps to 32 before snapping — never 16
        assert_eq!(ico_dimensions(10, 10), (32, 32));
        assert_eq!(ico_dimensions(1, 500), (32, 32));
    }

    #[test]
    fn ico_tie_goes_to_smaller_candidate() {
        // 40 is equidistant from 32 and 48 → 32 wins
        assert_eq!(ico_dimensions(40, 40), (32, 32));
        // 96 is equidistant from 64 and 128 → 64 wins
        assert_eq!(ico_dimensions(96, 96), (64, 64));
    }
}
