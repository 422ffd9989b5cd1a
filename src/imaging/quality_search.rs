//! Bounded search over encoder quality to hit a byte budget.
//!
//! The search is a hybrid of bisection and a fixed ±0.05 step: each probe
//! tries the midpoint of the current bounds, then nudges the relevant bound
//! past the midpoint by the step instead of onto it. This samples slightly
//! denser near the budget boundary than pure halving would, at a bounded,
//! deterministic cost of exactly [`ITERATIONS`] encode calls. The behavior —
//! step size included — is this pipeline's contract; do not "correct" it to
//! pure bisection.

use super::codec::EncodeError;
use crate::settings::Quality;
use tracing::debug;

/// Fixed number of encode probes per search. Termination never depends on
/// convergence.
pub const ITERATIONS: u32 = 10;

const MIN_QUALITY: f64 = 0.1;
const MAX_QUALITY: f64 = 1.0;
const STEP: f64 = 0.05;

/// What the search settled on.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub bytes: Vec<u8>,
    pub quality: Quality,
    /// `false` when even the smallest probed encoding exceeded the budget;
    /// `bytes` is then the smallest blob observed, best-effort.
    pub within_budget: bool,
}

/// Binary-search quality for the largest encoding that fits `budget_bytes`.
///
/// `encode` maps a normalized quality in `[0.1, 1.0]` to encoded bytes and is
/// expected to be pure for a fixed surface and format; callers bind it over
/// one already-decoded surface so no probe re-decodes. Encode failures
/// propagate immediately.
///
/// When the budget is feasible the returned blob satisfies
/// `bytes.len() <= budget_bytes`; when it is not, the smallest over-budget
/// blob comes back with `within_budget == false` — callers must not assume
/// the budget was met.
pub fn search_quality<E>(mut encode: E, budget_bytes: u64) -> Result<SearchOutcome, EncodeError>
where
    E: FnMut(f64) -> Result<Vec<u8>, EncodeError>,
{
    let mut lower = MIN_QUALITY;
    let mut upper = MAX_QUALITY;

    // Highest-quality blob seen under budget, and smallest seen over it
    let mut best_under: Option<(f64, Vec<u8>)> = None;
    let mut smallest_over: Option<(f64, Vec<u8>)> = None;

    for iteration in 0..ITERATIONS {
        let quality = (lower + upper) / 2.0;
        let bytes = encode(quality)?;
        let size = bytes.len() as u64;
        debug!(iteration, quality, size, budget_bytes, "quality probe");

        if size <= budget_bytes {
            if best_under.as_ref().is_none_or(|(q, _)| quality > *q) {
                best_under = Some((quality, bytes));
            }
            lower = quality + STEP;
        } else {
            if smallest_over
                .as_ref()
                .is_none_or(|(_, b)| bytes.len() < b.len())
            {
                smallest_over = Some((quality, bytes));
            }
            upper = quality - STEP;
        }
    }

    let (quality, bytes, within_budget) = match (best_under, smallest_over) {
        (Some((q, bytes)), _) => (q, bytes, true),
        (None, Some((q, bytes))) => (q, bytes, false),
        // Unreachable with ITERATIONS > 0: every probe lands in one bucket
        (None, None) => (MIN_QUALITY, Vec::new(), false),
    };

    Ok(SearchOutcome {
        bytes,
        quality: Quality::from_normalized(quality),
        within_budget,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Fabricated encoder with size strictly monotonic in quality.
    fn sized(q: f64, bytes_per_unit: f64) -> Vec<u8> {
        vec![0u8; (q * bytes_per_unit) as usize]
    }

    #[test]
    fn feasible_budget_result_is_within_budget() {
        let outcome = search_quality(|q| Ok(sized(q, 10_000.0)), 5_000).unwrap();
        assert!(outcome.within_budget);
        assert!(outcome.bytes.len() as u64 <= 5_000);
        // A budget at half the max size should land near mid quality, not
        // collapse to the minimum
        assert!(outcome.quality.value() >= 40);
    }

    #[test]
    fn exactly_ten_encode_invocations() {
        let calls = Cell::new(0u32);
        search_quality(
            |q| {
                calls.set(calls.get() + 1);
                Ok(sized(q, 10_000.0))
            },
            5_000,
        )
        .unwrap();
        assert_eq!(calls.get(), ITERATIONS);
    }

    #[test]
    fn generous_budget_pushes_quality_high() {
        let outcome = search_quality(|q| Ok(sized(q, 1_000.0)), 1_000_000).unwrap();
        assert!(outcome.within_budget);
        assert!(outcome.quality.value() >= 90);
    }

    #[test]
    fn infeasible_budget_terminates_with_smallest_blob() {
        let calls = Cell::new(0u32);
        let mut sizes = Vec::new();
        let outcome = search_quality(
            |q| {
                calls.set(calls.get() + 1);
                let bytes = sized(q, 10_000.0);
                sizes.push(bytes.len());
                Ok(bytes)
            },
            // Smaller than even quality 0.1 can produce
            100,
        )
        .unwrap();

        assert_eq!(calls.get(), ITERATIONS);
        assert!(!outcome.within_budget);
        assert_eq!(outcome.bytes.len(), *sizes.iter().min().unwrap());
    }

    #[test]
    fn constant_size_encoder_still_terminates() {
        // Pathological: size does not depend on quality at all
        let outcome = search_quality(|_| Ok(vec![0u8; 777]), 1_000).unwrap();
        assert!(outcome.within_budget);
        assert_eq!(outcome.bytes.len(), 777);

        let outcome = search_quality(|_| Ok(vec![0u8; 777]), 10).unwrap();
        assert!(!outcome.within_budget);
        assert_eq!(outcome.bytes.len(), 777);
    }

    #[test]
    fn encode_failure_propagates() {
        let err = search_quality(
            |_| {
                Err(EncodeError::Codec {
                    format: crate::formats::FormatTag::Jpeg,
                    message: "boom".to_string(),
                })
            },
            1_000,
        )
        .unwrap_err();
        assert!(matches!(err, EncodeError::Codec { .. }));
    }
}
