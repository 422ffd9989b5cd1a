//! Per-image transcoding: one decode fanned out into N target formats.
//!
//! [`transcode_format`] is a single (surface, format) job: plan dimensions,
//! render, then either a direct encode or a byte-budget quality search.
//! [`transcode_formats`] runs it once per requested format against one shared
//! decoded surface, aggregating per-format failures into a partial-success
//! [`MultiFormatOutcome`] instead of aborting the batch. Only a
//! [`DecodeError`] — the source itself being unreadable — fails the whole
//! image.
//!
//! Formats fan out across rayon workers; each job renders its own surface
//! from the shared decoded one, so no mutable pixel state is shared.

use crate::formats::FormatTag;
use crate::imaging::{
    Codec, DecodeError, EncodeError, Surface, ico_dimensions, plan_dimensions, search_quality,
};
use crate::settings::{CompressionSettings, Quality};
use rayon::prelude::*;
use std::borrow::Cow;
use tracing::warn;

/// Output of transcoding one image into one format.
#[derive(Debug, Clone)]
pub struct TranscodedFormat {
    pub format: FormatTag,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Quality actually encoded at — the settings value, or what the budget
    /// search settled on.
    pub quality: Quality,
    /// `false` only when a byte budget was set and even the lowest probed
    /// quality exceeded it (best-effort result).
    pub within_budget: bool,
}

/// A target format that could not be produced.
#[derive(Debug, Clone)]
pub struct FormatFailure {
    pub format: FormatTag,
    pub error: EncodeError,
}

/// Partial-success result of a multi-format transcode.
///
/// `succeeded` keeps request order, which downstream code relies on for
/// primary-result selection. An empty `succeeded` with a non-empty `failed`
/// means the caller must treat the image as failed, never as completed.
#[derive(Debug, Default)]
pub struct MultiFormatOutcome {
    pub succeeded: Vec<TranscodedFormat>,
    pub failed: Vec<FormatFailure>,
}

impl MultiFormatOutcome {
    /// Human-readable summary of every per-format failure.
    pub fn failure_summary(&self) -> String {
        self.failed
            .iter()
            .map(|f| format!("{}: {}", f.format, f.error))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Transcode an already-decoded surface into one target format.
///
/// ICO output snaps to the standard square icon sizes; every other format
/// follows the planner's aspect-preserving bounds. With a byte budget set,
/// the encode goes through the quality search, reusing the rendered surface
/// across all probes.
pub fn transcode_format<C: Codec>(
    codec: &C,
    surface: &Surface,
    format: FormatTag,
    settings: &CompressionSettings,
) -> Result<TranscodedFormat, EncodeError> {
    let (width, height) = if format == FormatTag::Ico {
        ico_dimensions(surface.width(), surface.height())
    } else {
        plan_dimensions(
            surface.width(),
            surface.height(),
            settings.max_width,
            settings.max_height,
        )
    };

    let rendered: Cow<'_, Surface> = if (width, height) == (surface.width(), surface.height()) {
        Cow::Borrowed(surface)
    } else {
        Cow::Owned(codec.render(surface, width, height))
    };

    if let Some(budget) = settings.budget_bytes() {
        let outcome = search_quality(
            |q| codec.encode(&rendered, format, Quality::from_normalized(q)),
            budget,
        )?;
        Ok(TranscodedFormat {
            format,
            bytes: outcome.bytes,
            width,
            height,
            quality: outcome.quality,
            within_budget: outcome.within_budget,
        })
    } else {
        let bytes = codec.encode(&rendered, format, settings.quality)?;
        Ok(TranscodedFormat {
            format,
            bytes,
            width,
            height,
            quality: settings.quality,
            within_budget: true,
        })
    }
}

/// Transcode one source image into every requested format.
///
/// The source is decoded exactly once and shared read-only across the
/// per-format jobs. The `Original` sentinel never touches the codec: its
/// result is the source bytes verbatim at the original dimensions — which
/// also means a `[Original]`-only request succeeds without any decode.
pub fn transcode_formats<C: Codec>(
    codec: &C,
    source: &[u8],
    original_dims: (u32, u32),
    formats: &[FormatTag],
    settings: &CompressionSettings,
) -> Result<MultiFormatOutcome, DecodeError> {
    let needs_decode = formats.iter().any(|&f| f != FormatTag::Original);
    let surface = if needs_decode {
        Some(codec.decode(source)?)
    } else {
        None
    };

    let results: Vec<(FormatTag, Result<TranscodedFormat, EncodeError>)> = formats
        .par_iter()
        .map(|&format| match (format, surface.as_ref()) {
            (FormatTag::Original, _) => (
                format,
                Ok(TranscodedFormat {
                    format,
                    bytes: source.to_vec(),
                    width: original_dims.0,
                    height: original_dims.1,
                    quality: settings.quality,
                    within_budget: true,
                }),
            ),
            (_, Some(surface)) => (format, transcode_format(codec, surface, format, settings)),
            (_, None) => unreachable!("non-sentinel format implies a decoded surface"),
        })
        .collect();

    let mut outcome = MultiFormatOutcome::default();
    for (format, result) in results {
        match result {
            Ok(transcoded) => outcome.succeeded.push(transcoded),
            Err(error) => {
                warn!(%format, %error, "format transcode failed, continuing");
                outcome.failed.push(FormatFailure { format, error });
            }
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::codec::tests::{MockCodec, RecordedOp};
    use crate::imaging::quality_search::ITERATIONS;

    fn settings() -> CompressionSettings {
        CompressionSettings::default()
    }

    #[test]
    fn plans_render_dimensions_from_settings() {
        let codec = MockCodec::new(1000, 800);
        let surface = codec.decode(&[]).unwrap();
        let result = transcode_format(
            &codec,
            &surface,
            FormatTag::WebP,
            &CompressionSettings {
                max_width: Some(500),
                ..settings()
            },
        )
        .unwrap();

        assert_eq!((result.width, result.height), (500, 400));
        assert!(codec.recorded().contains(&RecordedOp::Render {
            width: 500,
            height: 400
        }));
    }

    #[test]
    fn skips_render_when_dimensions_unchanged() {
        let codec = MockCodec::new(320, 240);
        let surface = codec.decode(&[]).unwrap();
        let result = transcode_format(&codec, &surface, FormatTag::Png, &settings()).unwrap();

        assert_eq!((result.width, result.height), (320, 240));
        assert!(
            !codec
                .recorded()
                .iter()
                .any(|op| matches!(op, RecordedOp::Render { .. }))
        );
    }

    #[test]
    fn ico_overrides_planner_dimensions() {
        let codec = MockCodec::new(1000, 800);
        let surface = codec.decode(&[]).unwrap();
        let result = transcode_format(
            &codec,
            &surface,
            FormatTag::Ico,
            &CompressionSettings {
                max_width: Some(500),
                ..settings()
            },
        )
        .unwrap();

        // Snap from min(1000, 800) clamped to 256 — max_width is ignored
        assert_eq!((result.width, result.height), (256, 256));
    }

    #[test]
    fn budget_runs_bounded_quality_search() {
        let codec = MockCodec::new(100, 100);
        let surface = codec.decode(&[]).unwrap();
        let result = transcode_format(
            &codec,
            &surface,
            FormatTag::Jpeg,
            &CompressionSettings {
                // Mock produces quality * 100 bytes; 0.005 MB = 5242 bytes
                max_size_mb: Some(0.005),
                ..settings()
            },
        )
        .unwrap();

        let encodes = codec
            .recorded()
            .iter()
            .filter(|op| matches!(op, RecordedOp::Encode { .. }))
            .count();
        assert_eq!(encodes, ITERATIONS as usize);
        assert!(result.within_budget);
        assert!(result.bytes.len() as u64 <= 5242);
    }

    #[test]
    fn infeasible_budget_is_best_effort() {
        let codec = MockCodec::new(100, 100);
        let surface = codec.decode(&[]).unwrap();
        let result = transcode_format(
            &codec,
            &surface,
            FormatTag::Jpeg,
            &CompressionSettings {
                // Even quality 1 produces 100 bytes from the mock
                max_size_mb: Some(0.00001),
                ..settings()
            },
        )
        .unwrap();

        assert!(!result.within_budget);
        assert!(!result.bytes.is_empty());
    }

    #[test]
    fn one_failing_format_does_not_abort_batch() {
        let codec = MockCodec::new(400, 300);
        let outcome = transcode_formats(
            &codec,
            b"src",
            (400, 300),
            &[FormatTag::WebP, FormatTag::Gif, FormatTag::Png],
            &settings(),
        )
        .unwrap();

        assert_eq!(outcome.succeeded.len(), 2);
        assert_eq!(outcome.succeeded[0].format, FormatTag::WebP);
        assert_eq!(outcome.succeeded[1].format, FormatTag::Png);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].format, FormatTag::Gif);
        assert!(matches!(
            outcome.failed[0].error,
            EncodeError::ReadOnlyFormat(FormatTag::Gif)
        ));
    }

    #[test]
    fn all_formats_failing_yields_empty_success() {
        let codec = MockCodec::new(400, 300);
        let outcome = transcode_formats(
            &codec,
            b"src",
            (400, 300),
            &[FormatTag::Gif, FormatTag::Tiff],
            &settings(),
        )
        .unwrap();

        assert!(outcome.succeeded.is_empty());
        assert_eq!(outcome.failed.len(), 2);
        let summary = outcome.failure_summary();
        assert!(summary.contains("gif"));
        assert!(summary.contains("tiff"));
    }

    #[test]
    fn original_sentinel_passes_bytes_through_without_decode() {
        let codec = MockCodec::new(400, 300);
        let outcome = transcode_formats(
            &codec,
            b"raw source bytes",
            (400, 300),
            &[FormatTag::Original],
            &settings(),
        )
        .unwrap();

        assert_eq!(outcome.succeeded.len(), 1);
        let result = &outcome.succeeded[0];
        assert_eq!(result.format, FormatTag::Original);
        assert_eq!(result.bytes, b"raw source bytes");
        assert_eq!((result.width, result.height), (400, 300));
        assert!(codec.recorded().is_empty());
    }

    #[test]
    fn decode_failure_is_fatal_to_the_whole_image() {
        let codec = MockCodec::failing_decode();
        let err = transcode_formats(
            &codec,
            b"src",
            (0, 0),
            &[FormatTag::WebP, FormatTag::Png],
            &settings(),
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn source_decodes_exactly_once_for_many_formats() {
        let codec = MockCodec::new(400, 300);
        transcode_formats(
            &codec,
            b"src",
            (400, 300),
            &[FormatTag::WebP, FormatTag::Png, FormatTag::Jpeg],
            &settings(),
        )
        .unwrap();

        let decodes = codec
            .recorded()
            .iter()
            .filter(|op| matches!(op, RecordedOp::Decode))
            .count();
        assert_eq!(decodes, 1);
    }

    #[test]
    fn codec_level_failure_recorded_per_format() {
        let codec = MockCodec::new(100, 100).with_failing_formats(vec![FormatTag::WebP]);
        let outcome = transcode_formats(
            &codec,
            b"src",
            (100, 100),
            &[FormatTag::WebP, FormatTag::Jpeg],
            &settings(),
        )
        .unwrap();

        assert_eq!(outcome.succeeded.len(), 1);
        assert_eq!(outcome.succeeded[0].format, FormatTag::Jpeg);
        assert!(matches!(
            outcome.failed[0].error,
            EncodeError::Codec { .. }
        ));
    }
}
