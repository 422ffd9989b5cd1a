//! Codec capability trait and shared types.
//!
//! The [`Codec`] trait defines the four operations the pipeline delegates to
//! an image codec: probe, decode, render, encode. The production
//! implementation is [`RustCodec`](super::rust_codec::RustCodec) — pure Rust
//! via the `image` crate, statically linked, no system dependencies.
//!
//! Errors split along the blast-radius boundary: a [`DecodeError`] is fatal to
//! the whole per-image job, an [`EncodeError`] only to the one target format
//! that raised it.

use crate::formats::FormatTag;
use crate::settings::Quality;
use thiserror::Error;

/// An in-memory decoded pixel buffer with known dimensions — the unit every
/// transcode step operates on.
pub type Surface = image::DynamicImage;

/// Source bytes are unreadable. Fatal to the whole per-image job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("could not identify an image format in the supplied bytes")]
    UnknownFormat,
    #[error("format {0} is not decodable by this runtime")]
    Unsupported(FormatTag),
    #[error("decode failed: {0}")]
    Malformed(String),
}

/// One target format could not be encoded. Other formats in the same batch
/// still attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("format {0} is read-only and cannot be encoded")]
    ReadOnlyFormat(FormatTag),
    #[error("format {0} has no encoder in this runtime")]
    Unsupported(FormatTag),
    #[error("{format} encode failed: {message}")]
    Codec { format: FormatTag, message: String },
}

/// Trait for the image codec capability.
///
/// Implementations are stateless per call and `Sync`, so the transcoder can
/// fan formats out across rayon workers against a shared reference.
pub trait Codec: Sync {
    /// Read dimensions from the image header without a full pixel decode.
    fn probe_dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), DecodeError>;

    /// Decode bytes into an addressable pixel surface.
    fn decode(&self, bytes: &[u8]) -> Result<Surface, DecodeError>;

    /// Resample a surface to new dimensions with a quality-biased filter.
    /// Always succeeds for positive target dimensions.
    fn render(&self, surface: &Surface, width: u32, height: u32) -> Surface;

    /// Serialize a surface into encoded bytes for the given format.
    ///
    /// `quality` applies to lossy encoders and is accepted-but-ignored for
    /// lossless ones. Read-only formats fail with
    /// [`EncodeError::ReadOnlyFormat`].
    fn encode(
        &self,
        surface: &Surface,
        format: FormatTag,
        quality: Quality,
    ) -> Result<Vec<u8>, EncodeError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock codec that records operations and fabricates deterministic
    /// output. Uses Mutex (not RefCell) so it is Sync and works with rayon.
    pub struct MockCodec {
        /// Dimensions "decoded" from any input; `None` makes decode fail.
        pub decode_dims: Option<(u32, u32)>,
        /// Formats whose encode fails with a codec-level error (on top of
        /// the read-only/unsupported checks, which the mock mirrors from
        /// production).
        pub fail_formats: Vec<FormatTag>,
        /// Encoded output length is `quality * bytes_per_quality_step`,
        /// making size strictly monotonic in quality for budget tests.
        pub bytes_per_quality_step: usize,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Probe,
        Decode,
        Render { width: u32, height: u32 },
        Encode { format: FormatTag, quality: u32 },
    }

    impl MockCodec {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                decode_dims: Some((width, height)),
                fail_formats: Vec::new(),
                bytes_per_quality_step: 100,
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_decode() -> Self {
            Self {
                decode_dims: None,
                fail_formats: Vec::new(),
                bytes_per_quality_step: 100,
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn with_failing_formats(mut self, formats: Vec<FormatTag>) -> Self {
            self.fail_formats = formats;
            self
        }

        pub fn recorded(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn record(&self, op: RecordedOp) {
            self.operations.lock().unwrap().push(op);
        }
    }

    impl Codec for MockCodec {
        fn probe_dimensions(&self, _bytes: &[u8]) -> Result<(u32, u32), DecodeError> {
            self.record(RecordedOp::Probe);
            self.decode_dims
                .ok_or_else(|| DecodeError::Malformed("mock probe failure".to_string()))
        }

        fn decode(&self, _bytes: &[u8]) -> Result<Surface, DecodeError> {
            self.record(RecordedOp::Decode);
            let (width, height) = self
                .decode_dims
                .ok_or_else(|| DecodeError::Malformed("mock decode failure".to_string()))?;
            Ok(Surface::new_rgba8(width, height))
        }

        fn render(&self, _surface: &Surface, width: u32, height: u32) -> Surface {
            self.record(RecordedOp::Render { width, height });
            Surface::new_rgba8(width, height)
        }

        fn encode(
            &self,
            _surface: &Surface,
            format: FormatTag,
            quality: Quality,
        ) -> Result<Vec<u8>, EncodeError> {
            self.record(RecordedOp::Encode {
                format,
                quality: quality.value(),
            });
            if format.is_read_only() {
                return Err(EncodeError::ReadOnlyFormat(format));
            }
            if !format.is_encodable() {
                return Err(EncodeError::Unsupported(format));
            }
            if self.fail_formats.contains(&format) {
                return Err(EncodeError::Codec {
                    format,
                    message: "mock encode failure".to_string(),
                });
            }
            Ok(vec![0u8; quality.value() as usize * self.bytes_per_quality_step])
        }
    }

    #[test]
    fn mock_records_operations_in_order() {
        let codec = MockCodec::new(800, 600);
        let surface = codec.decode(&[]).unwrap();
        let small = codec.render(&surface, 400, 300);
        codec
            .encode(&small, FormatTag::WebP, Quality::new(80))
            .unwrap();

        assert_eq!(
            codec.recorded(),
            vec![
                RecordedOp::Decode,
                RecordedOp::Render {
                    width: 400,
                    height: 300
                },
                RecordedOp::Encode {
                    format: FormatTag::WebP,
                    quality: 80
                },
            ]
        );
    }

    #[test]
    fn mock_encode_size_is_monotonic_in_quality() {
        let codec = MockCodec::new(10, 10);
        let surface = codec.decode(&[]).unwrap();
        let low = codec
            .encode(&surface, FormatTag::Jpeg, Quality::new(30))
            .unwrap();
        let high = codec
            .encode(&surface, FormatTag::Jpeg, Quality::new(90))
            .unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn mock_rejects_read_only_formats() {
        let codec = MockCodec::new(10, 10);
        let surface = codec.decode(&[]).unwrap();
        let err = codec
            .encode(&surface, FormatTag::Gif, Quality::default())
            .unwrap_err();
        assert_eq!(err, EncodeError::ReadOnlyFormat(FormatTag::Gif));
    }
}
