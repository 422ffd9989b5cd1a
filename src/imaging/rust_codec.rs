//! Pure Rust codec — zero external dependencies.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Probe | `ImageReader::with_guessed_format` + `into_dimensions` |
//! | Decode (JPEG, PNG, WebP, GIF, BMP, ICO, TIFF) | `image` crate (pure Rust decoders) |
//! | Render | `image::DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality honored) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6, quality honored) |
//! | Encode → PNG / WebP / BMP / ICO | lossless encoders, quality ignored |
//!
//! AVIF decoding is deliberately absent: the `image` crate's `"avif"` feature
//! only enables the **encoder** (rav1e); decoding requires the C library
//! dav1d. [`FormatTag::is_decodable_by_runtime`] reports this, and callers
//! filter selectable formats through it.

use super::codec::{Codec, DecodeError, EncodeError, Surface};
use crate::formats::FormatTag;
use crate::settings::Quality;
use image::codecs::avif::AvifEncoder;
use image::codecs::bmp::BmpEncoder;
use image::codecs::ico::IcoEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, ImageReader};
use std::io::Cursor;

/// Production codec using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Sniff the container format and reject what the compiled-in decoders
/// cannot read, so unsupported-format errors are distinguishable from
/// corrupt-data errors.
fn sniffed_decodable(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, DecodeError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let format = reader.format().ok_or(DecodeError::UnknownFormat)?;
    match FormatTag::from_sniffed(format) {
        Some(tag) if tag.is_decodable_by_runtime() => Ok(reader),
        Some(tag) => Err(DecodeError::Unsupported(tag)),
        None => Err(DecodeError::UnknownFormat),
    }
}

impl Codec for RustCodec {
    fn probe_dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), DecodeError> {
        sniffed_decodable(bytes)?
            .into_dimensions()
            .map_err(|e| DecodeError::Malformed(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Surface, DecodeError> {
        sniffed_decodable(bytes)?
            .decode()
            .map_err(|e| DecodeError::Malformed(e.to_string()))
    }

    fn render(&self, surface: &Surface, width: u32, height: u32) -> Surface {
        surface.resize_exact(width.max(1), height.max(1), FilterType::Lanczos3)
    }

    fn encode(
        &self,
        surface: &Surface,
        format: FormatTag,
        quality: Quality,
    ) -> Result<Vec<u8>, EncodeError> {
        if format.is_read_only() {
            return Err(EncodeError::ReadOnlyFormat(format));
        }
        if !format.is_encodable() {
            return Err(EncodeError::Unsupported(format));
        }

        let codec_err = |e: image::ImageError| EncodeError::Codec {
            format,
            message: e.to_string(),
        };

        let (width, height) = (surface.width(), surface.height());
        let mut out = Cursor::new(Vec::new());

        match format {
            FormatTag::Jpeg => {
                let rgb = surface.to_rgb8();
                JpegEncoder::new_with_quality(&mut out, quality.value() as u8)
                    .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                    .map_err(codec_err)?;
            }
            FormatTag::Png => {
                let rgba = surface.to_rgba8();
                PngEncoder::new(&mut out)
                    .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                    .map_err(codec_err)?;
            }
            FormatTag::WebP => {
                // Lossless encoder; quality accepted and ignored
                let rgba = surface.to_rgba8();
                WebPEncoder::new_lossless(&mut out)
                    .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                    .map_err(codec_err)?;
            }
            FormatTag::Avif => {
                let encoder =
                    AvifEncoder::new_with_speed_quality(&mut out, 6, quality.value() as u8);
                surface.write_with_encoder(encoder).map_err(codec_err)?;
            }
            FormatTag::Bmp => {
                let rgb = surface.to_rgb8();
                BmpEncoder::new(&mut out)
                    .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                    .map_err(codec_err)?;
            }
            FormatTag::Ico => {
                // The planner snaps ICO output to ≤256px; oversized surfaces
                // are rejected by the encoder itself
                let rgba = surface.to_rgba8();
                IcoEncoder::new(&mut out)
                    .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                    .map_err(codec_err)?;
            }
            FormatTag::Gif
            | FormatTag::Tiff
            | FormatTag::Heif
            | FormatTag::Heic
            | FormatTag::Original => unreachable!("rejected by the capability checks above"),
        }

        Ok(out.into_inner())
    }
}
