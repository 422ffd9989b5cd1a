//! The closed vocabulary of image formats.
//!
//! Every format the pipeline can name is a [`FormatTag`] variant. Free-form
//! strings (CLI arguments, MIME hints, config files) are validated into the
//! enumeration at the boundary via [`FormatTag::parse`] / [`FormatTag::from_mime`];
//! past that point no stringly-typed format names exist.
//!
//! Two capability queries drive format selection:
//! - [`FormatTag::is_encodable`] — can the codec serialize into this format?
//! - [`FormatTag::is_decodable_by_runtime`] — can the codec read it back?
//!
//! The two sets differ: GIF and TIFF decode fine but are export-blocked
//! (multi-frame/legacy), while AVIF is the reverse — the `image` crate ships
//! an encoder (rav1e) but no pure-Rust decoder.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A target or source image format.
///
/// [`FormatTag::Original`] is a sentinel meaning "keep the source format,
/// pass bytes through without re-encoding". It is a valid *target* but never
/// a real codec format: both capability queries report `false` for it and the
/// transcoder intercepts it before the encoder is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    Jpeg,
    Png,
    WebP,
    Avif,
    Gif,
    Bmp,
    Ico,
    Tiff,
    Heif,
    Heic,
    Original,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown image format: {0:?}")]
pub struct UnknownFormat(pub String);

impl FormatTag {
    /// Every real codec format, in the order the UI lists them.
    /// Excludes the `Original` sentinel.
    pub const CODEC_FORMATS: &'static [FormatTag] = &[
        FormatTag::Jpeg,
        FormatTag::Png,
        FormatTag::WebP,
        FormatTag::Avif,
        FormatTag::Gif,
        FormatTag::Bmp,
        FormatTag::Ico,
        FormatTag::Tiff,
        FormatTag::Heif,
        FormatTag::Heic,
    ];

    /// Validate a user-supplied format name. Accepts the common aliases
    /// (`jpg`, `tif`) and is case-insensitive.
    pub fn parse(name: &str) -> Result<Self, UnknownFormat> {
        match name.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            "avif" => Ok(Self::Avif),
            "gif" => Ok(Self::Gif),
            "bmp" => Ok(Self::Bmp),
            "ico" => Ok(Self::Ico),
            "tiff" | "tif" => Ok(Self::Tiff),
            "heif" => Ok(Self::Heif),
            "heic" => Ok(Self::Heic),
            "original" => Ok(Self::Original),
            other => Err(UnknownFormat(other.to_string())),
        }
    }

    /// Validate a MIME type (e.g. from a file-picker hint).
    pub fn from_mime(mime: &str) -> Result<Self, UnknownFormat> {
        match mime.to_ascii_lowercase().as_str() {
            "image/jpeg" => Ok(Self::Jpeg),
            "image/png" => Ok(Self::Png),
            "image/webp" => Ok(Self::WebP),
            "image/avif" => Ok(Self::Avif),
            "image/gif" => Ok(Self::Gif),
            "image/bmp" => Ok(Self::Bmp),
            "image/x-icon" | "image/vnd.microsoft.icon" => Ok(Self::Ico),
            "image/tiff" => Ok(Self::Tiff),
            "image/heif" => Ok(Self::Heif),
            "image/heic" => Ok(Self::Heic),
            other => Err(UnknownFormat(other.to_string())),
        }
    }

    /// Map a sniffed `image` crate format to the tag vocabulary.
    /// Returns `None` for formats outside the supported set (e.g. DDS).
    pub fn from_sniffed(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::WebP => Some(Self::WebP),
            image::ImageFormat::Avif => Some(Self::Avif),
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::Bmp => Some(Self::Bmp),
            image::ImageFormat::Ico => Some(Self::Ico),
            image::ImageFormat::Tiff => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Canonical lowercase name, matching what [`FormatTag::parse`] accepts.
    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Ico => "ico",
            Self::Tiff => "tiff",
            Self::Heif => "heif",
            Self::Heic => "heic",
            Self::Original => "original",
        }
    }

    /// MIME identifier handed to the codec capability.
    /// `None` for the `Original` sentinel, which has no format of its own.
    pub fn mime_type(self) -> Option<&'static str> {
        match self {
            Self::Jpeg => Some("image/jpeg"),
            Self::Png => Some("image/png"),
            Self::WebP => Some("image/webp"),
            Self::Avif => Some("image/avif"),
            Self::Gif => Some("image/gif"),
            Self::Bmp => Some("image/bmp"),
            Self::Ico => Some("image/x-icon"),
            Self::Tiff => Some("image/tiff"),
            Self::Heif => Some("image/heif"),
            Self::Heic => Some("image/heic"),
            Self::Original => None,
        }
    }

    /// File extension used when exporting a result in this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Ico => "ico",
            Self::Tiff => "tif",
            Self::Heif => "heif",
            Self::Heic => "heic",
            // Callers exporting a passthrough result should use the source
            // format's extension instead; this is the fallback.
            Self::Original => "bin",
        }
    }

    /// Whether the codec can serialize a surface into this format.
    ///
    /// GIF, TIFF, HEIF and HEIC are read-only: attempting to encode them
    /// yields [`EncodeError::ReadOnlyFormat`](crate::imaging::EncodeError).
    pub fn is_encodable(self) -> bool {
        matches!(
            self,
            Self::Jpeg | Self::Png | Self::WebP | Self::Avif | Self::Bmp | Self::Ico
        )
    }

    /// Whether the read-only restriction (rather than a missing codec) is
    /// what blocks encoding.
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::Gif | Self::Tiff | Self::Heif | Self::Heic)
    }

    /// Whether the compiled-in decoders can read this format.
    ///
    /// AVIF is excluded: the `image` crate's `"avif"` feature only enables
    /// the encoder (rav1e); decoding would require the C library dav1d.
    /// HEIF/HEIC have no pure-Rust decoder at all.
    pub fn is_decodable_by_runtime(self) -> bool {
        matches!(
            self,
            Self::Jpeg | Self::Png | Self::WebP | Self::Gif | Self::Bmp | Self::Ico | Self::Tiff
        )
    }

    /// Whether this format uses a lossy quality parameter when encoding.
    /// Quality is accepted and ignored for the rest.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg | Self::Avif)
    }
}

impl std::fmt::Display for FormatTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
