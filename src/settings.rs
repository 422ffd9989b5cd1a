//! Compression settings and their partial-update lifecycle.
//!
//! The store owns exactly one [`CompressionSettings`] value, created with
//! defaults at construction and mutated in place through
//! [`SettingsUpdate`] — never replaced wholesale. Invalid updates (a
//! non-positive size budget, a zero dimension bound) are rejected before any
//! pixel work happens.

use crate::formats::FormatTag;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Normalized quality in `[0.01, 1.0]` as used by the quality search.
    pub fn normalized(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Quality from a normalized `[0.0, 1.0]` value, rounded and clamped.
    pub fn from_normalized(value: f64) -> Self {
        Self::new((value * 100.0).round() as u32)
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// Rejected settings update. Surfaced to the caller synchronously, before
/// any decode is attempted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("size budget must be positive, got {0} MB")]
    NonPositiveBudget(f64),
    #[error("{0} bound must be at least 1 pixel")]
    ZeroDimension(&'static str),
}

/// Process-wide compression configuration.
///
/// `target_formats` is semantically a set (duplicates have no extra effect)
/// but its order matters: the first format that transcodes successfully
/// becomes an entry's primary result. It is never empty — clearing it resets
/// to `[Original]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionSettings {
    #[serde(default)]
    pub quality: Quality,
    /// Byte-size budget in megabytes. Fractional values allowed.
    #[serde(default)]
    pub max_size_mb: Option<f64>,
    #[serde(default)]
    pub max_width: Option<u32>,
    #[serde(default)]
    pub max_height: Option<u32>,
    #[serde(default = "default_formats")]
    pub target_formats: Vec<FormatTag>,
}

fn default_formats() -> Vec<FormatTag> {
    vec![FormatTag::Original]
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            max_size_mb: None,
            max_width: None,
            max_height: None,
            target_formats: default_formats(),
        }
    }
}

impl CompressionSettings {
    /// Size budget converted to bytes, if one is set.
    pub fn budget_bytes(&self) -> Option<u64> {
        self.max_size_mb.map(|mb| (mb * 1024.0 * 1024.0) as u64)
    }

    /// Apply a partial update in place. Fields left `None` in the update are
    /// untouched. Fails without modifying anything if any updated field is
    /// invalid.
    pub fn apply(&mut self, update: SettingsUpdate) -> Result<(), SettingsError> {
        update.validate()?;

        if let Some(quality) = update.quality {
            self.quality = quality;
        }
        if let Some(budget) = update.max_size_mb {
            self.max_size_mb = budget;
        }
        if let Some(max_width) = update.max_width {
            self.max_width = max_width;
        }
        if let Some(max_height) = update.max_height {
            self.max_height = max_height;
        }
        if let Some(formats) = update.target_formats {
            self.target_formats = normalize_formats(formats);
        }
        Ok(())
    }
}

/// De-duplicate a requested format list preserving first-occurrence order;
/// an empty list falls back to the `Original` sentinel.
pub fn normalize_formats(formats: Vec<FormatTag>) -> Vec<FormatTag> {
    let mut seen = Vec::with_capacity(formats.len());
    for format in formats {
        if !seen.contains(&format) {
            seen.push(format);
        }
    }
    if seen.is_empty() {
        seen.push(FormatTag::Original);
    }
    seen
}

/// A partial settings update. The outer `Option` distinguishes "leave as is"
/// from "set"; for the clearable fields the inner `Option` distinguishes
/// "set to a value" from "unset".
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub quality: Option<Quality>,
    pub max_size_mb: Option<Option<f64>>,
    pub max_width: Option<Option<u32>>,
    pub max_height: Option<Option<u32>>,
    pub target_formats: Option<Vec<FormatTag>>,
}

impl SettingsUpdate {
    fn validate(&self) -> Result<(), SettingsError> {
        if let Some(Some(mb)) = self.max_size_mb
            && mb <= 0.0
        {
            return Err(SettingsError::NonPositiveBudget(mb));
        }
        if self.max_width == Some(Some(0)) {
            return Err(SettingsError::ZeroDimension("max width"));
        }
        if self.max_height == Some(Some(0)) {
            return Err(SettingsError::ZeroDimension("max height"));
        }
        Ok(())
    }
}
