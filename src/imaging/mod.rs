//! Image operations — pure Rust, zero external dependencies.
//!
//! | Operation | Where |
//! |---|---|
//! | **Dimension planning** | [`planner`] — pure math, width bound then height bound |
//! | **ICO size snapping** | [`planner::ico_dimensions`] |
//! | **Probe / decode / render / encode** | [`Codec`] trait + [`RustCodec`] |
//! | **Byte-budget search** | [`quality_search`] — 10 bounded probes |
//!
//! The module is split into:
//! - **Planner**: pure functions for dimension math (unit testable)
//! - **Codec**: the [`Codec`] trait seam, error taxonomy, and a mock for tests
//! - **RustCodec**: the production implementation on the `image` crate
//! - **QualitySearch**: quality-vs-size search against an encode callback

pub mod codec;
mod planner;
pub mod quality_search;
pub mod rust_codec;

pub use codec::{Codec, DecodeError, EncodeError, Surface};
pub use planner::{ico_dimensions, plan_dimensions};
pub use quality_search::{SearchOutcome, search_quality};
pub use rust_codec::RustCodec;
