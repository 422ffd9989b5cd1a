//! # Pixpress
//!
//! A batch image transcoder: load raster images, re-encode them into one or
//! more target formats under size/quality/dimension constraints, and collect
//! the results. The interesting parts are the quality-targeting pipeline and
//! the per-image state machine that drives it — everything display-side is a
//! thin CLI over the same store API a GUI would use.
//!
//! # Architecture: One Store, Stateless Pipeline
//!
//! ```text
//! bytes ──add──→ Store (entries + settings)
//!                  │ process
//!                  ▼
//!          transcode_formats          one decode per image
//!            ├─ plan_dimensions       aspect-preserving bounds (ico snaps)
//!            ├─ Codec::render         Lanczos3 resample
//!            └─ Codec::encode         direct, or via search_quality
//!                  │
//!                  ▼
//!           FormatResults merged back, status flipped
//! ```
//!
//! The [`store::Store`] is the single mutable owner of entries, settings,
//! and display-handle lifecycles. Everything below it is stateless per call:
//! the transcoder, the planner, and the codec operate only on arguments and
//! retain nothing between invocations, which is what lets formats fan out
//! across rayon workers safely.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`formats`] | Closed [`FormatTag`](formats::FormatTag) vocabulary + capability queries |
//! | [`settings`] | Compression settings, partial updates, validation |
//! | [`imaging`] | Planner math, the [`Codec`](imaging::Codec) seam, production codec, quality search |
//! | [`transcode`] | Per-image fan-out into N formats with partial-success aggregation |
//! | [`store`] | Entry registry, state machine, display-handle accounting |
//! | [`output`] | CLI result formatting + JSON report |
//!
//! # Design Decisions
//!
//! ## Pure-Rust Imaging (No ImageMagick, No FFmpeg)
//!
//! All pixel work goes through the `image` crate — pure Rust decoders and
//! encoders, statically linked. No `apt install`, no Homebrew, no version
//! conflicts: a user can download a single binary and it just works. The
//! flip side is an asymmetric capability table (AVIF encodes but does not
//! decode; GIF/TIFF decode but are export-blocked), which is why format
//! capability is a first-class query rather than an assumption.
//!
//! ## Bounded Quality Search
//!
//! Hitting a byte budget is a search over the encoder's quality parameter.
//! Rather than iterating to convergence, [`imaging::search_quality`] runs a
//! fixed ten probes of a bisection/fixed-step hybrid: deterministic worst
//! case, no pathological-input loops, and a best-effort answer when the
//! budget is simply unreachable.
//!
//! ## Explicit Handle Lifecycle
//!
//! Display handles model a scarce resource. Their release is an explicit,
//! counted operation on the [`store::HandleRegistry`] — performed by
//! whichever store operation drops or replaces the owning record — so
//! leak-freedom is a testable property, not a hope pinned on destructors.

pub mod formats;
pub mod imaging;
pub mod output;
pub mod settings;
pub mod store;
pub mod transcode;
