// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Typeline: multilingual text shaping and layout
//!
//! Given a run of characters carrying per-position attributes (faces,
//! language, charset), this library itemizes it by script and face, selects
//! a realized font per run, shapes it into a glyph buffer (through a font's
//! layout-table shaper or the combining-class fallback), reorders it
//! visually, lays it out into physical lines and renders it through driver
//! capabilities — ready-made rasterization is deliberately absent.
//!
//! Everything the engine needs from its surroundings is a capability:
//!
//! - [`TextStore`] supplies characters and attributes ([`TextBuffer`] is a
//!   complete in-memory implementation);
//! - [`FaceResolver`], [`FontDriver`] and [`Shaper`] supply fonts, metrics
//!   and complex-script shaping;
//! - [`FrameDriver`] supplies device drawing primitives;
//! - [`Environment`] supplies Unicode property tables
//!   ([`UnicodeTables`] is the stock implementation);
//! - [`BidiEngine`] supplies the bidirectional algorithm ([`UnicodeBidi`]
//!   or the legacy [`NaiveBidi`]).
//!
//! Operations hang off [`Frame`]: [`Frame::draw`], [`Frame::text_extents`],
//! [`Frame::per_char_extents`], [`Frame::coordinates_position`],
//! [`Frame::glyph_info`] and [`Frame::glyph_list`], all controlled by a
//! [`DrawControl`]. Laid-out lines are cached on the text itself and
//! invalidated by edits; see [`clear_cache`] for the one case needing a
//! manual flush.

mod cache;
mod combining;
mod compose;
mod control;
mod environment;
mod error;
mod faces;
mod frame;
mod glyph;
mod layout;
mod linebreak;
#[cfg(test)]
pub(crate) mod mock;
mod query;
mod render;
mod reorder;
mod store;

pub use combining::{CombiningCode, Placement};
pub use control::{DrawControl, LineBreaker, LineFormat, LineFormatter};
pub use environment::{Environment, UnicodeTables};
pub use error::{Error, Result};
pub use faces::{
    FaceBox, FaceHandle, FaceList, FaceResolver, FontDriver, HLine, HLineStyle, RealizedFace,
    RealizedFont, Shaper,
};
pub use frame::{Frame, FrameDriver, Rect, Region};
pub use glyph::{CharPos, Glyph, GlyphChain, GlyphCode, GlyphKind, GlyphString};
pub use linebreak::{default_line_break, UaxLineBreaker};
pub use query::{clear_cache, GlyphEntry, GlyphInfo, PerCharExtents, TextExtents};
pub use reorder::{BidiEngine, NaiveBidi, Reordered, UnicodeBidi};
pub use store::{CacheEntry, Charset, Language, TextBuffer, TextStore};
