// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Face and font capabilities
//!
//! The engine does not open font files or query font tables itself. Faces
//! attached to text are opaque [`FaceHandle`]s; a [`FaceResolver`] turns them
//! into shared [`RealizedFace`]s carrying concrete metrics and an optional
//! [`RealizedFont`]. Rendering and per-character encoding go through the
//! font's [`FontDriver`]; complex scripts go through its optional [`Shaper`].

use crate::glyph::{GlyphCode, GlyphString};
use crate::{Charset, Language, Region};
use icu_properties::props::Script;
use smallvec::SmallVec;
use std::any::Any;
use std::rc::Rc;

/// Opaque identifier of an unrealized face description
///
/// Only the [`FaceResolver`] assigns meaning to the value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FaceHandle(pub u32);

/// List of face handles in priority order, as attached to a text position
pub type FaceList = SmallVec<[FaceHandle; 4]>;

/// Horizontal decoration carried by a face
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HLine {
    pub style: HLineStyle,
    /// Line thickness in device units
    pub width: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HLineStyle {
    Underline,
    StrikeThrough,
    Overline,
}

/// Box decoration carried by a face
///
/// Two adjacent glyphs belong to the same box only if they share the same
/// `FaceBox` allocation; the layouter inserts box-edge glyphs where the
/// allocation changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceBox {
    /// Rule thickness in device units
    pub width: i32,
    pub inner_hmargin: i32,
    pub outer_hmargin: i32,
    pub inner_vmargin: i32,
    pub outer_vmargin: i32,
}

impl FaceBox {
    /// Advance taken by one vertical edge of the box
    pub(crate) fn edge_width(&self) -> i32 {
        self.inner_hmargin + self.width + self.outer_hmargin
    }

    /// Extra line height taken by the top (or bottom) rule
    pub(crate) fn line_height(&self) -> i32 {
        self.width + self.inner_vmargin + self.outer_vmargin
    }
}

/// A face resolved against a concrete size and frame
///
/// Shared by every glyph that references it; never mutated by the engine.
#[derive(Clone)]
pub struct RealizedFace {
    /// Logical ascent in device units
    pub ascent: i32,
    /// Logical descent in device units
    pub descent: i32,
    /// Advance of the space glyph in device units
    pub space_width: i32,
    /// Font size used for combining-offset scaling (per-mille units)
    pub font_size: i32,
    /// Draw glyph backgrounds swapped with foregrounds
    pub reverse_video: bool,
    pub hline: Option<HLine>,
    pub face_box: Option<Rc<FaceBox>>,
    /// The concrete font, absent when realization found none
    pub font: Option<Rc<RealizedFont>>,
}

impl RealizedFace {
    /// Whether `self` and `other` carry the same box decoration
    pub(crate) fn same_box(&self, other: &RealizedFace) -> bool {
        match (&self.face_box, &other.face_box) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for RealizedFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealizedFace")
            .field("ascent", &self.ascent)
            .field("descent", &self.descent)
            .field("space_width", &self.space_width)
            .field("has_font", &self.font.is_some())
            .finish_non_exhaustive()
    }
}

/// A font realized for some face
pub struct RealizedFont {
    /// Size used for combining-offset scaling (per-mille units)
    pub size: i32,
    pub driver: Rc<dyn FontDriver>,
}

impl RealizedFont {
    pub(crate) fn shaper(&self) -> Option<Rc<dyn Shaper>> {
        self.driver.shaper()
    }
}

/// Face realization capability
///
/// Implementations own the realized-face cache; the engine only borrows
/// handles out of it.
pub trait FaceResolver {
    /// Realize the prioritized `faces` against `language`/`charset`/`size`
    ///
    /// An empty `faces` list yields the default face of the frame.
    fn realize(
        &self,
        faces: &[FaceHandle],
        language: Option<Language>,
        charset: Option<Charset>,
        size: i32,
    ) -> Rc<RealizedFace>;

    /// Assign a face and glyph code to each glyph of a same-script run
    ///
    /// Glyph `ch` fields are read; `face` and `code` fields are written.
    /// The implementation may leave `code` as [`GlyphCode::INVALID`] where no
    /// font covers the character.
    fn for_chars(
        &self,
        script: Option<Script>,
        language: Option<Language>,
        charset: Option<Charset>,
        gs: &mut GlyphString,
        from: usize,
        to: usize,
        size: i32,
    );

    /// Fill `width`/`lbearing`/`rbearing`/`ascent`/`descent` of glyphs in
    /// `[from, to)`
    fn metrics(&self, gs: &mut GlyphString, from: usize, to: usize);
}

/// Rendering/encoding capability of one realized font
pub trait FontDriver {
    /// Map a character to its glyph code, or [`GlyphCode::INVALID`]
    fn encode_char(&self, c: char) -> GlyphCode;

    /// Draw the foreground of glyphs `[from, to)` at pen position `(x, y)`
    fn render(
        &self,
        surface: &mut dyn Any,
        x: i32,
        y: i32,
        gs: &GlyphString,
        from: usize,
        to: usize,
        reverse: bool,
        clip: Option<&Region>,
    );

    /// The font's layout-table shaper, if it declares one
    fn shaper(&self) -> Option<Rc<dyn Shaper>> {
        None
    }
}

/// Layout-table shaper of a font
pub trait Shaper {
    /// Shape glyphs `[from, to)` in place
    ///
    /// The shaper may replace, reorder, insert and delete glyphs within the
    /// range and assign explicit combining codes. Returns the new end index.
    fn run(&self, gs: &mut GlyphString, from: usize, to: usize, face: &Rc<RealizedFace>) -> usize;
}
