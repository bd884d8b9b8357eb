// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Draw control
//!
//! [`DrawControl`] collects every option of one layout-and-draw request. A
//! snapshot travels with each [`crate::GlyphString`]; the glyph cache reuses
//! a chain only when the layout-relevant options match
//! ([`DrawControl::layout_eq`]).

use crate::frame::Region;
use crate::glyph::CharPos;
use crate::store::TextStore;
use std::rc::Rc;

/// Per-line indent and width limit returned by a [`LineFormatter`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineFormat {
    pub indent: i32,
    /// 0 means unlimited
    pub width_limit: i32,
}

/// Per-line formatting capability
///
/// `line` counts physical lines from the start of the request and `y` is the
/// accumulated vertical offset; both reset at explicit newlines.
pub trait LineFormatter {
    fn format(&self, line: usize, y: i32) -> LineFormat;
}

/// Line-breaking capability
///
/// `pos` is the greedy overflow point. An implementation may return any
/// position strictly inside `(from, to)`; anything else leaves the line
/// unbroken.
pub trait LineBreaker {
    fn line_break(
        &self,
        text: &dyn TextStore,
        pos: CharPos,
        from: CharPos,
        to: CharPos,
        line: usize,
        y: i32,
    ) -> CharPos;
}

/// Options controlling composition, layout and drawing
#[derive(Clone)]
pub struct DrawControl {
    /// Paint face backgrounds behind glyphs
    pub as_image: bool,
    /// Insert left-padding even at the line head
    pub align_head: bool,
    /// Break on newlines and on the width limit
    pub two_dimensional: bool,
    /// Base paragraph direction is right-to-left
    pub orientation_reversed: bool,
    /// Apply visual reordering
    pub enable_bidi: bool,
    /// Render category-Cf characters as zero-width spaces
    pub ignore_formatting_char: bool,
    /// Force a monospace advance
    pub fixed_width: bool,
    /// Hint to the font driver
    pub anti_alias: bool,
    /// Floor of the line box
    pub min_line_ascent: i32,
    pub min_line_descent: i32,
    /// Ceiling of the line box; 0 (or ≤ the floor) means no ceiling
    pub max_line_ascent: i32,
    pub max_line_descent: i32,
    /// Maximum physical line width; 0 means unlimited
    pub max_line_width: i32,
    /// Multiples of space-width per tab stop; 0 means the default of 8
    pub tab_width: i32,

    /// Emit a cursor at [`Self::cursor_pos`] when inside the range
    pub with_cursor: bool,
    pub cursor_pos: CharPos,
    /// Cursor pixel width: negative → face space width, 0 → no cursor
    pub cursor_width: i32,
    /// Thin cursor with a direction tick
    pub cursor_bidi: bool,
    /// Expand the render clip to cover overlapping ink
    pub partial_update: bool,
    /// Do not attach the glyph cache property
    pub disable_caching: bool,

    pub clip: Option<Region>,
    pub format: Option<Rc<dyn LineFormatter>>,
    pub line_break: Option<Rc<dyn LineBreaker>>,
}

impl Default for DrawControl {
    fn default() -> Self {
        DrawControl {
            as_image: false,
            align_head: false,
            two_dimensional: false,
            orientation_reversed: false,
            enable_bidi: false,
            ignore_formatting_char: false,
            fixed_width: false,
            anti_alias: false,
            min_line_ascent: 0,
            min_line_descent: 0,
            max_line_ascent: 0,
            max_line_descent: 0,
            max_line_width: 0,
            tab_width: 0,
            with_cursor: false,
            cursor_pos: 0,
            cursor_width: 0,
            cursor_bidi: false,
            partial_update: false,
            disable_caching: false,
            clip: None,
            format: None,
            line_break: None,
        }
    }
}

impl DrawControl {
    /// Whether `self` and `other` agree on everything that shapes layout
    ///
    /// Cursor placement, partial update, caching and clipping do not affect
    /// glyph geometry, so a cached chain remains valid across changes to
    /// them. The formatter and breaker capabilities cannot be compared;
    /// callers changing those must clear the cache explicitly.
    pub fn layout_eq(&self, other: &DrawControl) -> bool {
        self.as_image == other.as_image
            && self.align_head == other.align_head
            && self.two_dimensional == other.two_dimensional
            && self.orientation_reversed == other.orientation_reversed
            && self.enable_bidi == other.enable_bidi
            && self.ignore_formatting_char == other.ignore_formatting_char
            && self.fixed_width == other.fixed_width
            && self.anti_alias == other.anti_alias
            && self.min_line_ascent == other.min_line_ascent
            && self.min_line_descent == other.min_line_descent
            && self.max_line_ascent == other.max_line_ascent
            && self.max_line_descent == other.max_line_descent
            && self.max_line_width == other.max_line_width
            && self.tab_width == other.tab_width
    }

    /// Tab advance in device units, given the frame's space width
    pub(crate) fn tab_advance(&self, space_width: i32) -> i32 {
        let stops = if self.tab_width > 0 { self.tab_width } else { 8 };
        space_width * stops
    }

    /// Number of positions past the end of text addressable by a cursor
    ///
    /// A non-zero cursor width makes the virtual position `text.len()`
    /// addressable so a cursor can follow the last character.
    pub(crate) fn cursor_slack(&self) -> usize {
        usize::from(self.cursor_width != 0)
    }
}

impl std::fmt::Debug for DrawControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawControl")
            .field("as_image", &self.as_image)
            .field("two_dimensional", &self.two_dimensional)
            .field("orientation_reversed", &self.orientation_reversed)
            .field("enable_bidi", &self.enable_bidi)
            .field("max_line_width", &self.max_line_width)
            .field("with_cursor", &self.with_cursor)
            .field("cursor_pos", &self.cursor_pos)
            .finish_non_exhaustive()
    }
}
