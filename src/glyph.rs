// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Glyph buffer types
//!
//! A [`GlyphString`] is one physical line of laid-out text: an owning
//! `Vec<Glyph>` flanked by two sentinel [`GlyphKind::Anchor`] glyphs. All
//! walks happen between the anchors, by index. Inserting a glyph shifts
//! indices, so passes that insert re-fetch indices rather than caching them.
//!
//! A [`GlyphChain`] roots the physical lines produced for one logical range
//! after line breaking.

use crate::combining::CombiningCode;
use crate::control::DrawControl;
use crate::faces::RealizedFace;
use icu_properties::props::GeneralCategory;
use std::rc::Rc;

/// 0-based character position in the backing text
pub type CharPos = usize;

/// Font-specific glyph id
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GlyphCode(pub u32);

impl GlyphCode {
    /// Sentinel for characters no font could encode
    pub const INVALID: GlyphCode = GlyphCode(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlyphKind {
    /// A character drawn through its font
    Char,
    /// Space, tab or newline
    Space,
    /// Width adjustment for ink protruding past logical bounds
    Pad,
    /// Vertical edge of a face box
    Box,
    /// Sentinel at both ends of the buffer
    Anchor,
}

/// One glyph of a [`GlyphString`]
#[derive(Clone)]
pub struct Glyph {
    pub kind: GlyphKind,
    /// Source character; NUL for anchors, boxes and pads
    pub ch: char,
    pub code: GlyphCode,
    /// Covered character range: `pos < to` for non-anchors
    pub pos: CharPos,
    pub to: CharPos,
    pub face: Rc<RealizedFace>,
    /// General category, when the composer looked it up
    pub category: Option<GeneralCategory>,
    pub combining: CombiningCode,
    /// Embedding level from the reordering pass
    pub bidi_level: u8,

    pub width: i32,
    pub lbearing: i32,
    pub rbearing: i32,
    pub ascent: i32,
    pub descent: i32,
    /// Horizontal displacement applied at positioning
    pub xoff: i32,
    /// Vertical displacement applied at positioning
    pub yoff: i32,

    pub left_padding: bool,
    pub right_padding: bool,
    /// Set by shapers that already emitted font-table positioning
    pub otf_encoded: bool,
    /// Scratch flag of the renderer: glyph participates in the current draw
    pub enabled: bool,
}

impl Glyph {
    pub(crate) fn new(kind: GlyphKind, pos: CharPos, face: Rc<RealizedFace>) -> Self {
        Glyph {
            kind,
            ch: '\0',
            code: GlyphCode::default(),
            pos,
            to: pos,
            face,
            category: None,
            combining: CombiningCode::NONE,
            bidi_level: 0,
            width: 0,
            lbearing: 0,
            rbearing: 0,
            ascent: 0,
            descent: 0,
            xoff: 0,
            yoff: 0,
            left_padding: false,
            right_padding: false,
            otf_encoded: false,
            enabled: false,
        }
    }

    #[inline]
    pub fn is_anchor(&self) -> bool {
        self.kind == GlyphKind::Anchor
    }
}

impl std::fmt::Debug for Glyph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:?} pos:{}-{} c:{:04X} code:{:04X} cmb:{:?} w:{} bidi:{})",
            self.kind, self.pos, self.to, self.ch as u32, self.code.0, self.combining, self.width,
            self.bidi_level
        )
    }
}

/// One laid-out physical line
///
/// Created by the composer, mutated by the layouter, possibly truncated by
/// the line breaker.
#[derive(Clone, Debug)]
pub struct GlyphString {
    /// Logical character range covered
    pub from: CharPos,
    pub to: CharPos,

    pub indent: i32,
    /// Maximum line width; 0 means unlimited
    pub width_limit: i32,

    pub width: i32,
    pub lbearing: i32,
    pub rbearing: i32,
    pub ascent: i32,
    pub descent: i32,
    pub physical_ascent: i32,
    pub physical_descent: i32,
    pub text_ascent: i32,
    pub text_descent: i32,
    pub line_ascent: i32,
    pub line_descent: i32,
    pub height: i32,

    // Intermediate results of per-run layout
    pub(crate) sub_width: i32,
    pub(crate) sub_lbearing: i32,
    pub(crate) sub_rbearing: i32,

    /// Snapshot of the control the string was built under
    pub control: DrawControl,

    pub glyphs: Vec<Glyph>,
}

impl GlyphString {
    pub(crate) fn new(from: CharPos, control: DrawControl, line: usize, y: i32) -> Self {
        let (indent, width_limit) = match control.format.as_ref() {
            Some(fmt) => {
                let lf = fmt.format(line, y);
                (lf.indent, lf.width_limit)
            }
            None => (0, control.max_line_width),
        };
        GlyphString {
            from,
            to: from,
            indent,
            width_limit,
            width: 0,
            lbearing: 0,
            rbearing: 0,
            ascent: 0,
            descent: 0,
            physical_ascent: 0,
            physical_descent: 0,
            text_ascent: 0,
            text_descent: 0,
            line_ascent: 0,
            line_descent: 0,
            height: 0,
            sub_width: 0,
            sub_lbearing: 0,
            sub_rbearing: 0,
            control,
            glyphs: vec![],
        }
    }

    /// Index of the trailing anchor
    #[inline]
    pub fn last(&self) -> usize {
        self.glyphs.len() - 1
    }

    /// Indices of the glyphs between the anchors
    #[inline]
    pub fn body(&self) -> std::ops::Range<usize> {
        1..self.last()
    }

    /// Drop all glyphs, keeping capacity, and restart at `from`
    pub(crate) fn reset(&mut self, from: CharPos) {
        self.glyphs.clear();
        self.from = from;
        self.to = from;
    }

    pub(crate) fn push(&mut self, g: Glyph) {
        self.glyphs.push(g);
    }

    pub(crate) fn insert(&mut self, index: usize, g: Glyph) {
        self.glyphs.insert(index, g);
    }

    /// Index of the cluster end: the first glyph after `index` that is not a
    /// combining mark
    pub(crate) fn cluster_end(&self, index: usize) -> usize {
        let mut i = index + 1;
        while i < self.last() && self.glyphs[i].combining.is_combining() {
            i += 1;
        }
        i
    }

    /// Width and right bearing of the glyphs covering `[from, to)`
    pub fn width_of(&self, from: CharPos, to: CharPos) -> (i32, i32) {
        if from <= self.from && to >= self.to {
            return (self.width, self.rbearing);
        }
        let mut width = 0;
        let mut rbearing = 0;
        for g in &self.glyphs[self.body()] {
            if g.pos >= from && g.pos < to {
                rbearing = rbearing.max(width + g.rbearing);
                width += g.width;
            }
        }
        (width, rbearing)
    }

    /// The glyph covering `pos`, searching forward or backward
    pub(crate) fn find_glyph(&self, pos: CharPos, forward: bool) -> Option<usize> {
        let covers = |g: &Glyph| !g.is_anchor() && g.pos <= pos && g.to > pos;
        if forward {
            self.body().find(|&i| covers(&self.glyphs[i]))
        } else {
            self.body().rev().find(|&i| covers(&self.glyphs[i]))
        }
    }
}

/// The physical lines laid out for one logical range
///
/// Owned by the glyph cache (or transiently by a query); shared through
/// `Rc<RefCell<…>>`, single-threaded per frame.
#[derive(Debug)]
pub struct GlyphChain {
    /// Identity of the frame the chain was built for
    pub(crate) frame_id: u64,
    /// Frame tick at build time; the tick moves on font-config changes
    pub(crate) tick: u64,
    pub lines: Vec<GlyphString>,
}

impl GlyphChain {
    /// Logical start of the first line
    pub fn from(&self) -> CharPos {
        self.lines.first().map_or(0, |gs| gs.from)
    }

    /// Logical end of the last line
    pub fn to(&self) -> CharPos {
        self.lines.last().map_or(0, |gs| gs.to)
    }

    /// Index of the line containing `pos`
    pub fn line_at(&self, pos: CharPos) -> Option<usize> {
        self.lines.iter().position(|gs| gs.to > pos)
    }

    /// Shift every character label after the attachment point moved
    pub(crate) fn translate(&mut self, offset: isize) {
        if offset == 0 {
            return;
        }
        let shift = |v: CharPos| (v as isize + offset) as CharPos;
        for gs in &mut self.lines {
            gs.from = shift(gs.from);
            gs.to = shift(gs.to);
            for g in &mut gs.glyphs {
                g.pos = shift(g.pos);
                g.to = shift(g.to);
            }
        }
    }
}
