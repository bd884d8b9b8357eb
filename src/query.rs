// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Measurement and introspection queries
//!
//! Everything here goes through the glyph cache, so measuring a region and
//! then drawing it costs one layout.

use crate::cache::get_chain;
use crate::control::DrawControl;
use crate::error::{Error, Result};
use crate::frame::{Frame, Rect};
use crate::glyph::{CharPos, GlyphCode, GlyphKind, GlyphString};
use crate::store::TextStore;

/// Bounding boxes of a measured range
///
/// All rectangles are relative to the drawing origin: `y` grows downward
/// and the first baseline sits at `y = 0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextExtents {
    /// Width of the widest physical line
    pub width: i32,
    /// Bounding box of character ink, boxes included
    pub ink: Rect,
    /// Bounding box giving minimum spacing to other graphics
    pub logical: Rect,
    /// Bounding box giving minimum spacing to other drawn text
    pub line: Rect,
}

/// Per-character boxes from [`Frame::per_char_extents`]
#[derive(Clone, Debug, Default)]
pub struct PerCharExtents {
    /// Ink box per character, indexed relative to `from`
    pub ink: Vec<Rect>,
    /// Logical box per character, indexed relative to `from`
    pub logical: Vec<Rect>,
    pub overall_ink: Rect,
    pub overall_logical: Rect,
}

/// One cluster's geometry and its neighborhood
#[derive(Clone, Debug, Default)]
pub struct GlyphInfo {
    /// Character range of the cluster
    pub from: CharPos,
    pub to: CharPos,
    /// Character range of the physical line holding it
    pub line_from: CharPos,
    pub line_to: CharPos,
    /// Pen position of the cluster relative to the drawing origin
    pub x: i32,
    pub y: i32,
    /// Ink rectangle relative to the pen position
    pub this: Rect,
    pub code: GlyphCode,
    pub logical_width: i32,
    /// Start of the logically previous cluster, possibly on another line
    pub prev_from: Option<CharPos>,
    /// Range of the visually adjacent cluster to the left
    pub left: Option<(CharPos, CharPos)>,
    /// Range of the visually adjacent cluster to the right
    pub right: Option<(CharPos, CharPos)>,
    /// End of the logically next cluster, possibly on another line
    pub next_to: Option<CharPos>,
}

/// One glyph from [`Frame::glyph_list`]
#[derive(Clone, Debug, Default)]
pub struct GlyphEntry {
    pub from: CharPos,
    pub to: CharPos,
    pub code: GlyphCode,
    /// Displacement applied when positioning, padding folded in
    pub x: i32,
    pub y: i32,
    /// Ink rectangle relative to the glyph origin
    pub this: Rect,
    pub logical_width: i32,
}

/// Drop every glyph chain cached on `text`
///
/// Required after changing the behavior of a formatter or breaker
/// capability, which cache validation cannot observe.
pub fn clear_cache(text: &dyn TextStore) {
    text.clear_chains();
}

fn line_of(frame: &Frame, text: &dyn TextStore, pos: CharPos, to: CharPos, control: &DrawControl) -> Result<GlyphString> {
    let (chain, idx) = get_chain(frame, text, pos, to, control)?;
    let gs = chain.borrow().lines[idx].clone();
    Ok(gs)
}

impl Frame {
    /// Measure `[from, to)` of `text`
    ///
    /// Returns the width of the widest physical line together with the
    /// overall bounding boxes.
    pub fn text_extents(
        &self,
        text: &dyn TextStore,
        from: CharPos,
        to: CharPos,
        control: &DrawControl,
    ) -> Result<TextExtents> {
        if from > text.len() {
            return Err(Error::Range);
        }
        let to = to.min(text.len() + control.cursor_slack()).max(from);

        let mut gs = line_of(self, text, from, to, control)?;
        let (mut width, mut rbearing) = gs.width_of(from, to);

        let mut ext = TextExtents::default();
        ext.ink.y = -gs.physical_ascent;
        ext.ink.x = gs.lbearing;
        ext.logical.y = -gs.ascent;
        ext.logical.x = 0;
        ext.line.y = -gs.line_ascent;
        ext.line.x = gs.lbearing;

        let mut y = 0;
        let mut from = gs.to;
        while from < to {
            y += gs.line_descent;
            gs = line_of(self, text, from, to, control)?;
            let (w, rb) = gs.width_of(from, to);
            y += gs.line_ascent;
            width = width.max(w);
            rbearing = rbearing.max(rb);
            from = gs.to;
        }

        ext.width = width;
        ext.ink.width = rbearing;
        ext.ink.height = y + gs.physical_descent - ext.ink.y;
        ext.logical.width = width;
        ext.logical.height = y + gs.descent - ext.logical.y;
        ext.line.width = width.max(rbearing);
        ext.line.height = y + gs.line_descent - ext.line.y;
        Ok(ext)
    }

    /// Measure every character of `[from, to)`
    ///
    /// Only the first physical line is measured when laying out
    /// two-dimensionally. Characters not covered by that line keep default
    /// rectangles.
    pub fn per_char_extents(
        &self,
        text: &dyn TextStore,
        from: CharPos,
        to: CharPos,
        control: &DrawControl,
    ) -> Result<PerCharExtents> {
        if from > to || to > text.len() {
            return Err(Error::Range);
        }
        let mut out = PerCharExtents {
            ink: vec![Rect::default(); to - from],
            logical: vec![Rect::default(); to - from],
            ..Default::default()
        };
        if from == to {
            return Ok(out);
        }

        let gs = line_of(self, text, from, to, control)?;
        let mut x = 0;
        let mut i = 1;
        while i < gs.last() {
            let g = &gs.glyphs[i];
            if g.pos < from || g.pos >= to {
                i += 1;
                continue;
            }
            let start = g.pos;
            let mut end = g.to;
            let mut width = g.width;
            let mut lbearing = g.lbearing;
            let mut rbearing = g.rbearing;
            let mut ascent = g.ascent;
            let mut descent = g.descent;
            let logical_ascent = g.face.ascent;
            let logical_descent = g.face.descent;

            i += 1;
            while i < gs.last() && gs.glyphs[i].pos == start {
                let g = &gs.glyphs[i];
                lbearing = lbearing.max(width + g.lbearing);
                rbearing = rbearing.max(width + g.rbearing);
                width += g.width;
                ascent = ascent.max(g.ascent);
                descent = descent.max(g.descent);
                end = end.max(g.to);
                i += 1;
            }

            for p in start..end.min(to) {
                out.ink[p - from] = Rect::new(x + lbearing, -ascent, rbearing - lbearing, ascent + descent);
                out.logical[p - from] = Rect::new(
                    x,
                    -logical_descent,
                    width,
                    logical_ascent + logical_descent,
                );
            }
            x += width;
        }

        out.overall_ink = Rect::new(gs.lbearing, -gs.line_ascent, x - gs.lbearing, gs.height);
        out.overall_logical = Rect::new(0, -gs.ascent, x, gs.ascent + gs.descent);
        Ok(out)
    }

    /// Character position drawn at device coordinates `(x, y)`
    ///
    /// Coordinates are relative to the drawing origin of `[from, to)`.
    /// Above the drawn area resolves to `from`; below it to `to`.
    pub fn coordinates_position(
        &self,
        text: &dyn TextStore,
        from: CharPos,
        to: CharPos,
        x_offset: i32,
        y_offset: i32,
        control: &DrawControl,
    ) -> Result<CharPos> {
        if from > text.len() {
            return Err(Error::Range);
        }
        let to = to.min(text.len() + control.cursor_slack()).max(from);
        if from == to {
            return Ok(from);
        }

        let mut from = from;
        let mut y = 0;
        let mut gs = line_of(self, text, from, to, control)?;
        while y + gs.line_descent <= y_offset && gs.to < to {
            from = gs.to;
            y += gs.line_descent;
            gs = line_of(self, text, from, to, control)?;
            y += gs.line_ascent;
        }

        let mut found = None;
        if !control.orientation_reversed {
            let mut width = gs.indent;
            for i in gs.body() {
                // The last glyph on the line soaks up everything to its
                // right.
                if i + 1 >= gs.last() {
                    found = Some(i);
                    break;
                }
                let g = &gs.glyphs[i];
                if g.pos >= from && g.pos < to {
                    width += g.width;
                    if width > x_offset {
                        found = Some(i);
                        break;
                    }
                }
            }
        } else {
            let mut width = -gs.indent;
            for i in gs.body().rev() {
                let g = &gs.glyphs[i];
                if g.pos >= from && g.pos < to {
                    width -= g.width;
                    if width < x_offset {
                        found = Some(i);
                        break;
                    }
                }
            }
        }
        Ok(found.map_or(gs.from, |i| gs.glyphs[i].pos))
    }

    /// Geometry of the cluster covering `pos`, with its neighbors
    ///
    /// The text is assumed drawn from `from`; neighbor lookups cross line
    /// boundaries through the glyph cache.
    pub fn glyph_info(
        &self,
        text: &dyn TextStore,
        from: CharPos,
        pos: CharPos,
        control: &DrawControl,
    ) -> Result<GlyphInfo> {
        if from > pos || pos >= text.len() + control.cursor_slack() {
            return Err(Error::Range);
        }

        let mut y = 0;
        let mut gs = line_of(self, text, from, pos + 1, control)?;
        while gs.to <= pos {
            y += gs.line_descent;
            let next_from = gs.to;
            gs = line_of(self, text, next_from, pos + 1, control)?;
            y += gs.line_ascent;
        }

        let mut info = GlyphInfo {
            line_from: gs.from.max(from),
            line_to: gs.to,
            y,
            ..Default::default()
        };

        // Pen-advance to the cluster covering pos.
        let gi;
        if !control.orientation_reversed {
            info.x = gs.indent;
            let mut i = 1;
            while i < gs.last() && !(gs.glyphs[i].pos <= pos && gs.glyphs[i].to > pos) {
                info.x += gs.glyphs[i].width;
                i += 1;
            }
            gi = i;
        } else {
            info.x = -gs.indent;
            let mut i = gs.last() - 1;
            while i > 0 && !(gs.glyphs[i].pos <= pos && gs.glyphs[i].to > pos) {
                info.x -= gs.glyphs[i].width;
                i -= 1;
            }
            let mut i = i;
            while i > 1 && gs.glyphs[i - 1].to == gs.glyphs[i].to {
                i -= 1;
            }
            gi = i;
        }
        if gi == 0 || gi >= gs.last() {
            return Err(Error::Draw);
        }

        {
            let g = &gs.glyphs[gi];
            info.from = g.pos;
            info.to = g.to;
            info.code = g.code;
            info.this = Rect::new(g.lbearing, -gs.line_ascent, -g.lbearing + g.width, gs.height);
        }

        info.prev_from = if info.from > info.line_from {
            gs.find_glyph(info.from - 1, true).map(|i| gs.glyphs[i].pos)
        } else if gs.from > 0 {
            let prev = line_of(self, text, gs.from - 1, gs.from, control)?;
            prev.find_glyph(info.from - 1, true).map(|i| prev.glyphs[i].pos)
        } else {
            None
        };

        let no_cursor = usize::from(control.cursor_width == 0);
        info.left = if gi > 1 {
            let g = &gs.glyphs[gi - 1];
            Some((g.pos, g.to))
        } else if !control.orientation_reversed {
            if gs.from > 0 {
                let prev = line_of(self, text, gs.from - 1, gs.from, control)?;
                let g = &prev.glyphs[prev.last() - 1];
                Some((g.pos, g.to))
            } else {
                None
            }
        } else if gs.to + no_cursor <= text.len() {
            let next = line_of(self, text, gs.to, gs.to + 1, control)?;
            let g = &next.glyphs[next.last() - 1];
            Some((g.pos, g.to))
        } else {
            None
        };

        info.next_to = if info.to < gs.to {
            gs.find_glyph(info.to, false).map(|i| gs.glyphs[i].to)
        } else if info.to + no_cursor <= text.len() {
            let next = line_of(self, text, info.to, info.to + 1, control)?;
            next.find_glyph(info.to, false).map(|i| next.glyphs[i].to)
        } else {
            None
        };

        // Fold the remaining cluster members into the widths.
        let mut g = gi;
        info.logical_width = gs.glyphs[g].width;
        g += 1;
        while g < gs.last() && gs.glyphs[g].pos == info.from {
            info.this.width += gs.glyphs[g].width;
            info.logical_width += gs.glyphs[g].width;
            g += 1;
        }
        info.this.width += gs.glyphs[g - 1].rbearing - gs.glyphs[g - 1].width;

        info.right = if g < gs.last() {
            Some((gs.glyphs[g].pos, gs.glyphs[g].to))
        } else if !control.orientation_reversed {
            if gs.to + no_cursor <= text.len() {
                let next = line_of(self, text, gs.to, gs.to + 1, control)?;
                let g = &next.glyphs[1];
                Some((g.pos, g.to))
            } else {
                None
            }
        } else if gs.from > 0 {
            let prev = line_of(self, text, gs.from - 1, gs.from, control)?;
            let g = &prev.glyphs[1];
            Some((g.pos, g.to))
        } else {
            None
        };

        Ok(info)
    }

    /// Per-glyph introspection over `[from, to)`
    ///
    /// Box edges are omitted; padding folds into the glyph it pads.
    pub fn glyph_list(
        &self,
        text: &dyn TextStore,
        from: CharPos,
        to: CharPos,
        control: &DrawControl,
    ) -> Result<Vec<GlyphEntry>> {
        if from > to || to > text.len() {
            return Err(Error::Range);
        }
        let gs = line_of(self, text, from, to, control)?;
        let mut out: Vec<GlyphEntry> = vec![];
        let mut pad_width = 0;
        for i in gs.body() {
            let g = &gs.glyphs[i];
            if g.kind == GlyphKind::Box || g.pos < from || g.pos >= to {
                continue;
            }
            if g.kind == GlyphKind::Pad {
                if g.left_padding {
                    pad_width = g.width;
                } else if let Some(last) = out.last_mut() {
                    pad_width = 0;
                    last.x += g.width;
                    last.this.x += g.width;
                    last.this.width += g.width;
                    last.logical_width += g.width;
                }
                continue;
            }
            out.push(GlyphEntry {
                from: g.pos,
                to: g.to,
                code: g.code,
                x: g.xoff + pad_width,
                y: g.yoff,
                this: Rect::new(
                    g.lbearing + pad_width,
                    -g.ascent,
                    g.rbearing - g.lbearing + pad_width,
                    g.ascent + g.descent,
                ),
                logical_width: g.width,
            });
            pad_width = 0;
        }
        Ok(out)
    }
}
