// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Glyph string layout
//!
//! The layouter fills in everything composition left open: device metrics
//! from the face resolver, mark placement on bases, box-edge and padding
//! glyphs, space/tab/newline advances and the line box. Space glyphs are
//! handled here directly; character clusters go through
//! [`layout_cluster`].
//!
//! Insertion of box and pad glyphs shifts buffer indices; every insertion
//! point below re-derives indices instead of holding on to them.

use crate::combining::CombiningCode;
use crate::faces::FaceBox;
use crate::frame::Frame;
use crate::glyph::{GlyphKind, GlyphString};
use icu_properties::props::GeneralCategory;
use std::rc::Rc;

fn same_box(a: &Option<Rc<FaceBox>>, b: &Option<Rc<FaceBox>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// Resolve metrics and mark placement for the cluster run `[from, to)`
///
/// Results accumulate into `sub_width`/`sub_lbearing`/`sub_rbearing` and the
/// physical ascent/descent of `gs`.
fn layout_cluster(frame: &Frame, gs: &mut GlyphString, from: usize, to: usize) {
    let mut physical_ascent = gs.physical_ascent;
    let mut physical_descent = gs.physical_descent;
    let mut run_width = 0;
    let mut run_lbearing = 0;
    let mut run_rbearing = 0;

    frame.resolver.metrics(gs, from, to);

    let mut i = from;
    while i < to {
        let base = i;
        i += 1;

        let lbearing;
        let rbearing;
        if i == to || !gs.glyphs[i].combining.is_combining() {
            // No combining.
            let g = &mut gs.glyphs[base];
            if g.left_padding && g.lbearing < 0 {
                g.xoff = -g.lbearing;
                g.width += g.xoff;
                g.rbearing += g.xoff;
                g.lbearing = 0;
            }
            if g.right_padding && g.rbearing > g.width {
                g.width = g.rbearing;
            }
            lbearing = g.lbearing.min(0);
            rbearing = g.rbearing;
        } else {
            // With combining glyphs.
            let mut left = -gs.glyphs[base].width;
            let mut right = 0;
            let mut top = -gs.glyphs[base].ascent;
            let mut bottom = gs.glyphs[base].descent;
            let mut height = bottom - top;
            let mut begin = gs.glyphs[base].pos;
            let mut end = gs.glyphs[base].to;
            let mut width = gs.glyphs[base].width;
            let mut lb = gs.glyphs[base].lbearing.min(0);
            let mut rb = gs.glyphs[base].rbearing;

            while i < to && gs.glyphs[i].combining.is_combining() {
                let g = &mut gs.glyphs[i];
                if g.combining.is_by_class() {
                    g.combining = CombiningCode::from_class(g.combining.class());
                }
                let p = g.combining.unpack();
                let size = g.face.font.as_ref().map_or(g.face.font_size, |f| f.size);
                let off_x = size * (i32::from(p.off_x) - 128) / 1000;
                let off_y = size * (i32::from(p.off_y) - 128) / 1000;

                begin = begin.min(g.pos);
                end = end.max(g.to);

                g.xoff = left + (width * i32::from(p.base_x) - g.width * i32::from(p.add_x)) / 2
                    + off_x;
                left = left.min(g.xoff);
                right = right.max(g.xoff + g.width);
                width = right - left;
                if g.xoff + g.lbearing < left + lb {
                    lb = g.xoff + g.lbearing - left;
                }
                if g.xoff + g.rbearing > left + rb {
                    rb = g.xoff + g.rbearing - left;
                }

                g.yoff = if p.base_y < 3 {
                    top + height * i32::from(p.base_y) / 2
                } else {
                    0
                };
                if p.add_y < 3 {
                    g.yoff -= (g.ascent + g.descent) * i32::from(p.add_y) / 2 - g.ascent;
                }
                g.yoff -= off_y;
                top = top.min(g.yoff - g.ascent);
                bottom = bottom.max(g.yoff + g.descent);
                height = bottom - top;

                g.width = 0;
                i += 1;
            }

            {
                let b = &mut gs.glyphs[base];
                b.ascent = -top;
                b.descent = bottom;
                b.lbearing = lb;
                b.rbearing = rb;
                if left < -b.width {
                    // Ink reaches left of the base origin: shift the cluster.
                    b.xoff = -b.width - left;
                    b.width += b.xoff;
                    b.rbearing += b.xoff;
                    b.lbearing += b.xoff;
                }
                if right > 0 {
                    // Ink reaches past the base advance: widen and pull the
                    // marks back.
                    b.width += right;
                    b.rbearing += right;
                    b.right_padding = true;
                }
            }
            if right > 0 {
                for k in (base + 1)..i {
                    gs.glyphs[k].xoff -= right;
                }
            }
            for k in base..i {
                gs.glyphs[k].pos = begin;
                gs.glyphs[k].to = end;
            }
            lbearing = lb;
            rbearing = rb;
        }

        let b = &gs.glyphs[base];
        physical_ascent = physical_ascent.max(b.ascent);
        physical_descent = physical_descent.max(b.descent);
        run_lbearing = run_lbearing.min(run_width + lbearing);
        run_rbearing = run_rbearing.max(run_width + rbearing);
        run_width += b.width;
    }

    gs.physical_ascent = physical_ascent;
    gs.physical_descent = physical_descent;
    gs.sub_width = run_width;
    gs.sub_lbearing = run_lbearing;
    gs.sub_rbearing = run_rbearing;
}

/// Lay out `gs` completely
pub(crate) fn layout(frame: &Frame, gs: &mut GlyphString) {
    let tab_width = gs.control.tab_advance(frame.space_width);
    let mut tab_found = false;
    let ignore_formatting = gs.control.ignore_formatting_char;
    let fixed_width = gs.control.fixed_width;

    gs.ascent = 0;
    gs.descent = 0;
    gs.physical_ascent = 0;
    gs.physical_descent = 0;
    gs.width = 0;
    gs.lbearing = 0;
    gs.rbearing = 0;

    let mut cur_box: Option<Rc<FaceBox>> = None;
    let mut box_line_height = 0;

    let mut i = 1;
    while gs.glyphs[i].kind != GlyphKind::Anchor {
        if !same_box(&cur_box, &gs.glyphs[i].face.face_box) {
            let mut gidx = i;
            if let Some(b) = cur_box.take() {
                // Close the outgoing box; the edge belongs to the previous
                // cluster.
                let mut edge = gs.glyphs[gidx - 1].clone();
                edge.kind = GlyphKind::Box;
                edge.width = if fixed_width { frame.space_width } else { b.edge_width() };
                edge.lbearing = 0;
                edge.rbearing = edge.width;
                edge.xoff = 0;
                edge.right_padding = true;
                gs.width += edge.width;
                gs.rbearing += edge.width;
                gs.insert(gidx, edge);
                gidx += 1;
            }
            cur_box = gs.glyphs[gidx].face.face_box.clone();
            if let Some(b) = cur_box.clone() {
                // Open the incoming box; the edge belongs to the following
                // cluster.
                box_line_height = box_line_height.max(b.line_height());
                let mut edge = gs.glyphs[gidx].clone();
                edge.kind = GlyphKind::Box;
                edge.width = if fixed_width { frame.space_width } else { b.edge_width() };
                edge.lbearing = 0;
                edge.rbearing = edge.width;
                edge.xoff = 0;
                edge.left_padding = true;
                gs.width += edge.width;
                gs.rbearing += edge.width;
                gs.insert(gidx, edge);
                gidx += 1;
            }
            i = gidx;
        }

        if ignore_formatting && gs.glyphs[i].category == Some(GeneralCategory::Format) {
            gs.glyphs[i].kind = GlyphKind::Space;
        }

        match gs.glyphs[i].kind {
            GlyphKind::Char => {
                let rface = gs.glyphs[i].face.clone();
                let has_font = rface.font.is_some();
                let from = i;
                let from_invalid = !gs.glyphs[from].code.is_valid();

                let mut j = i + 1;
                while gs.glyphs[j].kind == GlyphKind::Char {
                    let g = &gs.glyphs[j];
                    if has_font != g.face.font.is_some()
                        || !same_box(&cur_box, &g.face.face_box)
                        || from_invalid != !g.code.is_valid()
                        || (ignore_formatting && g.category == Some(GeneralCategory::Format))
                    {
                        break;
                    }
                    j += 1;
                }

                if has_font && !from_invalid {
                    layout_cluster(frame, gs, from, j);
                    let mut to = j;

                    let mut extra = -gs.sub_lbearing;
                    if extra > 0 && (from > 1 || gs.control.align_head) {
                        // Ink protrudes left of the run: pad, or let the
                        // preceding space absorb it.
                        let mut pad = gs.glyphs[from].clone();
                        pad.kind = GlyphKind::Pad;
                        pad.xoff = 0;
                        pad.lbearing = 0;
                        pad.width = extra;
                        pad.rbearing = extra;
                        pad.left_padding = true;
                        gs.insert(from, pad);
                        to += 1;
                        gs.sub_lbearing = 0;
                        gs.sub_width += extra;
                        gs.sub_rbearing += extra;

                        let prev = from - 1;
                        if prev >= 1 && gs.glyphs[prev].kind == GlyphKind::Space {
                            // Keep at least a 2-unit space width.
                            let space_width = gs.glyphs[prev].width;
                            if extra + 2 < space_width {
                                gs.glyphs[prev].width -= extra;
                            } else {
                                extra -= space_width - 2;
                                gs.glyphs[prev].width = 2;
                            }
                            gs.width -= extra;
                            gs.rbearing -= extra;
                        }
                    }

                    let extra = gs.sub_rbearing - gs.sub_width;
                    if extra > 0 {
                        let next_is_space = gs.glyphs[to].kind == GlyphKind::Space
                            && same_box(&cur_box, &gs.glyphs[to].face.face_box);
                        if next_is_space {
                            let mut pad = gs.glyphs[to - 1].clone();
                            pad.kind = GlyphKind::Pad;
                            pad.xoff = 0;
                            pad.lbearing = 0;
                            pad.width = extra;
                            pad.rbearing = extra;
                            pad.left_padding = false;
                            pad.right_padding = true;
                            gs.insert(to, pad);
                            to += 1;
                        } else {
                            gs.glyphs[to - 1].width += extra;
                        }
                        gs.sub_width += extra;
                    }

                    gs.lbearing = gs.lbearing.min(gs.width + gs.sub_lbearing);
                    gs.rbearing = gs.rbearing.max(gs.width + gs.sub_rbearing);
                    gs.width += gs.sub_width;
                    gs.ascent = gs.ascent.max(rface.ascent);
                    gs.descent = gs.descent.max(rface.descent);
                    i = to;
                } else {
                    // No realized font (or nothing encodable): every glyph
                    // renders as an empty box of space width, except
                    // zero-width specials.
                    for k in from..j {
                        let g = &mut gs.glyphs[k];
                        let c = g.ch as u32;
                        if (0x200B..=0x200F).contains(&c) || (0x202A..=0x202E).contains(&c) {
                            g.width = 1;
                            g.rbearing = 1;
                        } else {
                            g.width = rface.space_width;
                            g.rbearing = g.width;
                        }
                        g.xoff = 0;
                        g.lbearing = 0;
                        g.ascent = 0;
                        g.descent = 0;
                        gs.width += g.width;
                        gs.rbearing += g.width;
                    }
                    gs.ascent = gs.ascent.max(frame.rface.ascent);
                    gs.descent = gs.descent.max(frame.rface.descent);
                    i = j;
                }
            }
            GlyphKind::Space => {
                let prev_pad_width = (gs.glyphs[i - 1].kind == GlyphKind::Pad)
                    .then(|| gs.glyphs[i - 1].width);
                let control_cursor_width = gs.control.cursor_width;
                let cursor_bidi = gs.control.cursor_bidi;
                let indent_plus_width = gs.indent + gs.width;

                let g = &mut gs.glyphs[i];
                match g.ch {
                    ' ' => g.width = g.face.space_width,
                    '\n' => {
                        g.width = control_cursor_width;
                        if g.width != 0 {
                            if cursor_bidi {
                                g.width = 3;
                            } else if g.width < 0 {
                                g.width = g.face.space_width;
                            }
                        }
                    }
                    '\t' => {
                        g.width = tab_width - (indent_plus_width % tab_width);
                        tab_found = true;
                    }
                    _ => g.width = 1,
                }
                if let Some(pad) = prev_pad_width {
                    // This space absorbs (maybe partially) the preceding
                    // padding glyph.
                    g.width -= pad;
                    if g.width < 1 {
                        g.width = 2;
                    }
                }
                g.rbearing = g.width;
                let width = g.width;
                let has_font = g.face.font.is_some();
                let (f_ascent, f_descent) = (g.face.ascent, g.face.descent);
                gs.width += width;
                gs.rbearing += width;
                if has_font {
                    gs.ascent = gs.ascent.max(f_ascent);
                    gs.descent = gs.descent.max(f_descent);
                }
                i += 1;
            }
            _ => {
                gs.width += gs.glyphs[i].width;
                gs.rbearing += gs.glyphs[i].width;
                i += 1;
            }
        }
    }

    if let Some(b) = cur_box {
        // Close a box still open at the end of the line.
        let mut edge = gs.glyphs[i - 1].clone();
        edge.kind = GlyphKind::Box;
        edge.width = if fixed_width { frame.space_width } else { b.edge_width() };
        edge.lbearing = 0;
        edge.rbearing = edge.width;
        edge.xoff = 0;
        edge.right_padding = true;
        gs.width += edge.width;
        gs.rbearing += edge.width;
        gs.insert(i, edge);
    }

    gs.text_ascent = gs.ascent.max(gs.physical_ascent);
    gs.text_descent = gs.descent.max(gs.physical_descent);
    gs.line_ascent = gs.text_ascent;
    gs.line_descent = gs.text_descent;
    if box_line_height > 0 {
        gs.line_ascent += box_line_height;
        gs.physical_ascent = gs.line_ascent;
        gs.line_descent += box_line_height;
        gs.physical_descent = gs.line_descent;
    }

    let (min_ascent, max_ascent) = (gs.control.min_line_ascent, gs.control.max_line_ascent);
    let (min_descent, max_descent) = (gs.control.min_line_descent, gs.control.max_line_descent);
    if gs.line_ascent < min_ascent {
        gs.line_ascent = min_ascent;
    } else if max_ascent != 0 && max_ascent > min_ascent && gs.line_ascent > max_ascent {
        gs.line_ascent = max_ascent;
    }
    if gs.line_descent < min_descent {
        gs.line_descent = min_descent;
    } else if max_descent != 0 && max_descent > min_descent && gs.line_descent > max_descent {
        gs.line_descent = max_descent;
    }
    gs.height = gs.line_ascent + gs.line_descent;

    if gs.control.orientation_reversed && tab_found {
        // Tab stops count from the right edge on reversed lines.
        let mut width = gs.indent;
        for k in (1..gs.last()).rev() {
            if gs.glyphs[k].kind == GlyphKind::Space && gs.glyphs[k].ch == '\t' {
                let mut this_width = tab_width - (width % tab_width);
                if gs.glyphs[k + 1].kind == GlyphKind::Pad {
                    this_width -= gs.glyphs[k + 1].width;
                }
                if gs.glyphs[k - 1].kind == GlyphKind::Pad {
                    this_width -= gs.glyphs[k - 1].width;
                }
                this_width = this_width.max(2);
                gs.width += this_width - gs.glyphs[k].width;
                gs.rbearing += this_width - gs.glyphs[k].width;
                gs.glyphs[k].width = this_width;
                width += this_width;
            } else {
                width += gs.glyphs[k].width;
            }
        }
    }

    log::trace!(
        "laid out [{}, {}): width {} line box {}+{}",
        gs.from,
        gs.to,
        gs.width,
        gs.line_ascent,
        gs.line_descent
    );
}
