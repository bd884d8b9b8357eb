// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Rendering
//!
//! Each physical line draws in two passes. The background pass fills face
//! backgrounds and the cursor, collecting the cursor rectangles into a
//! region; the foreground pass walks the glyphs again grouped by face and
//! kind, dispatching to the font driver (valid characters), the frame driver
//! (empty boxes, box edges) and decoration overlays. The foreground pass
//! then runs a second time restricted to the cursor region so the cursor
//! shows in reverse video.

use crate::control::DrawControl;
use crate::error::{Error, Result};
use crate::frame::{Frame, Rect, Region};
use crate::glyph::{CharPos, GlyphKind, GlyphString};
use crate::store::TextStore;
use crate::cache::get_chain;
use std::any::Any;
use std::rc::Rc;

/// Result of the background pass
struct Background {
    /// First and one-past-last glyph index touched
    from_idx: usize,
    to_idx: usize,
    /// Right edge of the drawn area
    to_x: i32,
    /// Cursor rectangles, for the reverse-video foreground pass
    cursor_region: Option<Region>,
}

fn add_to(region: &mut Option<Region>, rect: Rect) {
    match region {
        Some(r) => r.add(rect),
        None => *region = Some(Region::from_rect(rect)),
    }
}

/// Background and cursor pass over glyphs covering `[from, to)`
#[allow(clippy::too_many_arguments)]
fn draw_background(
    frame: &Frame,
    surface: &mut dyn Any,
    x: i32,
    y: i32,
    gs: &mut GlyphString,
    from: CharPos,
    to: CharPos,
    control: &DrawControl,
) -> Background {
    let clip = control.clip.as_ref();
    let mut cursor_region = None;

    let mut cursor_pos = None;
    let mut prev_pos = None;
    if control.with_cursor && control.cursor_width != 0 {
        if gs.from <= control.cursor_pos && gs.to > control.cursor_pos {
            cursor_pos = Some(control.cursor_pos);
        }
        if control.cursor_bidi
            && control.cursor_pos >= 1
            && gs.from <= control.cursor_pos - 1
            && gs.to > control.cursor_pos - 1
        {
            prev_pos = Some(control.cursor_pos - 1);
        }
    }

    let mut from_idx = 0;
    let mut to_idx = 0;
    let mut to_x = x;
    let mut x = x;

    let mut i = 1;
    while i < gs.last() {
        if gs.glyphs[i].pos < from || gs.glyphs[i].pos >= to {
            gs.glyphs[i].enabled = false;
            i += 1;
            continue;
        }

        let group = i;
        let rface = gs.glyphs[i].face.clone();
        let mut width = 0;
        let mut cursor: Option<(usize, i32)> = None;
        let mut cursor_width = 0;
        if from_idx == 0 {
            from_idx = i;
        }

        while i < gs.last() {
            let g = &gs.glyphs[i];
            if g.pos < from || g.pos >= to || !Rc::ptr_eq(&g.face, &rface) {
                break;
            }
            gs.glyphs[i].enabled = true;
            let g = &gs.glyphs[i];
            if g.kind != GlyphKind::Box
                && cursor_pos.is_some_and(|cp| g.pos <= cp && g.to > cp)
            {
                if cursor.is_none() {
                    cursor = Some((i, x + width));
                }
                cursor_width += g.width;
            }
            width += g.width;
            i += 1;
        }

        if width > 0 && (control.as_image || rface.reverse_video) {
            let mut this_x = x;
            let mut this_width = width;
            if gs.glyphs[group].kind == GlyphKind::Box {
                this_x += gs.glyphs[group].width;
                this_width -= gs.glyphs[group].width;
            }
            if gs.glyphs[i - 1].kind == GlyphKind::Box {
                this_width -= gs.glyphs[i - 1].width;
            }
            frame.driver.fill_space(
                surface,
                &rface,
                false,
                this_x,
                y - gs.text_ascent,
                this_width,
                gs.text_ascent + gs.text_descent,
                clip,
            );
        }

        if let Some((ci, cursor_x)) = cursor {
            let mut rect = Rect::new(
                cursor_x,
                y - gs.text_ascent,
                0,
                gs.text_ascent + gs.text_descent,
            );
            if !control.cursor_bidi {
                rect.width = if control.cursor_width > 0 && control.cursor_width < cursor_width {
                    control.cursor_width
                } else {
                    cursor_width
                };
            } else {
                if gs.glyphs[ci].bidi_level % 2 == 1 {
                    rect.x += cursor_width - 1;
                }
                rect.width = 1;
            }
            frame.driver.fill_space(
                surface, &rface, true, rect.x, rect.y, rect.width, rect.height, clip,
            );
            add_to(&mut cursor_region, rect);
            if control.cursor_bidi {
                // Direction tick at the top edge.
                if gs.glyphs[ci].bidi_level % 2 == 1 {
                    rect.x -= 3;
                }
                rect.height = 2;
                rect.width = cursor_width.min(4);
                frame.driver.fill_space(
                    surface, &rface, true, rect.x, rect.y, rect.width, rect.height, clip,
                );
                add_to(&mut cursor_region, rect);
            }
        }

        if let Some(pp) = prev_pos {
            // The logical predecessor may straddle the cursor; mark its edge
            // with a bottom tick.
            let mut temp_width = 0;
            let mut cursor: Option<(usize, i32)> = None;
            let mut cursor_width = 0;
            for k in group..i {
                let g = &gs.glyphs[k];
                if g.kind != GlyphKind::Box && g.pos <= pp && g.to > pp {
                    if cursor.is_none() {
                        cursor = Some((k, x + temp_width));
                    }
                    cursor_width += g.width;
                }
                temp_width += g.width;
            }
            if let Some((ci, cursor_x)) = cursor {
                let ltr = gs.glyphs[ci].bidi_level % 2 == 0;
                let mut rect = Rect::new(
                    cursor_x,
                    y - gs.text_ascent,
                    1,
                    gs.text_ascent + gs.text_descent,
                );
                if ltr {
                    rect.x += cursor_width - 1;
                }
                frame.driver.fill_space(
                    surface, &rface, true, rect.x, rect.y, rect.width, rect.height, clip,
                );
                add_to(&mut cursor_region, rect);
                rect.y += rect.height - 2;
                rect.height = 2;
                rect.width = cursor_width.min(4);
                if ltr {
                    rect.x -= rect.width - 1;
                }
                frame.driver.fill_space(
                    surface, &rface, true, rect.x, rect.y, rect.width, rect.height, clip,
                );
                add_to(&mut cursor_region, rect);
            }
        }

        x += width;
        to_idx = i;
        to_x = x;
    }

    Background {
        from_idx,
        to_idx,
        to_x,
        cursor_region,
    }
}

/// Widen `[left, right)` to glyphs whose ink reaches into it
///
/// Returns the x adjustments for both edges, or `None` when nothing
/// overlaps. Extended glyphs are enabled so the foreground pass draws them.
fn find_overlapping_glyphs(gs: &mut GlyphString, left: &mut usize, right: &mut usize) -> Option<(i32, i32)> {
    let mut left_idx = *left;
    let mut right_idx = *right;
    let mut left_x = 0;
    let mut right_x = 0;

    let mut x = 0;
    let mut k = *left;
    while k > 1 {
        k -= 1;
        x -= gs.glyphs[k].width;
        if x + gs.glyphs[k].rbearing > 0 {
            while k > 1 && gs.glyphs[k - 1].pos == gs.glyphs[k].pos {
                k -= 1;
                x -= gs.glyphs[k].width;
            }
            left_idx = k;
            left_x = x;
        }
    }

    let mut x = 0;
    let mut k = *right;
    while k < gs.last() {
        x += gs.glyphs[k].width;
        if x - gs.glyphs[k].width + gs.glyphs[k].lbearing < 0 {
            while k + 1 < gs.last() && gs.glyphs[k].pos == gs.glyphs[k + 1].pos {
                k += 1;
                x += gs.glyphs[k].width;
            }
            right_idx = k + 1;
            right_x = x;
        }
        k += 1;
    }

    if left_idx == *left && right_idx == *right {
        return None;
    }
    let mut adjust = (0, 0);
    if left_idx < *left {
        for g in &mut gs.glyphs[left_idx..*left] {
            g.enabled = true;
        }
        *left = left_idx;
        adjust.0 = left_x;
    }
    if right_idx > *right {
        for g in &mut gs.glyphs[*right..right_idx] {
            g.enabled = true;
        }
        *right = right_idx;
        adjust.1 = right_x;
    }
    Some(adjust)
}

/// Foreground pass over enabled glyphs `[from_idx, to_idx)`
#[allow(clippy::too_many_arguments)]
fn render_glyphs(
    frame: &Frame,
    surface: &mut dyn Any,
    x: i32,
    y: i32,
    width: i32,
    gs: &GlyphString,
    from_idx: usize,
    to_idx: usize,
    reverse: bool,
    clip: Option<&Region>,
) {
    let mut g = from_idx;
    let mut gend = to_idx;
    let mut x = x;
    let mut width = width;

    if let Some(region) = clip {
        // Narrow the glyph range to the clip's bounding rectangle.
        let rect = region.bounding_rect();
        if rect.x > x {
            while g != gend && x + gs.glyphs[g].rbearing <= rect.x {
                x += gs.glyphs[g].width;
                width -= gs.glyphs[g].width;
                g += 1;
                while g != gend && !gs.glyphs[g].enabled {
                    g += 1;
                }
            }
        }
        let clip_right = rect.x + rect.width;
        if clip_right < x + width {
            while g != gend
                && x + width - gs.glyphs[gend - 1].width + gs.glyphs[gend - 1].lbearing
                    >= clip_right
            {
                gend -= 1;
                width -= gs.glyphs[gend].width;
                while g != gend && !gs.glyphs[gend].enabled {
                    gend -= 1;
                }
            }
            if g != gend {
                // Keep whole clusters.
                while gend < gs.last() && gs.glyphs[gend - 1].to == gs.glyphs[gend].to {
                    gend += 1;
                }
            }
        }
    }

    while g < gend {
        if !gs.glyphs[g].enabled {
            g += 1;
            continue;
        }
        let from_g = g;
        let rface = gs.glyphs[g].face.clone();
        let kind = gs.glyphs[g].kind;
        let valid = gs.glyphs[g].code.is_valid();
        let mut group_width = gs.glyphs[g].width;
        g += 1;
        while g < gend {
            let n = &gs.glyphs[g];
            if n.kind != kind
                || !Rc::ptr_eq(&n.face, &rface)
                || n.code.is_valid() != valid
                || !n.enabled
            {
                break;
            }
            group_width += n.width;
            g += 1;
        }

        match kind {
            GlyphKind::Char => {
                match rface.font.as_ref() {
                    Some(font) if valid => {
                        font.driver.render(surface, x, y, gs, from_g, g, reverse, clip);
                    }
                    _ => {
                        frame
                            .driver
                            .draw_empty_boxes(surface, x, y, gs, from_g, g, reverse, clip);
                    }
                }
            }
            GlyphKind::Box => {
                frame.driver.draw_box(surface, gs, from_g, x, y, 0, clip);
            }
            _ => (),
        }

        if kind != GlyphKind::Box {
            if rface.hline.is_some() {
                frame
                    .driver
                    .draw_hline(surface, gs, &rface, reverse, x, y, group_width, clip);
            }
            if rface.face_box.is_some() && !reverse {
                // Top and bottom rules of the box.
                frame
                    .driver
                    .draw_box(surface, gs, from_g, x, y, group_width, clip);
            }
        }
        x += group_width;
    }
}

/// Draw one physical line
#[allow(clippy::too_many_arguments)]
pub(crate) fn render_glyph_string(
    frame: &Frame,
    surface: &mut dyn Any,
    x: i32,
    y: i32,
    gs: &mut GlyphString,
    from: CharPos,
    to: CharPos,
    control: &DrawControl,
) {
    let mut x = if control.orientation_reversed {
        x - (gs.indent + gs.width_of(from, to).0)
    } else {
        x + gs.indent
    };

    let bg = draw_background(frame, surface, x, y, gs, from, to, control);
    let Background {
        mut from_idx,
        mut to_idx,
        mut to_x,
        cursor_region,
    } = bg;

    let mut expanded_clip = None;
    if control.partial_update {
        let target = Rect::new(x, y - gs.line_ascent, to_x - x, gs.height);
        if let Some((dx_left, dx_right)) = find_overlapping_glyphs(gs, &mut from_idx, &mut to_idx)
        {
            x += dx_left;
            to_x += dx_right;
            let mut region = Region::from_rect(target);
            if let Some(outer) = control.clip.as_ref() {
                region.intersect(outer);
            }
            expanded_clip = Some(region);
        }
    }
    let clip = expanded_clip.as_ref().or(control.clip.as_ref());

    render_glyphs(frame, surface, x, y, to_x - x, gs, from_idx, to_idx, false, clip);

    if let Some(mut cursor_region) = cursor_region {
        if let Some(clip) = clip {
            cursor_region.intersect(clip);
        }
        render_glyphs(
            frame,
            surface,
            x,
            y,
            to_x - x,
            gs,
            from_idx,
            to_idx,
            true,
            Some(&cursor_region),
        );
    }
}

impl Frame {
    /// Draw `[from, to)` of `text` with the pen starting at `(x, y)`
    ///
    /// `y` is the baseline of the first physical line. Lines advance by
    /// their laid-out line boxes. `to` past `text.len()` is clamped, one
    /// further position being addressable when the control carries a
    /// cursor.
    pub fn draw(
        &self,
        surface: &mut dyn Any,
        x: i32,
        y: i32,
        text: &dyn TextStore,
        from: CharPos,
        to: CharPos,
        control: &DrawControl,
    ) -> Result<()> {
        if from > text.len() {
            return Err(Error::Range);
        }
        let mut to = to.min(text.len() + control.cursor_slack()).max(from);
        if from == text.len() {
            // Cursor past the last character: cover the virtual position.
            to = to.max(from + control.cursor_slack());
        }
        let mut from = from;
        let mut y = y;
        let mut prev_descent = None;
        loop {
            let (chain, idx) = get_chain(self, text, from, to, control)?;
            let mut chain = chain.borrow_mut();
            let gs = &mut chain.lines[idx];
            if let Some(descent) = prev_descent {
                y += descent + gs.line_ascent;
            }
            render_glyph_string(self, surface, x, y, gs, from, to, control);
            from = gs.to;
            prev_descent = Some(gs.line_descent);
            if from >= to {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::{mock, mock_with, DrawOp};
    use crate::store::TextBuffer;

    #[test]
    fn foreground_draws_one_group() {
        let m = mock();
        let text = TextBuffer::new("ab");
        let mut surface = ();
        m.frame
            .draw(&mut surface, 0, 0, &text, 0, 2, &DrawControl::default())
            .unwrap();
        let log = m.log.borrow();
        assert_eq!(
            log.as_slice(),
            &[DrawOp::Glyphs {
                x: 0,
                y: 0,
                from: 1,
                to: 3,
                reverse: false
            }]
        );
    }

    #[test]
    fn as_image_fills_background_first() {
        let m = mock();
        let text = TextBuffer::new("ab");
        let control = DrawControl {
            as_image: true,
            ..Default::default()
        };
        let mut surface = ();
        m.frame.draw(&mut surface, 0, 0, &text, 0, 2, &control).unwrap();
        let log = m.log.borrow();
        assert_eq!(
            log[0],
            DrawOp::Fill {
                x: 0,
                y: -10,
                width: 20,
                height: 12,
                cursor: false
            }
        );
        assert!(matches!(log[1], DrawOp::Glyphs { reverse: false, .. }));
    }

    #[test]
    fn cursor_rect_and_reverse_pass() {
        let m = mock();
        let text = TextBuffer::new("abc");
        let control = DrawControl {
            with_cursor: true,
            cursor_pos: 1,
            cursor_width: 2,
            ..Default::default()
        };
        let mut surface = ();
        m.frame.draw(&mut surface, 0, 0, &text, 0, 3, &control).unwrap();
        let log = m.log.borrow();
        // Cursor fill: clamped to the declared width, at the glyph's x.
        assert!(log.contains(&DrawOp::Fill {
            x: 10,
            y: -10,
            width: 2,
            height: 12,
            cursor: true
        }));
        // A reverse foreground pass follows the normal one.
        let reverses: Vec<bool> = log
            .iter()
            .filter_map(|op| match op {
                DrawOp::Glyphs { reverse, .. } => Some(*reverse),
                _ => None,
            })
            .collect();
        assert_eq!(reverses, vec![false, true]);
    }

    #[test]
    fn wide_cursor_covers_cluster() {
        let m = mock();
        let text = TextBuffer::new("abc");
        let control = DrawControl {
            with_cursor: true,
            cursor_pos: 2,
            cursor_width: -1,
            ..Default::default()
        };
        let mut surface = ();
        m.frame.draw(&mut surface, 0, 0, &text, 0, 3, &control).unwrap();
        assert!(m.log.borrow().contains(&DrawOp::Fill {
            x: 20,
            y: -10,
            width: 10,
            height: 12,
            cursor: true
        }));
    }

    #[test]
    fn empty_range_with_cursor_draws_cursor_box() {
        let m = mock();
        let text = TextBuffer::new("");
        let control = DrawControl {
            with_cursor: true,
            cursor_pos: 0,
            cursor_width: 5,
            ..Default::default()
        };
        let mut surface = ();
        m.frame.draw(&mut surface, 0, 0, &text, 0, 0, &control).unwrap();
        assert!(m.log.borrow().contains(&DrawOp::Fill {
            x: 0,
            y: -10,
            width: 5,
            height: 12,
            cursor: true
        }));
    }

    #[test]
    fn two_dimensional_renders_linked_lines() {
        let m = mock();
        let text = TextBuffer::new("ab\ncd");
        let control = DrawControl {
            two_dimensional: true,
            ..Default::default()
        };
        let mut surface = ();
        m.frame.draw(&mut surface, 0, 0, &text, 0, 5, &control).unwrap();
        let log = m.log.borrow();
        let glyph_ops: Vec<(i32, usize, usize)> = log
            .iter()
            .filter_map(|op| match op {
                DrawOp::Glyphs { y, from, to, .. } => Some((*y, *from, *to)),
                _ => None,
            })
            .collect();
        // Second line drops by first descent + second ascent.
        assert_eq!(glyph_ops, vec![(0, 1, 3), (12, 1, 3)]);
    }

    #[test]
    fn unencodable_chars_draw_empty_boxes() {
        let m = mock_with(vec!['q'], None);
        let text = TextBuffer::new("aqb");
        let mut surface = ();
        m.frame
            .draw(&mut surface, 0, 0, &text, 0, 3, &DrawControl::default())
            .unwrap();
        let log = m.log.borrow();
        assert!(log.contains(&DrawOp::EmptyBoxes { from: 2, to: 3 }));
        // The valid neighbors still render through the font.
        assert!(matches!(log[0], DrawOp::Glyphs { from: 1, to: 2, .. }));
        assert!(matches!(log[2], DrawOp::Glyphs { from: 3, to: 4, .. }));
    }

    #[test]
    fn reversed_orientation_draws_leftward() {
        let m = mock();
        let text = TextBuffer::new("ab");
        let control = DrawControl {
            orientation_reversed: true,
            ..Default::default()
        };
        let mut surface = ();
        m.frame.draw(&mut surface, 100, 0, &text, 0, 2, &control).unwrap();
        assert!(matches!(
            m.log.borrow()[0],
            DrawOp::Glyphs { x: 80, .. }
        ));
    }

    #[test]
    fn hline_overlay_follows_glyphs() {
        use crate::faces::{HLine, HLineStyle};
        let m = mock();
        let mut face = (*m.frame.rface).clone();
        face.hline = Some(HLine {
            style: HLineStyle::Underline,
            width: 1,
        });
        let face = std::rc::Rc::new(face);
        let frame = Frame::new(
            face,
            1000,
            m.frame.driver.clone(),
            m.frame.resolver.clone(),
            m.frame.env.clone(),
            m.frame.bidi.clone(),
        );
        let text = TextBuffer::new("ab");
        let mut surface = ();
        frame
            .draw(&mut surface, 0, 0, &text, 0, 2, &DrawControl::default())
            .unwrap();
        assert!(m.log.borrow().contains(&DrawOp::HLine { x: 0, width: 20 }));
    }

    #[test]
    fn draw_rejects_out_of_range_start() {
        let m = mock();
        let text = TextBuffer::new("ab");
        let mut surface = ();
        assert_eq!(
            m.frame
                .draw(&mut surface, 0, 0, &text, 5, 6, &DrawControl::default())
                .unwrap_err(),
            Error::Range
        );
    }

    #[test]
    fn width_limit_splits_lines() {
        let m = mock();
        let text = TextBuffer::new("hello world foo");
        let control = DrawControl {
            two_dimensional: true,
            max_line_width: 100,
            ..Default::default()
        };
        let mut surface = ();
        m.frame.draw(&mut surface, 0, 0, &text, 0, 15, &control).unwrap();
        let (chain, _) = crate::cache::get_chain(&m.frame, &text, 0, 15, &control).unwrap();
        let chain = chain.borrow();
        assert_eq!(chain.lines.len(), 2);
        // Default policy: break after the whitespace following "hello".
        assert_eq!((chain.lines[0].from, chain.lines[0].to), (0, 6));
        assert_eq!((chain.lines[1].from, chain.lines[1].to), (6, 15));
    }
}
