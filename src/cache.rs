// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Glyph cache
//!
//! A laid-out [`GlyphChain`] covers one hard line (up to the first newline)
//! and is attached to the text it was built from; re-rendering the same
//! unchanged region reuses it. Any edit inside the attached span drops the
//! chain (the store's volatile-property semantics); edits before it shift
//! the attachment and the chain's character labels are translated to match
//! on the next lookup.
//!
//! A chain is also dropped when it was built for another frame, for an older
//! font-configuration tick, or under layout options that differ from the
//! current request.

use crate::compose::compose;
use crate::control::DrawControl;
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::glyph::{CharPos, GlyphChain, GlyphString};
use crate::layout::layout;
use crate::linebreak::truncate;
use crate::store::TextStore;
use std::cell::RefCell;
use std::rc::Rc;

/// A glyph chain handle plus the index of the line covering the request
pub(crate) type ChainAt = (Rc<RefCell<GlyphChain>>, usize);

/// Get (or build) the glyph chain covering `pos`
///
/// `to` bounds composition when not laying out two-dimensionally. Returns
/// the chain and the index of the physical line containing `pos`.
pub(crate) fn get_chain(
    frame: &Frame,
    text: &dyn TextStore,
    pos: CharPos,
    to: CharPos,
    control: &DrawControl,
) -> Result<ChainAt> {
    if pos < text.len() {
        if let Some(chain) = lookup(frame, text, pos, control) {
            return Ok(chain);
        }
    } else if control.cursor_width == 0 {
        return Err(Error::Draw);
    }
    build(frame, text, pos, to, control)
}

/// Validate and translate a cached chain, detaching stale ones
fn lookup(
    frame: &Frame,
    text: &dyn TextStore,
    pos: CharPos,
    control: &DrawControl,
) -> Option<ChainAt> {
    let entry = text.cached_chain(pos)?;

    // A span that stopped being newline-delimited covers a stale mix of
    // lines.
    let misaligned = (entry.from != 0 && text.char_at(entry.from - 1) != Some('\n'))
        || (entry.to < text.len() && text.char_at(entry.to - 1) != Some('\n'));
    if misaligned {
        log::debug!("glyph cache detached: span [{}, {}) off line boundaries", entry.from, entry.to);
        text.detach_chain(pos);
        return None;
    }

    {
        let chain = entry.chain.borrow();
        let stale = chain.frame_id != frame.id
            || chain.tick != frame.tick
            || !chain
                .lines
                .first()
                .is_some_and(|gs| gs.control.layout_eq(control));
        if stale {
            drop(chain);
            log::debug!("glyph cache detached: frame, tick or control changed");
            text.detach_chain(pos);
            return None;
        }
    }

    // Edits before the span moved the attachment; move the labels along.
    let line_beg = text.line_start(pos);
    let offset = line_beg as isize - entry.chain.borrow().from() as isize;
    if offset != 0 {
        entry.chain.borrow_mut().translate(offset);
    }

    let idx = entry.chain.borrow().line_at(pos)?;
    log::trace!("glyph cache hit at {pos}");
    Some((entry.chain, idx))
}

/// Compose, lay out and (two-dimensionally) split one hard line
fn build(
    frame: &Frame,
    text: &dyn TextStore,
    pos: CharPos,
    to: CharPos,
    control: &DrawControl,
) -> Result<ChainAt> {
    let (beg, mut end) = if control.two_dimensional {
        (text.line_start(pos), text.len() + control.cursor_slack())
    } else {
        // A degenerate range still composes the position a cursor sits on.
        (pos, to.max(pos + control.cursor_slack()))
    };

    let mut line = 0;
    let mut y = 0;
    let mut gs = GlyphString::new(beg, control.clone(), line, y);
    compose(frame, text, beg, end, &mut gs);
    layout(frame, &mut gs);
    end = gs.to;

    let mut lines = vec![gs];
    if control.two_dimensional
        && lines[0].width_limit > 0
        && lines[0].width > lines[0].width_limit
    {
        truncate(frame, text, &mut lines[0]);
        loop {
            let prev = lines.last().expect("chain has a line");
            if prev.to >= end {
                break;
            }
            line += 1;
            y += prev.height;
            let from = prev.to;
            let mut gs = GlyphString::new(from, control.clone(), line, y);
            compose(frame, text, from, end, &mut gs);
            layout(frame, &mut gs);
            let fits = gs.width_limit == 0 || gs.width <= gs.width_limit;
            if !fits {
                truncate(frame, text, &mut gs);
            }
            lines.push(gs);
            if fits {
                break;
            }
        }
    }

    let chain = Rc::new(RefCell::new(GlyphChain {
        frame_id: frame.id,
        tick: frame.tick,
        lines,
    }));

    if !control.disable_caching && pos < text.len() {
        text.attach_chain(beg, end.min(text.len()), chain.clone());
    }

    let idx = chain.borrow().line_at(pos).unwrap_or_else(|| {
        let last = chain.borrow().lines.len() - 1;
        last
    });
    Ok((chain, idx))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::{frame, mock_control};
    use crate::store::TextBuffer;

    #[test]
    fn rebuild_reuses_cached_chain() {
        let frame = frame();
        let text = TextBuffer::new("hello");
        let control = mock_control();

        let (a, _) = get_chain(&frame, &text, 0, text.len(), &control).unwrap();
        let (b, _) = get_chain(&frame, &text, 0, text.len(), &control).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn edit_in_span_invalidates() {
        let frame = frame();
        let mut text = TextBuffer::new("hello");
        let control = mock_control();

        let (a, _) = get_chain(&frame, &text, 0, text.len(), &control).unwrap();
        text.insert(2, "xx");
        let (b, _) = get_chain(&frame, &text, 0, text.len(), &control).unwrap();
        assert!(!Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn edit_before_span_translates() {
        let frame = frame();
        let mut text = TextBuffer::new("ab\ncd");
        let mut control = mock_control();
        control.two_dimensional = true;

        let (a, _) = get_chain(&frame, &text, 3, text.len(), &control).unwrap();
        assert_eq!((a.borrow().from(), a.borrow().to()), (3, 5));

        text.insert(0, "xy");
        let (b, _) = get_chain(&frame, &text, 5, text.len(), &control).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!((b.borrow().from(), b.borrow().to()), (5, 7));
        for g in &b.borrow().lines[0].glyphs {
            assert!(g.pos >= 5);
        }
    }

    #[test]
    fn font_tick_invalidates() {
        let mut frame = frame();
        let text = TextBuffer::new("hello");
        let control = mock_control();

        let (a, _) = get_chain(&frame, &text, 0, text.len(), &control).unwrap();
        frame.note_font_change();
        let (b, _) = get_chain(&frame, &text, 0, text.len(), &control).unwrap();
        assert!(!Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn layout_control_change_invalidates() {
        let frame = frame();
        let text = TextBuffer::new("hello");
        let control = mock_control();

        let (a, _) = get_chain(&frame, &text, 0, text.len(), &control).unwrap();

        let mut wider = control.clone();
        wider.tab_width = 4;
        let (b, _) = get_chain(&frame, &text, 0, text.len(), &wider).unwrap();
        assert!(!Rc::ptr_eq(&a, &b));

        // Cursor options do not affect layout: the chain is reusable.
        let (c, _) = get_chain(&frame, &text, 0, text.len(), &wider).unwrap();
        let mut cursor = wider.clone();
        cursor.with_cursor = true;
        cursor.cursor_pos = 2;
        cursor.cursor_width = 1;
        let (d, _) = get_chain(&frame, &text, 0, text.len(), &cursor).unwrap();
        assert!(Rc::ptr_eq(&c, &d));
    }

    #[test]
    fn disable_caching_skips_attach() {
        let frame = frame();
        let text = TextBuffer::new("hello");
        let mut control = mock_control();
        control.disable_caching = true;

        let (a, _) = get_chain(&frame, &text, 0, text.len(), &control).unwrap();
        let (b, _) = get_chain(&frame, &text, 0, text.len(), &control).unwrap();
        assert!(!Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn cursor_past_end_needs_cursor_width() {
        let frame = frame();
        let text = TextBuffer::new("ab");
        let mut control = mock_control();
        assert_eq!(
            get_chain(&frame, &text, 2, 2, &control).unwrap_err(),
            Error::Draw
        );

        control.cursor_width = 2;
        let (chain, idx) = get_chain(&frame, &text, 2, 3, &control).unwrap();
        let chain = chain.borrow();
        // The virtual newline covers the position past the last character.
        assert_eq!(chain.lines[idx].to, 3);
    }
}
