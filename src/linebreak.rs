// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Line breaking
//!
//! When a laid-out line exceeds its width limit the breaker finds the split
//! position and truncates the glyph string to it; the caller then lays out
//! the remainder as further physical lines. The split position comes from
//! the [`LineBreaker`] capability when the control carries one, otherwise
//! from [`default_line_break`]. [`UaxLineBreaker`] is an alternative
//! capability snapping to UAX #14 break opportunities.

use crate::compose::compose;
use crate::control::LineBreaker;
use crate::frame::Frame;
use crate::glyph::{CharPos, GlyphString};
use crate::layout::layout;
use crate::store::TextStore;
use xi_unicode::LineBreakIterator;

/// Truncate `gs` to its width limit
///
/// Returns false when no valid break position was found and the line stays
/// overlong.
pub(crate) fn truncate(frame: &Frame, text: &dyn TextStore, gs: &mut GlyphString) -> bool {
    // pos_width[i] is the summed glyph width of the character at
    // gs.from + i; positions inside a cluster count 0.
    let n = gs.to - gs.from;
    let mut pos_width = vec![0i32; n];
    for g in &gs.glyphs[gs.body()] {
        if g.pos >= gs.from && g.pos < gs.to {
            pos_width[g.pos - gs.from] += g.width;
        }
    }

    let mut width = 0;
    let mut i = 0;
    while i < n {
        if pos_width[i] > 0 && width + pos_width[i] > gs.width_limit {
            break;
        }
        width += pos_width[i];
        i += 1;
    }

    let overflow = gs.from + i;
    let pos = match gs.control.line_break.clone() {
        Some(breaker) => breaker.line_break(text, overflow, gs.from, gs.to, 0, 0),
        None => default_line_break(text, overflow, gs.from, gs.to),
    };
    if pos <= gs.from || pos >= gs.to {
        log::debug!(
            "line break at {pos} outside ({}, {}); line left unbroken",
            gs.from,
            gs.to
        );
        return false;
    }

    let from = gs.from;
    compose(frame, text, from, pos, gs);
    layout(frame, gs);
    true
}

/// Default break policy
///
/// Given the greedy overflow position `pos` inside `[from, to)`: at
/// whitespace, skip to the first following non-whitespace; otherwise walk
/// backward to whitespace and break just after it; with no whitespace in
/// reach, break at `pos` itself.
pub fn default_line_break(
    text: &dyn TextStore,
    mut pos: CharPos,
    from: CharPos,
    to: CharPos,
) -> CharPos {
    let ws = |p: CharPos| matches!(text.char_at(p), Some(' ') | Some('\t'));
    let orig = pos;

    if ws(pos) {
        pos += 1;
        while pos < to && ws(pos) {
            pos += 1;
        }
    } else {
        while pos > from {
            if ws(pos) {
                break;
            }
            pos -= 1;
        }
        if pos == from {
            pos = orig;
        } else {
            pos += 1;
        }
    }
    pos
}

/// Break at UAX #14 line-break opportunities
///
/// Picks the last opportunity at or before the overflow position; with none
/// available the overflow position itself is returned.
#[derive(Clone, Copy, Debug, Default)]
pub struct UaxLineBreaker;

impl LineBreaker for UaxLineBreaker {
    fn line_break(
        &self,
        text: &dyn TextStore,
        pos: CharPos,
        from: CharPos,
        to: CharPos,
        _line: usize,
        _y: i32,
    ) -> CharPos {
        let slice: String = (from..to.min(text.len()))
            .map_while(|i| text.char_at(i))
            .collect();

        // Byte offset → character ordinal within the slice.
        let mut ordinal = std::collections::HashMap::new();
        for (ord, (byte, _)) in slice.char_indices().enumerate() {
            ordinal.insert(byte, ord);
        }
        ordinal.insert(slice.len(), slice.chars().count());

        let mut best = None;
        for (byte, _hard) in LineBreakIterator::new(&slice) {
            let p = from + ordinal[&byte];
            if p > from && p <= pos {
                best = Some(p);
            }
            if p > pos {
                break;
            }
        }
        best.unwrap_or(pos)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::store::TextBuffer;

    #[test]
    fn break_after_whitespace_run() {
        let text = TextBuffer::new("hello  world");
        // Overflow lands on the first space: skip to the word after it.
        assert_eq!(default_line_break(&text, 5, 0, 12), 7);
    }

    #[test]
    fn break_backs_up_to_whitespace() {
        let text = TextBuffer::new("hello world foo");
        // Overflow inside "world": back up to just after the space.
        assert_eq!(default_line_break(&text, 8, 0, 15), 6);
    }

    #[test]
    fn no_whitespace_breaks_at_overflow() {
        let text = TextBuffer::new("abcdefgh");
        assert_eq!(default_line_break(&text, 5, 0, 8), 5);
    }

    #[test]
    fn uax_breaker_prefers_word_boundary() {
        let text = TextBuffer::new("hello world foo");
        let b = UaxLineBreaker;
        assert_eq!(b.line_break(&text, 8, 0, 15, 0, 0), 6);
        assert_eq!(b.line_break(&text, 14, 0, 15, 0, 0), 12);
    }
}
