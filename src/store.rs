// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Text storage capability
//!
//! The engine reads characters and per-position attributes (faces, language,
//! charset) through the [`TextStore`] trait, and parks its glyph cache in the
//! store through the same trait. [`TextBuffer`] is a complete in-memory
//! implementation: attribute spans move with edits, and any edit inside the
//! cached span drops the cache (volatile-strong semantics).

use crate::faces::{FaceHandle, FaceList};
use crate::glyph::{CharPos, GlyphChain};
use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

/// Interned language tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Language(pub &'static str);

/// Interned charset tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Charset(pub &'static str);

/// A glyph chain attached to a span of text
#[derive(Clone)]
pub struct CacheEntry {
    /// Span the chain is attached over
    pub from: CharPos,
    pub to: CharPos,
    pub chain: Rc<RefCell<GlyphChain>>,
}

/// Capability contract for the backing text
///
/// `*_at` accessors return the value at `pos` together with the end of the
/// contiguous span over which that value is constant, so the composer can
/// schedule its next property stop without re-reading every character.
pub trait TextStore {
    /// Character count
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Character at `pos`, or `None` past the end
    fn char_at(&self, pos: CharPos) -> Option<char>;

    /// Faces attached at `pos`, best match first, with the span end
    fn faces_at(&self, pos: CharPos) -> (FaceList, CharPos);

    /// Language attached at `pos`, with the span end
    fn language_at(&self, pos: CharPos) -> (Option<Language>, CharPos);

    /// Charset attached at `pos`, with the span end
    fn charset_at(&self, pos: CharPos) -> (Option<Charset>, CharPos);

    /// The cached glyph chain covering `pos`, if one is attached
    fn cached_chain(&self, pos: CharPos) -> Option<CacheEntry>;

    /// Attach `chain` over `[from, to)`, replacing overlapping attachments
    fn attach_chain(&self, from: CharPos, to: CharPos, chain: Rc<RefCell<GlyphChain>>);

    /// Drop the cached chain covering `pos`
    fn detach_chain(&self, pos: CharPos);

    /// Drop every cached chain
    fn clear_chains(&self);

    /// Start of the line containing `pos`: one past the previous newline
    fn line_start(&self, pos: CharPos) -> CharPos {
        let mut i = pos.min(self.len());
        while i > 0 {
            if self.char_at(i - 1) == Some('\n') {
                return i;
            }
            i -= 1;
        }
        0
    }
}

#[derive(Clone, Debug)]
struct Span<T> {
    range: Range<CharPos>,
    value: T,
}

/// Span list keyed by position; spans never overlap
#[derive(Clone, Debug)]
struct SpanMap<T: Clone> {
    spans: Vec<Span<T>>,
}

impl<T: Clone> Default for SpanMap<T> {
    fn default() -> Self {
        SpanMap { spans: vec![] }
    }
}

impl<T: Clone> SpanMap<T> {
    fn set(&mut self, range: Range<CharPos>, value: T) {
        if range.is_empty() {
            return;
        }
        // Trim or split whatever the new span overlaps.
        let mut replaced = vec![];
        for span in self.spans.drain(..) {
            if span.range.end <= range.start || span.range.start >= range.end {
                replaced.push(span);
                continue;
            }
            if span.range.start < range.start {
                replaced.push(Span {
                    range: span.range.start..range.start,
                    value: span.value.clone(),
                });
            }
            if span.range.end > range.end {
                replaced.push(Span {
                    range: range.end..span.range.end,
                    value: span.value,
                });
            }
        }
        replaced.push(Span { range, value });
        replaced.sort_by_key(|s| s.range.start);
        self.spans = replaced;
    }

    /// Value at `pos` plus the end of its constant span, `limit` capping the
    /// span of an absent value
    fn at(&self, pos: CharPos, limit: CharPos) -> (Option<&T>, CharPos) {
        for span in &self.spans {
            if span.range.contains(&pos) {
                return (Some(&span.value), span.range.end.min(limit));
            }
            if span.range.start > pos {
                return (None, span.range.start.min(limit));
            }
        }
        (None, limit)
    }

    fn shift_insert(&mut self, pos: CharPos, n: usize) {
        for span in &mut self.spans {
            if span.range.start >= pos {
                span.range.start += n;
            }
            if span.range.end > pos {
                span.range.end += n;
            }
        }
    }

    fn shift_delete(&mut self, range: &Range<CharPos>) {
        let n = range.len();
        self.spans.retain_mut(|span| {
            span.range.start = clamp_delete(span.range.start, range, n);
            span.range.end = clamp_delete(span.range.end, range, n);
            !span.range.is_empty()
        });
    }
}

fn clamp_delete(pos: CharPos, deleted: &Range<CharPos>, n: usize) -> CharPos {
    if pos <= deleted.start {
        pos
    } else if pos >= deleted.end {
        pos - n
    } else {
        deleted.start
    }
}

/// In-memory text with attribute spans and a volatile glyph-cache slot
#[derive(Default)]
pub struct TextBuffer {
    chars: Vec<char>,
    faces: SpanMap<FaceList>,
    language: SpanMap<Language>,
    charset: SpanMap<Charset>,
    /// Non-overlapping cached chains, one per hard line, sorted by span
    cache: RefCell<Vec<CacheEntry>>,
}

impl TextBuffer {
    pub fn new(text: &str) -> Self {
        TextBuffer {
            chars: text.chars().collect(),
            ..Default::default()
        }
    }

    pub fn set_faces(&mut self, range: Range<CharPos>, faces: &[FaceHandle]) {
        self.faces.set(range, faces.iter().copied().collect());
    }

    pub fn set_language(&mut self, range: Range<CharPos>, language: Language) {
        self.language.set(range, language);
    }

    pub fn set_charset(&mut self, range: Range<CharPos>, charset: Charset) {
        self.charset.set(range, charset);
    }

    /// Insert `text` before `pos`
    ///
    /// A cached chain attached strictly around `pos` is dropped; a chain
    /// entirely at or after `pos` moves with the text.
    pub fn insert(&mut self, pos: CharPos, text: &str) {
        let added: Vec<char> = text.chars().collect();
        let n = added.len();
        assert!(pos <= self.chars.len());
        self.chars.splice(pos..pos, added);
        self.faces.shift_insert(pos, n);
        self.language.shift_insert(pos, n);
        self.charset.shift_insert(pos, n);

        let mut cache = self.cache.borrow_mut();
        cache.retain_mut(|entry| {
            if pos > entry.from && pos < entry.to {
                log::debug!("glyph cache dropped: insertion at {pos} inside span");
                return false;
            }
            if pos <= entry.from {
                entry.from += n;
                entry.to += n;
            }
            true
        });
    }

    /// Delete the characters in `range`
    pub fn delete(&mut self, range: Range<CharPos>) {
        assert!(range.start <= range.end && range.end <= self.chars.len());
        let n = range.len();
        self.chars.drain(range.clone());
        self.faces.shift_delete(&range);
        self.language.shift_delete(&range);
        self.charset.shift_delete(&range);

        let mut cache = self.cache.borrow_mut();
        cache.retain_mut(|entry| {
            if range.start < entry.to && range.end > entry.from {
                log::debug!("glyph cache dropped: deletion {range:?} overlaps span");
                return false;
            }
            if range.end <= entry.from {
                entry.from -= n;
                entry.to -= n;
            }
            true
        });
    }
}

impl TextStore for TextBuffer {
    fn len(&self) -> usize {
        self.chars.len()
    }

    fn char_at(&self, pos: CharPos) -> Option<char> {
        self.chars.get(pos).copied()
    }

    fn faces_at(&self, pos: CharPos) -> (FaceList, CharPos) {
        let (value, end) = self.faces.at(pos, self.len());
        (value.cloned().unwrap_or_default(), end)
    }

    fn language_at(&self, pos: CharPos) -> (Option<Language>, CharPos) {
        let (value, end) = self.language.at(pos, self.len());
        (value.copied(), end)
    }

    fn charset_at(&self, pos: CharPos) -> (Option<Charset>, CharPos) {
        let (value, end) = self.charset.at(pos, self.len());
        (value.copied(), end)
    }

    fn cached_chain(&self, pos: CharPos) -> Option<CacheEntry> {
        self.cache
            .borrow()
            .iter()
            .find(|entry| entry.from <= pos && pos < entry.to)
            .cloned()
    }

    fn attach_chain(&self, from: CharPos, to: CharPos, chain: Rc<RefCell<GlyphChain>>) {
        let mut cache = self.cache.borrow_mut();
        cache.retain(|entry| entry.to <= from || entry.from >= to);
        cache.push(CacheEntry { from, to, chain });
        cache.sort_by_key(|entry| entry.from);
    }

    fn detach_chain(&self, pos: CharPos) {
        self.cache
            .borrow_mut()
            .retain(|entry| !(entry.from <= pos && pos < entry.to));
    }

    fn clear_chains(&self) {
        self.cache.borrow_mut().clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn span_map_set_and_query() {
        let mut text = TextBuffer::new("hello world");
        text.set_language(0..5, Language("en"));
        text.set_language(6..11, Language("de"));

        assert_eq!(text.language_at(0), (Some(Language("en")), 5));
        assert_eq!(text.language_at(4), (Some(Language("en")), 5));
        assert_eq!(text.language_at(5), (None, 6));
        assert_eq!(text.language_at(6), (Some(Language("de")), 11));
    }

    #[test]
    fn span_overwrite_splits() {
        let mut text = TextBuffer::new("abcdefgh");
        text.set_language(0..8, Language("en"));
        text.set_language(3..5, Language("fr"));

        assert_eq!(text.language_at(0), (Some(Language("en")), 3));
        assert_eq!(text.language_at(3), (Some(Language("fr")), 5));
        assert_eq!(text.language_at(5), (Some(Language("en")), 8));
    }

    #[test]
    fn edits_shift_spans() {
        let mut text = TextBuffer::new("abcdef");
        text.set_language(2..5, Language("en"));
        text.insert(1, "xy");
        assert_eq!(text.language_at(4), (Some(Language("en")), 7));
        text.delete(0..3);
        assert_eq!(text.language_at(1), (Some(Language("en")), 4));
    }

    #[test]
    fn line_start_scans_backward() {
        let text = TextBuffer::new("ab\ncd\nef");
        assert_eq!(text.line_start(0), 0);
        assert_eq!(text.line_start(2), 0);
        assert_eq!(text.line_start(3), 3);
        assert_eq!(text.line_start(7), 6);
        assert_eq!(text.line_start(8), 6);
    }
}
