// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Glyph string composition
//!
//! The composer walks a character range, itemizes it into runs of one
//! script/face/language/charset, resolves a realized face per run, and fills
//! the glyph buffer with one glyph per character (two for `^X` control
//! forms). Runs whose font declares a layout-table shaper are then shaped in
//! place; runs without one get canonical combining codes for their marks.
//! Finally the buffer is reordered visually.
//!
//! Composition fills `kind`, `face`, `ch`, `pos`, `to`, `code` and
//! `combining`; the remaining fields are filled by the layouter.

use crate::combining::CombiningCode;
use crate::environment::is_explicit_script;
use crate::frame::Frame;
use crate::glyph::{CharPos, Glyph, GlyphCode, GlyphKind, GlyphString};
use crate::reorder::visual_order;
use crate::store::TextStore;
use icu_properties::props::{GeneralCategory, Script};
use std::rc::Rc;

/// Compose glyphs for `[from, to)` of `text` into `gs`
///
/// `to` may exceed `text.len()`; virtual positions read as `'\n'` so a
/// cursor can sit past the last character. With
/// [`two_dimensional`](crate::DrawControl::two_dimensional) set,
/// composition stops after the first newline and `gs.to` reports where.
pub(crate) fn compose(frame: &Frame, text: &dyn TextStore, from: CharPos, to: CharPos, gs: &mut GlyphString) {
    gs.reset(from);

    let mut head = Glyph::new(GlyphKind::Anchor, from, frame.rface.clone());
    head.code = GlyphCode::INVALID;
    gs.push(head);

    let mut script: Option<Script> = None;
    let mut language = None;
    let mut charset = None;
    let mut rface = frame.rface.clone();
    let size = frame.font_size;

    let mut stop = from;
    let mut face_change = from;
    let mut language_change = from;
    let mut charset_change = from;
    let mut run_start = 0;
    let mut pos = from;

    loop {
        let c = text.char_at(pos).unwrap_or('\n');
        let mut kind = GlyphKind::Char;
        let mut category = None;
        let this_script;

        if (c as u32) < 0x100 {
            // Short cut for script resolution; the category lookup cannot be
            // skipped, Latin-1 has formatting characters (soft hyphen).
            if c == ' ' || c == '\n' || c == '\t' {
                kind = GlyphKind::Space;
                this_script = None;
            } else {
                category = Some(frame.env.category_of(c));
                this_script = Some(Script::Latin);
            }
        } else {
            category = Some(frame.env.category_of(c));
            let s = frame.env.script_of(c);
            this_script = if is_explicit_script(s) {
                Some(s)
            } else {
                script.or_else(|| forward_script(frame, text, pos + 1, to))
            };
        }

        if pos == stop || script != this_script || gs.glyphs[run_start].kind != kind {
            if gs.glyphs[run_start].kind != GlyphKind::Anchor {
                let end = gs.glyphs.len();
                frame
                    .resolver
                    .for_chars(script, language, charset, gs, run_start, end, size);
            }
            if pos == to {
                break;
            }
            run_start = gs.glyphs.len();
            script = this_script;
            if pos == stop {
                if pos < text.len() && pos == language_change {
                    let (lang, end) = text.language_at(pos);
                    language = lang;
                    language_change = end;
                }
                if pos < text.len() && pos == charset_change {
                    let (cs, end) = text.charset_at(pos);
                    charset = cs;
                    charset_change = end;
                }
                if pos < text.len() && pos == face_change {
                    let (faces, end) = text.faces_at(pos);
                    face_change = end;
                    rface = if faces.is_empty() {
                        frame.rface.clone()
                    } else {
                        frame.resolver.realize(&faces, language, charset, size)
                    };
                }
                stop = to.min(language_change).min(charset_change).min(face_change);
                if stop <= pos {
                    // Past the last property span (virtual tail positions).
                    stop = to;
                }
            }
        }

        let mut g = Glyph::new(kind, pos, rface.clone());
        g.ch = c;
        g.to = pos + 1;
        g.category = category;
        pos += 1;

        if (c as u32) < 0x20 || c == '\x7f' {
            if kind == GlyphKind::Char {
                // Control characters display as a ^X pair.
                let mut caret = g.clone();
                caret.ch = '^';
                let mut letter = g;
                letter.ch = if (c as u32) < 0x20 {
                    char::from_u32(c as u32 + 0x40).unwrap_or('?')
                } else {
                    '?'
                };
                let at = gs.glyphs.len();
                gs.push(caret);
                gs.push(letter);
                frame
                    .resolver
                    .for_chars(Some(Script::Latin), language, charset, gs, at, at + 2, size);
            } else {
                gs.push(g);
            }
        } else {
            gs.push(g);
        }

        if c == '\n' && gs.control.two_dimensional {
            break;
        }
    }

    let mut tail = Glyph::new(GlyphKind::Anchor, pos, rface);
    tail.code = GlyphCode::INVALID;
    gs.push(tail);
    gs.to = pos;

    log::trace!(
        "composed [{from}, {}) into {} glyphs",
        gs.to,
        gs.glyphs.len()
    );

    shape_runs(frame, gs);

    if gs.control.enable_bidi {
        visual_order(frame, gs);
    }
}

/// First explicitly-scripted character in `[pos, to)`, if any
fn forward_script(frame: &Frame, text: &dyn TextStore, pos: CharPos, to: CharPos) -> Option<Script> {
    for i in pos..to.min(text.len()) {
        let c1 = text.char_at(i)?;
        let sym = if (c1 as u32) > 0x20 && (c1 as u32) < 0x100 {
            Script::Latin
        } else {
            frame.env.script_of(c1)
        };
        if is_explicit_script(sym) {
            return Some(sym);
        }
    }
    None
}

/// Run layout-table shapers where fonts declare one; otherwise attach
/// by-class combining codes to marks and order them canonically
fn shape_runs(frame: &Frame, gs: &mut GlyphString) {
    let mut i = 1;
    while i < gs.last() {
        let g = &gs.glyphs[i];
        if g.kind != GlyphKind::Char {
            i += 1;
            continue;
        }
        let Some(font) = g.face.font.clone() else {
            i += 1;
            continue;
        };

        if let Some(shaper) = font.shaper() {
            let face = gs.glyphs[i].face.clone();
            let mut start = i;
            i += 1;

            // Formatting characters ahead of the run join it when the font
            // can encode them.
            while start > 1 {
                let prev = &gs.glyphs[start - 1];
                if prev.kind != GlyphKind::Char || prev.category != Some(GeneralCategory::Format) {
                    break;
                }
                let code = font.driver.encode_char(prev.ch);
                if !code.is_valid() {
                    break;
                }
                start -= 1;
                gs.glyphs[start].code = code;
            }

            while i < gs.last() && gs.glyphs[i].kind == GlyphKind::Char {
                let same_font = match &gs.glyphs[i].face.font {
                    Some(f) => Rc::ptr_eq(f, &font),
                    None => false,
                };
                if same_font {
                    i += 1;
                    continue;
                }
                if gs.glyphs[i].category == Some(GeneralCategory::Format) {
                    let code = font.driver.encode_char(gs.glyphs[i].ch);
                    if code.is_valid() {
                        gs.glyphs[i].face = face.clone();
                        gs.glyphs[i].code = code;
                        i += 1;
                        continue;
                    }
                }
                break;
            }

            i = shaper.run(gs, start, i, &face);
        } else {
            let start = i;
            while i < gs.last() && is_shapeless_mark(gs, i) {
                let class = frame.env.combining_class_of(gs.glyphs[i].ch);
                gs.glyphs[i].combining = CombiningCode::by_class(class);
                i += 1;
            }
            if i > start + 1 {
                reorder_combining_marks(gs, start, i);
            }
            if i == start {
                i += 1;
            }
        }
    }
}

/// A combining mark handled by the fallback path: category `M*`, outside the
/// ASCII short cut, with a realized font that declares no shaper
fn is_shapeless_mark(gs: &GlyphString, i: usize) -> bool {
    let g = &gs.glyphs[i];
    g.kind == GlyphKind::Char
        && (g.ch as u32) >= 0x100
        && matches!(
            g.category,
            Some(
                GeneralCategory::NonspacingMark
                    | GeneralCategory::SpacingMark
                    | GeneralCategory::EnclosingMark
            )
        )
        && g.face.font.as_ref().is_some_and(|f| f.shaper().is_none())
}

/// Stable bubble sort of marks `[from, to)` by canonical class
///
/// Only by-class codes participate; explicit codes (class 0) keep their
/// place, as do equal classes.
fn reorder_combining_marks(gs: &mut GlyphString, from: usize, to: usize) {
    let mut reordered = true;
    while reordered {
        reordered = false;
        for i in (from + 1)..to {
            let class = gs.glyphs[i].combining.class();
            if class > 0 && gs.glyphs[i - 1].combining.class() > class {
                gs.glyphs.swap(i - 1, i);
                reordered = true;
            }
        }
    }
}
