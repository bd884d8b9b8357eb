// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Visual reordering
//!
//! The reorderer rewrites a logical-order glyph buffer into visual order,
//! tagging every glyph with its embedding level and substituting mirrored
//! characters. The bidi algorithm itself is a capability: [`UnicodeBidi`]
//! runs the full TR9 implementation, [`NaiveBidi`] reproduces the legacy
//! fallback (reversal of strong-RTL runs; neutrals are handled incorrectly,
//! kept for compatibility).
//!
//! Clusters travel as units: a base precedes its marks in both the logical
//! and the visual buffer.

use crate::environment::is_strong_rtl;
use crate::frame::Frame;
use crate::glyph::GlyphString;
use unicode_bidi::{BidiInfo, Level};

/// Result of one reordering request
///
/// All vectors are indexed per input character except `visual`, which lists
/// logical indices in visual order.
pub struct Reordered {
    /// `visual[i]` is the logical index of the i-th visual character
    pub visual: Vec<usize>,
    /// Embedding level per logical character
    pub levels: Vec<u8>,
    /// Mirror substitution per logical character
    pub mirrored: Vec<Option<char>>,
}

/// Bidirectional-algorithm capability
pub trait BidiEngine {
    /// Reorder `chars` for display, `base_rtl` giving the paragraph direction
    fn reorder(&self, chars: &[char], base_rtl: bool) -> Reordered;
}

/// Full Unicode bidirectional algorithm
#[derive(Clone, Copy, Debug, Default)]
pub struct UnicodeBidi;

impl BidiEngine for UnicodeBidi {
    fn reorder(&self, chars: &[char], base_rtl: bool) -> Reordered {
        let text: String = chars.iter().collect();
        let base = Some(if base_rtl { Level::rtl() } else { Level::ltr() });
        let info = BidiInfo::new(&text, base);

        // Map byte indices back to character ordinals.
        let mut ordinal_of = vec![0usize; text.len() + 1];
        for (ord, (byte, _)) in text.char_indices().enumerate() {
            ordinal_of[byte] = ord;
        }

        let mut visual = Vec::with_capacity(chars.len());
        let mut levels = vec![0u8; chars.len()];

        for para in &info.paragraphs {
            let (byte_levels, runs) = info.visual_runs(para, para.range.clone());
            for run in runs {
                let level = byte_levels[run.start];
                let ordinals = text[run.clone()]
                    .char_indices()
                    .map(|(b, _)| ordinal_of[run.start + b]);
                if level.is_rtl() {
                    let mut batch: Vec<usize> = ordinals.collect();
                    batch.reverse();
                    visual.extend_from_slice(&batch);
                } else {
                    visual.extend(ordinals);
                }
            }
            for (byte, _) in text[para.range.clone()].char_indices() {
                let abs = para.range.start + byte;
                levels[ordinal_of[abs]] = byte_levels[abs].number();
            }
        }

        let mirrored = chars
            .iter()
            .zip(&levels)
            .map(|(&c, &level)| {
                if level % 2 == 1 {
                    unicode_bidi_mirroring::get_mirrored(c)
                } else {
                    None
                }
            })
            .collect();

        Reordered {
            visual,
            levels,
            mirrored,
        }
    }
}

/// Legacy reversal of strong right-to-left runs
///
/// Characters of bidi class R/AL/RLE/RLO get level 1 and each maximal run of
/// them is reversed; everything else keeps level 0 and its place. No mirror
/// substitution and no neutral resolution.
pub struct NaiveBidi {
    pub env: std::rc::Rc<dyn crate::environment::Environment>,
}

impl BidiEngine for NaiveBidi {
    fn reorder(&self, chars: &[char], _base_rtl: bool) -> Reordered {
        let levels: Vec<u8> = chars
            .iter()
            .map(|&c| u8::from(is_strong_rtl(self.env.bidi_class_of(c))))
            .collect();

        let mut visual: Vec<usize> = (0..chars.len()).collect();
        let mut i = 0;
        while i < levels.len() {
            if levels[i] == 1 {
                let mut j = i + 1;
                while j < levels.len() && levels[j] == 1 {
                    j += 1;
                }
                visual[i..j].reverse();
                i = j;
            } else {
                i += 1;
            }
        }

        Reordered {
            visual,
            levels,
            mirrored: vec![None; chars.len()],
        }
    }
}

/// Rewrite `gs` into visual order
///
/// No-op unless the buffer is direction-sensitive: it contains a strong RTL
/// character or the base orientation is reversed.
pub(crate) fn visual_order(frame: &Frame, gs: &mut GlyphString) {
    // One entry per cluster: buffer range of base plus marks, and the base
    // character.
    let mut clusters = vec![];
    let mut chars = vec![];
    let mut sensitive = gs.control.orientation_reversed;

    let mut i = 1;
    while i < gs.last() {
        let g = &gs.glyphs[i];
        if is_strong_rtl(frame.env.bidi_class_of(g.ch)) {
            sensitive = true;
        }
        let end = gs.cluster_end(i);
        clusters.push(i..end);
        chars.push(g.ch);
        i = end;
    }

    if !sensitive {
        return;
    }

    let base_rtl = gs.control.orientation_reversed;
    let order = frame.bidi.reorder(&chars, base_rtl);
    debug_assert_eq!(order.visual.len(), chars.len());
    debug_assert_eq!(order.levels.len(), chars.len());

    let old = gs.glyphs.clone();
    let mut out = 1;
    for &j in &order.visual {
        let cluster = clusters[j].clone();
        let level = order.levels[j];
        let mirror = order.mirrored[j].filter(|&m| m != chars[j]);
        for k in cluster.clone() {
            let mut g = old[k].clone();
            g.bidi_level = level;
            if k == cluster.start {
                if let Some(m) = mirror {
                    g.ch = m;
                    if let Some(font) = g.face.font.as_ref() {
                        g.code = font.driver.encode_char(m);
                    }
                }
            }
            gs.glyphs[out] = g;
            out += 1;
        }
    }
    debug_assert_eq!(out, gs.last());

    log::trace!("visual order applied over {} clusters", chars.len());
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compose::compose;
    use crate::control::DrawControl;
    use crate::environment::UnicodeTables;
    use crate::glyph::GlyphCode;
    use crate::mock::{chars_of, mock};
    use crate::store::{TextBuffer, TextStore};
    use std::rc::Rc;

    fn composed(text: &str, control: DrawControl) -> GlyphString {
        let m = mock();
        let buffer = TextBuffer::new(text);
        let mut gs = GlyphString::new(0, control, 0, 0);
        compose(&m.frame, &buffer, 0, buffer.len(), &mut gs);
        gs
    }

    fn bidi_control() -> DrawControl {
        DrawControl {
            enable_bidi: true,
            ..Default::default()
        }
    }

    #[test]
    fn embedded_rtl_reorders() {
        // Logical a b א ב e f → visual a b ב א e f, the Hebrew at level 1.
        let gs = composed("abאבef", bidi_control());
        assert_eq!(chars_of(&gs), vec!['a', 'b', 'ב', 'א', 'e', 'f']);
        let levels: Vec<_> = gs.glyphs[gs.body()].iter().map(|g| g.bidi_level).collect();
        assert_eq!(levels, vec![0, 0, 1, 1, 0, 0]);
        // Labels still name logical positions.
        assert_eq!(gs.glyphs[3].pos, 3);
        assert_eq!(gs.glyphs[4].pos, 2);
    }

    #[test]
    fn ltr_only_is_untouched() {
        let gs = composed("abc", bidi_control());
        assert_eq!(chars_of(&gs), vec!['a', 'b', 'c']);
        assert!(gs.glyphs[gs.body()].iter().all(|g| g.bidi_level == 0));
    }

    #[test]
    fn rtl_without_enable_bidi_is_not_reordered() {
        let gs = composed("אבג", DrawControl::default());
        assert_eq!(chars_of(&gs), vec!['א', 'ב', 'ג']);
        assert!(gs.glyphs[gs.body()].iter().all(|g| g.bidi_level == 0));
    }

    #[test]
    fn rtl_run_reverses_with_levels() {
        let gs = composed("אבג", bidi_control());
        assert_eq!(chars_of(&gs), vec!['ג', 'ב', 'א']);
        assert!(gs.glyphs[gs.body()].iter().all(|g| g.bidi_level == 1));
    }

    #[test]
    fn clusters_travel_as_units() {
        // A mark on the first Hebrew letter must follow its base after
        // reversal.
        let gs = composed("א\u{0591}ב", bidi_control());
        assert_eq!(chars_of(&gs), vec!['ב', 'א', '\u{0591}']);
        assert!(gs.glyphs[3].combining.is_combining());
        assert_eq!(gs.glyphs[2].bidi_level, gs.glyphs[3].bidi_level);
    }

    #[test]
    fn mirrored_chars_are_substituted() {
        // A parenthesis inside an RTL run mirrors and re-encodes.
        let gs = composed("א(ב", bidi_control());
        assert_eq!(chars_of(&gs), vec!['ב', ')', 'א']);
        let paren = &gs.glyphs[2];
        assert_eq!(paren.code, GlyphCode(')' as u32));
    }

    #[test]
    fn reorder_preserves_glyph_multiset() {
        let logical = composed("abאבef", DrawControl::default());
        let visual = composed("abאבef", bidi_control());
        let mut a = chars_of(&logical);
        let mut b = chars_of(&visual);
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }

    #[test]
    fn naive_engine_reverses_strong_runs_only() {
        let engine = NaiveBidi {
            env: Rc::new(UnicodeTables),
        };
        let chars: Vec<char> = "aאבb".chars().collect();
        let r = engine.reorder(&chars, false);
        assert_eq!(r.visual, vec![0, 2, 1, 3]);
        assert_eq!(r.levels, vec![0, 1, 1, 0]);
        assert!(r.mirrored.iter().all(|m| m.is_none()));
    }

    #[test]
    fn unicode_engine_resolves_neutrals() {
        let engine = UnicodeBidi;
        let chars: Vec<char> = "א ב".chars().collect();
        // The space between two RTL letters joins the RTL run.
        let r = engine.reorder(&chars, false);
        assert_eq!(r.visual, vec![2, 1, 0]);
        assert_eq!(r.levels, vec![1, 1, 1]);
    }
}
