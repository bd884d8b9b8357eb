// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Frame: the per-surface drawing context
//!
//! A [`Frame`] bundles everything one drawing surface needs: the default
//! realized face, the [`FrameDriver`] that fills rectangles and draws
//! decorations, the [`Environment`] property tables, the face resolver and
//! the bidi engine. All mutating operations on a frame happen on one thread.

use crate::environment::Environment;
use crate::faces::{FaceResolver, RealizedFace};
use crate::glyph::GlyphString;
use crate::reorder::BidiEngine;
use smallvec::SmallVec;
use std::any::Any;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Device-unit rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rect { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let r = (self.x + self.width).min(other.x + other.width);
        let b = (self.y + self.height).min(other.y + other.height);
        let rect = Rect::new(x, y, r - x, b - y);
        (!rect.is_empty()).then_some(rect)
    }
}

/// Clip region: a small set of device rectangles
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Region {
    rects: SmallVec<[Rect; 4]>,
}

impl Region {
    pub fn from_rect(rect: Rect) -> Self {
        let mut region = Region::default();
        region.add(rect);
        region
    }

    pub fn add(&mut self, rect: Rect) {
        if !rect.is_empty() {
            self.rects.push(rect);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Restrict to the parts also inside `other`
    pub fn intersect(&mut self, other: &Region) {
        let mut out = SmallVec::new();
        for a in &self.rects {
            for b in &other.rects {
                if let Some(r) = a.intersection(b) {
                    out.push(r);
                }
            }
        }
        self.rects = out;
    }

    /// Smallest rectangle containing the region
    pub fn bounding_rect(&self) -> Rect {
        let mut iter = self.rects.iter();
        let Some(first) = iter.next() else {
            return Rect::default();
        };
        let mut x0 = first.x;
        let mut y0 = first.y;
        let mut x1 = first.x + first.width;
        let mut y1 = first.y + first.height;
        for r in iter {
            x0 = x0.min(r.x);
            y0 = y0.min(r.y);
            x1 = x1.max(r.x + r.width);
            y1 = y1.max(r.y + r.height);
        }
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// Drawing primitives of the device behind a frame
///
/// The `surface` argument is the opaque window/pixmap handle the caller
/// passed to the draw operation; only the driver assigns meaning to it.
pub trait FrameDriver {
    /// Fill a background or cursor rectangle in the face's colors
    #[allow(clippy::too_many_arguments)]
    fn fill_space(
        &self,
        surface: &mut dyn Any,
        face: &RealizedFace,
        is_cursor: bool,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        clip: Option<&Region>,
    );

    /// Draw placeholder boxes for glyphs without a resolvable font
    #[allow(clippy::too_many_arguments)]
    fn draw_empty_boxes(
        &self,
        surface: &mut dyn Any,
        x: i32,
        y: i32,
        gs: &GlyphString,
        from: usize,
        to: usize,
        reverse: bool,
        clip: Option<&Region>,
    );

    /// Draw a box edge (`width == 0`) or the top and bottom rules
    /// (`width > 0`) of the box carried by glyph `g`
    #[allow(clippy::too_many_arguments)]
    fn draw_box(
        &self,
        surface: &mut dyn Any,
        gs: &GlyphString,
        g: usize,
        x: i32,
        y: i32,
        width: i32,
        clip: Option<&Region>,
    );

    /// Draw an underline/strike-through/overline over `width` units
    #[allow(clippy::too_many_arguments)]
    fn draw_hline(
        &self,
        surface: &mut dyn Any,
        gs: &GlyphString,
        face: &RealizedFace,
        reverse: bool,
        x: i32,
        y: i32,
        width: i32,
        clip: Option<&Region>,
    );
}

static FRAME_IDS: AtomicU64 = AtomicU64::new(1);

/// Per-surface drawing context
pub struct Frame {
    pub(crate) id: u64,
    /// Bumped whenever font configuration changes; invalidates glyph caches
    pub(crate) tick: u64,
    /// Default realized face, used where text carries no face
    pub rface: Rc<RealizedFace>,
    /// Space advance of the default face
    pub space_width: i32,
    /// Font size passed to the resolver (per-mille units)
    pub font_size: i32,
    pub driver: Rc<dyn FrameDriver>,
    pub resolver: Rc<dyn FaceResolver>,
    pub env: Rc<dyn Environment>,
    pub bidi: Rc<dyn BidiEngine>,
}

impl Frame {
    pub fn new(
        rface: Rc<RealizedFace>,
        font_size: i32,
        driver: Rc<dyn FrameDriver>,
        resolver: Rc<dyn FaceResolver>,
        env: Rc<dyn Environment>,
        bidi: Rc<dyn BidiEngine>,
    ) -> Self {
        Frame {
            id: FRAME_IDS.fetch_add(1, Ordering::Relaxed),
            tick: 0,
            space_width: rface.space_width,
            rface,
            font_size,
            driver,
            resolver,
            env,
            bidi,
        }
    }

    /// Note a font-configuration change
    ///
    /// Cached glyph chains built before the change stop validating.
    pub fn note_font_change(&mut self) {
        self.tick += 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn region_intersection() {
        let mut a = Region::from_rect(Rect::new(0, 0, 10, 10));
        a.add(Rect::new(20, 0, 10, 10));
        let b = Region::from_rect(Rect::new(5, 5, 30, 2));
        a.intersect(&b);
        assert_eq!(a.bounding_rect(), Rect::new(5, 5, 25, 2));
    }

    #[test]
    fn empty_rects_are_ignored() {
        let mut r = Region::default();
        r.add(Rect::new(0, 0, 0, 5));
        assert!(r.is_empty());
        assert_eq!(r.bounding_rect(), Rect::default());
    }
}
