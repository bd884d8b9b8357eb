// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Deterministic font stack for tests
//!
//! Every character is 10 units wide with ascent 10 and descent 2 unless a
//! test overrides it, glyph codes equal the codepoint, and all drawing is
//! recorded into an operation log. `font_size` is 1000, so combining-offset
//! per-milles scale 1:1.

use crate::control::DrawControl;
use crate::environment::UnicodeTables;
use crate::faces::{
    FaceHandle, FaceResolver, FontDriver, RealizedFace, RealizedFont, Shaper,
};
use crate::frame::{Frame, FrameDriver, Region};
use crate::glyph::{GlyphCode, GlyphString};
use crate::reorder::UnicodeBidi;
use crate::store::{Charset, Language};
use icu_properties::props::Script;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub const WIDTH: i32 = 10;
pub const ASCENT: i32 = 10;
pub const DESCENT: i32 = 2;

/// Per-character metric override: (width, lbearing, rbearing)
pub type MetricOverride = (i32, i32, i32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrawOp {
    Fill {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        cursor: bool,
    },
    Glyphs {
        x: i32,
        y: i32,
        from: usize,
        to: usize,
        reverse: bool,
    },
    EmptyBoxes {
        from: usize,
        to: usize,
    },
    Box {
        glyph: usize,
        width: i32,
    },
    HLine {
        x: i32,
        width: i32,
    },
}

pub type OpLog = Rc<RefCell<Vec<DrawOp>>>;

pub struct MockFontDriver {
    pub log: OpLog,
    /// Characters no font covers
    pub missing: Vec<char>,
    pub shaper: Option<Rc<dyn Shaper>>,
}

impl FontDriver for MockFontDriver {
    fn encode_char(&self, c: char) -> GlyphCode {
        if self.missing.contains(&c) {
            GlyphCode::INVALID
        } else {
            GlyphCode(c as u32)
        }
    }

    fn render(
        &self,
        _surface: &mut dyn Any,
        x: i32,
        y: i32,
        _gs: &GlyphString,
        from: usize,
        to: usize,
        reverse: bool,
        _clip: Option<&Region>,
    ) {
        self.log.borrow_mut().push(DrawOp::Glyphs {
            x,
            y,
            from,
            to,
            reverse,
        });
    }

    fn shaper(&self) -> Option<Rc<dyn Shaper>> {
        self.shaper.clone()
    }
}

pub struct MockFrameDriver {
    pub log: OpLog,
}

impl FrameDriver for MockFrameDriver {
    fn fill_space(
        &self,
        _surface: &mut dyn Any,
        _face: &RealizedFace,
        is_cursor: bool,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        _clip: Option<&Region>,
    ) {
        self.log.borrow_mut().push(DrawOp::Fill {
            x,
            y,
            width,
            height,
            cursor: is_cursor,
        });
    }

    fn draw_empty_boxes(
        &self,
        _surface: &mut dyn Any,
        _x: i32,
        _y: i32,
        _gs: &GlyphString,
        from: usize,
        to: usize,
        _reverse: bool,
        _clip: Option<&Region>,
    ) {
        self.log.borrow_mut().push(DrawOp::EmptyBoxes { from, to });
    }

    fn draw_box(
        &self,
        _surface: &mut dyn Any,
        _gs: &GlyphString,
        glyph: usize,
        _x: i32,
        _y: i32,
        width: i32,
        _clip: Option<&Region>,
    ) {
        self.log.borrow_mut().push(DrawOp::Box { glyph, width });
    }

    fn draw_hline(
        &self,
        _surface: &mut dyn Any,
        _gs: &GlyphString,
        _face: &RealizedFace,
        _reverse: bool,
        x: i32,
        _y: i32,
        width: i32,
        _clip: Option<&Region>,
    ) {
        self.log.borrow_mut().push(DrawOp::HLine { x, width });
    }
}

pub struct MockResolver {
    pub default_face: Rc<RealizedFace>,
    /// Faces substituted for specific handles by `realize`
    pub faces: HashMap<FaceHandle, Rc<RealizedFace>>,
    /// Metric overrides per character
    pub metrics: RefCell<HashMap<char, MetricOverride>>,
}

impl FaceResolver for MockResolver {
    fn realize(
        &self,
        faces: &[FaceHandle],
        _language: Option<Language>,
        _charset: Option<Charset>,
        _size: i32,
    ) -> Rc<RealizedFace> {
        faces
            .iter()
            .find_map(|handle| self.faces.get(handle).cloned())
            .unwrap_or_else(|| self.default_face.clone())
    }

    fn for_chars(
        &self,
        _script: Option<Script>,
        _language: Option<Language>,
        _charset: Option<Charset>,
        gs: &mut GlyphString,
        from: usize,
        to: usize,
        _size: i32,
    ) {
        for g in &mut gs.glyphs[from..to] {
            g.code = match g.face.font.as_ref() {
                Some(font) => font.driver.encode_char(g.ch),
                None => GlyphCode::INVALID,
            };
        }
    }

    fn metrics(&self, gs: &mut GlyphString, from: usize, to: usize) {
        let overrides = self.metrics.borrow();
        for g in &mut gs.glyphs[from..to] {
            let (width, lbearing, rbearing) = overrides
                .get(&g.ch)
                .copied()
                .unwrap_or((WIDTH, 0, WIDTH));
            g.width = width;
            g.lbearing = lbearing;
            g.rbearing = rbearing;
            g.ascent = ASCENT;
            g.descent = DESCENT;
            g.xoff = 0;
            g.yoff = 0;
        }
    }
}

pub fn face_with(font: Option<Rc<RealizedFont>>) -> Rc<RealizedFace> {
    Rc::new(RealizedFace {
        ascent: ASCENT,
        descent: DESCENT,
        space_width: WIDTH,
        font_size: 1000,
        reverse_video: false,
        hline: None,
        face_box: None,
        font,
    })
}

pub struct Mock {
    pub frame: Frame,
    pub log: OpLog,
    pub resolver: Rc<MockResolver>,
}

pub fn mock() -> Mock {
    mock_with(vec![], None)
}

/// Build a frame whose default font cannot encode `missing` and shapes with
/// `shaper`
pub fn mock_with(missing: Vec<char>, shaper: Option<Rc<dyn Shaper>>) -> Mock {
    let log: OpLog = Rc::new(RefCell::new(vec![]));
    let font_driver = Rc::new(MockFontDriver {
        log: log.clone(),
        missing,
        shaper,
    });
    let font = Rc::new(RealizedFont {
        size: 1000,
        driver: font_driver,
    });
    let face = face_with(Some(font));
    let resolver = Rc::new(MockResolver {
        default_face: face.clone(),
        faces: HashMap::new(),
        metrics: RefCell::new(HashMap::new()),
    });
    let frame = Frame::new(
        face,
        1000,
        Rc::new(MockFrameDriver { log: log.clone() }),
        resolver.clone(),
        Rc::new(UnicodeTables),
        Rc::new(UnicodeBidi),
    );
    Mock {
        frame,
        log,
        resolver,
    }
}

pub fn frame() -> Frame {
    mock().frame
}

pub fn mock_control() -> DrawControl {
    DrawControl::default()
}

/// Characters of the glyph buffer between the anchors
pub fn chars_of(gs: &GlyphString) -> Vec<char> {
    gs.glyphs[gs.body()].iter().map(|g| g.ch).collect()
}

/// Widths of the glyph buffer between the anchors
pub fn widths_of(gs: &GlyphString) -> Vec<i32> {
    gs.glyphs[gs.body()].iter().map(|g| g.width).collect()
}
