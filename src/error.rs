// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Error type

/// Error type of fallible engine operations
///
/// Shaping and font-driver failures are not reported through this type: the
/// affected glyph keeps [`crate::GlyphCode::INVALID`] and is later rendered
/// as an empty box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An index lies outside the text, or a range is inverted
    #[error("position out of range")]
    Range,
    /// A glyph string could not be produced for the request
    #[error("cannot lay out text")]
    Draw,
    /// A scratch buffer could not be acquired
    #[error("out of resources")]
    Resource,
}

pub type Result<T> = std::result::Result<T, Error>;
