// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Character property tables
//!
//! Script, general category, canonical combining class, bidi class and
//! mirroring lookups are process-wide data, but the engine reaches them only
//! through an explicit [`Environment`] handle so no global state hides in
//! the pipeline. [`UnicodeTables`] is the stock implementation, backed by
//! the `icu_properties` compiled data for the first three and by
//! `unicode-bidi`/`unicode-bidi-mirroring` for the rest.

use icu_properties::props::{CanonicalCombiningClass, GeneralCategory, Script};
use icu_properties::CodePointMapData;
use unicode_bidi::data_source::BidiDataSource;
use unicode_bidi::{BidiClass, HardcodedBidiData};

/// Per-codepoint property tables consumed by the engine
pub trait Environment {
    fn script_of(&self, c: char) -> Script;
    fn category_of(&self, c: char) -> GeneralCategory;
    fn combining_class_of(&self, c: char) -> u8;
    fn bidi_class_of(&self, c: char) -> BidiClass;
    /// The mirrored counterpart for right-to-left display, if any
    fn mirrored(&self, c: char) -> Option<char>;
}

/// Whether `class` is one of the strong right-to-left classes
///
/// These are the classes whose presence makes a buffer direction-sensitive.
pub(crate) fn is_strong_rtl(class: BidiClass) -> bool {
    matches!(
        class,
        BidiClass::R | BidiClass::AL | BidiClass::RLE | BidiClass::RLO
    )
}

/// Whether `script` explicitly identifies a script
///
/// `Inherited`, `Common` and `Unknown` do not; the composer propagates or
/// searches instead.
pub(crate) fn is_explicit_script(script: Script) -> bool {
    script != Script::Inherited && script != Script::Common && script != Script::Unknown
}

/// Stock property tables backed by the Unicode character database
#[derive(Clone, Copy, Debug, Default)]
pub struct UnicodeTables;

impl Environment for UnicodeTables {
    fn script_of(&self, c: char) -> Script {
        CodePointMapData::<Script>::new().get(c)
    }

    fn category_of(&self, c: char) -> GeneralCategory {
        CodePointMapData::<GeneralCategory>::new().get(c)
    }

    fn combining_class_of(&self, c: char) -> u8 {
        CodePointMapData::<CanonicalCombiningClass>::new()
            .get(c)
            .to_icu4c_value()
    }

    fn bidi_class_of(&self, c: char) -> BidiClass {
        HardcodedBidiData.bidi_class(c)
    }

    fn mirrored(&self, c: char) -> Option<char> {
        unicode_bidi_mirroring::get_mirrored(c)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stock_tables() {
        let env = UnicodeTables;
        assert_eq!(env.script_of('a'), Script::Latin);
        assert_eq!(env.script_of('א'), Script::Hebrew);
        assert!(!is_explicit_script(env.script_of('\u{0301}')));
        assert_eq!(env.category_of('\u{0301}'), GeneralCategory::NonspacingMark);
        assert_eq!(env.category_of('\u{00AD}'), GeneralCategory::Format);
        assert_eq!(env.combining_class_of('\u{0301}'), 230);
        assert_eq!(env.combining_class_of('\u{0323}'), 220);
        assert_eq!(env.combining_class_of('a'), 0);
        assert!(is_strong_rtl(env.bidi_class_of('א')));
        assert!(!is_strong_rtl(env.bidi_class_of('a')));
        assert_eq!(env.mirrored('('), Some(')'));
        assert_eq!(env.mirrored('a'), None);
    }
}
