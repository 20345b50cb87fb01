use std::path::Path;

use embedded_graphics::mono_font::{ascii, MonoFont};

pub type Font = &'static MonoFont<'static>;

const FONTS: &[(&str, Font)] = &[
    ("4x6", &ascii::FONT_4X6),
    ("5x7", &ascii::FONT_5X7),
    ("5x8", &ascii::FONT_5X8),
    ("6x9", &ascii::FONT_6X9),
    ("6x10", &ascii::FONT_6X10),
    ("6x12", &ascii::FONT_6X12),
    ("6x13", &ascii::FONT_6X13),
    ("6x13b", &ascii::FONT_6X13_BOLD),
    ("7x13", &ascii::FONT_7X13),
    ("7x14", &ascii::FONT_7X14),
    ("8x13", &ascii::FONT_8X13),
    ("9x15", &ascii::FONT_9X15),
    ("9x18", &ascii::FONT_9X18),
    ("10x20", &ascii::FONT_10X20),
];

/// Looks up a font by reference. Paths like `fonts/6x12.bdf` resolve by
/// their file stem, so configs written for BDF fonts keep working.
pub fn load(reference: &str) -> Option<Font> {
    let stem = Path::new(reference)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(reference)
        .to_lowercase();

    FONTS
        .iter()
        .find(|(name, _)| *name == stem)
        .map(|(_, font)| *font)
}

pub fn height(font: Font) -> i32 {
    font.character_size.height as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name() {
        let font = load("6x12").unwrap();
        assert_eq!(height(font), 12);
    }

    #[test]
    fn test_bdf_path() {
        let font = load("fonts-aux/10x20.bdf").unwrap();
        assert_eq!(height(font), 20);
    }

    #[test]
    fn test_unknown() {
        assert!(load("hoog32").is_none());
    }
}
