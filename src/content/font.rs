//! Font metrics and per-code text decoding.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Encoding, Object};

use crate::model::get_number;
use crate::page::resources::{resolve_array, resolve_dict};

/// Default glyph width (thousandths of an em) when a font has no width table.
const FALLBACK_WIDTH: f32 = 500.0;
const COURIER_WIDTH: f32 = 600.0;
const DEFAULT_ASCENT: f32 = 0.8;
const DEFAULT_DESCENT: f32 = -0.2;

/// Glyph widths and vertical extent of a font, in text space units
/// (multiply by the font size to get user space).
#[derive(Debug, Clone)]
pub struct FontMetrics {
    /// Bytes per character code: 2 for composite (Type0) fonts, else 1.
    pub code_len: usize,
    widths: HashMap<u32, f32>,
    default_width: f32,
    /// Converts glyph space widths to text space.
    scale: f32,
    pub ascent: f32,
    pub descent: f32,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            code_len: 1,
            widths: HashMap::new(),
            default_width: FALLBACK_WIDTH,
            scale: 0.001,
            ascent: DEFAULT_ASCENT,
            descent: DEFAULT_DESCENT,
        }
    }
}

impl FontMetrics {
    /// Read metrics from a font dictionary.
    pub fn from_font(doc: &Document, font: &Dictionary) -> Self {
        let subtype = font.get(b"Subtype").and_then(Object::as_name).unwrap_or_default();
        let mut metrics = FontMetrics::default();

        let descriptor = match subtype {
            b"Type0" => {
                metrics.code_len = 2;
                let descendant = font
                    .get(b"DescendantFonts")
                    .ok()
                    .and_then(|d| resolve_array(doc, d))
                    .and_then(|arr| arr.first())
                    .and_then(|d| resolve_dict(doc, d));
                if let Some(cid_font) = descendant {
                    metrics.read_cid_widths(doc, cid_font);
                    descriptor_of(doc, cid_font)
                } else {
                    metrics.default_width = 1000.0;
                    None
                }
            }
            _ => {
                if subtype == b"Type3" {
                    if let Some(a) = font
                        .get(b"FontMatrix")
                        .ok()
                        .and_then(|m| resolve_array(doc, m))
                        .and_then(|m| m.first())
                        .and_then(get_number)
                    {
                        metrics.scale = a.abs();
                    }
                }
                metrics.read_simple_widths(doc, font);
                descriptor_of(doc, font)
            }
        };

        if let Some(desc) = descriptor {
            if subtype != b"Type0" {
                if let Some(mw) = desc.get(b"MissingWidth").ok().and_then(get_number) {
                    if metrics.widths.is_empty() || mw > 0.0 {
                        metrics.default_width = mw;
                    }
                }
            }
            // Type3 glyph space is arbitrary; keep em-based defaults there.
            if subtype != b"Type3" {
                let ascent = desc.get(b"Ascent").ok().and_then(get_number).unwrap_or(0.0);
                let descent = desc.get(b"Descent").ok().and_then(get_number).unwrap_or(0.0);
                if ascent > 0.0 {
                    metrics.ascent = ascent / 1000.0;
                }
                if descent < 0.0 {
                    metrics.descent = descent / 1000.0;
                }
            }
        }

        metrics
    }

    fn read_simple_widths(&mut self, doc: &Document, font: &Dictionary) {
        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0)
            .max(0) as u32;

        if let Some(widths) = font.get(b"Widths").ok().and_then(|w| resolve_array(doc, w)) {
            for (i, w) in widths.iter().enumerate() {
                let w = doc.dereference(w).ok().and_then(|(_, o)| get_number(o));
                if let Some(w) = w {
                    self.widths.insert(first_char + i as u32, w);
                }
            }
        } else if let Ok(base) = font.get(b"BaseFont").and_then(Object::as_name) {
            if base.starts_with(b"Courier") {
                self.default_width = COURIER_WIDTH;
            }
        }
    }

    /// `/W` array: `c [w1 w2 ...]` or `cfirst clast w`.
    fn read_cid_widths(&mut self, doc: &Document, cid_font: &Dictionary) {
        self.default_width = cid_font.get(b"DW").ok().and_then(get_number).unwrap_or(1000.0);

        let Some(w) = cid_font.get(b"W").ok().and_then(|w| resolve_array(doc, w)) else {
            return;
        };
        let mut i = 0;
        while i < w.len() {
            let Some(first) = get_number(&w[i]) else {
                break;
            };
            let first = first.max(0.0) as u32;
            match w.get(i + 1).and_then(|o| doc.dereference(o).ok()).map(|(_, o)| o) {
                Some(Object::Array(list)) => {
                    for (k, width) in list.iter().enumerate() {
                        if let Some(width) = get_number(width) {
                            self.widths.insert(first + k as u32, width);
                        }
                    }
                    i += 2;
                }
                Some(last) => {
                    let (Some(last), Some(width)) = (get_number(last), w.get(i + 2).and_then(get_number)) else {
                        break;
                    };
                    let last = last.max(0.0) as u32;
                    // Cap pathological ranges.
                    for code in first..=last.min(first.saturating_add(0xFFFF)) {
                        self.widths.insert(code, width);
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    /// Horizontal advance of a code in text space (before font size).
    pub fn width(&self, code: u32) -> f32 {
        self.widths.get(&code).copied().unwrap_or(self.default_width) * self.scale
    }
}

fn descriptor_of<'a>(doc: &'a Document, font: &'a Dictionary) -> Option<&'a Dictionary> {
    font.get(b"FontDescriptor").ok().and_then(|d| resolve_dict(doc, d))
}

/// A font resource ready for glyph placement and decoding.
#[derive(Debug)]
pub struct PageFont<'a> {
    pub metrics: FontMetrics,
    encoding: Option<Encoding<'a>>,
}

impl<'a> PageFont<'a> {
    pub fn load(doc: &'a Document, font: &'a Dictionary) -> Self {
        // lopdf asserts on non-font dictionaries in debug builds.
        let encoding = if font.type_is(b"Font") {
            font.get_font_encoding(doc).ok()
        } else {
            None
        };
        Self {
            metrics: FontMetrics::from_font(doc, font),
            encoding,
        }
    }

    /// Stand-in for a missing font resource.
    pub fn fallback() -> Self {
        Self {
            metrics: FontMetrics::default(),
            encoding: None,
        }
    }

    /// Split a string operand into character codes.
    pub fn codes<'b>(&self, bytes: &'b [u8]) -> impl Iterator<Item = (u32, &'b [u8])> + 'b {
        bytes.chunks(self.metrics.code_len).map(|chunk| {
            let code = chunk.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
            (code, chunk)
        })
    }

    /// Unicode text for a single character code.
    pub fn decode(&self, code: u32, bytes: &[u8]) -> String {
        match &self.encoding {
            Some(Encoding::UnicodeMapEncoding(map)) => map
                .get(code as u16)
                .map(|units| String::from_utf16_lossy(&units))
                .unwrap_or_else(|| decode_text_simple(bytes)),
            Some(enc) => {
                Document::decode_text(enc, bytes).unwrap_or_else(|_| decode_text_simple(bytes))
            }
            None if self.metrics.code_len == 2 => char::from_u32(code)
                .filter(|c| !c.is_control())
                .map(String::from)
                .unwrap_or_default(),
            None => decode_text_simple(bytes),
        }
    }
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // Try UTF-16BE first (BOM marker)
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_simple_font_widths() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "FirstChar" => 65,
            "Widths" => vec![600.into(), 700.into()],
        };
        let m = FontMetrics::from_font(&doc, &font);
        assert_eq!(m.code_len, 1);
        assert!((m.width(65) - 0.6).abs() < 1e-6);
        assert!((m.width(66) - 0.7).abs() < 1e-6);
        assert!((m.width(67) - 0.5).abs() < 1e-6);
        assert_eq!(m.ascent, 0.8);
    }

    #[test]
    fn test_standard_courier() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier-Bold",
        };
        let m = FontMetrics::from_font(&doc, &font);
        assert!((m.width(32) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_cid_widths() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "DescendantFonts" => vec![Object::Dictionary(dictionary! {
                "Type" => "Font",
                "Subtype" => "CIDFontType2",
                "DW" => 900,
                "W" => vec![
                    1.into(), vec![Object::Integer(250), Object::Integer(300)].into(),
                    10.into(), 12.into(), 400.into(),
                ],
                "FontDescriptor" => dictionary! { "Ascent" => 900, "Descent" => -300 },
            })],
        };
        let m = FontMetrics::from_font(&doc, &font);
        assert_eq!(m.code_len, 2);
        assert!((m.width(1) - 0.25).abs() < 1e-6);
        assert!((m.width(2) - 0.3).abs() < 1e-6);
        assert!((m.width(11) - 0.4).abs() < 1e-6);
        assert!((m.width(5) - 0.9).abs() < 1e-6);
        assert!((m.ascent - 0.9).abs() < 1e-6);
        assert!((m.descent + 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_type3_scale() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type3",
            "FontMatrix" => vec![Object::Real(0.01), 0.into(), 0.into(), Object::Real(0.01), 0.into(), 0.into()],
            "FirstChar" => 0,
            "Widths" => vec![50.into()],
        };
        let m = FontMetrics::from_font(&doc, &font);
        assert!((m.width(0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_win_ansi() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        };
        let pf = PageFont::load(&doc, &font);
        let codes: Vec<_> = pf.codes(b"Hi\x80").collect();
        assert_eq!(codes.len(), 3);
        assert_eq!(pf.decode(codes[0].0, codes[0].1), "H");
        assert_eq!(pf.decode(codes[2].0, codes[2].1), "\u{20AC}");
    }

    #[test]
    fn test_two_byte_codes() {
        let pf = PageFont {
            metrics: FontMetrics {
                code_len: 2,
                ..FontMetrics::default()
            },
            encoding: None,
        };
        let codes: Vec<_> = pf.codes(&[0x00, 0x41, 0x4E, 0x2D]).collect();
        assert_eq!(codes[0].0, 0x41);
        assert_eq!(codes[1].0, 0x4E2D);
        assert_eq!(pf.decode(codes[1].0, codes[1].1), "中");
    }

    #[test]
    fn test_decode_text_simple() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
        assert_eq!(decode_text_simple(&[0x48, 0xE9]), "Hé");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]), "Hi");
    }
}
