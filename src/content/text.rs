//! Text lines and pattern search over interpreted glyphs.

use regex::Regex;
use serde::Serialize;

use crate::model::Rect;

use super::interpreter::PageContent;

/// Position of a glyph inside [`PageContent::text_runs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GlyphRef {
    pub run: usize,
    pub glyph: usize,
}

/// A span of line text produced by one glyph.
#[derive(Debug, Clone)]
struct Segment {
    start: usize,
    end: usize,
    glyph: GlyphRef,
    rect: Rect,
}

/// Glyphs that share a baseline, joined into a string.
#[derive(Debug, Clone, Default)]
pub struct TextLine {
    pub text: String,
    pub rect: Rect,
    segments: Vec<Segment>,
}

impl TextLine {
    fn push_glyph(&mut self, text: &str, glyph: GlyphRef, rect: Rect) {
        let start = self.text.len();
        self.text.push_str(text);
        self.rect = if self.segments.is_empty() {
            rect
        } else {
            self.rect.union(&rect)
        };
        self.segments.push(Segment {
            start,
            end: self.text.len(),
            glyph,
            rect,
        });
    }

    /// Glyphs whose text overlaps a byte range of [`TextLine::text`].
    fn glyphs_in(&self, start: usize, end: usize) -> impl Iterator<Item = &Segment> {
        self.segments
            .iter()
            .filter(move |s| s.start < end && s.end > start)
    }
}

/// One occurrence of a pattern on a page.
#[derive(Debug, Clone, Serialize)]
pub struct TextMatch {
    pub text: String,
    pub rect: Rect,
    pub glyphs: Vec<GlyphRef>,
}

/// Group the glyphs of a page into lines, in content order.
///
/// A new line starts when the baseline moves by more than half a glyph
/// height; a space is inserted for gaps wider than a quarter of it.
pub fn build_lines(content: &PageContent) -> Vec<TextLine> {
    let mut lines: Vec<TextLine> = Vec::new();
    let mut current = TextLine::default();
    let mut prev: Option<Rect> = None;

    for (run_index, run) in content.text_runs.iter().enumerate() {
        for (glyph_index, glyph) in run.glyphs.iter().enumerate() {
            let rect = glyph.rect;
            let glyph_ref = GlyphRef {
                run: run_index,
                glyph: glyph_index,
            };

            if let Some(p) = prev {
                let height = rect.height().max(p.height()).max(f32::EPSILON);
                if (rect.y0 - p.y0).abs() > height * 0.5 {
                    lines.push(std::mem::take(&mut current));
                } else if rect.x0 - p.x1 > height * 0.25
                    && !current.text.ends_with(char::is_whitespace)
                    && !glyph.text.starts_with(char::is_whitespace)
                {
                    current.text.push(' ');
                }
            }

            current.push_glyph(&glyph.text, glyph_ref, rect);
            prev = Some(rect);
        }
    }

    if !current.segments.is_empty() {
        lines.push(current);
    }
    lines
}

/// Find every non-empty match of `pattern` in the given lines.
pub fn find_matches(lines: &[TextLine], pattern: &Regex) -> Vec<TextMatch> {
    let mut matches = Vec::new();
    for line in lines {
        for m in pattern.find_iter(&line.text) {
            if m.start() == m.end() {
                continue;
            }
            let mut rect: Option<Rect> = None;
            let mut glyphs = Vec::new();
            for seg in line.glyphs_in(m.start(), m.end()) {
                rect = Some(match rect {
                    Some(r) => r.union(&seg.rect),
                    None => seg.rect,
                });
                glyphs.push(seg.glyph);
            }
            if let Some(rect) = rect {
                matches.push(TextMatch {
                    text: m.as_str().to_string(),
                    rect,
                    glyphs,
                });
            }
        }
    }
    matches
}
