//! Applying redactions to a page's content stream.
//!
//! Removed glyphs are replaced by `TJ` kerning so the remaining text keeps
//! its position, removed image draws are dropped, and fills are painted on
//! top of the original content. The page receives a fresh content stream;
//! the old streams stay in the document until garbage collection on save.
//!
//! A form XObject with something removed is copied, and only this page's
//! `Do` is pointed at the copy, so other pages drawing the same form keep
//! it intact.

use std::collections::{HashMap, HashSet};

use log::debug;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::content::{GlyphBox, PageContent, StreamSource, XObjectKind, PAGE_STREAM};
use crate::error::Result;
use crate::model::Rect;
use crate::page::resources::{page_resources, resolve_dict, resource_category};

use super::options::Rgb;

/// A page area to clear, optionally painted over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Redaction {
    pub rect: Rect,
    pub fill: Option<Rgb>,
}

impl Redaction {
    pub fn new(rect: Rect, fill: Option<Rgb>) -> Self {
        Self { rect, fill }
    }

    /// An element is covered when the centre of its box lies inside the area.
    pub fn covers(&self, rect: &Rect) -> bool {
        let (x, y) = rect.center();
        self.rect.contains_point(x, y)
    }
}

/// What a redaction pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedactionOutcome {
    pub glyphs_removed: usize,
    pub images_removed: usize,
    /// Form XObjects copied for this page.
    pub forms_rewritten: usize,
}

/// An operator position: stream index and operation index.
type OpKey = (usize, usize);

#[derive(Default)]
struct Edits<'c> {
    glyphs: HashMap<OpKey, (&'c [GlyphBox], Vec<bool>)>,
    dropped: HashSet<OpKey>,
    /// `Do` operators redirected to a rewritten form copy.
    renamed: HashMap<OpKey, String>,
}

/// Apply redactions to one page.
///
/// Draws of the image streams in `drop_images` are removed wherever they
/// are placed, including inside forms.
pub fn apply_redactions(
    doc: &mut Document,
    page_id: ObjectId,
    redactions: &[Redaction],
    drop_images: &HashSet<ObjectId>,
) -> Result<RedactionOutcome> {
    if redactions.is_empty() && drop_images.is_empty() {
        return Ok(RedactionOutcome::default());
    }

    let content = PageContent::load(doc, page_id)?;
    let covered = |rect: &Rect| redactions.iter().any(|r| r.covers(rect));

    let mut outcome = RedactionOutcome::default();
    let mut edits = Edits::default();

    for run in &content.text_runs {
        let flags: Vec<bool> = run.glyphs.iter().map(|g| covered(&g.rect)).collect();
        let count = flags.iter().filter(|&&f| f).count();
        if count > 0 {
            outcome.glyphs_removed += count;
            edits
                .glyphs
                .insert((run.stream, run.op_index), (run.glyphs.as_slice(), flags));
        }
    }

    edits.dropped = content
        .xobjects
        .iter()
        .filter(|d| d.kind == XObjectKind::Image)
        .filter(|d| d.target.is_some_and(|id| drop_images.contains(&id)) || covered(&d.rect))
        .map(|d| (d.stream, d.op_index))
        .collect();
    outcome.images_removed = edits.dropped.len();

    let mut dirty = vec![false; content.streams.len()];
    for &(stream, _) in edits.glyphs.keys().chain(edits.dropped.iter()) {
        dirty[stream] = true;
    }
    for index in (1..content.streams.len()).rev() {
        if let StreamSource::Form { parent, .. } = content.streams[index].source {
            if dirty[index] {
                dirty[parent] = true;
            }
        }
    }

    let fills: Vec<&Redaction> = redactions.iter().filter(|r| r.fill.is_some()).collect();
    if !dirty[PAGE_STREAM] && fills.is_empty() {
        return Ok(outcome);
    }

    // Children come after their parents, so walking backwards rewrites every
    // form before the stream that draws it.
    let mut added: HashMap<usize, Vec<(String, ObjectId)>> = HashMap::new();
    for index in (1..content.streams.len()).rev() {
        let StreamSource::Form { id, parent, op_index } = content.streams[index].source else {
            continue;
        };
        if !dirty[index] {
            continue;
        }

        let operations = rewrite_operations(index, &content.streams[index].operations, &edits);
        let mut dict = doc.get_object(id).and_then(Object::as_stream)?.dict.clone();
        dict.remove(b"Filter");
        dict.remove(b"DecodeParms");
        if let Some(children) = added.remove(&index) {
            let resources = effective_resources(doc, &content, index);
            dict.set("Resources", with_xobjects(doc, resources, &children));
        }
        let encoded = Content { operations }.encode()?;
        let copy_id = doc.add_object(Stream::new(dict, encoded));

        let original = content.streams[parent]
            .operations
            .get(op_index)
            .and_then(|op| op.operands.first())
            .and_then(|name| name.as_name().ok())
            .map(|name| String::from_utf8_lossy(name).to_string())
            .unwrap_or_else(|| "Fm".to_string());
        let name = format!("{}R{}", original, copy_id.0);
        debug!("Page {:?}: form {:?} rewritten as {:?} /{}", page_id, id, copy_id, name);

        edits.renamed.insert((parent, op_index), name.clone());
        added.entry(parent).or_default().push((name, copy_id));
        outcome.forms_rewritten += 1;
    }

    let page_ops = rewrite_operations(PAGE_STREAM, content.operations(), &edits);
    let mut operations = wrap_balanced(page_ops);

    for redaction in &fills {
        if let Some([r, g, b]) = redaction.fill {
            let rect = redaction.rect;
            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
            operations.push(Operation::new(
                "re",
                vec![
                    rect.x0.into(),
                    rect.y0.into(),
                    rect.width().into(),
                    rect.height().into(),
                ],
            ));
            operations.push(Operation::new("f", vec![]));
            operations.push(Operation::new("Q", vec![]));
        }
    }

    let resources = added.remove(&PAGE_STREAM).map(|children| {
        let resources = page_resources(doc, page_id).cloned().unwrap_or_default();
        with_xobjects(doc, resources, &children)
    });

    let encoded = Content { operations }.encode()?;
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), encoded));
    let page = doc.get_dictionary_mut(page_id)?;
    page.set("Contents", Object::Reference(stream_id));
    if let Some(resources) = resources {
        page.set("Resources", resources);
    }

    debug!(
        "Page {:?}: removed {} glyphs, {} image draws, rewrote {} forms, painted {} fills",
        page_id,
        outcome.glyphs_removed,
        outcome.images_removed,
        outcome.forms_rewritten,
        fills.len()
    );
    Ok(outcome)
}

/// Copy one stream's operations, applying the edits that belong to it.
fn rewrite_operations(stream: usize, operations: &[Operation], edits: &Edits) -> Vec<Operation> {
    let mut out = Vec::with_capacity(operations.len());
    for (index, op) in operations.iter().enumerate() {
        let key = (stream, index);
        if edits.dropped.contains(&key) {
            continue;
        }
        if let Some(name) = edits.renamed.get(&key) {
            out.push(Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]));
            continue;
        }
        match edits.glyphs.get(&key) {
            Some((glyphs, flags)) => rewrite_text_op(op, glyphs, flags, &mut out),
            None => out.push(op.clone()),
        }
    }
    out
}

/// Wrap page operations in `q … Q`.
///
/// Stray `Q`s get matching `q`s in front and unclosed `q`s are closed at
/// the end, so the wrapper state is restored exactly once.
fn wrap_balanced(operations: Vec<Operation>) -> Vec<Operation> {
    let mut depth: i64 = 0;
    let mut lowest: i64 = 0;
    for op in &operations {
        match op.operator.as_str() {
            "q" => depth += 1,
            "Q" => {
                depth -= 1;
                lowest = lowest.min(depth);
            }
            _ => {}
        }
    }
    let open = 1 - lowest;
    let close = open + depth;

    let mut wrapped = Vec::with_capacity(operations.len() + (open + close) as usize);
    wrapped.extend((0..open).map(|_| Operation::new("q", vec![])));
    wrapped.extend(operations);
    wrapped.extend((0..close).map(|_| Operation::new("Q", vec![])));
    wrapped
}

/// The resources a stream resolves names against, as an owned copy.
fn effective_resources(doc: &Document, content: &PageContent, mut index: usize) -> Dictionary {
    loop {
        match content.streams[index].source {
            StreamSource::Page => {
                return page_resources(doc, content.page_id).cloned().unwrap_or_default();
            }
            StreamSource::Form { id, parent, .. } => {
                let own = doc
                    .get_object(id)
                    .and_then(Object::as_stream)
                    .ok()
                    .and_then(|form| form.dict.get(b"Resources").ok())
                    .and_then(|r| resolve_dict(doc, r));
                if let Some(resources) = own {
                    return resources.clone();
                }
                index = parent;
            }
        }
    }
}

/// Add XObject entries to a resource dictionary, inlining `/XObject` so
/// shared resource objects stay untouched.
fn with_xobjects(doc: &Document, mut resources: Dictionary, entries: &[(String, ObjectId)]) -> Dictionary {
    let mut xobjects = resource_category(doc, &resources, b"XObject")
        .cloned()
        .unwrap_or_default();
    for (name, id) in entries {
        xobjects.set(name.as_bytes().to_vec(), Object::Reference(*id));
    }
    resources.set("XObject", xobjects);
    resources
}

/// Emit the replacement for a text-showing operator with some glyphs removed.
fn rewrite_text_op(op: &Operation, glyphs: &[GlyphBox], removed: &[bool], out: &mut Vec<Operation>) {
    let for_element = |element: usize| -> Vec<(&GlyphBox, bool)> {
        glyphs
            .iter()
            .zip(removed.iter().copied())
            .filter(|(g, _)| g.element == element)
            .collect()
    };

    let items = match op.operator.as_str() {
        "Tj" | "'" => match op.operands.first() {
            Some(Object::String(bytes, format)) => rebuild_string(bytes, *format, &for_element(0)),
            _ => return out.push(op.clone()),
        },
        "\"" => match op.operands.get(2) {
            Some(Object::String(bytes, format)) => rebuild_string(bytes, *format, &for_element(2)),
            _ => return out.push(op.clone()),
        },
        "TJ" => match op.operands.first() {
            Some(Object::Array(elements)) => {
                let mut items = Vec::new();
                for (i, element) in elements.iter().enumerate() {
                    match element {
                        Object::String(bytes, format) => {
                            push_items(&mut items, rebuild_string(bytes, *format, &for_element(i)))
                        }
                        other => push_items(&mut items, vec![other.clone()]),
                    }
                }
                items
            }
            _ => return out.push(op.clone()),
        },
        _ => return out.push(op.clone()),
    };

    match op.operator.as_str() {
        "'" => out.push(Operation::new("T*", vec![])),
        "\"" => {
            out.push(Operation::new("Tw", vec![op.operands[0].clone()]));
            out.push(Operation::new("Tc", vec![op.operands[1].clone()]));
            out.push(Operation::new("T*", vec![]));
        }
        _ => {}
    }
    out.push(Operation::new("TJ", vec![Object::Array(items)]));
}

/// Split a string operand into kept substrings and kerning for removed glyphs.
fn rebuild_string(bytes: &[u8], format: StringFormat, glyphs: &[(&GlyphBox, bool)]) -> Vec<Object> {
    let mut items = Vec::new();
    let mut kept: Vec<u8> = Vec::new();
    let mut kerning = 0.0f32;

    for (glyph, removed) in glyphs {
        let Some(chunk) = bytes.get(glyph.bytes.clone()) else {
            continue;
        };
        if *removed {
            if !kept.is_empty() {
                items.push(Object::String(std::mem::take(&mut kept), format));
            }
            kerning += glyph.adjust;
        } else {
            if kerning != 0.0 {
                items.push(Object::Real(kerning));
                kerning = 0.0;
            }
            kept.extend_from_slice(chunk);
        }
    }
    if !kept.is_empty() {
        items.push(Object::String(kept, format));
    }
    if kerning != 0.0 {
        items.push(Object::Real(kerning));
    }
    items
}

/// Append items, merging adjacent kerning numbers.
fn push_items(items: &mut Vec<Object>, new: Vec<Object>) {
    for item in new {
        let n = match &item {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        };
        if let (Some(n), Some(last)) = (n, items.last_mut()) {
            let merged = match last {
                Object::Integer(i) => Some(*i as f32 + n),
                Object::Real(r) => Some(*r + n),
                _ => None,
            };
            if let Some(merged) = merged {
                *last = Object::Real(merged);
                continue;
            }
        }
        items.push(item);
    }
}
