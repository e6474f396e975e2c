//! Content stream interpretation.
//!
//! Walks a page's operations while tracking the graphics and text state,
//! and records where each glyph and each XObject lands in page space.
//! Form XObjects are interpreted in place, so glyphs and images they draw
//! are recorded like the page's own, tagged with the stream that owns them.
//! The result owns its data so that callers can mutate the document
//! afterwards.

use std::collections::HashMap;
use std::ops::Range;

use log::{debug, warn};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::Result;
use crate::model::{get_number, Matrix, Rect};
use crate::page::resources::{page_resources, resolve_array, resolve_dict, resource_category};

use super::font::PageFont;

/// Guard against unbalanced `q` in broken content streams.
const MAX_STATE_DEPTH: usize = 256;

/// Forms nested deeper than this are not interpreted.
const MAX_FORM_DEPTH: usize = 12;

/// Index of the page's own content in [`PageContent::streams`].
pub const PAGE_STREAM: usize = 0;

/// One character code shown by a text operator.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphBox {
    /// Operand position holding the string: the array index for `TJ`, else 0.
    pub element: usize,
    /// Byte range of the code inside that string.
    pub bytes: Range<usize>,
    /// Decoded text (may be empty or several chars for ligatures).
    pub text: String,
    /// Glyph box in page space.
    pub rect: Rect,
    /// `TJ` number that advances the pen exactly as this glyph does.
    pub adjust: f32,
}

/// Glyphs shown by one text operator (`Tj`, `TJ`, `'`, `"`).
#[derive(Debug, Clone)]
pub struct TextRun {
    /// Index into [`PageContent::streams`].
    pub stream: usize,
    pub op_index: usize,
    pub glyphs: Vec<GlyphBox>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XObjectKind {
    Image,
    Form,
    Other,
}

/// One `Do` operator.
#[derive(Debug, Clone)]
pub struct XObjectDraw {
    /// Index into [`PageContent::streams`].
    pub stream: usize,
    pub op_index: usize,
    pub name: String,
    pub kind: XObjectKind,
    pub rect: Rect,
    /// The XObject stream, when the resource entry is a reference.
    pub target: Option<ObjectId>,
}

/// Where a content stream comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    /// The page's `/Contents`.
    Page,
    /// A form XObject drawn by the `Do` at `op_index` of stream `parent`.
    Form {
        id: ObjectId,
        parent: usize,
        op_index: usize,
    },
}

/// Decoded operations of one content stream.
#[derive(Debug, Clone)]
pub struct ContentStream {
    pub source: StreamSource,
    pub operations: Vec<Operation>,
}

/// Interpreted page content.
///
/// `streams[PAGE_STREAM]` is the page content; every form drawn from it
/// (directly or nested) follows, once per `Do`, parents before children.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub page_id: ObjectId,
    pub streams: Vec<ContentStream>,
    pub text_runs: Vec<TextRun>,
    pub xobjects: Vec<XObjectDraw>,
}

impl PageContent {
    /// Decode and interpret the content streams of a page.
    pub fn load(doc: &Document, page_id: ObjectId) -> Result<Self> {
        let data = doc.get_page_content(page_id)?;
        let operations = Content::decode(&data)?.operations;
        Ok(Self::interpret(doc, page_id, operations))
    }

    /// Interpret already decoded operations against a page's resources.
    pub fn interpret(doc: &Document, page_id: ObjectId, operations: Vec<Operation>) -> Self {
        let resources = page_resources(doc, page_id);
        let mut interpreter = Interpreter::new(doc, resources);
        interpreter.streams.push(ContentStream {
            source: StreamSource::Page,
            operations: Vec::new(),
        });
        interpreter.run(PAGE_STREAM, &operations);
        interpreter.streams[PAGE_STREAM].operations = operations;
        debug!(
            "Page {:?}: {} text runs, {} XObject draws, {} form(s)",
            page_id,
            interpreter.text_runs.len(),
            interpreter.xobjects.len(),
            interpreter.streams.len() - 1
        );
        Self {
            page_id,
            streams: interpreter.streams,
            text_runs: interpreter.text_runs,
            xobjects: interpreter.xobjects,
        }
    }

    /// Operations of the page content itself.
    pub fn operations(&self) -> &[Operation] {
        &self.streams[PAGE_STREAM].operations
    }

    /// All glyphs in content order.
    pub fn glyphs(&self) -> impl Iterator<Item = &GlyphBox> {
        self.text_runs.iter().flat_map(|run| run.glyphs.iter())
    }

    /// Plain page text in content order, without layout.
    pub fn raw_text(&self) -> String {
        self.glyphs().map(|g| g.text.as_str()).collect()
    }
}

/// State saved by `q` and restored by `Q`.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    char_spacing: f32,
    word_spacing: f32,
    /// `Tz` / 100
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
    /// Stream whose resources define the font, and its resource name.
    font: Option<(usize, Vec<u8>)>,
    font_size: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            font: None,
            font_size: 0.0,
        }
    }
}

/// Resource categories a stream looks names up in.
#[derive(Debug, Clone, Copy, Default)]
struct Scope<'a> {
    fonts: Option<&'a Dictionary>,
    xobjects: Option<&'a Dictionary>,
}

impl<'a> Scope<'a> {
    fn new(doc: &'a Document, resources: Option<&'a Dictionary>) -> Self {
        Self {
            fonts: resources.and_then(|r| resource_category(doc, r, b"Font")),
            xobjects: resources.and_then(|r| resource_category(doc, r, b"XObject")),
        }
    }
}

struct Interpreter<'a> {
    doc: &'a Document,
    /// One scope per entry of `streams`.
    scopes: Vec<Scope<'a>>,
    streams: Vec<ContentStream>,
    current: usize,
    /// Forms being interpreted, outermost first.
    form_chain: Vec<ObjectId>,
    font_cache: HashMap<(usize, Vec<u8>), PageFont<'a>>,
    fallback_font: PageFont<'a>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    text_runs: Vec<TextRun>,
    xobjects: Vec<XObjectDraw>,
}

impl<'a> Interpreter<'a> {
    fn new(doc: &'a Document, resources: Option<&'a Dictionary>) -> Self {
        Self {
            doc,
            scopes: vec![Scope::new(doc, resources)],
            streams: Vec::new(),
            current: PAGE_STREAM,
            form_chain: Vec::new(),
            font_cache: HashMap::new(),
            fallback_font: PageFont::fallback(),
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            text_runs: Vec::new(),
            xobjects: Vec::new(),
        }
    }

    fn run(&mut self, stream: usize, operations: &[Operation]) {
        let outer = self.current;
        self.current = stream;
        for (index, op) in operations.iter().enumerate() {
            self.execute(index, op);
        }
        self.current = outer;
    }

    fn execute(&mut self, index: usize, op: &Operation) {
        let operands = &op.operands;
        let num = |i: usize| operands.get(i).and_then(get_number);

        match op.operator.as_str() {
            "q" => {
                if self.stack.len() < MAX_STATE_DEPTH {
                    self.stack.push(self.state.clone());
                }
            }
            "Q" => {
                if let Some(state) = self.stack.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.state.ctm = m.concat(&self.state.ctm);
                }
            }
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "Tc" => self.state.char_spacing = num(0).unwrap_or(0.0),
            "Tw" => self.state.word_spacing = num(0).unwrap_or(0.0),
            "Tz" => self.state.horizontal_scale = num(0).unwrap_or(100.0) / 100.0,
            "TL" => self.state.leading = num(0).unwrap_or(0.0),
            "Ts" => self.state.rise = num(0).unwrap_or(0.0),
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.load_font(name);
                    self.state.font = Some((self.current, name.clone()));
                }
                self.state.font_size = num(1).unwrap_or(0.0);
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.state.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let glyphs = self.show(0, bytes);
                    self.push_run(index, glyphs);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let glyphs = self.show(0, bytes);
                    self.push_run(index, glyphs);
                }
            }
            "\"" => {
                self.state.word_spacing = num(0).unwrap_or(self.state.word_spacing);
                self.state.char_spacing = num(1).unwrap_or(self.state.char_spacing);
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    let glyphs = self.show(2, bytes);
                    self.push_run(index, glyphs);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let mut glyphs = Vec::new();
                    for (element, item) in items.iter().enumerate() {
                        match item {
                            Object::String(bytes, _) => glyphs.extend(self.show(element, bytes)),
                            other => {
                                if let Some(n) = get_number(other) {
                                    let tx = -n / 1000.0
                                        * self.state.font_size
                                        * self.state.horizontal_scale;
                                    self.advance(tx);
                                }
                            }
                        }
                    }
                    self.push_run(index, glyphs);
                }
            }
            "Do" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.record_xobject(index, name);
                }
            }
            "BI" | "ID" | "EI" => warn!("Inline images are not tracked"),
            _ => {}
        }
    }

    fn load_font(&mut self, name: &[u8]) {
        let key = (self.current, name.to_vec());
        if self.font_cache.contains_key(&key) {
            return;
        }
        let doc = self.doc;
        let font = self.scopes[self.current]
            .fonts
            .and_then(|fonts| fonts.get(name).ok())
            .and_then(|obj| doc.dereference(obj).ok())
            .and_then(|(_, obj)| obj.as_dict().ok());
        match font {
            Some(dict) => {
                self.font_cache.insert(key, PageFont::load(doc, dict));
            }
            None => warn!("Font /{} not found in resources", String::from_utf8_lossy(name)),
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).concat(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.state.leading);
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix = Matrix::translation(tx, 0.0).concat(&self.text_matrix);
    }

    fn push_run(&mut self, op_index: usize, glyphs: Vec<GlyphBox>) {
        if !glyphs.is_empty() {
            self.text_runs.push(TextRun {
                stream: self.current,
                op_index,
                glyphs,
            });
        }
    }

    /// Place every code of a string operand and advance the text matrix.
    fn show(&mut self, element: usize, bytes: &[u8]) -> Vec<GlyphBox> {
        let font = self
            .state
            .font
            .as_ref()
            .and_then(|key| self.font_cache.get(key))
            .unwrap_or(&self.fallback_font);

        let size = self.state.font_size;
        let th = self.state.horizontal_scale;
        let tc = self.state.char_spacing;
        let tw = self.state.word_spacing;
        let ctm = self.state.ctm;
        let font_to_text = Matrix::new(size * th, 0.0, 0.0, size, 0.0, self.state.rise);
        let metrics = &font.metrics;

        let mut text_matrix = self.text_matrix;
        let mut glyphs = Vec::new();
        let mut offset = 0;

        for (code, chunk) in font.codes(bytes) {
            let w0 = metrics.width(code);
            let trm = font_to_text.concat(&text_matrix).concat(&ctm);
            let rect = trm.transform_rect(&Rect::new(0.0, metrics.descent, w0, metrics.ascent));

            let spacing = if metrics.code_len == 1 && code == 32 {
                tc + tw
            } else {
                tc
            };
            let adjust = if size != 0.0 {
                -(w0 * 1000.0 + spacing * 1000.0 / size)
            } else {
                -(w0 * 1000.0)
            };

            glyphs.push(GlyphBox {
                element,
                bytes: offset..offset + chunk.len(),
                text: font.decode(code, chunk),
                rect,
                adjust,
            });

            let tx = (w0 * size + spacing) * th;
            text_matrix = Matrix::translation(tx, 0.0).concat(&text_matrix);
            offset += chunk.len();
        }

        self.text_matrix = text_matrix;
        glyphs
    }

    fn record_xobject(&mut self, op_index: usize, name: &[u8]) {
        let doc = self.doc;
        let entry = self.scopes[self.current]
            .xobjects
            .and_then(|xobjects| xobjects.get(name).ok());
        let target = entry.and_then(|obj| obj.as_reference().ok());
        let stream = entry
            .and_then(|obj| doc.dereference(obj).ok())
            .and_then(|(_, obj)| obj.as_stream().ok());

        let ctm = self.state.ctm;
        let unit = Rect::new(0.0, 0.0, 1.0, 1.0);
        let mut form = None;
        let (kind, rect) = match stream {
            Some(s) => match s.dict.get(b"Subtype").and_then(Object::as_name) {
                Ok(b"Image") => (XObjectKind::Image, ctm.transform_rect(&unit)),
                Ok(b"Form") => {
                    let bbox = s
                        .dict
                        .get(b"BBox")
                        .ok()
                        .and_then(|b| resolve_array(doc, b))
                        .and_then(|b| Rect::from_pdf_array(b))
                        .unwrap_or(unit);
                    let matrix = s
                        .dict
                        .get(b"Matrix")
                        .ok()
                        .and_then(|m| resolve_array(doc, m))
                        .and_then(|m| Matrix::from_operands(m))
                        .unwrap_or_default();
                    form = target.map(|id| (id, s, matrix));
                    (
                        XObjectKind::Form,
                        matrix.concat(&ctm).transform_rect(&bbox),
                    )
                }
                _ => (XObjectKind::Other, ctm.transform_rect(&unit)),
            },
            None => {
                warn!("XObject /{} not found in resources", String::from_utf8_lossy(name));
                (XObjectKind::Other, ctm.transform_rect(&unit))
            }
        };

        self.xobjects.push(XObjectDraw {
            stream: self.current,
            op_index,
            name: String::from_utf8_lossy(name).to_string(),
            kind,
            rect,
            target,
        });

        if let Some((id, stream, matrix)) = form {
            self.enter_form(op_index, id, stream, matrix);
        }
    }

    /// Interpret a form's content with its own resources and `matrix`
    /// applied on top of the current CTM.
    fn enter_form(&mut self, op_index: usize, id: ObjectId, form: &'a Stream, matrix: Matrix) {
        if self.form_chain.contains(&id) {
            warn!("Form {:?} draws itself, not descending", id);
            return;
        }
        if self.form_chain.len() >= MAX_FORM_DEPTH {
            warn!("Forms nested deeper than {}, not descending into {:?}", MAX_FORM_DEPTH, id);
            return;
        }
        let operations = match form
            .get_plain_content()
            .and_then(|data| Content::decode(&data))
        {
            Ok(content) => content.operations,
            Err(e) => {
                warn!("Cannot decode form {:?}: {}", id, e);
                return;
            }
        };

        let doc = self.doc;
        let scope = match form.dict.get(b"Resources").ok().and_then(|r| resolve_dict(doc, r)) {
            Some(resources) => Scope::new(doc, Some(resources)),
            None => self.scopes[self.current],
        };
        let index = self.streams.len();
        self.streams.push(ContentStream {
            source: StreamSource::Form {
                id,
                parent: self.current,
                op_index,
            },
            operations: Vec::new(),
        });
        self.scopes.push(scope);

        let saved_state = self.state.clone();
        let saved_stack = std::mem::take(&mut self.stack);
        let (text_matrix, line_matrix) = (self.text_matrix, self.line_matrix);
        self.state.ctm = matrix.concat(&self.state.ctm);
        self.form_chain.push(id);

        self.run(index, &operations);

        self.form_chain.pop();
        self.state = saved_state;
        self.stack = saved_stack;
        self.text_matrix = text_matrix;
        self.line_matrix = line_matrix;
        self.streams[index].operations = operations;
    }
}
