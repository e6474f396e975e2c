//! In-memory PDF fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pixels {
    Gray,
    Rgb,
    Cmyk,
    /// Raw bytes tagged with a filter this crate cannot decode.
    Jpx,
}

#[derive(Debug, Clone)]
pub struct ImageSpec {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Pixels,
    /// x, y, w, h on the page.
    pub at: [f32; 4],
}

/// A form XObject drawn on the page, holding a line of text and/or an image.
#[derive(Debug, Clone)]
pub struct StampSpec {
    pub name: String,
    /// Form origin on the page.
    pub at: [f32; 2],
    /// 12pt text with its baseline at the form origin.
    pub text: Option<String>,
    /// Image placed in form space.
    pub image: Option<ImageSpec>,
}

#[derive(Debug, Clone, Default)]
pub struct PageSpec {
    pub text: Vec<(f32, f32, String)>,
    pub links: Vec<(String, [f32; 4])>,
    pub images: Vec<ImageSpec>,
    pub stamps: Vec<StampSpec>,
}

impl PageSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// 12pt Helvetica text with its baseline at (x, y).
    pub fn text(mut self, x: f32, y: f32, text: &str) -> Self {
        self.text.push((x, y, text.to_string()));
        self
    }

    pub fn link(mut self, uri: &str, rect: [f32; 4]) -> Self {
        self.links.push((uri.to_string(), rect));
        self
    }

    pub fn image(mut self, name: &str, width: u32, height: u32, pixels: Pixels, at: [f32; 4]) -> Self {
        self.images.push(ImageSpec {
            name: name.to_string(),
            width,
            height,
            pixels,
            at,
        });
        self
    }

    /// Draw form `name` at (x, y). Stamps with the same name share one form.
    pub fn stamp(mut self, name: &str, at: [f32; 2], text: Option<&str>, image: Option<ImageSpec>) -> Self {
        self.stamps.push(StampSpec {
            name: name.to_string(),
            at,
            text: text.map(str::to_string),
            image,
        });
        self
    }
}

pub fn image_spec(name: &str, width: u32, height: u32, pixels: Pixels, at: [f32; 4]) -> ImageSpec {
    ImageSpec {
        name: name.to_string(),
        width,
        height,
        pixels,
        at,
    }
}

fn draw_image(operations: &mut Vec<Operation>, image: &ImageSpec) {
    let [x, y, w, h] = image.at;
    operations.push(Operation::new("q", vec![]));
    operations.push(Operation::new(
        "cm",
        vec![w.into(), 0.into(), 0.into(), h.into(), x.into(), y.into()],
    ));
    operations.push(Operation::new("Do", vec![Object::Name(image.name.as_bytes().to_vec())]));
    operations.push(Operation::new("Q", vec![]));
}

fn draw_text(operations: &mut Vec<Operation>, x: f32, y: f32, text: &str) {
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
    operations.push(Operation::new("Td", vec![x.into(), y.into()]));
    operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
    operations.push(Operation::new("ET", vec![]));
}

fn flate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn image_stream(spec: &ImageSpec) -> Stream {
    let pixels = (spec.width * spec.height) as usize;
    let (color_space, data, filter) = match spec.pixels {
        Pixels::Gray => ("DeviceGray", (0..pixels).map(|i| (i * 37 % 256) as u8).collect(), None),
        Pixels::Rgb => (
            "DeviceRGB",
            flate(&(0..pixels * 3).map(|i| (i * 11 % 256) as u8).collect::<Vec<_>>()),
            Some("FlateDecode"),
        ),
        Pixels::Cmyk => ("DeviceCMYK", [0u8, 255, 255, 0].repeat(pixels), None),
        Pixels::Jpx => ("DeviceRGB", vec![0xFF; 16], Some("JPXDecode")),
    };

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => spec.width as i64,
        "Height" => spec.height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    };
    if let Some(filter) = filter {
        dict.set("Filter", filter);
    }
    Stream::new(dict, data)
}

/// Build a document from page descriptions.
///
/// Images with the same name and size share one XObject across pages, and
/// stamps with the same name share one flate-compressed form.
pub fn build_pdf(pages: &[PageSpec]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
        "FirstChar" => 32,
        "Widths" => (32..127).map(|_| Object::Integer(500)).collect::<Vec<_>>(),
    });

    let mut shared: HashMap<(String, u32, u32), ObjectId> = HashMap::new();
    let mut forms: HashMap<String, ObjectId> = HashMap::new();
    let mut kids = Vec::new();

    for spec in pages {
        let mut operations = vec![Operation::new("q", vec![])];
        let mut xobjects = lopdf::Dictionary::new();

        for image in &spec.images {
            let key = (image.name.clone(), image.width, image.height);
            let id = match shared.get(&key) {
                Some(id) => *id,
                None => {
                    let id = doc.add_object(image_stream(image));
                    shared.insert(key, id);
                    id
                }
            };
            xobjects.set(image.name.as_bytes().to_vec(), id);
            draw_image(&mut operations, image);
        }

        for stamp in &spec.stamps {
            let id = match forms.get(&stamp.name) {
                Some(id) => *id,
                None => {
                    let mut form_ops = Vec::new();
                    let mut form_xobjects = lopdf::Dictionary::new();
                    if let Some(image) = &stamp.image {
                        let image_id = doc.add_object(image_stream(image));
                        form_xobjects.set(image.name.as_bytes().to_vec(), image_id);
                        draw_image(&mut form_ops, image);
                    }
                    if let Some(text) = &stamp.text {
                        draw_text(&mut form_ops, 0.0, 0.0, text);
                    }
                    let mut form = Stream::new(
                        dictionary! {
                            "Type" => "XObject",
                            "Subtype" => "Form",
                            "BBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                            "Resources" => dictionary! {
                                "Font" => dictionary! { "F1" => font_id },
                                "XObject" => form_xobjects,
                            },
                        },
                        flate(&Content { operations: form_ops }.encode().unwrap()),
                    );
                    form.dict.set("Filter", "FlateDecode");
                    let id = doc.add_object(form);
                    forms.insert(stamp.name.clone(), id);
                    id
                }
            };
            xobjects.set(stamp.name.as_bytes().to_vec(), id);
            let [x, y] = stamp.at;
            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new(
                "cm",
                vec![1.into(), 0.into(), 0.into(), 1.into(), x.into(), y.into()],
            ));
            operations.push(Operation::new("Do", vec![Object::Name(stamp.name.as_bytes().to_vec())]));
            operations.push(Operation::new("Q", vec![]));
        }

        for (x, y, text) in &spec.text {
            draw_text(&mut operations, *x, *y, text);
        }
        operations.push(Operation::new("Q", vec![]));

        let content = Content { operations }.encode().unwrap();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));

        let annots: Vec<Object> = spec
            .links
            .iter()
            .map(|(uri, [x0, y0, x1, y1])| {
                Object::Reference(doc.add_object(dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Link",
                    "Rect" => vec![(*x0).into(), (*y0).into(), (*x1).into(), (*y1).into()],
                    "Border" => vec![0.into(), 0.into(), 0.into()],
                    "A" => dictionary! {
                        "S" => "URI",
                        "URI" => Object::string_literal(uri.as_str()),
                    },
                }))
            })
            .collect();

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => xobjects,
            },
        };
        if !annots.is_empty() {
            page.set("Annots", annots);
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn pdf_bytes(pages: &[PageSpec]) -> Vec<u8> {
    let mut doc = build_pdf(pages);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

pub fn write_pdf(path: &Path, pages: &[PageSpec]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, pdf_bytes(pages)).unwrap();
}

/// A watermarked three-page book: every page carries a banner image and a
/// "Downloaded from" footer; pages 1 and 3 carry an ad link.
pub fn watermarked_book() -> Vec<PageSpec> {
    (1..=3)
        .map(|n| {
            let mut page = PageSpec::new()
                .text(72.0, 700.0, &format!("Chapter {}", n))
                .text(72.0, 40.0, "Downloaded from ebooks.example")
                .image("Im1", 4, 2, Pixels::Rgb, [200.0, 740.0, 200.0, 40.0])
                .image("Im2", 3, 3, Pixels::Gray, [72.0, 300.0, 90.0, 90.0]);
            if n != 2 {
                page = page.link("https://ads.example.com/", [400.0, 20.0, 560.0, 50.0]);
            }
            page.link("https://docs.example.org/", [300.0, 600.0, 400.0, 620.0])
        })
        .collect()
}

/// Two pages stamped with the same form: a "Downloaded from" line at
/// (72, 40) and a 480x201 banner drawn 240x100 at (300, 680) on the page.
pub fn stamped_book() -> Vec<PageSpec> {
    (1..=2)
        .map(|n| {
            PageSpec::new().text(72.0, 400.0, &format!("Chapter {}", n)).stamp(
                "Fm0",
                [72.0, 40.0],
                Some("Downloaded from ebooks.example"),
                Some(image_spec("Im0", 480, 201, Pixels::Gray, [228.0, 640.0, 240.0, 100.0])),
            )
        })
        .collect()
}
