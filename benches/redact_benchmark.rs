//! Benchmarks for unwatermark removal performance.
//!
//! Run with: cargo bench
//!
//! These benchmarks build synthetic documents with a footer watermark on
//! every page and measure interpretation and redaction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Creates a synthetic PDF with `page_count` pages of body text plus a
/// "Downloaded from" footer and a footer link on every page.
fn create_test_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids = Vec::new();
    for i in 0..page_count {
        let mut operations = Vec::new();
        for line in 0..40 {
            let text = format!("Page {} line {} - benchmark body text for redaction.", i + 1, line);
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
            operations.push(Operation::new("Td", vec![72.into(), (740 - line * 16).into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), 8.into()]));
        operations.push(Operation::new("Td", vec![72.into(), 30.into()]));
        operations.push(Operation::new("Tj", vec![Object::string_literal("Downloaded from ebooks.example")]));
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations }.encode().unwrap();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let annot_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => vec![72.into(), 25.into(), 250.into(), 40.into()],
            "A" => dictionary! { "S" => "URI", "URI" => Object::string_literal("https://ebooks.example") },
        });
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            "Annots" => vec![Object::Reference(annot_id)],
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Benchmark PDF header detection.
fn bench_header_detection(c: &mut Criterion) {
    let pdf_data = create_test_pdf(1);
    let non_pdf_data = b"Not a PDF file at all, just random text content";

    c.bench_function("detect_valid_pdf", |b| {
        b.iter(|| unwatermark::detect_header_from_bytes(black_box(&pdf_data)).is_ok());
    });

    c.bench_function("detect_non_pdf", |b| {
        b.iter(|| unwatermark::detect_header_from_bytes(black_box(non_pdf_data)).is_err());
    });
}

/// Benchmark pattern removal at various sizes.
fn bench_pattern_removal(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_removal");

    for page_count in [1, 5, 20].iter() {
        let data = create_test_pdf(*page_count);

        group.bench_function(format!("{}_pages", page_count), |b| {
            b.iter(|| {
                let Ok(mut editor) = unwatermark::PdfEditor::from_bytes(black_box(&data)) else {
                    return;
                };
                let _ = editor.remove_pattern(r"Downloaded from \S+", false);
            });
        });
    }

    group.finish();
}

/// Benchmark the full link, pattern and save pipeline.
fn bench_full_pipeline(c: &mut Criterion) {
    let data = create_test_pdf(10);
    let builder = unwatermark::Unwatermark::new()
        .with_link("https://ebooks.example")
        .with_pattern(r"Downloaded from \S+");

    c.bench_function("full_pipeline_10_pages", |b| {
        b.iter(|| {
            let _ = builder.process_bytes(black_box(&data));
        });
    });
}

criterion_group!(benches, bench_header_detection, bench_pattern_removal, bench_full_pipeline);
criterion_main!(benches);
