//! Shared fixtures for the integration tests.
//!
//! PDFs are built with lopdf and pages are "rendered" by [`FakeRasterizer`],
//! so nothing here needs the pdfium shared library.

#![allow(dead_code)]

use image::{DynamicImage, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdf_toolbox::pipeline::load::DEFAULT_PAGE_SIZE;
use pdf_toolbox::pipeline::render::target_dimensions;
use pdf_toolbox::{
    load_document, JobMode, JobProgressCallback, PageBitmap, PageError, PageRasterizer,
    SourceDocument, ToolkitConfig,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Small page so the fake bitmaps stay cheap to encode.
pub const PAGE: (f32, f32) = (160.0, 120.0);

/// A PDF whose pages each show one text label, all `size` points large.
pub fn labelled_pdf(labels: &[&str], size: (f32, f32)) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for label in labels {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![20.into(), 60.into()]),
                Operation::new("Tj", vec![Object::string_literal(*label)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), size.0.into(), size.1.into()],
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => labels.len() as i64,
            "Resources" => resources_id,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// A PDF of blank `PAGE`-sized pages, each carrying extra dictionary
/// entries such as `/Rotate` or `/CropBox`.
pub fn pdf_with_page_entries(pages: Vec<Vec<(&str, Object)>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let count = pages.len() as i64;
    let mut kids: Vec<Object> = Vec::new();
    for entries in pages {
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE.0.into(), PAGE.1.into()],
        };
        for (key, value) in entries {
            page.set(key, value);
        }
        kids.push(doc.add_object(page).into());
    }
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

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Load a fixture with pages labelled `<prefix>-1`, `<prefix>-2`, …
pub fn fixture(prefix: &str, pages: usize) -> SourceDocument {
    let labels: Vec<String> = (1..=pages).map(|n| format!("{prefix}-{n}")).collect();
    let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    load_document(format!("{prefix}.pdf"), labelled_pdf(&refs, PAGE)).unwrap()
}

/// The text label of every page of `bytes`, in page order.
pub fn page_labels(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let raw = doc.get_page_content(page_id).unwrap();
            let content = Content::decode(&raw).unwrap();
            content
                .operations
                .iter()
                .find(|op| op.operator == "Tj")
                .and_then(|op| op.operands.first())
                .and_then(|o| o.as_str().ok())
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .unwrap_or_default()
        })
        .collect()
}

/// Deterministic noisy bitmap, so JPEG size actually tracks quality.
pub fn noise_image(width: u32, height: u32, seed: u32) -> DynamicImage {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let n = (state & 0x3f) as u8;
        Rgb([
            (x as u8).wrapping_add(n),
            (y as u8).wrapping_add(n / 2),
            n.wrapping_mul(3),
        ])
    }))
}

/// Rasteriser that paints noise instead of calling pdfium.
#[derive(Default)]
pub struct FakeRasterizer {
    failing_pages: HashSet<usize>,
    calls: AtomicUsize,
}

impl FakeRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the given 1-indexed pages.
    pub fn failing(pages: &[usize]) -> Self {
        Self {
            failing_pages: pages.iter().copied().collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageRasterizer for FakeRasterizer {
    fn rasterize(
        &self,
        doc: &SourceDocument,
        page_index: usize,
        scale: f32,
    ) -> Result<PageBitmap, PageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let page = page_index + 1;
        if self.failing_pages.contains(&page) {
            return Err(PageError::RenderFailed {
                page,
                detail: "synthetic render failure".into(),
            });
        }
        let page_size = doc.page_size(page_index).unwrap_or(DEFAULT_PAGE_SIZE);
        let (w, h) = target_dimensions(page_size, scale);
        Ok(PageBitmap {
            image: noise_image(w, h, page as u32),
            page_size,
        })
    }
}

/// Records every callback as a short string.
#[derive(Default)]
pub struct TrackingCallback {
    events: Mutex<Vec<String>>,
}

impl TrackingCallback {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl JobProgressCallback for TrackingCallback {
    fn on_job_start(&self, mode: JobMode, total_units: usize) {
        self.push(format!("start {mode} {total_units}"));
    }

    fn on_status(&self, message: &str) {
        self.push(format!("status {message}"));
    }

    fn on_page_start(&self, page_num: usize, total: usize) {
        self.push(format!("page_start {page_num}/{total}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, _encoded_len: usize) {
        self.push(format!("page_done {page_num}/{total}"));
    }

    fn on_page_skipped(&self, page_num: usize, total: usize, _error: &str) {
        self.push(format!("page_skipped {page_num}/{total}"));
    }

    fn on_job_complete(&self, mode: JobMode, total_units: usize, success_count: usize) {
        self.push(format!("complete {mode} {success_count}/{total_units}"));
    }
}

/// Config wired to a fake rasteriser and optional tracking callback.
pub fn config_with(
    rasterizer: Arc<FakeRasterizer>,
    progress: Option<Arc<TrackingCallback>>,
) -> ToolkitConfig {
    let mut builder = ToolkitConfig::builder().rasterizer(rasterizer);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().unwrap()
}
