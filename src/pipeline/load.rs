//! SourceLoader: parse PDF bytes into a [`SourceDocument`].
//!
//! Loading is cheap relative to rasterisation, so a document is parsed once
//! here to validate it and read page geometry, then re-parsed by whichever
//! stage needs the object graph. Only the raw bytes are kept.

use crate::error::ToolkitError;
use crate::pipeline::input::AcceptedFile;
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// US Letter, used when no MediaBox can be found.
pub const DEFAULT_PAGE_SIZE: PageSize = PageSize {
    width: 612.0,
    height: 792.0,
};

/// Page-tree depth after which inheritance lookups give up.
const MAX_TREE_DEPTH: usize = 64;

/// Displayed page dimensions in PDF points (1/72 inch), after the CropBox
/// and `/Rotate` are applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// A loaded, validated PDF. Cloning shares the underlying bytes.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    name: String,
    bytes: Arc<[u8]>,
    page_sizes: Vec<PageSize>,
    version: String,
}

impl SourceDocument {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte_len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn page_count(&self) -> usize {
        self.page_sizes.len()
    }

    /// Size of the 0-indexed page, if it exists.
    pub fn page_size(&self, page_index: usize) -> Option<PageSize> {
        self.page_sizes.get(page_index).copied()
    }

    pub fn page_sizes(&self) -> &[PageSize] {
        &self.page_sizes
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Parse the object graph again.
    pub(crate) fn parse(&self) -> Result<Document, ToolkitError> {
        parse_bytes(&self.name, &self.bytes)
    }

    pub fn info(&self) -> DocumentInfo {
        DocumentInfo {
            name: self.name.clone(),
            bytes: self.byte_len(),
            pages: self.page_count(),
            version: self.version.clone(),
            page_sizes: self.page_sizes.clone(),
        }
    }
}

impl TryFrom<AcceptedFile> for SourceDocument {
    type Error = ToolkitError;

    fn try_from(file: AcceptedFile) -> Result<Self, Self::Error> {
        load_document(file.name, file.bytes)
    }
}

/// Summary of a loaded document, as printed by `pdftools inspect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub name: String,
    pub bytes: u64,
    pub pages: usize,
    pub version: String,
    pub page_sizes: Vec<PageSize>,
}

/// Validate and load a PDF.
///
/// # Errors
/// [`ToolkitError::InvalidFormat`] when the bytes are not a PDF, cannot be
/// parsed, or need a non-empty password.
pub fn load_document(
    name: impl Into<String>,
    bytes: impl Into<Arc<[u8]>>,
) -> Result<SourceDocument, ToolkitError> {
    let name = name.into();
    let bytes: Arc<[u8]> = bytes.into();

    if !bytes.starts_with(b"%PDF") {
        let head = &bytes[..bytes.len().min(4)];
        return Err(ToolkitError::InvalidFormat {
            name,
            detail: format!("missing %PDF header (starts with {:?})", head),
        });
    }

    let doc = parse_bytes(&name, &bytes)?;
    let page_sizes: Vec<PageSize> = doc
        .get_pages()
        .values()
        .map(|&page_id| page_size(&doc, page_id))
        .collect();

    if page_sizes.is_empty() {
        return Err(ToolkitError::InvalidFormat {
            name,
            detail: "document has no pages".into(),
        });
    }

    info!(
        name = %name,
        pages = page_sizes.len(),
        bytes = bytes.len(),
        version = %doc.version,
        "PDF loaded"
    );

    Ok(SourceDocument {
        name,
        version: doc.version.clone(),
        bytes,
        page_sizes,
    })
}

fn parse_bytes(name: &str, bytes: &[u8]) -> Result<Document, ToolkitError> {
    let doc = Document::load_mem(bytes).map_err(|e| ToolkitError::InvalidFormat {
        name: name.to_string(),
        detail: match e {
            lopdf::Error::Decryption(_) => {
                "password protected documents are not supported".to_string()
            }
            other => other.to_string(),
        },
    })?;

    // lopdf opens documents encrypted with an empty user password on its
    // own; anything else leaves an unreadable page tree behind.
    if doc.is_encrypted() && doc.catalog().is_err() {
        return Err(ToolkitError::InvalidFormat {
            name: name.to_string(),
            detail: "password protected documents are not supported".into(),
        });
    }
    if doc.is_encrypted() {
        debug!(name, "opened encrypted document with the empty password");
    }
    Ok(doc)
}

/// Look up a page attribute, following `/Parent` links for inherited values.
pub(crate) fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut dict: &Dictionary = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        let parent = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Displayed size of a page: the CropBox clipped to the MediaBox, turned
/// by `/Rotate`. This is the view pdfium renders.
fn page_size(doc: &Document, page_id: ObjectId) -> PageSize {
    let media = inherited_attribute(doc, page_id, b"MediaBox").and_then(|b| Rect::read(doc, &b));
    let Some(media) = media else {
        return DEFAULT_PAGE_SIZE;
    };
    let visible = inherited_attribute(doc, page_id, b"CropBox")
        .and_then(|b| Rect::read(doc, &b))
        .and_then(|crop| crop.intersect(&media))
        .unwrap_or(media);

    let (width, height) = (visible.width(), visible.height());
    if matches!(rotation(doc, page_id), 90 | 270) {
        PageSize {
            width: height,
            height: width,
        }
    } else {
        PageSize { width, height }
    }
}

/// `/Rotate` normalised into `0..360`. Non-multiples of 90 count as 0.
fn rotation(doc: &Document, page_id: ObjectId) -> i64 {
    let degrees = inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|r| resolve(doc, &r).and_then(|o| o.as_i64().ok()))
        .unwrap_or(0)
        .rem_euclid(360);
    if degrees % 90 == 0 {
        degrees
    } else {
        0
    }
}

/// A normalised PDF rectangle (lower-left, upper-right).
#[derive(Debug, Clone, Copy)]
struct Rect {
    llx: f32,
    lly: f32,
    urx: f32,
    ury: f32,
}

impl Rect {
    fn read(doc: &Document, object: &Object) -> Option<Rect> {
        let array = resolve(doc, object)?.as_array().ok()?;
        if array.len() != 4 {
            return None;
        }
        let mut c = [0f32; 4];
        for (slot, value) in c.iter_mut().zip(array) {
            *slot = number(resolve(doc, value)?)?;
        }
        let rect = Rect {
            llx: c[0].min(c[2]),
            lly: c[1].min(c[3]),
            urx: c[0].max(c[2]),
            ury: c[1].max(c[3]),
        };
        (rect.width() > 0.0 && rect.height() > 0.0).then_some(rect)
    }

    fn intersect(&self, other: &Rect) -> Option<Rect> {
        let rect = Rect {
            llx: self.llx.max(other.llx),
            lly: self.lly.max(other.lly),
            urx: self.urx.min(other.urx),
            ury: self.ury.min(other.ury),
        };
        (rect.width() > 0.0 && rect.height() > 0.0).then_some(rect)
    }

    fn width(&self) -> f32 {
        self.urx - self.llx
    }

    fn height(&self) -> f32 {
        self.ury - self.lly
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};

    fn pdf_with_pages(sizes: &[Option<(i64, i64)>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();
        for size in sizes {
            let content = Content {
                operations: vec![Operation::new("q", vec![]), Operation::new("Q", vec![])],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            };
            if let Some((w, h)) = size {
                page.set("MediaBox", vec![0.into(), 0.into(), (*w).into(), (*h).into()]);
            }
            kids.push(doc.add_object(page).into());
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => sizes.len() as i64,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn reads_page_count_and_sizes() {
        let bytes = pdf_with_pages(&[Some((300, 400)), None]);
        let doc = load_document("t.pdf", bytes).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(
            doc.page_size(0),
            Some(PageSize {
                width: 300.0,
                height: 400.0
            })
        );
        // Second page inherits the A4 MediaBox from the page tree node.
        assert_eq!(
            doc.page_size(1),
            Some(PageSize {
                width: 595.0,
                height: 842.0
            })
        );
        assert_eq!(doc.version(), "1.5");
    }

    fn letter_page_with(entries: Vec<(&str, Object)>) -> SourceDocument {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        for (key, value) in entries {
            page.set(key, value);
        }
        let page_id = doc.add_object(page);
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        load_document("page.pdf", out).unwrap()
    }

    fn size(width: f32, height: f32) -> Option<PageSize> {
        Some(PageSize { width, height })
    }

    #[test]
    fn quarter_rotation_swaps_width_and_height() {
        let turned = letter_page_with(vec![("Rotate", 90.into())]);
        assert_eq!(turned.page_size(0), size(792.0, 612.0));

        let turned_back = letter_page_with(vec![("Rotate", (-270).into())]);
        assert_eq!(turned_back.page_size(0), size(792.0, 612.0));

        let upside_down = letter_page_with(vec![("Rotate", 180.into())]);
        assert_eq!(upside_down.page_size(0), size(612.0, 792.0));
    }

    #[test]
    fn crop_box_limits_the_visible_area() {
        let cropped = letter_page_with(vec![(
            "CropBox",
            Object::Array(vec![0.into(), 0.into(), 300.into(), 300.into()]),
        )]);
        assert_eq!(cropped.page_size(0), size(300.0, 300.0));

        // Clipped to the MediaBox.
        let overhanging = letter_page_with(vec![(
            "CropBox",
            Object::Array(vec![500.into(), 700.into(), 900.into(), 900.into()]),
        )]);
        assert_eq!(overhanging.page_size(0), size(112.0, 92.0));

        // A CropBox outside the MediaBox is ignored.
        let disjoint = letter_page_with(vec![(
            "CropBox",
            Object::Array(vec![700.into(), 800.into(), 900.into(), 900.into()]),
        )]);
        assert_eq!(disjoint.page_size(0), size(612.0, 792.0));
    }

    #[test]
    fn crop_and_rotation_combine() {
        let doc = letter_page_with(vec![
            ("CropBox", Object::Array(vec![0.into(), 0.into(), 200.into(), 100.into()])),
            ("Rotate", 270.into()),
        ]);
        assert_eq!(doc.page_size(0), size(100.0, 200.0));
    }

    #[test]
    fn rejects_non_pdf_bytes() {
        let err = load_document("x.pdf", b"PK\x03\x04zip".to_vec()).unwrap_err();
        match err {
            ToolkitError::InvalidFormat { detail, .. } => assert!(detail.contains("%PDF")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_truncated_pdf() {
        let err = load_document("broken.pdf", b"%PDF-1.7\n%garbage".to_vec()).unwrap_err();
        assert!(matches!(err, ToolkitError::InvalidFormat { .. }));
    }

    #[test]
    fn clones_share_bytes() {
        let doc = load_document("t.pdf", pdf_with_pages(&[Some((10, 10))])).unwrap();
        let copy = doc.clone();
        assert!(std::ptr::eq(doc.bytes().as_ptr(), copy.bytes().as_ptr()));
    }

    #[test]
    fn info_is_serialisable() {
        let doc = load_document("t.pdf", pdf_with_pages(&[Some((10, 20))])).unwrap();
        let json = serde_json::to_value(doc.info()).unwrap();
        assert_eq!(json["pages"], 1);
        assert_eq!(json["name"], "t.pdf");
    }
}
