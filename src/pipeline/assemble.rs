//! DocumentAssembler: build output PDFs with lopdf.
//!
//! Two shapes of output:
//!
//! * [`merge_documents`] copies pages verbatim from several sources into one
//!   page tree. Nothing is rasterised; text and vector content survive.
//! * [`ImageDocumentBuilder`] creates a fresh document where every page is a
//!   single full-bleed JPEG, used by compress.

use crate::error::ToolkitError;
use crate::pipeline::encode::EncodedImage;
use crate::pipeline::load::{inherited_attribute, PageSize, SourceDocument};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};

/// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

const OUTPUT_VERSION: &str = "1.5";

fn failure(detail: impl Into<String>) -> ToolkitError {
    ToolkitError::PipelineFailure {
        detail: detail.into(),
    }
}

/// Concatenate the pages of `docs`, in list order then page order.
///
/// Any document that fails to parse aborts the whole merge.
pub fn merge_documents(docs: &[SourceDocument]) -> Result<Vec<u8>, ToolkitError> {
    let mut version = OUTPUT_VERSION.to_string();
    let mut max_id: u32 = 1;
    let mut pages: Vec<(ObjectId, Object)> = Vec::new();
    let mut document = Document::with_version(OUTPUT_VERSION);

    for source in docs {
        let mut doc = source
            .parse()
            .map_err(|e| failure(format!("failed to read '{}': {}", source.name(), e)))?;
        if doc.version > version {
            version = doc.version.clone();
        }

        // Pages lose their parent tree below, so inherited values must live
        // on the page itself first.
        materialize_inherited(&mut doc);

        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        debug!(name = source.name(), pages = page_ids.len(), "copying pages");
        for page_id in page_ids {
            let page = doc
                .get_object(page_id)
                .map_err(|e| failure(format!("'{}': {}", source.name(), e)))?;
            pages.push((page_id, page.clone()));
        }

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    document.objects.insert(object_id, object);
                }
            }
        }
    }

    document.version = version;
    document.max_id = max_id;
    let pages_id = document.new_object_id();

    let mut kids = Vec::with_capacity(pages.len());
    for (page_id, object) in pages {
        let Object::Dictionary(mut dict) = object else {
            return Err(failure(format!("page {page_id:?} is not a dictionary")));
        };
        dict.set("Parent", pages_id);
        document.objects.insert(page_id, Object::Dictionary(dict));
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len();
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    document.prune_objects();
    document.renumber_objects();

    let mut out = Vec::new();
    document
        .save_to(&mut out)
        .map_err(|e| failure(format!("failed to serialise merged PDF: {e}")))?;

    info!(
        documents = docs.len(),
        pages = page_count,
        bytes = out.len(),
        "merged documents"
    );
    Ok(out)
}

fn materialize_inherited(doc: &mut Document) {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in page_ids {
        let missing: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter_map(|&key| {
                let own = doc
                    .get_dictionary(page_id)
                    .map(|d| d.has(key))
                    .unwrap_or(false);
                if own {
                    return None;
                }
                inherited_attribute(doc, page_id, key).map(|v| (key, v))
            })
            .collect();

        if missing.is_empty() {
            continue;
        }
        if let Ok(dict) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            for (key, value) in missing {
                dict.set(key, value);
            }
        }
    }
}

/// Builds a PDF where each page shows one JPEG.
pub struct ImageDocumentBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Default for ImageDocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageDocumentBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version(OUTPUT_VERSION);
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append a page of `size` points showing `image` stretched to fill it.
    pub fn add_page(&mut self, image: &EncodedImage, size: PageSize) -> Result<(), ToolkitError> {
        let xobject = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => image.color_space(),
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            image.bytes.clone(),
        )
        .with_compression(false);
        let image_id = self.doc.add_object(xobject);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(size.width),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(size.height),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| failure(format!("failed to encode page content: {e}")))?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(size.width),
                Object::Real(size.height),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    /// Serialise the document. Fails when no page was added.
    pub fn finish(mut self) -> Result<Vec<u8>, ToolkitError> {
        if self.kids.is_empty() {
            return Err(failure("cannot build a PDF without pages"));
        }
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| failure(format!("failed to serialise PDF: {e}")))?;
        Ok(out)
    }
}
