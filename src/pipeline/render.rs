//! Page rasterisation behind the [`PageRasterizer`] seam.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with thread-local state and CPU-heavy rendering.
//! Callers run [`PageRasterizer::rasterize`] inside
//! `tokio::task::spawn_blocking` (see [`crate::pipeline::pages`]) so the
//! Tokio workers never stall on a large page.
//!
//! ## One surface per page
//!
//! [`PdfiumRasterizer`] opens the document, renders a single page and drops
//! everything before returning. Peak memory is one page bitmap regardless of
//! document length.

use crate::error::{PageError, ToolkitError};
use crate::pipeline::engine::bind_pdfium;
use crate::pipeline::load::{PageSize, SourceDocument};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// A rendered page, alive only between rasterisation and encoding.
pub struct PageBitmap {
    pub image: DynamicImage,
    /// Displayed geometry of the source page in points.
    pub page_size: PageSize,
}

impl PageBitmap {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Pixel dimensions of a page rendered at `scale`.
///
/// `size` is the displayed size (CropBox, then `/Rotate`), which is what
/// pdfium's `scale_page_by_factor` renders.
pub fn target_dimensions(size: PageSize, scale: f32) -> (u32, u32) {
    let w = (size.width * scale).ceil().max(1.0) as u32;
    let h = (size.height * scale).ceil().max(1.0) as u32;
    (w, h)
}

/// Turns one page of a loaded document into pixels.
pub trait PageRasterizer: Send + Sync {
    /// Render the 0-indexed page at `scale` (1.0 = one pixel per point).
    fn rasterize(
        &self,
        doc: &SourceDocument,
        page_index: usize,
        scale: f32,
    ) -> Result<PageBitmap, PageError>;

    /// Fail fast before the page loop if the backend cannot work at all.
    fn ensure_ready(&self) -> Result<(), ToolkitError> {
        Ok(())
    }
}

/// Default rasteriser backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }
}

/// pdfium addresses pages with a `u16`; larger indices must not wrap.
fn pdfium_page_index(page_index: usize) -> Result<u16, PageError> {
    u16::try_from(page_index).map_err(|_| PageError::RenderFailed {
        page: page_index + 1,
        detail: format!("page index {page_index} exceeds pdfium's page range"),
    })
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        doc: &SourceDocument,
        page_index: usize,
        scale: f32,
    ) -> Result<PageBitmap, PageError> {
        let page_num = page_index + 1;
        let fail = |detail: String| PageError::RenderFailed {
            page: page_num,
            detail,
        };

        let page_size = doc
            .page_size(page_index)
            .ok_or_else(|| fail(format!("page out of range (total={})", doc.page_count())))?;

        let pdfium = bind_pdfium(self.library_path.as_deref()).map_err(|e| fail(e.to_string()))?;
        let document = pdfium
            .load_pdf_from_byte_slice(doc.bytes(), None)
            .map_err(|e| fail(format!("{:?}", e)))?;

        let page = document
            .pages()
            .get(pdfium_page_index(page_index)?)
            .map_err(|e| fail(format!("{:?}", e)))?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| fail(format!("{:?}", e)))?;

        let image = DynamicImage::ImageRgb8(bitmap.as_image().to_rgb8());
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );

        Ok(PageBitmap { image, page_size })
    }

    fn ensure_ready(&self) -> Result<(), ToolkitError> {
        bind_pdfium(self.library_path.as_deref()).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_dimensions_round_up() {
        let letter = PageSize {
            width: 612.0,
            height: 792.0,
        };
        assert_eq!(target_dimensions(letter, 1.5), (918, 1188));

        let odd = PageSize {
            width: 100.5,
            height: 33.3,
        };
        assert_eq!(target_dimensions(odd, 1.5), (151, 50));
    }

    #[test]
    fn page_index_beyond_u16_is_an_error() {
        assert_eq!(pdfium_page_index(0).unwrap(), 0);
        assert_eq!(pdfium_page_index(65_535).unwrap(), u16::MAX);
        let err = pdfium_page_index(65_536).unwrap_err();
        assert_eq!(err.page(), 65_537);
        assert!(matches!(err, PageError::RenderFailed { .. }));
    }

    #[test]
    fn rotated_size_renders_landscape() {
        let turned = PageSize {
            width: 792.0,
            height: 612.0,
        };
        assert_eq!(target_dimensions(turned, 1.5), (1188, 918));
    }

    #[test]
    fn target_dimensions_never_zero() {
        let tiny = PageSize {
            width: 0.1,
            height: 0.1,
        };
        assert_eq!(target_dimensions(tiny, 0.0), (1, 1));
    }
}
