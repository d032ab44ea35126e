//! The sequential per-page loop shared by compress and convert.
//!
//! Each page is rasterised and encoded inside one blocking task, and the
//! bitmap is dropped before that task returns. Only the encoded JPEG crosses
//! back to the async side, so at most one raw bitmap exists at a time.
//!
//! A failing page is logged, reported through
//! [`crate::progress::JobProgressCallback::on_page_skipped`] and left out.
//! The loop only fails when no page at all was produced.

use crate::config::{Quality, RENDER_SCALE};
use crate::error::{PageError, ToolkitError};
use crate::job::PipelineContext;
use crate::pipeline::encode::{EncodedImage, ImageEncoder};
use crate::pipeline::load::{PageSize, SourceDocument};
use crate::pipeline::render::PageRasterizer;
use std::sync::Arc;
use tracing::{debug, warn};

/// One page after encoding.
#[derive(Debug)]
pub struct RenderedPage {
    /// 1-indexed.
    pub page_num: usize,
    /// Size of the source page in points.
    pub size: PageSize,
    pub image: EncodedImage,
}

/// What happened across the whole loop.
#[derive(Debug, Default)]
pub struct PageTally {
    pub total: usize,
    pub written: usize,
    pub skipped: Vec<PageError>,
}

/// Rasterise and encode one page on the blocking pool.
pub async fn render_page(
    rasterizer: Arc<dyn PageRasterizer>,
    encoder: Arc<dyn ImageEncoder>,
    doc: SourceDocument,
    page_index: usize,
    quality: Quality,
) -> Result<RenderedPage, PageError> {
    let page_num = page_index + 1;

    tokio::task::spawn_blocking(move || {
        let bitmap = rasterizer.rasterize(&doc, page_index, RENDER_SCALE)?;
        let size = bitmap.page_size;
        let image = encoder
            .encode(&bitmap.image, quality)
            .map_err(|e| PageError::EncodeFailed {
                page: page_num,
                detail: e.to_string(),
            })?;
        drop(bitmap);
        Ok(RenderedPage {
            page_num,
            size,
            image,
        })
    })
    .await
    .map_err(|e| PageError::RenderFailed {
        page: page_num,
        detail: format!("page task panicked: {e}"),
    })?
}

/// Run every page of `doc` through [`render_page`], strictly in order.
///
/// `on_start` fires before each page, `on_page` receives each page that
/// made it. An error from `on_page` aborts the loop.
pub async fn for_each_page<S, F>(
    ctx: &PipelineContext,
    doc: &SourceDocument,
    quality: Quality,
    mut on_start: S,
    mut on_page: F,
) -> Result<PageTally, ToolkitError>
where
    S: FnMut(usize, usize) + Send,
    F: FnMut(RenderedPage) -> Result<(), ToolkitError> + Send,
{
    ctx.rasterizer.ensure_ready()?;

    let total = doc.page_count();
    let mut tally = PageTally {
        total,
        ..PageTally::default()
    };

    for page_index in 0..total {
        let page_num = page_index + 1;
        on_start(page_num, total);
        ctx.progress.on_page_start(page_num, total);

        let result = render_page(
            Arc::clone(&ctx.rasterizer),
            Arc::clone(&ctx.encoder),
            doc.clone(),
            page_index,
            quality,
        )
        .await;

        match result {
            Ok(page) => {
                let len = page.image.len();
                debug!(page = page_num, bytes = len, "page encoded");
                on_page(page)?;
                tally.written += 1;
                ctx.progress.on_page_complete(page_num, total, len);
            }
            Err(e) => {
                warn!("Skipping page {}/{}: {}", page_num, total, e);
                ctx.progress.on_page_skipped(page_num, total, &e.to_string());
                tally.skipped.push(e);
            }
        }
    }

    if tally.written == 0 {
        let first_error = tally
            .skipped
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(ToolkitError::NoPagesProduced { total, first_error });
    }
    Ok(tally)
}
