use super::ExtractionError;
use async_trait::async_trait;
use pdfium_render::prelude::*;

/// Optical recognition over a document's rendered pages.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Render up to `max_pages` pages and recognize each one, returning
    /// per-page text in page order.
    async fn recognize(&self, bytes: &[u8], max_pages: usize)
        -> Result<Vec<String>, ExtractionError>;
}

/// Render width for recognition rasters. Wide enough for body text in a
/// scanned book page.
const RENDER_TARGET_WIDTH: i32 = 1600;

/// Production engine: pdfium renders each page to a raster and tesseract
/// recognizes it. Both run on the blocking pool; pdfium is bound from the
/// system library per call so a missing install surfaces as a recognition
/// error, not a process-wide failure.
pub struct PdfiumTesseractOcr;

#[async_trait]
impl OcrEngine for PdfiumTesseractOcr {
    async fn recognize(
        &self,
        bytes: &[u8],
        max_pages: usize,
    ) -> Result<Vec<String>, ExtractionError> {
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || recognize_blocking(&bytes, max_pages))
            .await
            .map_err(|e| ExtractionError::Recognition(format!("recognition task failed: {e}")))?
    }
}

fn recognize_blocking(bytes: &[u8], max_pages: usize) -> Result<Vec<String>, ExtractionError> {
    let bindings = Pdfium::bind_to_system_library()
        .map_err(|e| ExtractionError::Recognition(format!("pdfium unavailable: {e}")))?;
    let pdfium = Pdfium::new(bindings);

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| ExtractionError::Recognition(format!("document failed to load: {e}")))?;

    let render_config = PdfRenderConfig::new().set_target_width(RENDER_TARGET_WIDTH);
    let workdir = tempfile::tempdir()
        .map_err(|e| ExtractionError::Recognition(format!("temp dir unavailable: {e}")))?;

    let mut pages_text = Vec::new();
    for (index, page) in document.pages().iter().enumerate() {
        if index >= max_pages {
            tracing::debug!(max_pages, "recognition page budget reached");
            break;
        }

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ExtractionError::Recognition(format!("page {index} failed to render: {e}"))
        })?;

        let raster_path = workdir.path().join(format!("page-{index:03}.png"));
        bitmap.as_image().save(&raster_path).map_err(|e| {
            ExtractionError::Recognition(format!("page {index} raster not written: {e}"))
        })?;

        let image = rusty_tesseract::Image::from_path(raster_path).map_err(|e| {
            ExtractionError::Recognition(format!("page {index} raster not readable: {e}"))
        })?;
        let text = rusty_tesseract::image_to_string(&image, &rusty_tesseract::Args::default())
            .map_err(|e| {
                ExtractionError::Recognition(format!("page {index} recognition failed: {e}"))
            })?;

        pages_text.push(text.trim().to_string());
    }

    Ok(pages_text)
}
