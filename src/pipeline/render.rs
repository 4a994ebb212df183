//! PDF rasterisation: render the leading pages of a PDF to PNG via pdfium.
//!
//! pdfium is a blocking C++ library, so all work runs inside
//! `tokio::task::spawn_blocking`. The caller still awaits the result; files
//! are processed one at a time.
//!
//! The library is bound per call, either from an explicit path
//! (`PDFIUM_LIB_PATH`) or from the system search path. A missing library is a
//! per-file [`FileError::PdfRender`], so a batch of images and text still runs
//! on a machine without pdfium.

use super::classify::PagePng;
use super::encode::encode_png;
use crate::config::AnalyzerConfig;
use crate::error::FileError;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
struct RenderSettings {
    scale: f32,
    max_pixels: u32,
    max_pages: usize,
}

/// Rasterise up to `config.max_pdf_pages` leading pages of a PDF.
///
/// A document with zero pages is an error: there is nothing to analyse.
pub async fn render_pages(pdf_path: &Path, config: &AnalyzerConfig) -> Result<Vec<PagePng>, FileError> {
    let path = pdf_path.to_path_buf();
    let library = config.pdfium_library.clone();
    let settings = RenderSettings {
        scale: config.pdf_scale,
        max_pixels: config.max_rendered_pixels,
        max_pages: config.max_pdf_pages,
    };
    let name = display_name(pdf_path);

    tokio::task::spawn_blocking(move || render_pages_blocking(&path, library.as_deref(), settings))
        .await
        .map_err(|e| FileError::PdfRender {
            name,
            detail: format!("render task panicked: {e}"),
        })?
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, String> {
    let bindings = match library {
        Some(path) => Pdfium::bind_to_library(path)
            .map_err(|e| format!("cannot load pdfium from {}: {e}", path.display()))?,
        None => Pdfium::bind_to_system_library()
            .map_err(|e| format!("pdfium library not available: {e}"))?,
    };
    Ok(Pdfium::new(bindings))
}

fn render_pages_blocking(
    pdf_path: &Path,
    library: Option<&Path>,
    settings: RenderSettings,
) -> Result<Vec<PagePng>, FileError> {
    let name = display_name(pdf_path);
    let fail = |detail: String| FileError::PdfRender {
        name: name.clone(),
        detail,
    };

    let pdfium = bind_pdfium(library).map_err(&fail)?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| fail(format!("cannot open document: {e}")))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages == 0 {
        return Err(fail("document has no pages".to_string()));
    }
    let count = total_pages.min(settings.max_pages);
    info!("PDF {} loaded: {} pages, rendering {}", name, total_pages, count);

    let max_px = settings.max_pixels as i32;
    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(settings.scale)
        .set_maximum_width(max_px)
        .set_maximum_height(max_px);

    let mut rendered = Vec::with_capacity(count);
    for idx in 0..count {
        let page = pages
            .get(idx as u16)
            .map_err(|e| fail(format!("page {}: {e}", idx + 1)))?;
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| fail(format!("page {}: {e}", idx + 1)))?;
        let image = bitmap.as_image();
        let png = encode_png(&image).map_err(|e| fail(format!("page {}: {e}", idx + 1)))?;
        debug!(
            "Rendered page {} → {}x{} px, {} bytes PNG",
            idx + 1,
            image.width(),
            image.height(),
            png.len()
        );
        rendered.push(PagePng { page: idx + 1, png });
    }

    Ok(rendered)
}

/// Which pdfium library a render would bind, for startup logs.
pub fn describe_library(config: &AnalyzerConfig) -> String {
    match &config.pdfium_library {
        Some(p) => p.display().to_string(),
        None => "system library".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_library(path: &str) -> AnalyzerConfig {
        AnalyzerConfig::builder()
            .project_id("p")
            .region("r")
            .pdfium_library(path)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn unloadable_library_is_a_per_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();

        let config = config_with_library("/nonexistent/libpdfium.so");
        let err = render_pages(&pdf, &config).await.unwrap_err();
        match err {
            FileError::PdfRender { name, detail } => {
                assert_eq!(name, "doc.pdf");
                assert!(detail.contains("cannot load pdfium"), "got: {detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn library_description() {
        assert_eq!(describe_library(&config_with_library("/opt/libpdfium.so")), "/opt/libpdfium.so");
    }
}
