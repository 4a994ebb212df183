//! Input classification and loading.
//!
//! The MIME type guessed from the file extension picks one of three loaders:
//! images are read and decoded once to validate them, text is decoded as
//! UTF-8, PDFs are rasterised page by page. Every failure is a [`FileError`]
//! for that file alone.

use super::render;
use crate::config::AnalyzerConfig;
use crate::error::FileError;
use std::path::Path;
use tracing::{debug, info};

/// File extensions picked up by batch runs (lower case, no dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp", "txt", "pdf"];

/// Broad content class of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Image,
    Text,
    Pdf,
}

/// One rendered PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePng {
    /// 1-based page number.
    pub page: usize,
    pub png: Vec<u8>,
}

/// File content ready to be turned into request parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedContent {
    Image { mime_type: String, bytes: Vec<u8> },
    Text(String),
    PdfPages(Vec<PagePng>),
}

impl LoadedContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            LoadedContent::Image { .. } => ContentKind::Image,
            LoadedContent::Text(_) => ContentKind::Text,
            LoadedContent::PdfPages(_) => ContentKind::Pdf,
        }
    }
}

/// Result of loading an input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Content(LoadedContent),
    /// A text file with no non-whitespace content. No remote call is made.
    EmptyText,
}

fn kind_for_mime(mime: &mime_guess::Mime) -> Option<ContentKind> {
    match (mime.type_().as_str(), mime.subtype().as_str()) {
        ("image", _) => Some(ContentKind::Image),
        ("text", _) => Some(ContentKind::Text),
        ("application", "pdf") => Some(ContentKind::Pdf),
        _ => None,
    }
}

/// Content kind implied by the file extension, `None` when unsupported.
pub fn detect_kind(path: &Path) -> Option<ContentKind> {
    mime_guess::from_path(path)
        .first()
        .as_ref()
        .and_then(kind_for_mime)
}

/// Whether a batch run should pick up this file.
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load a file for analysis.
pub async fn load(path: &Path, config: &AnalyzerConfig) -> Result<Classification, FileError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        _ => return Err(FileError::NotFound),
    }

    let mime_name = mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    info!("Detected MIME type {} for {}", mime_name, path.display());

    let name = display_name(path);
    match detect_kind(path) {
        None => Err(FileError::UnsupportedType { mime: mime_name }),
        Some(ContentKind::Image) => load_image(path, name).await,
        Some(ContentKind::Text) => load_text(path, name).await,
        Some(ContentKind::Pdf) => {
            let pages = render::render_pages(path, config).await?;
            Ok(Classification::Content(LoadedContent::PdfPages(pages)))
        }
    }
}

async fn load_image(path: &Path, name: String) -> Result<Classification, FileError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| FileError::ImageLoad {
        name: name.clone(),
        detail: e.to_string(),
    })?;
    let format = image::guess_format(&bytes).map_err(|e| FileError::ImageLoad {
        name: name.clone(),
        detail: e.to_string(),
    })?;
    let decoded = image::load_from_memory_with_format(&bytes, format).map_err(|e| {
        FileError::ImageLoad {
            name: name.clone(),
            detail: e.to_string(),
        }
    })?;
    debug!(
        "Image {} is {:?}, {}x{} px",
        name,
        format,
        decoded.width(),
        decoded.height()
    );
    Ok(Classification::Content(LoadedContent::Image {
        mime_type: format.to_mime_type().to_string(),
        bytes,
    }))
}

async fn load_text(path: &Path, name: String) -> Result<Classification, FileError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| FileError::TextRead {
        name: name.clone(),
        detail: e.to_string(),
    })?;
    let text = String::from_utf8(bytes).map_err(|e| FileError::TextRead {
        name,
        detail: e.to_string(),
    })?;
    let text = if text.starts_with('\u{feff}') {
        text['\u{feff}'.len_utf8()..].to_string()
    } else {
        text
    };
    if text.trim().is_empty() {
        return Ok(Classification::EmptyText);
    }
    debug!("Read {} chars of text", text.chars().count());
    Ok(Classification::Content(LoadedContent::Text(text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::path::PathBuf;

    fn config() -> AnalyzerConfig {
        AnalyzerConfig::builder().project_id("p").region("r").build().unwrap()
    }

    #[test]
    fn kinds_by_extension() {
        assert_eq!(detect_kind(Path::new("a.PNG")), Some(ContentKind::Image));
        assert_eq!(detect_kind(Path::new("a.jpeg")), Some(ContentKind::Image));
        assert_eq!(detect_kind(Path::new("notes.txt")), Some(ContentKind::Text));
        assert_eq!(detect_kind(Path::new("report.pdf")), Some(ContentKind::Pdf));
        assert_eq!(detect_kind(Path::new("archive.zip")), None);
        assert_eq!(detect_kind(Path::new("noext")), None);
    }

    #[test]
    fn batch_extension_filter() {
        assert!(has_supported_extension(Path::new("x/Photo.JPG")));
        assert!(has_supported_extension(Path::new("doc.pdf")));
        assert!(!has_supported_extension(Path::new("page.html")));
        assert!(!has_supported_extension(Path::new("README")));
    }

    #[tokio::test]
    async fn missing_file() {
        let err = load(&PathBuf::from("/nonexistent/file.txt"), &config())
            .await
            .unwrap_err();
        assert_eq!(err, FileError::NotFound);
    }

    #[tokio::test]
    async fn unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xyz");
        std::fs::write(&path, b"???").unwrap();
        let err = load(&path, &config()).await.unwrap_err();
        assert!(matches!(err, FileError::UnsupportedType { .. }));
        assert!(err.to_string().starts_with("Unsupported file type"));
    }

    #[tokio::test]
    async fn text_and_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let full = dir.path().join("a.txt");
        let empty = dir.path().join("b.txt");
        let blank = dir.path().join("c.txt");
        std::fs::write(&full, "hello").unwrap();
        std::fs::write(&empty, "").unwrap();
        std::fs::write(&blank, " \n\t\n").unwrap();

        assert_eq!(
            load(&full, &config()).await.unwrap(),
            Classification::Content(LoadedContent::Text("hello".into()))
        );
        assert_eq!(load(&empty, &config()).await.unwrap(), Classification::EmptyText);
        assert_eq!(load(&blank, &config()).await.unwrap(), Classification::EmptyText);
    }

    #[tokio::test]
    async fn invalid_utf8_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();
        let err = load(&path, &config()).await.unwrap_err();
        assert_eq!(err.to_string(), "Could not read text file bad.txt.");
    }

    #[tokio::test]
    async fn valid_and_corrupt_images() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("dot.png");
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([0, 0, 255])))
            .save(&good)
            .unwrap();
        match load(&good, &config()).await.unwrap() {
            Classification::Content(LoadedContent::Image { mime_type, bytes }) => {
                assert_eq!(mime_type, "image/png");
                assert!(!bytes.is_empty());
            }
            other => panic!("unexpected: {other:?}"),
        }

        let bad = dir.path().join("broken.jpg");
        std::fs::write(&bad, b"not a jpeg").unwrap();
        let err = load(&bad, &config()).await.unwrap_err();
        assert_eq!(err.to_string(), "Could not load image file broken.jpg.");
    }
}
