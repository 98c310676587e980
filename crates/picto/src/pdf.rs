//! PDF page loading.

use std::path::Path;

use crate::types::{GuidePage, PictoError, PictoResult};

/// Loads a document into ordered pages of text.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> PictoResult<Vec<GuidePage>>;
}

/// Extracts per-page text from PDF files with `lopdf`.
#[derive(Debug, Clone, Default)]
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> PictoResult<Vec<GuidePage>> {
        if !path.exists() {
            return Err(PictoError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("PDF not found: {}", path.display()),
            )));
        }

        let doc = lopdf::Document::load(path)
            .map_err(|e| PictoError::Pdf(format!("Failed to open {}: {e}", path.display())))?;

        let source = path.display().to_string();
        let mut pages = Vec::new();

        // get_pages() is keyed by one-based page number, in order.
        for (number, _) in doc.get_pages() {
            let text = doc.extract_text(&[number]).map_err(|e| {
                PictoError::Pdf(format!("Failed to read page {number} of {source}: {e}"))
            })?;

            if text.trim().is_empty() {
                tracing::debug!("Skipping blank page {number} of {source}");
                continue;
            }
            pages.push(GuidePage::new(text.trim().to_string(), source.clone(), number - 1));
        }

        tracing::info!("Loaded {} pages from {source}", pages.len());
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_io_error() {
        let err = PdfLoader.load(Path::new("/nonexistent/guide.pdf")).unwrap_err();
        assert!(matches!(err, PictoError::Io(_)));
    }

    #[test]
    fn test_garbage_file_is_pdf_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();
        let err = PdfLoader.load(&path).unwrap_err();
        assert!(matches!(err, PictoError::Pdf(_)));
    }

    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, ObjectId, Stream};

    /// Write a PDF with one page per entry; `None` is a page with no text.
    fn write_pdf(path: &Path, pages: &[Option<&str>]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let mut operations = vec![Operation::new("BT", vec![])];
            if let Some(text) = text {
                operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
                operations.push(Operation::new("Td", vec![72.into(), 720.into()]));
                operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            }
            operations.push(Operation::new("ET", vec![]));

            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id: ObjectId = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
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
        doc.save(path).unwrap();
    }

    #[test]
    fn test_loads_text_pages_with_zero_based_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.pdf");
        write_pdf(
            &path,
            &[
                Some("Keep the horizon level"),
                None,
                Some("Shoot portraits in soft light"),
            ],
        );

        let pages = PdfLoader.load(&path).unwrap();
        assert_eq!(pages.len(), 2);

        assert_eq!(pages[0].metadata.page, 0);
        assert!(pages[0].content.contains("horizon"), "got: {}", pages[0].content);
        assert_eq!(pages[1].metadata.page, 2);
        assert!(pages[1].content.contains("portraits"), "got: {}", pages[1].content);

        let source = path.display().to_string();
        assert!(pages.iter().all(|p| p.metadata.source == source));
    }
}
