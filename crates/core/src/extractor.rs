use crate::error::IngestError;
use lopdf::Document;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let document = Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        // A document whose pages are all blank is still a valid document;
        // it extracts to the empty string and stages as an empty text file.
        Ok(pages)
    }
}

/// Full document text: every page's text concatenated in page order, with no
/// separator inserted between pages.
pub fn extract_document_text(
    extractor: &dyn PdfExtractor,
    path: &Path,
) -> Result<String, IngestError> {
    let pages = extractor.extract_pages(path)?;

    let mut text = String::new();
    for page in pages {
        text.push_str(&page.text);
    }

    Ok(text)
}
