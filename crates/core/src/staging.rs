use crate::error::IngestError;
use crate::extractor::{extract_document_text, PdfExtractor};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

/// An uploaded file as handed over by the front end: the original name plus
/// the full byte content, read once.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Session-scoped home for every transient file the pipeline creates.
///
/// All materialized PDFs and staged text files live inside one temp
/// directory; dropping the registry removes them, so nothing outlives the
/// session.
pub struct TempFileRegistry {
    dir: TempDir,
}

impl TempFileRegistry {
    pub fn new() -> Result<Self, IngestError> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    pub fn base_path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `bytes` to a fresh file with an opaque uuid name and the given
    /// suffix. Names are never derived from upload filenames.
    pub fn write_file(&self, suffix: &str, bytes: &[u8]) -> Result<PathBuf, IngestError> {
        let path = self.dir.path().join(format!("{}{suffix}", Uuid::new_v4()));
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// Writes each uploaded blob to a `.pdf` temp file, preserving upload order.
/// The first write failure aborts the whole batch.
pub fn materialize_uploads(
    registry: &TempFileRegistry,
    uploads: &[UploadedFile],
) -> Result<Vec<PathBuf>, IngestError> {
    if uploads.is_empty() {
        return Err(IngestError::InvalidArgument(
            "upload batch is empty".to_string(),
        ));
    }

    let mut paths = Vec::with_capacity(uploads.len());
    for upload in uploads {
        paths.push(registry.write_file(".pdf", &upload.bytes)?);
    }

    Ok(paths)
}

/// Extracts each PDF's text and stages it as a UTF-8 `.txt` temp file, one
/// per input, same order. The first extraction or write error aborts the
/// batch so no partial index input is produced.
pub fn stage_text_files(
    registry: &TempFileRegistry,
    extractor: &dyn PdfExtractor,
    pdf_paths: &[PathBuf],
) -> Result<Vec<PathBuf>, IngestError> {
    let mut staged = Vec::with_capacity(pdf_paths.len());

    for path in pdf_paths {
        let text = extract_document_text(extractor, path)?;
        staged.push(registry.write_file(".txt", text.as_bytes())?);
    }

    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::{materialize_uploads, stage_text_files, TempFileRegistry, UploadedFile};
    use crate::error::IngestError;
    use crate::extractor::{PageText, PdfExtractor};
    use std::fs;
    use std::path::{Path, PathBuf};

    struct EchoPathExtractor;

    impl PdfExtractor for EchoPathExtractor {
        fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
            let bytes = fs::read(path)?;
            Ok(vec![PageText {
                number: 1,
                text: String::from_utf8_lossy(&bytes).to_string(),
            }])
        }
    }

    struct FailingExtractor;

    impl PdfExtractor for FailingExtractor {
        fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
            Err(IngestError::PdfParse(format!(
                "unreadable: {}",
                path.display()
            )))
        }
    }

    #[test]
    fn materialize_preserves_order_and_uses_pdf_suffix(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let registry = TempFileRegistry::new()?;
        let uploads = vec![
            UploadedFile::new("first.pdf", b"alpha".to_vec()),
            UploadedFile::new("second.pdf", b"beta".to_vec()),
        ];

        let paths = materialize_uploads(&registry, &uploads)?;

        assert_eq!(paths.len(), 2);
        assert_eq!(fs::read(&paths[0])?, b"alpha");
        assert_eq!(fs::read(&paths[1])?, b"beta");
        for path in &paths {
            assert_eq!(path.extension().and_then(|ext| ext.to_str()), Some("pdf"));
            assert!(!path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .contains("first"));
        }
        Ok(())
    }

    #[test]
    fn empty_batch_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let registry = TempFileRegistry::new()?;
        let result = materialize_uploads(&registry, &[]);
        assert!(matches!(result, Err(IngestError::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn staging_produces_one_txt_per_pdf_in_order() -> Result<(), Box<dyn std::error::Error>> {
        let registry = TempFileRegistry::new()?;
        let uploads = vec![
            UploadedFile::new("a.pdf", b"content a".to_vec()),
            UploadedFile::new("b.pdf", b"content b".to_vec()),
            UploadedFile::new("c.pdf", b"content c".to_vec()),
        ];

        let pdf_paths = materialize_uploads(&registry, &uploads)?;
        let staged = stage_text_files(&registry, &EchoPathExtractor, &pdf_paths)?;

        assert_eq!(staged.len(), pdf_paths.len());
        assert_eq!(fs::read_to_string(&staged[0])?, "content a");
        assert_eq!(fs::read_to_string(&staged[1])?, "content b");
        assert_eq!(fs::read_to_string(&staged[2])?, "content c");
        for path in &staged {
            assert_eq!(path.extension().and_then(|ext| ext.to_str()), Some("txt"));
        }
        Ok(())
    }

    #[test]
    fn first_extraction_error_aborts_the_batch() -> Result<(), Box<dyn std::error::Error>> {
        let registry = TempFileRegistry::new()?;
        let pdf_paths = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];

        let result = stage_text_files(&registry, &FailingExtractor, &pdf_paths);
        assert!(matches!(result, Err(IngestError::PdfParse(_))));
        Ok(())
    }

    #[test]
    fn dropping_the_registry_removes_its_files() -> Result<(), Box<dyn std::error::Error>> {
        let registry = TempFileRegistry::new()?;
        let path = registry.write_file(".pdf", b"transient")?;
        assert!(path.exists());

        drop(registry);
        assert!(!path.exists());
        Ok(())
    }
}
