use crate::embeddings::Embedder;
use crate::error::IndexError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

const INDEX_FILE_NAME: &str = "index.json";

/// One staged text file, embedded as a single document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub document_id: String,
    pub source_path: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub indexed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document_id: String,
    pub source_path: String,
    pub text: String,
    pub score: f64,
}

/// Index build policy. With `reuse` set, an existing persisted store under
/// `persist_dir` is loaded instead of re-embedding, and a freshly built store
/// is written back to that directory.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub reuse: bool,
    pub persist_dir: PathBuf,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            reuse: false,
            persist_dir: PathBuf::from("persist"),
        }
    }
}

impl IndexOptions {
    fn persisted_index_file(&self) -> PathBuf {
        self.persist_dir.join(INDEX_FILE_NAME)
    }

    pub fn has_persisted_index(&self) -> bool {
        self.reuse && self.persisted_index_file().is_file()
    }
}

/// In-memory nearest-neighbor store over embedded documents. Immutable for
/// the lifetime of a session once built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorStore {
    entries: Vec<DocumentEntry>,
}

impl VectorStore {
    pub fn insert(&mut self, entry: DocumentEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-k nearest documents by cosine similarity, highest score first.
    pub fn search(&self, query_vector: &[f32], top_k: usize) -> Vec<ScoredDocument> {
        let mut scored = self
            .entries
            .iter()
            .map(|entry| ScoredDocument {
                document_id: entry.document_id.clone(),
                source_path: entry.source_path.clone(),
                text: entry.text.clone(),
                score: cosine_similarity(&entry.embedding, query_vector),
            })
            .collect::<Vec<_>>();

        scored.sort_by(|left, right| right.score.total_cmp(&left.score));
        scored.truncate(top_k);
        scored
    }

    pub fn persist(&self, dir: &Path) -> Result<(), IndexError> {
        fs::create_dir_all(dir)?;
        let serialized = serde_json::to_vec(self)?;
        fs::write(dir.join(INDEX_FILE_NAME), serialized)?;
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self, IndexError> {
        let bytes = fs::read(dir.join(INDEX_FILE_NAME))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut left_magnitude = 0.0f64;
    let mut right_magnitude = 0.0f64;
    for (a, b) in left.iter().zip(right.iter()) {
        dot += f64::from(*a) * f64::from(*b);
        left_magnitude += f64::from(*a) * f64::from(*a);
        right_magnitude += f64::from(*b) * f64::from(*b);
    }

    let denominator = left_magnitude.sqrt() * right_magnitude.sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        dot / denominator
    }
}

/// Builds the session index from staged text files, or loads the persisted
/// store when reuse is enabled and one exists (skipping embedding entirely).
/// Any embedding failure aborts with no partial index.
pub async fn build_index(
    text_paths: &[PathBuf],
    embedder: &dyn Embedder,
    options: &IndexOptions,
) -> Result<VectorStore, IndexError> {
    if options.has_persisted_index() {
        return VectorStore::load(&options.persist_dir);
    }

    let mut store = VectorStore::default();
    for path in text_paths {
        let text = fs::read_to_string(path)?;
        let embedding = embedder.embed(&text).await?;

        store.insert(DocumentEntry {
            document_id: document_id(path, &text),
            source_path: path.to_string_lossy().to_string(),
            text,
            embedding,
            indexed_at: Utc::now(),
        });
    }

    if options.reuse {
        store.persist(&options.persist_dir)?;
    }

    Ok(store)
}

fn document_id(path: &Path, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::{build_index, DocumentEntry, IndexOptions, VectorStore};
    use crate::embeddings::Embedder;
    use crate::error::IndexError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn dimensions(&self) -> usize {
            3
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let length = text.len() as f32;
            Ok(vec![length, 1.0, 0.0])
        }
    }

    fn entry(id: &str, embedding: Vec<f32>) -> DocumentEntry {
        DocumentEntry {
            document_id: id.to_string(),
            source_path: format!("/tmp/{id}.txt"),
            text: format!("text for {id}"),
            embedding,
            indexed_at: Utc::now(),
        }
    }

    #[test]
    fn search_orders_by_cosine_similarity_and_truncates() {
        let mut store = VectorStore::default();
        store.insert(entry("aligned", vec![1.0, 0.0, 0.0]));
        store.insert(entry("orthogonal", vec![0.0, 1.0, 0.0]));
        store.insert(entry("close", vec![0.9, 0.1, 0.0]));

        let hits = store.search(&[1.0, 0.0, 0.0], 2);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document_id, "aligned");
        assert_eq!(hits[1].document_id, "close");
    }

    #[test]
    fn single_document_store_returns_it_as_the_sole_candidate() {
        let mut store = VectorStore::default();
        store.insert(entry("only", vec![0.2, 0.5, 0.3]));

        let hits = store.search(&[1.0, 1.0, 1.0], 1);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, "only");
    }

    #[tokio::test]
    async fn build_embeds_one_document_per_staged_file(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let first = dir.path().join("a.txt");
        let second = dir.path().join("b.txt");
        fs::write(&first, "alpha")?;
        fs::write(&second, "beta beta")?;

        let embedder = CountingEmbedder::new();
        let store = build_index(
            &[first, second],
            &embedder,
            &IndexOptions::default(),
        )
        .await?;

        assert_eq!(store.len(), 2);
        assert_eq!(embedder.call_count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn reuse_loads_persisted_store_without_embedding(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let staged_dir = tempdir()?;
        let persist_dir = tempdir()?;
        let staged = staged_dir.path().join("a.txt");
        fs::write(&staged, "persisted content")?;

        let options = IndexOptions {
            reuse: true,
            persist_dir: persist_dir.path().to_path_buf(),
        };

        let first_build = CountingEmbedder::new();
        let built = build_index(std::slice::from_ref(&staged), &first_build, &options).await?;
        assert_eq!(first_build.call_count(), 1);
        assert_eq!(built.len(), 1);

        let second_build = CountingEmbedder::new();
        let loaded = build_index(std::slice::from_ref(&staged), &second_build, &options).await?;

        assert_eq!(second_build.call_count(), 0);
        assert_eq!(loaded.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn missing_staged_file_aborts_the_build() {
        let embedder = CountingEmbedder::new();
        let result = build_index(
            &[std::path::PathBuf::from("/nonexistent/staged.txt")],
            &embedder,
            &IndexOptions::default(),
        )
        .await;

        assert!(matches!(result, Err(IndexError::Io(_))));
    }
}
