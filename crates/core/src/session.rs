use crate::chat::{ChatClient, ChatHistory, ConversationalChain};
use crate::embeddings::Embedder;
use crate::error::SessionError;
use crate::extractor::PdfExtractor;
use crate::index::{build_index, IndexOptions, VectorStore};
use crate::staging::{materialize_uploads, stage_text_files, TempFileRegistry, UploadedFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoUploads,
    FilesStaged,
    IndexReady,
    AwaitingQuery,
    AnswerShown,
}

/// Drives one user session end to end: accepts an upload batch, stages and
/// indexes it once, then answers questions over the built index while
/// maintaining the chat history.
///
/// The index is built exactly once per upload batch and held for the session;
/// a later upload replaces it, resets the history, and drops the previous
/// batch's temp files.
pub struct SessionController<P, C, E>
where
    P: PdfExtractor,
    C: ChatClient,
    E: Embedder,
{
    extractor: P,
    client: C,
    embedder: E,
    options: IndexOptions,
    registry: Option<TempFileRegistry>,
    store: Option<VectorStore>,
    history: ChatHistory,
    state: SessionState,
}

impl<P, C, E> SessionController<P, C, E>
where
    P: PdfExtractor + Send + Sync,
    C: ChatClient + Send + Sync,
    E: Embedder + Send + Sync,
{
    pub fn new(extractor: P, client: C, embedder: E, options: IndexOptions) -> Self {
        Self {
            extractor,
            client,
            embedder,
            options,
            registry: None,
            store: None,
            history: ChatHistory::default(),
            state: SessionState::NoUploads,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn document_count(&self) -> usize {
        self.store.as_ref().map_or(0, VectorStore::len)
    }

    /// Runs the full pipeline over one upload batch: materialize, stage,
    /// build the index. An empty batch is rejected before any work; a staging
    /// or build failure halts this batch with the previous index discarded.
    pub async fn upload(&mut self, uploads: &[UploadedFile]) -> Result<(), SessionError> {
        if uploads.is_empty() {
            return Err(SessionError::NoUploads);
        }

        // A new batch supersedes the old session: previous index, history,
        // and temp files all go.
        self.store = None;
        self.history.clear();
        self.state = SessionState::NoUploads;

        let registry = TempFileRegistry::new().map_err(SessionError::Staging)?;
        let pdf_paths = materialize_uploads(&registry, uploads)?;
        let text_paths = stage_text_files(&registry, &self.extractor, &pdf_paths)?;
        self.registry = Some(registry);
        self.state = SessionState::FilesStaged;

        let store = build_index(&text_paths, &self.embedder, &self.options).await?;
        self.store = Some(store);
        self.state = SessionState::IndexReady;

        Ok(())
    }

    /// Answers one question over the session index. Returns `Ok(None)` for
    /// whitespace-only input (no transition, nothing recorded). On success
    /// the exchange is appended to the history; on failure the history is
    /// left exactly as it was.
    pub async fn ask(&mut self, question: &str) -> Result<Option<String>, SessionError> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| SessionError::NotReady("no index built for this session".to_string()))?;

        if question.trim().is_empty() {
            return Ok(None);
        }

        self.state = SessionState::AwaitingQuery;

        let chain = ConversationalChain::new(&self.client, &self.embedder, store);
        let answer = chain.ask(question, &self.history).await?;

        self.history.push_turn(question, answer.clone());
        self.state = SessionState::AnswerShown;

        Ok(Some(answer))
    }

    /// Empties the chat history. Prior uploads and the built index are kept.
    pub fn clear_history(&mut self) {
        self.history.clear();
        if self.store.is_some() {
            self.state = SessionState::AwaitingQuery;
        }
    }
}
