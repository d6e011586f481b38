pub mod chat;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod session;
pub mod staging;

pub use chat::{
    compose_messages, ChatClient, ChatHistory, ChatMessage, ChatTurn, ConversationalChain,
    MessageRole, OpenAiChatClient, DEFAULT_CHAT_MODEL, RETRIEVAL_TOP_K,
};
pub use embeddings::{Embedder, OpenAiEmbedder, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL};
pub use error::{ChatError, IndexError, IngestError, SessionError};
pub use extractor::{extract_document_text, LopdfExtractor, PageText, PdfExtractor};
pub use index::{build_index, DocumentEntry, IndexOptions, ScoredDocument, VectorStore};
pub use session::{SessionController, SessionState};
pub use staging::{materialize_uploads, stage_text_files, TempFileRegistry, UploadedFile};
