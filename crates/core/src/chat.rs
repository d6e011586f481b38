use crate::embeddings::Embedder;
use crate::error::ChatError;
use crate::index::{ScoredDocument, VectorStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// Documents retrieved as context for one answer. The chain contract is
/// top-1: one nearest document per question.
pub const RETRIEVAL_TOP_K: usize = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// One completed question/answer exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub turn_id: Uuid,
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

/// Session-scoped conversation log, appended after each successful answer.
/// Invariant: turns are stored in chronological question order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn push_turn(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ChatTurn {
            turn_id: Uuid::new_v4(),
            question: question.into(),
            answer: answer.into(),
            asked_at: Utc::now(),
        });
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }
}

/// Seam over the hosted chat-completion service: one message list in, one
/// answer out, exactly one round trip.
#[async_trait]
pub trait ChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError>;
}

pub struct OpenAiChatClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiChatClient {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: DEFAULT_CHAT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": messages,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChatError::BackendResponse {
                backend: "chat".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let answer = parsed
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| ChatError::Request("response carried no answer".to_string()))?;

        Ok(answer.to_string())
    }
}

/// Composes the single completion request for a question: retrieved context
/// as the system message, prior turns in chronological order, and the
/// question last. Pure, so identical question+history+context compose to
/// identical message lists.
pub fn compose_messages(
    question: &str,
    history: &ChatHistory,
    context: &[ScoredDocument],
) -> Vec<ChatMessage> {
    let mut system = String::from(
        "Answer the question using the document context below.\n\nContext:\n",
    );
    for document in context {
        system.push_str(&document.text);
        system.push('\n');
    }

    let mut messages = vec![ChatMessage::new(MessageRole::System, system)];
    for turn in history.turns() {
        messages.push(ChatMessage::new(MessageRole::User, turn.question.clone()));
        messages.push(ChatMessage::new(MessageRole::Assistant, turn.answer.clone()));
    }
    messages.push(ChatMessage::new(MessageRole::User, question));
    messages
}

/// Wraps the chat service and a top-1 retriever over the session index into
/// a single question-in, answer-out call. Borrows its seams so the session
/// controller keeps ownership of the service handles and the index.
pub struct ConversationalChain<'a, C, E>
where
    C: ChatClient,
    E: Embedder,
{
    client: &'a C,
    embedder: &'a E,
    store: &'a VectorStore,
}

impl<'a, C, E> ConversationalChain<'a, C, E>
where
    C: ChatClient + Send + Sync,
    E: Embedder + Send + Sync,
{
    pub fn new(client: &'a C, embedder: &'a E, store: &'a VectorStore) -> Self {
        Self {
            client,
            embedder,
            store,
        }
    }

    pub async fn ask(&self, question: &str, history: &ChatHistory) -> Result<String, ChatError> {
        if question.trim().is_empty() {
            return Err(ChatError::Request("question is empty".to_string()));
        }

        let query_vector = self.embedder.embed(question).await?;
        let context = self.store.search(&query_vector, RETRIEVAL_TOP_K);
        let messages = compose_messages(question, history, &context);

        self.client.complete(&messages).await
    }
}
