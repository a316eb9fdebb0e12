//! Grounded answer generation.

use super::context::{format_context_for_prompt, resolve_citations};
use super::generator::{Generator, OpenAIGenerator};
use super::retriever::Retriever;
use super::{Citation, ConversationTurn};
use crate::config::{Prompts, Settings};
use crate::embedding::Embedder;
use crate::error::{LeseError, Result};
use crate::vector_store::{ScoredCandidate, VectorStore};
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

/// The fixed answer returned when retrieval produces no usable context.
/// Generation is skipped entirely in that case.
pub const INSUFFICIENT_CONTEXT_ANSWER: &str =
    "I don't have enough information to answer that based on the documents.";

/// RAG engine for question answering over an indexed collection.
///
/// Holds the generation backend, the retriever and the in-memory session
/// state (conversation history and completed turns). Cancelled turns leave
/// the session state untouched.
pub struct RagEngine {
    generator: Arc<dyn Generator>,
    retriever: Retriever,
    prompts: Prompts,
    conversation_history: Vec<ChatCompletionRequestMessage>,
    history_turns: usize,
    turns: Vec<ConversationTurn>,
}

impl RagEngine {
    /// Create a new RAG engine from settings.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        settings: &Settings,
    ) -> Result<Self> {
        let retriever = Retriever::new(embedder, vector_store, &settings.retrieval)?;

        Ok(Self {
            generator: Arc::new(OpenAIGenerator::new(&settings.generation)),
            retriever,
            prompts: Prompts::default(),
            conversation_history: Vec::new(),
            history_turns: settings.generation.history_turns,
            turns: Vec::new(),
        })
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Replace the generation backend.
    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = generator;
        self
    }

    /// Ask a single question and get a grounded response.
    #[instrument(skip(self), fields(question = %question, collection = %collection))]
    pub async fn ask(&mut self, question: &str, collection: &str) -> Result<RagResponse> {
        self.ask_inner(question, collection, None).await
    }

    /// Ask a single question, streaming answer tokens through `sender` as
    /// they arrive. A dropped receiver cancels the turn: generation stops,
    /// `Cancelled` is returned and the turn is not recorded.
    pub async fn ask_streaming(
        &mut self,
        question: &str,
        collection: &str,
        sender: mpsc::Sender<String>,
    ) -> Result<RagResponse> {
        self.ask_inner(question, collection, Some(sender)).await
    }

    async fn ask_inner(
        &mut self,
        question: &str,
        collection: &str,
        sink: Option<mpsc::Sender<String>>,
    ) -> Result<RagResponse> {
        info!("Processing question: {}", question);

        let candidates = self.retriever.retrieve(question, collection).await?;

        if candidates.is_empty() {
            // No context to ground an answer in; the model is never called.
            let response = RagResponse::insufficient_context();
            self.record_turn(question, &response);
            return Ok(response);
        }

        let context_text = format_context_for_prompt(&candidates);

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context_text);

        let user_prompt = self.prompts.render_with_custom(&self.prompts.rag.user, &vars);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.rag.system.clone())
                .build()
                .map_err(|e| LeseError::Generation(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| LeseError::Generation(e.to_string()))?
                .into(),
        ];

        let answer = self.generator.generate(messages, sink.as_ref()).await?;
        let citations = resolve_citations(&answer, &candidates);
        debug!(citations = citations.len(), sources = candidates.len(), "answer generated");

        let response = RagResponse {
            answer,
            citations,
            sources: candidates,
        };
        self.record_turn(question, &response);
        Ok(response)
    }

    /// Continue a chat session with retrieval on every message.
    #[instrument(skip(self), fields(message = %message, collection = %collection))]
    pub async fn chat(&mut self, message: &str, collection: &str) -> Result<RagResponse> {
        self.chat_inner(message, collection, None).await
    }

    /// Continue a chat session, streaming answer tokens through `sender`.
    pub async fn chat_streaming(
        &mut self,
        message: &str,
        collection: &str,
        sender: mpsc::Sender<String>,
    ) -> Result<RagResponse> {
        self.chat_inner(message, collection, Some(sender)).await
    }

    async fn chat_inner(
        &mut self,
        message: &str,
        collection: &str,
        sink: Option<mpsc::Sender<String>>,
    ) -> Result<RagResponse> {
        info!("Chat message: {}", message);

        let candidates = self.retriever.retrieve(message, collection).await?;

        if candidates.is_empty() {
            // No context to ground an answer in; the model is never called
            // and the session history stays as it was.
            let response = RagResponse::insufficient_context();
            self.record_turn(message, &response);
            return Ok(response);
        }

        let user_content = format!(
            "Question: {}\n\nRelevant excerpts from the documents:\n\n{}",
            message,
            format_context_for_prompt(&candidates)
        );

        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(user_content)
            .build()
            .map_err(|e| LeseError::Generation(e.to_string()))?;

        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.rag.chat_system.clone())
                .build()
                .map_err(|e| LeseError::Generation(e.to_string()))?
                .into(),
        ];
        messages.extend(self.conversation_history.clone());
        messages.push(user_message.clone().into());

        // History is committed only after a completed generation, so a
        // cancelled or failed turn leaves the session as it was.
        let answer = self.generator.generate(messages, sink.as_ref()).await?;

        self.conversation_history.push(user_message.into());
        let assistant_message = ChatCompletionRequestAssistantMessageArgs::default()
            .content(answer.clone())
            .build()
            .map_err(|e| LeseError::Generation(e.to_string()))?;
        self.conversation_history.push(assistant_message.into());

        let max_messages = self.history_turns * 2;
        if self.conversation_history.len() > max_messages {
            let start = self.conversation_history.len() - max_messages;
            self.conversation_history.drain(..start);
        }

        let citations = resolve_citations(&answer, &candidates);
        let response = RagResponse {
            answer,
            citations,
            sources: candidates,
        };
        self.record_turn(message, &response);
        Ok(response)
    }

    fn record_turn(&mut self, query: &str, response: &RagResponse) {
        self.turns.push(ConversationTurn {
            query: query.to_string(),
            answer: response.answer.clone(),
            cited_chunk_ids: response.citations.iter().map(|c| c.chunk_id).collect(),
            timestamp: chrono::Utc::now(),
        });
    }

    /// Completed turns in this session, oldest first.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Messages currently in the chat history window.
    pub fn history_len(&self) -> usize {
        self.conversation_history.len()
    }

    /// Clear conversation history and recorded turns.
    pub fn clear_history(&mut self) {
        self.conversation_history.clear();
        self.turns.clear();
    }
}

/// A grounded response: the answer plus the chunks it drew on.
#[derive(Debug, Clone)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Citations the answer actually made, in order of first appearance.
    pub citations: Vec<Citation>,
    /// All chunks offered to the model as context.
    pub sources: Vec<ScoredCandidate>,
}

impl RagResponse {
    fn insufficient_context() -> Self {
        Self {
            answer: INSUFFICIENT_CONTEXT_ANSWER.to_string(),
            citations: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Whether the answer cites at least one stored chunk.
    pub fn is_grounded(&self) -> bool {
        !self.citations.is_empty()
    }

    /// Format the response for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.citations.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for citation in &self.citations {
                output.push_str(&format!(
                    "\n[{}] {}",
                    citation.label,
                    citation.document_name
                ));
                if let Some(page) = citation.page {
                    output.push_str(&format!(" (page {})", page));
                }
                output.push_str(&format!(" (score: {:.2})", citation.score));
            }
        }

        output
    }
}
