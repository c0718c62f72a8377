//! Retrieval and answer streaming.
//!
//! Provides the embedder and vector-store capabilities, the retrieval gate,
//! the streaming RAG answerer and conversation persistence.

pub mod chroma;
pub mod conversation;
pub mod embeddings;
pub mod rag;
pub mod retrieval;
pub mod vector_store;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chroma::ChromaStore;
pub use conversation::{
    conversation_title, ConversationStore, ConversationSummary, InMemoryConversationStore,
    JsonlConversationStore, StoredMessage, Transcript, Turn,
};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use rag::{
    into_session_stream, AskRequest, EventStream, RagAnswer, RagService, SessionStream,
    StreamEvent, WireMessage,
};
pub use retrieval::{Retriever, DEFAULT_TOP_K, MAX_DISTANCE};
pub use vector_store::{DocumentInfo, InMemoryVectorStore, VectorStore};
