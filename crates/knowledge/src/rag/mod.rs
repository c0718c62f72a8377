//! RAG (Retrieval-Augmented Generation) answering.

pub mod ask;
pub mod stream;
pub mod types;

pub use ask::RagService;
pub use stream::into_session_stream;
pub use types::{
    boxed_events, AskRequest, EventStream, RagAnswer, SessionStream, StreamEvent,
    WireMessage,
};
