//! End-to-end answering scenarios over test doubles.

use super::doubles::{geo_passage, BrokenStore, FixedStore, ScriptedChatModel};
use crate::embeddings::KeywordEmbedder;
use crate::rag::{into_session_stream, AskRequest, RagService, StreamEvent};
use crate::retrieval::Retriever;
use crate::vector_store::{InMemoryVectorStore, VectorStore};
use futures::StreamExt;
use heyrag_core::{Passage, SourceRef};
use heyrag_llm::{ChatMessage, Role};
use heyrag_prompt::DEFAULT_INSTRUCTION_NO_DOCS;
use std::sync::Arc;

fn service(store: Arc<dyn VectorStore>, model: Arc<ScriptedChatModel>) -> RagService {
    let retriever = Retriever::new(Arc::new(KeywordEmbedder::new(["paris", "france"])), store);
    RagService::new(retriever, model)
}

fn indexed(embedder: &KeywordEmbedder, text: &str, filename: &str) -> Passage {
    let mut passage = Passage::new(text, 0.0)
        .with_metadata("document_id", filename)
        .with_metadata("filename", filename)
        .with_metadata("chunk_index", 0);
    passage.embedding = embedder.vector(text);
    passage
}

fn tokens_of(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Token { content } => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_capital_of_france_event_sequence() {
    let model = Arc::new(ScriptedChatModel::new(&["The capital ", "is ", "Paris", "."]));
    let rag = service(Arc::new(FixedStore::new(vec![geo_passage()])), model.clone());

    let events: Vec<StreamEvent> = into_session_stream(
        rag.ask_stream(AskRequest::new("What is the capital of France?", "llama3.2")),
    )
    .collect()
    .await;

    assert_eq!(events.len(), 6);
    assert!(matches!(events[0], StreamEvent::Token { .. }));
    assert_eq!(tokens_of(&events), "The capital is Paris.");
    assert_eq!(
        events[4],
        StreamEvent::Sources {
            content: vec![SourceRef {
                filename: "geo.pdf".to_string(),
                chunk_index: 0
            }]
        }
    );
    assert_eq!(events[5], StreamEvent::Done);

    let request = model.last_request();
    assert_eq!(request.model, "llama3.2");
    assert!(request.messages[0]
        .content
        .contains("--- DOCUMENTS ---\nParis is the capital of France.\n---"));
}

#[tokio::test]
async fn test_streamed_tokens_match_non_streamed_answer() {
    let model = Arc::new(ScriptedChatModel::new(&["Bon", "jour", " à ", "tous", "!"]));
    let rag = service(Arc::new(FixedStore::new(vec![geo_passage()])), model);

    let streamed: Vec<StreamEvent> = into_session_stream(rag.ask_stream(AskRequest::new("Hi", "m")))
        .collect()
        .await;
    let answer = rag.ask(AskRequest::new("Hi", "m")).await.unwrap();

    assert_eq!(tokens_of(&streamed), answer.answer);
    assert_eq!(answer.sources.len(), 1);
}

#[tokio::test]
async fn test_distant_passages_fall_back_to_no_documents() {
    let far = vec![
        Passage::new("Unrelated.", 1.5).with_metadata("filename", "a.md"),
        Passage::new("Also unrelated.", 4.0).with_metadata("filename", "b.md"),
    ];
    let model = Arc::new(ScriptedChatModel::new(&["General knowledge."]));
    let rag = service(Arc::new(FixedStore::new(far)), model.clone());

    let events: Vec<StreamEvent> = into_session_stream(rag.ask_stream(AskRequest::new("Q", "m")))
        .collect()
        .await;

    assert_eq!(events[1], StreamEvent::Sources { content: vec![] });
    let system = &model.last_request().messages[0];
    assert_eq!(system.role, Role::System);
    assert_eq!(system.content, DEFAULT_INSTRUCTION_NO_DOCS);
}

#[tokio::test]
async fn test_indexed_store_keeps_only_close_passages() {
    let embedder = KeywordEmbedder::new(["paris", "france", "capital", "pasta", "recipe"]);
    let store = InMemoryVectorStore::new();
    store
        .add_documents(&[
            indexed(&embedder, "Pasta recipe with fresh basil.", "food.md"),
            indexed(&embedder, "Lyon is a city in France.", "lyon.md"),
            indexed(&embedder, "Paris is the capital of France.", "geo.pdf"),
        ])
        .await
        .unwrap();

    let model = Arc::new(ScriptedChatModel::new(&["Paris."]));
    let retriever = Retriever::new(Arc::new(embedder), Arc::new(store));
    let rag = RagService::new(retriever, model.clone());

    let answer = rag
        .ask(AskRequest::new("What is the capital of France?", "m"))
        .await
        .unwrap();

    let files: Vec<&str> = answer.sources.iter().map(|s| s.filename.as_str()).collect();
    assert_eq!(files, vec!["geo.pdf", "lyon.md"]);

    let system = &model.last_request().messages[0].content;
    assert!(system.contains("Paris is the capital of France."));
    assert!(system.contains("Lyon is a city in France."));
    assert!(!system.contains("Pasta"));
}

#[tokio::test]
async fn test_indexed_store_without_close_passages_uses_no_documents() {
    let embedder = KeywordEmbedder::new(["france", "pasta"]);
    let store = InMemoryVectorStore::new();
    store
        .add_documents(&[indexed(&embedder, "Pasta, always pasta.", "food.md")])
        .await
        .unwrap();

    let model = Arc::new(ScriptedChatModel::new(&["No idea."]));
    let rag = RagService::new(Retriever::new(Arc::new(embedder), Arc::new(store)), model.clone());

    let events: Vec<StreamEvent> = into_session_stream(
        rag.ask_stream(AskRequest::new("Where is France?", "m")),
    )
    .collect()
    .await;

    assert_eq!(events[1], StreamEvent::Sources { content: vec![] });
    assert_eq!(model.last_request().messages[0].content, DEFAULT_INSTRUCTION_NO_DOCS);
}

#[tokio::test]
async fn test_zero_tokens_still_yields_sources() {
    let model = Arc::new(ScriptedChatModel::new(&[]));
    let rag = service(Arc::new(FixedStore::new(vec![geo_passage()])), model);

    let events: Vec<StreamEvent> = into_session_stream(rag.ask_stream(AskRequest::new("Q", "m")))
        .collect()
        .await;

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], StreamEvent::Sources { .. }));
    assert_eq!(events[1], StreamEvent::Done);
}

#[tokio::test]
async fn test_model_failure_ends_with_single_error() {
    let model = Arc::new(ScriptedChatModel::new(&["One ", "two ", "three"]).failing_after(2));
    let rag = service(Arc::new(FixedStore::new(vec![geo_passage()])), model);

    let events: Vec<StreamEvent> = into_session_stream(rag.ask_stream(AskRequest::new("Q", "m")))
        .collect()
        .await;

    assert_eq!(events.len(), 3);
    assert_eq!(tokens_of(&events), "One two ");
    assert!(matches!(&events[2], StreamEvent::Error { content } if content.contains("model went away")));
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Sources { .. })));
}

#[tokio::test]
async fn test_retrieval_failure_emits_error_before_any_token() {
    let model = Arc::new(ScriptedChatModel::new(&["never"]));
    let rag = service(Arc::new(BrokenStore), model.clone());

    let events: Vec<StreamEvent> = into_session_stream(rag.ask_stream(AskRequest::new("Q", "m")))
        .collect()
        .await;

    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], StreamEvent::Error { content } if content.contains("search unavailable")));
    assert!(model.last_request.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_stream_is_lazy() {
    let model = Arc::new(ScriptedChatModel::new(&["x"]));
    let rag = service(Arc::new(FixedStore::new(vec![geo_passage()])), model.clone());

    let stream = rag.ask_stream(AskRequest::new("Q", "m"));
    assert!(model.last_request.lock().unwrap().is_none());

    let events: Vec<_> = stream.collect().await;
    assert_eq!(events.len(), 2);
    assert!(model.last_request.lock().unwrap().is_some());
}

#[tokio::test]
async fn test_top_k_limits_search_and_history_is_forwarded() {
    let passages: Vec<Passage> = (0..8)
        .map(|i| {
            Passage::new(format!("Passage {}.", i), 0.1)
                .with_metadata("filename", "many.md")
                .with_metadata("chunk_index", i)
        })
        .collect();
    let model = Arc::new(ScriptedChatModel::new(&["ok"]));
    let rag = service(Arc::new(FixedStore::new(passages)), model.clone()).with_top_k(3);

    let history = vec![ChatMessage::user("Earlier"), ChatMessage::assistant("Reply")];
    let mut options = heyrag_llm::ChatOptions::new();
    options.insert("temperature".to_string(), serde_json::json!(0.1));

    let answer = rag
        .ask(
            AskRequest::new("Now?", "m")
                .with_history(history.clone())
                .with_options(options)
                .with_instruction(Some("Be terse.".to_string())),
        )
        .await
        .unwrap();

    assert_eq!(answer.sources.len(), 3);

    let request = model.last_request();
    assert_eq!(request.messages.len(), 4);
    assert!(request.messages[0].content.starts_with("Be terse."));
    assert_eq!(&request.messages[1..3], history.as_slice());
    assert_eq!(request.messages[3], ChatMessage::user("Now?"));
    assert_eq!(request.options["temperature"], serde_json::json!(0.1));
}
