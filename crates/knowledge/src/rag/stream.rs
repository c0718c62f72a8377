//! Streaming boundary.

use crate::rag::types::{EventStream, SessionStream, StreamEvent};
use futures::StreamExt;

/// Convert a fallible answer sequence into the terminal protocol.
///
/// Events pass through unchanged. The first failure becomes a single
/// `Error` event and nothing follows it; a clean end appends `Done`.
pub fn into_session_stream(mut events: EventStream) -> SessionStream {
    Box::pin(async_stream::stream! {
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => yield event,
                Err(e) => {
                    tracing::error!("Answer stream failed: {}", e);
                    yield StreamEvent::Error { content: e.to_string() };
                    return;
                }
            }
        }

        yield StreamEvent::Done;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use heyrag_core::AppError;

    #[tokio::test]
    async fn test_done_appended_after_success() {
        let events: EventStream = Box::pin(futures::stream::iter(vec![
            Ok(StreamEvent::Token {
                content: "Hi".to_string(),
            }),
            Ok(StreamEvent::Sources { content: vec![] }),
        ]));

        let collected: Vec<_> = into_session_stream(events).collect().await;

        assert_eq!(collected.len(), 3);
        assert_eq!(collected[2], StreamEvent::Done);
    }

    #[tokio::test]
    async fn test_error_is_terminal() {
        let events: EventStream = Box::pin(futures::stream::iter(vec![
            Ok(StreamEvent::Token {
                content: "Hi".to_string(),
            }),
            Err(AppError::Upstream("model crashed".to_string())),
            Ok(StreamEvent::Sources { content: vec![] }),
        ]));

        let collected: Vec<_> = into_session_stream(events).collect().await;

        assert_eq!(collected.len(), 2);
        match &collected[1] {
            StreamEvent::Error { content } => assert!(content.contains("model crashed")),
            other => panic!("expected error event, got {:?}", other),
        }
    }
}
