//! Speech overlay on the answer stream.
//!
//! Tokens pass through untouched and are segmented into sentences; each
//! completed sentence is cleaned and synthesized, and its audio event follows
//! the token that completed it.

use crate::clean::clean_for_tts;
use crate::segmenter::SegmenterState;
use crate::tts::TextToSpeech;
use futures::StreamExt;
use heyrag_knowledge::rag::boxed_events;
use heyrag_knowledge::{AskRequest, EventStream, RagService, StreamEvent};
use std::sync::Arc;

/// Answering with spoken sentences.
#[derive(Clone)]
pub struct VoiceService {
    rag: RagService,
    tts: Arc<dyn TextToSpeech>,
}

impl VoiceService {
    pub fn new(rag: RagService, tts: Arc<dyn TextToSpeech>) -> Self {
        Self { rag, tts }
    }

    /// The answer stream with `Audio` events interleaved.
    ///
    /// When `Sources` arrives the remaining buffer is spoken first, then
    /// `Sources` is forwarded and the stream ends. A sentence that fails to
    /// synthesize is logged and skipped.
    pub fn ask_stream_voice(&self, request: AskRequest) -> EventStream {
        let mut answer = self.rag.ask_stream(request);
        let tts = Arc::clone(&self.tts);

        boxed_events(async_stream::try_stream! {
            let mut state = SegmenterState::new();

            while let Some(event) = answer.next().await {
                match event? {
                    StreamEvent::Token { content } => {
                        let (sentence, next) = state.feed(&content);
                        state = next;
                        yield StreamEvent::Token { content };

                        if let Some(sentence) = sentence {
                            if let Some(audio) = synthesize_sentence(tts.as_ref(), &sentence).await {
                                yield audio;
                            }
                        }
                    }
                    StreamEvent::Sources { content } => {
                        if let Some(rest) = std::mem::take(&mut state).finish() {
                            if let Some(audio) = synthesize_sentence(tts.as_ref(), &rest).await {
                                yield audio;
                            }
                        }
                        yield StreamEvent::Sources { content };
                        break;
                    }
                    other => yield other,
                }
            }
        })
    }
}

/// Audio for one sentence, or `None` when there is nothing to say or the
/// engine failed.
pub async fn synthesize_sentence(tts: &dyn TextToSpeech, sentence: &str) -> Option<StreamEvent> {
    let text = clean_for_tts(sentence);
    if text.is_empty() {
        return None;
    }

    match tts.synthesize(&text).await {
        Ok((content, sample_rate)) => Some(StreamEvent::Audio {
            content,
            sample_rate,
        }),
        Err(e) => {
            tracing::warn!("Speech synthesis failed, skipping sentence: {}", e);
            None
        }
    }
}
