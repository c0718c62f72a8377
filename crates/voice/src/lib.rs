//! Voice layer: spoken questions in, spoken answers out.
//!
//! Provides:
//! - Sentence segmentation of the token stream and TTS text cleanup
//! - Speech-to-text, text-to-speech and audio decoding capabilities
//! - The speech overlay on the answer stream
//! - The voice session gate and session driver

pub mod clean;
pub mod decode;
pub mod gate;
pub mod overlay;
pub mod segmenter;
pub mod session;
pub mod stt;
pub mod tts;


pub use clean::clean_for_tts;
pub use decode::{AudioDecoder, FfmpegDecoder};
pub use gate::{VoiceGate, VoicePermit};
pub use overlay::VoiceService;
pub use segmenter::{split_sentence, SegmenterState, MIN_SENTENCE_LENGTH};
pub use session::{
    run_voice_session, Inbound, SessionOutcome, SessionState, VoiceConfig, VoiceSessionDeps,
    VoiceTransport,
};
pub use stt::{CommandStt, SpeechToText};
pub use tts::{CommandTts, TextToSpeech};
