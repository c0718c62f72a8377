//! Sentence segmentation of a token stream.
//!
//! Tokens accumulate in a buffer until a sentence boundary shows up; the
//! completed sentence is then handed off for speech synthesis. State is an
//! explicit value threaded through every call.

/// Buffers shorter than this (in characters) never yield a sentence.
pub const MIN_SENTENCE_LENGTH: usize = 20;

const CODE_FENCE: &str = "```";

/// Split the first complete sentence off `buffer`.
///
/// A boundary is either a `.`, `!` or `?` at or after the minimum length
/// offset followed by a space, or a blank line (`\n\n`) with non-blank text
/// before it. Returns the trimmed sentence and the remainder.
pub fn split_sentence(buffer: &str) -> Option<(String, String)> {
    let chars: Vec<char> = buffer.chars().collect();
    if chars.len() < MIN_SENTENCE_LENGTH {
        return None;
    }

    for (i, &c) in chars.iter().enumerate() {
        let next = chars.get(i + 1).copied();

        if matches!(c, '.' | '!' | '?') && i + 1 >= MIN_SENTENCE_LENGTH && next == Some(' ') {
            let sentence: String = chars[..=i].iter().collect();
            let rest: String = chars[i + 1..].iter().collect();
            return Some((sentence.trim().to_string(), rest.trim_start().to_string()));
        }

        if c == '\n' && next == Some('\n') {
            let sentence: String = chars[..i].iter().collect();
            let sentence = sentence.trim();
            if !sentence.is_empty() {
                return Some((sentence.to_string(), chars[i + 2..].iter().collect()));
            }
        }
    }

    None
}

/// Append `token` to `buffer` and try to complete a sentence.
///
/// Returns the completed sentence, if any, and the new buffer. Nothing is
/// lost or duplicated apart from whitespace trimmed at the boundary.
pub fn feed(buffer: &str, token: &str) -> (Option<String>, String) {
    let combined = format!("{}{}", buffer, token);
    match split_sentence(&combined) {
        Some((sentence, rest)) => (Some(sentence), rest),
        None => (None, combined),
    }
}

/// Segmenter state for one streamed answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmenterState {
    pub buffer: String,

    /// Inside a fenced code block; no sentence is emitted until it closes
    pub in_code_block: bool,
}

impl SegmenterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one token.
    ///
    /// A token containing a code fence flips `in_code_block`. Inside a code
    /// block the token is buffered but no segmentation happens.
    pub fn feed(self, token: &str) -> (Option<String>, Self) {
        let mut in_code_block = self.in_code_block;
        if token.contains(CODE_FENCE) {
            in_code_block = !in_code_block;
        }

        if in_code_block {
            let mut buffer = self.buffer;
            buffer.push_str(token);
            return (
                None,
                Self {
                    buffer,
                    in_code_block,
                },
            );
        }

        let (sentence, buffer) = feed(&self.buffer, token);
        (
            sentence,
            Self {
                buffer,
                in_code_block,
            },
        )
    }

    /// Flush at end of stream: the trimmed remainder, unless it is blank or
    /// still inside a code block.
    pub fn finish(self) -> Option<String> {
        if self.in_code_block {
            return None;
        }

        let rest = self.buffer.trim();
        (!rest.is_empty()).then(|| rest.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(tokens: &[&str]) -> (Vec<String>, SegmenterState) {
        let mut state = SegmenterState::new();
        let mut sentences = Vec::new();
        for token in tokens {
            let (sentence, next) = state.feed(token);
            sentences.extend(sentence);
            state = next;
        }
        (sentences, state)
    }

    #[test]
    fn test_character_by_character_yields_two_sentences() {
        let text = "Bonjour, ceci est un test. Et voici une autre phrase.";
        let tokens: Vec<String> = text.chars().map(String::from).collect();
        let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();

        let (mut sentences, state) = run(&tokens);
        sentences.extend(state.finish());

        assert_eq!(
            sentences,
            vec!["Bonjour, ceci est un test.", "Et voici une autre phrase."]
        );
    }

    #[test]
    fn test_short_buffer_never_splits() {
        assert_eq!(split_sentence("Oui. Non. Peut-être"), None);
        assert_eq!(feed("Oui.", " Non."), (None, "Oui. Non.".to_string()));
    }

    #[test]
    fn test_terminator_before_minimum_offset_is_skipped() {
        let (sentence, rest) = split_sentence("Oui. Absolument, c'est exact! Et puis").unwrap();
        assert_eq!(sentence, "Oui. Absolument, c'est exact!");
        assert_eq!(rest, "Et puis");
    }

    #[test]
    fn test_terminator_at_end_waits_for_space() {
        assert_eq!(split_sentence("This sentence is long enough."), None);
        assert!(split_sentence("This sentence is long enough. ").is_some());
    }

    #[test]
    fn test_blank_line_ends_sentence() {
        let (sentence, rest) = split_sentence("Title of a section\n\nBody starts").unwrap();
        assert_eq!(sentence, "Title of a section");
        assert_eq!(rest, "Body starts");

        // Leading blank line with nothing before it is not a boundary
        assert_eq!(split_sentence("\n\nsome more words without end"), None);
    }

    #[test]
    fn test_no_characters_lost_across_boundary() {
        let (sentence, rest) = feed("First sentence is right here", ". Second part");
        assert_eq!(sentence.as_deref(), Some("First sentence is right here."));
        assert_eq!(rest, "Second part");
    }

    #[test]
    fn test_code_block_suppresses_segmentation() {
        let (sentences, state) = run(&[
            "Here is the code you asked for. ",
            "```rust\n",
            "let x = 1; // Assign a value to x. ",
            "Then print it. Done here. ",
            "More code.\n\nEven more. ",
        ]);

        assert_eq!(sentences, vec!["Here is the code you asked for."]);
        assert!(state.in_code_block);
        assert_eq!(state.finish(), None);
    }

    #[test]
    fn test_closing_fence_resumes_segmentation() {
        let (_, state) = run(&["```", "code", "```"]);
        assert!(!state.in_code_block);
        assert_eq!(state.finish().as_deref(), Some("```code```"));
    }

    #[test]
    fn test_finish_flushes_trimmed_remainder_once() {
        let state = SegmenterState {
            buffer: "  trailing words  ".to_string(),
            in_code_block: false,
        };
        assert_eq!(state.finish().as_deref(), Some("trailing words"));

        assert_eq!(SegmenterState::new().finish(), None);
        let blank = SegmenterState {
            buffer: " \n ".to_string(),
            in_code_block: false,
        };
        assert_eq!(blank.finish(), None);
    }

    #[test]
    fn test_multibyte_text_splits_on_characters() {
        let (sentence, rest) =
            split_sentence("Ça s'appelle l'été à Paris. Voilà où ça mène").unwrap();
        assert_eq!(sentence, "Ça s'appelle l'été à Paris.");
        assert_eq!(rest, "Voilà où ça mène");
    }
}
