//! Markdown and symbol stripping before speech synthesis.

use regex::Regex;
use std::sync::LazyLock;

/// Rewrite rules, applied in order.
const RULES: &[(&str, &str)] = &[
    // **bold**, *italic*
    (r"\*{1,3}(.+?)\*{1,3}", "$1"),
    // ### headings
    (r"#{1,6}\s*", ""),
    // `inline code`
    (r"`[^`]*`", ""),
    // - bullet lists
    (r"(?m)^\s*[-*+]\s+", ""),
    // 1. numbered lists
    (r"(?m)^\s*\d+\.\s+", ""),
    // [text](url)
    (r"\[([^\]]+)\]\([^)]+\)", "$1"),
    // emoji and other symbols
    (r#"[^\w\s.,;:!?'"()\-/àâäéèêëïîôùûüÿçœæ]"#, ""),
];

static COMPILED: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    RULES
        .iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|regex| (regex, *replacement))
        })
        .collect()
});

static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

fn clean_once(text: &str) -> String {
    let mut text = text.to_string();
    for (regex, replacement) in COMPILED.iter() {
        text = regex.replace_all(&text, *replacement).into_owned();
    }

    match WHITESPACE.as_ref() {
        Some(regex) => regex.replace_all(&text, " ").trim().to_string(),
        None => text.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Text fit for a speech engine: markdown markers, inline code, link URLs
/// and symbols outside letters, digits and basic punctuation removed,
/// whitespace collapsed.
///
/// Rules are reapplied until the text stops changing, so cleaning cleaned
/// text is a no-op.
pub fn clean_for_tts(text: &str) -> String {
    let mut current = clean_once(text);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_rules_compile() {
        assert_eq!(COMPILED.len(), RULES.len());
        assert!(WHITESPACE.is_some());
    }

    #[test]
    fn test_strips_markdown() {
        assert_eq!(clean_for_tts("**Paris** is *the* capital."), "Paris is the capital.");
        assert_eq!(clean_for_tts("## Summary\nAll good."), "Summary All good.");
        assert_eq!(clean_for_tts("Run `cargo test` now."), "Run now.");
        assert_eq!(clean_for_tts("- first\n- second"), "first second");
        assert_eq!(clean_for_tts("1. one\n2. two"), "one two");
        assert_eq!(
            clean_for_tts("See [the docs](https://example.com/docs) today."),
            "See the docs today."
        );
    }

    #[test]
    fn test_keeps_accents_and_punctuation() {
        assert_eq!(
            clean_for_tts("Où est l'été ? « Ici » 🎉 (voilà)!"),
            "Où est l'été ? Ici (voilà)!"
        );
    }

    #[test]
    fn test_symbols_only_becomes_empty() {
        assert_eq!(clean_for_tts("🎉🚀 *** ###"), "");
        assert_eq!(clean_for_tts("   "), "");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "**bold** and *italic* with `code` and [link](http://x.y)",
            "* **nested** list\n  - item with 🎉 emoji",
            "***triple*** ** lonely stars ** *",
            "1. first\n\n\t2. second\n   3. third",
            "[[nested]](a)(b) #hash ## tags",
            "text with `unclosed code and *stars",
            "",
        ];

        for input in inputs {
            let once = clean_for_tts(input);
            assert_eq!(clean_for_tts(&once), once, "input: {:?}", input);
        }
    }
}
