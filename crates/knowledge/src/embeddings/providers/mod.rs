pub mod keyword;
pub mod ollama;

pub use keyword::KeywordEmbedder;
pub use ollama::OllamaProvider;
