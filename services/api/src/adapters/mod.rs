pub mod chat_llm;
pub mod knowledge;

pub use chat_llm::GlmChatAdapter;
pub use knowledge::EmbeddingIndex;
