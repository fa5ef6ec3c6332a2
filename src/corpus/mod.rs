pub mod faq;
pub mod knowledge;
pub mod retriever;

pub use faq::{FaqCorpus, FaqEntry};
pub use knowledge::{format_context, KnowledgeChunk, KnowledgeCorpus};
pub use retriever::KnowledgeRetriever;
