pub mod hardware;
pub mod kb_search;
pub mod llm_reasoning;
pub mod news_fetch;

pub use hardware::HardwareDiagnostic;
pub use kb_search::KnowledgeBaseSearch;
pub use llm_reasoning::LlmReasoning;
pub use news_fetch::NewsFetch;
