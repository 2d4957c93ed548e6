pub mod api;
pub mod config;
pub mod llm_providers;
pub mod pipeline;
pub mod templates;

pub use api::{router, ApiError, AppState};
pub use config::{Config, ProviderKind};
pub use llm_providers::{ClaudeProvider, OllamaProvider, OpenAIProvider, SummaryGenerator};
pub use pipeline::{PipelineError, SummaryPipeline};
pub use templates::PromptRenderer;
