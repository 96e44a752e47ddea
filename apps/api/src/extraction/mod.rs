// Résumé extraction: document text, token budget, prompt, completion, sanitize.
// All completion calls go through the injected `CompletionClient`.
// CPU-bound extraction and truncation run inside tokio::task::spawn_blocking.

pub mod docx;
pub mod document;
pub mod errors;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod sanitizer;
pub mod text_extractor;
pub mod token_budget;
pub mod upload;

// Re-export the API consumed by state, routes and main.
pub use errors::{PipelineError, Stage};
pub use pipeline::ExtractionPipeline;
pub use text_extractor::{ExtractionMode, TextExtractor};
pub use token_budget::{build_estimator, EstimatorKind, TokenBudget, TokenBudgeter};
