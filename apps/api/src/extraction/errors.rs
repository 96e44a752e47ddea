//! Stage-local error types and the uniform `PipelineError` the caller sees.

use serde::Serialize;
use thiserror::Error;

use crate::llm_client::CompletionError;

/// Document could not be read or produced no text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Error extracting text from PDF: {0}")]
    Pdf(String),

    #[error("Error extracting text from Word document: {0}")]
    Word(String),

    #[error("No text could be extracted from the {0} document")]
    Empty(&'static str),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(&'static str),
}

/// Truncation gave up before the text fit the budget.
#[derive(Debug, Error)]
#[error("Text still estimates {estimate} tokens after {rounds} truncation rounds (budget {budget})")]
pub struct BudgetError {
    pub budget: usize,
    pub estimate: usize,
    pub rounds: usize,
}

/// The model reply did not contain a usable JSON object.
#[derive(Debug, Error)]
pub enum MalformedResponseError {
    #[error("no JSON object found")]
    NoJsonObject,

    #[error("Invalid JSON structure: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("response is missing the required `profile` object")]
    MissingProfile,
}

/// The pipeline step a failure originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    Budget,
    Completion,
    MalformedResponse,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::Budget => "budget",
            Stage::Completion => "completion",
            Stage::MalformedResponse => "malformed_response",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform failure surfaced by `ExtractionPipeline::run`.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {message}")]
pub struct PipelineError {
    pub stage: Stage,
    pub message: String,
}

impl PipelineError {
    pub fn new(stage: Stage, cause: impl std::fmt::Display) -> Self {
        Self {
            stage,
            message: cause.to_string(),
        }
    }
}

impl From<ExtractionError> for PipelineError {
    fn from(e: ExtractionError) -> Self {
        Self::new(Stage::Extraction, e)
    }
}

impl From<BudgetError> for PipelineError {
    fn from(e: BudgetError) -> Self {
        Self::new(Stage::Budget, e)
    }
}

impl From<CompletionError> for PipelineError {
    fn from(e: CompletionError) -> Self {
        Self::new(Stage::Completion, e)
    }
}

impl From<MalformedResponseError> for PipelineError {
    fn from(e: MalformedResponseError) -> Self {
        Self::new(Stage::MalformedResponse, e)
    }
}
