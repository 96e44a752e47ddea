//! Extraction Pipeline — one upload in, one canonical `ResumeRecord` out.
//!
//! Flow: extract text (or base64 the raw bytes) → truncate to the token budget →
//!       build prompt → completion call → sanitize.
//!
//! Every stage failure is logged with its detail and surfaced as a single
//! `PipelineError { stage, message }`. Nothing partial is ever returned.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::extraction::document::Document;
use crate::extraction::errors::{BudgetError, PipelineError, Stage};
use crate::extraction::prompts::{build, template};
use crate::extraction::sanitizer::sanitize;
use crate::extraction::text_extractor::TextExtractor;
use crate::extraction::token_budget::TokenBudgeter;
use crate::llm_client::CompletionClient;
use crate::models::resume::{ResumeRecord, SchemaVariant};

/// How much of a model reply goes into the debug log.
const RESPONSE_PREVIEW_CHARS: usize = 500;

pub struct ExtractionPipeline {
    extractor: TextExtractor,
    budgeter: TokenBudgeter,
    client: Arc<dyn CompletionClient>,
    variant: SchemaVariant,
    template: String,
}

impl ExtractionPipeline {
    pub fn new(
        extractor: TextExtractor,
        budgeter: TokenBudgeter,
        client: Arc<dyn CompletionClient>,
        variant: SchemaVariant,
    ) -> Self {
        Self {
            template: template(variant, extractor.mode()),
            extractor,
            budgeter,
            client,
            variant,
        }
    }

    /// Runs the full pipeline for a single document.
    ///
    /// Steps:
    /// 1. extract → ExtractedText (blocking pool)
    /// 2. truncate → payload within the token budget (blocking pool)
    /// 3. build → prompt
    /// 4. complete → raw model reply
    /// 5. sanitize → ResumeRecord
    pub async fn run(&self, document: Document) -> Result<ResumeRecord, PipelineError> {
        let format = document.format();
        info!(
            "Extracting {} document ({} bytes, mode {:?})",
            format.as_str(),
            document.len(),
            self.extractor.mode()
        );

        // Step 1: Extract
        let extractor = self.extractor;
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&document))
            .await
            .map_err(|e| {
                fail(PipelineError::new(
                    Stage::Extraction,
                    format!("extraction task failed: {e}"),
                ))
            })?
            .map_err(fail)?;
        info!(
            "Extracted text length: {} characters ({})",
            extracted.as_str().chars().count(),
            extracted.format().as_str()
        );

        // Step 2: Truncate
        let budgeter = self.budgeter.clone();
        let (payload, tokens) = tokio::task::spawn_blocking(move || {
            let payload = budgeter.fit(extracted.as_str())?;
            let tokens = budgeter.estimate(&payload);
            Ok::<_, BudgetError>((payload, tokens))
        })
        .await
        .map_err(|e| {
            fail(PipelineError::new(
                Stage::Budget,
                format!("truncation task failed: {e}"),
            ))
        })?
        .map_err(fail)?;
        info!(
            "Truncated text length: {} characters, ~{} tokens (budget {})",
            payload.chars().count(),
            tokens,
            self.budgeter.budget().get()
        );

        // Step 3: Prompt
        let request = build(&self.template, &payload);

        // Step 4: Completion
        info!("Sending request to completion service");
        let reply = self
            .client
            .complete(&request.prompt, request.system)
            .await
            .map_err(fail)?;
        info!("Received response from completion service");
        debug!("Raw API response: {}...", preview(&reply));

        // Step 5: Sanitize
        let record = sanitize(&reply, self.variant).map_err(|e| {
            error!("Unusable model response: {reply}");
            fail(e)
        })?;

        info!(
            "Parsed resume: {} experience entries, {} skills",
            record.profile.professional_experience.len(),
            record.profile.skills.len()
        );
        Ok(record)
    }
}

fn fail(cause: impl Into<PipelineError>) -> PipelineError {
    let err = cause.into();
    error!("Resume pipeline failed at {} stage: {}", err.stage, err.message);
    err
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(RESPONSE_PREVIEW_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::docx::build_docx;
    use crate::extraction::document::DocumentFormat;
    use crate::extraction::text_extractor::{build_pdf, ExtractionMode};
    use crate::extraction::token_budget::{
        CharHeuristicEstimator, TokenBudget, TokenEstimator,
    };
    use crate::llm_client::fake::FakeCompletionClient;

    const REPLY: &str = r#"Sure! Here is the data:
```json
{"profile": {"location": {"current": "Bengaluru"}, "skills": [{"skill": "Rust", "yearsOfExperience": 5}]}}
```
Hope that helps!"#;

    fn word_doc(body_text: &str) -> Document {
        let xml = format!(
            r#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:t>{body_text}</w:t></w:r></w:p></w:body></w:document>"#
        );
        Document::new(build_docx(&xml, None), DocumentFormat::Word)
    }

    fn pipeline(
        client: Arc<FakeCompletionClient>,
        mode: ExtractionMode,
        budget: usize,
        variant: SchemaVariant,
    ) -> ExtractionPipeline {
        let budgeter = TokenBudgeter::new(
            Arc::new(CharHeuristicEstimator),
            TokenBudget::new(budget).unwrap(),
        );
        ExtractionPipeline::new(TextExtractor::new(mode), budgeter, client, variant)
    }

    /// The payload part of a captured prompt.
    fn payload_of(prompt: &str, variant: SchemaVariant, mode: ExtractionMode) -> String {
        let header = template(variant, mode);
        prompt
            .strip_prefix(&header)
            .and_then(|rest| rest.strip_prefix('\n'))
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_run_returns_record_from_wrapped_reply() {
        let client = Arc::new(FakeCompletionClient::replying(REPLY));
        let p = pipeline(client.clone(), ExtractionMode::Text, 2_000, SchemaVariant::Basic);

        let record = p.run(word_doc("Jane Doe, Rust engineer")).await.unwrap();

        assert_eq!(record.profile.location.current, "Bengaluru");
        assert_eq!(record.profile.location.relocation, "");
        assert_eq!(record.profile.skills[0].years_of_experience, "5");
        assert!(record.profile.professional_experience.is_empty());
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_long_text_is_truncated_to_budget_before_sending() {
        let client = Arc::new(FakeCompletionClient::replying(REPLY));
        let p = pipeline(client.clone(), ExtractionMode::Text, 2_000, SchemaVariant::Extended);
        let long_text = "Designed distributed systems. ".repeat(50_000 / 30 + 1);
        assert!(long_text.len() >= 50_000);

        let record = p.run(word_doc(&long_text)).await.unwrap();

        let prompt = client.last_prompt().unwrap();
        let payload = payload_of(&prompt, SchemaVariant::Extended, ExtractionMode::Text);
        assert!(CharHeuristicEstimator.estimate(&payload) <= 2_000);
        assert!(long_text.starts_with(&payload));

        let value = serde_json::to_value(&record).unwrap();
        let profile = &value["profile"];
        for key in [
            "location",
            "certifications",
            "education",
            "professionalExperience",
            "skills",
            "links",
        ] {
            assert!(profile.get(key).is_some(), "missing {key}");
        }
        assert_eq!(profile["education"]["degree"], "");
        assert_eq!(profile["links"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_long_pdf_is_truncated_to_budget_before_sending() {
        let client = Arc::new(FakeCompletionClient::replying(REPLY));
        let p = pipeline(client.clone(), ExtractionMode::Text, 2_000, SchemaVariant::Basic);
        let page = "Designed distributed systems ".repeat(25_000 / 29 + 1);
        let doc = Document::new(build_pdf(&[&page, &page]), DocumentFormat::Pdf);

        let record = p.run(doc).await.unwrap();

        let prompt = client.last_prompt().unwrap();
        let payload = payload_of(&prompt, SchemaVariant::Basic, ExtractionMode::Text);
        assert!(payload.starts_with("Designed"));
        assert!(CharHeuristicEstimator.estimate(&payload) <= 2_000);
        assert!(payload.chars().count() > 2_000 * 3);
        assert_eq!(client.calls(), 1);

        let value = serde_json::to_value(&record).unwrap();
        for key in ["location", "education", "professionalExperience", "skills"] {
            assert!(value["profile"].get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["profile"]["location"]["current"], "Bengaluru");
    }

    #[tokio::test]
    async fn test_unknown_format_fails_in_raw_mode_too() {
        let client = Arc::new(FakeCompletionClient::replying(REPLY));
        let p = pipeline(client.clone(), ExtractionMode::Raw, 2_000, SchemaVariant::Basic);
        let doc = Document::new(b"plain text".to_vec(), DocumentFormat::Unknown);

        let err = p.run(doc).await.unwrap_err();

        assert_eq!(err.stage, Stage::Extraction);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_document_fails_without_calling_model() {
        let client = Arc::new(FakeCompletionClient::replying(REPLY));
        let p = pipeline(client.clone(), ExtractionMode::Text, 2_000, SchemaVariant::Basic);

        let err = p.run(word_doc("   ")).await.unwrap_err();

        assert_eq!(err.stage, Stage::Extraction);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_pdf_fails_at_extraction() {
        let client = Arc::new(FakeCompletionClient::replying(REPLY));
        let p = pipeline(client.clone(), ExtractionMode::Text, 2_000, SchemaVariant::Basic);
        let doc = Document::new(b"%PDF-1.4 truncated".to_vec(), DocumentFormat::Pdf);

        let err = p.run(doc).await.unwrap_err();

        assert_eq!(err.stage, Stage::Extraction);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_raw_mode_sends_base64_payload() {
        let client = Arc::new(FakeCompletionClient::replying(REPLY));
        let p = pipeline(client.clone(), ExtractionMode::Raw, 2_000, SchemaVariant::Basic);
        let doc = Document::new(b"%PDF-1.4 binary".to_vec(), DocumentFormat::Pdf);

        p.run(doc).await.unwrap();

        let prompt = client.last_prompt().unwrap();
        assert!(prompt.contains("base64 encoded document"));
        assert_eq!(
            payload_of(&prompt, SchemaVariant::Basic, ExtractionMode::Raw),
            "JVBERi0xLjQgYmluYXJ5"
        );
    }

    #[tokio::test]
    async fn test_completion_failure_is_surfaced_with_stage() {
        let client = Arc::new(FakeCompletionClient::failing(429, "quota exceeded"));
        let p = pipeline(client.clone(), ExtractionMode::Text, 2_000, SchemaVariant::Basic);

        let err = p.run(word_doc("Jane Doe")).await.unwrap_err();

        assert_eq!(err.stage, Stage::Completion);
        assert!(err.message.contains("quota exceeded"));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_reply_without_json_is_malformed() {
        let client = Arc::new(FakeCompletionClient::replying("I could not process this file."));
        let p = pipeline(client, ExtractionMode::Text, 2_000, SchemaVariant::Basic);

        let err = p.run(word_doc("Jane Doe")).await.unwrap_err();

        assert_eq!(err.stage, Stage::MalformedResponse);
        assert_eq!(err.message, "no JSON object found");
    }

    #[test]
    fn test_preview_cuts_on_char_boundary() {
        let text = "é".repeat(600);
        assert_eq!(preview(&text).chars().count(), RESPONSE_PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }
}
