// Résumé extraction prompt templates.
// The target JSON shape is fixed per schema variant; callers cannot change it.

use crate::extraction::text_extractor::ExtractionMode;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::models::resume::SchemaVariant;

pub const RESUME_EXTRACT_SYSTEM: &str = JSON_ONLY_SYSTEM;

const BASIC_SCHEMA: &str = r#"{
  "profile": {
    "location": {"current": "", "relocation": ""},
    "education": {"college": "", "degree": "", "stream": ""},
    "professionalExperience": [
      {
        "company": "",
        "from": "",
        "to": "",
        "description": [""]
      }
    ],
    "skills": [{"skill": "", "yearsOfExperience": ""}]
  }
}"#;

const EXTENDED_SCHEMA: &str = r#"{
  "profile": {
    "location": {"current": "", "relocation": ""},
    "certifications": {"select": "", "uploadOrUrl": ""},
    "education": {"college": "", "degree": "", "stream": ""},
    "professionalExperience": [
      {
        "company": "",
        "from": "",
        "to": "",
        "compensationDetails": {"inHand": "", "rsus": "", "bonus": "", "otherBenefits": ""},
        "noticePeriod": "",
        "description": [""]
      }
    ],
    "skills": [{"skill": "", "yearsOfExperience": ""}],
    "links": []
  }
}"#;

const TEXT_INSTRUCTION: &str =
    "Extract resume information from the following text. Return a JSON object with key details:";
const TEXT_LABEL: &str = "Resume Text: ";

const RAW_INSTRUCTION: &str = "Extract resume information from this base64 encoded document. \
Return a JSON object with key information:";
const RAW_LABEL: &str = "Document: ";

/// A fully assembled completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: &'static str,
    pub prompt: String,
}

/// The fixed instruction header for a schema variant and extraction mode.
pub fn template(variant: SchemaVariant, mode: ExtractionMode) -> String {
    let schema = match variant {
        SchemaVariant::Basic => BASIC_SCHEMA,
        SchemaVariant::Extended => EXTENDED_SCHEMA,
    };
    let (instruction, label) = match mode {
        ExtractionMode::Text => (TEXT_INSTRUCTION, TEXT_LABEL),
        ExtractionMode::Raw => (RAW_INSTRUCTION, RAW_LABEL),
    };
    format!("{instruction}\n{schema}\n\n{label}")
}

/// Template, a newline, then the payload verbatim. No escaping.
pub fn build(template: &str, payload: &str) -> CompletionRequest {
    let mut prompt = String::with_capacity(template.len() + payload.len() + 1);
    prompt.push_str(template);
    prompt.push('\n');
    prompt.push_str(payload);
    CompletionRequest {
        system: RESUME_EXTRACT_SYSTEM,
        prompt,
    }
}
