// Shared prompt fragments used by every completion request.

/// System instruction that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise resume data extractor. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Use an empty string or empty list for any field the resume does not mention. \
    Do NOT invent values.";
