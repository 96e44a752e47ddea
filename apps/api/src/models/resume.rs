//! The canonical résumé record returned to callers.
//!
//! The record's shape is fixed per `SchemaVariant`: every key is always present,
//! unknown values are `""` or `[]`. `normalize` builds it from whatever JSON the
//! model produced, coercing stray types instead of rejecting them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::extraction::errors::MalformedResponseError;

/// Which target shape the prompt asks for and the record carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchemaVariant {
    /// location, education, professionalExperience, skills
    #[default]
    Basic,
    /// Basic plus certifications, compensationDetails, noticePeriod and links
    Extended,
}

impl SchemaVariant {
    pub fn is_extended(&self) -> bool {
        matches!(self, SchemaVariant::Extended)
    }
}

impl std::str::FromStr for SchemaVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(SchemaVariant::Basic),
            "extended" => Ok(SchemaVariant::Extended),
            other => Err(format!("unknown schema variant '{other}' (expected basic|extended)")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub profile: Profile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certifications: Option<Certifications>,
    pub education: Education,
    pub professional_experience: Vec<Experience>,
    pub skills: Vec<Skill>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub current: String,
    pub relocation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Certifications {
    pub select: String,
    pub upload_or_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub college: String,
    pub degree: String,
    pub stream: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    pub company: String,
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compensation_details: Option<CompensationDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice_period: Option<String>,
    pub description: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompensationDetails {
    pub in_hand: String,
    pub rsus: String,
    pub bonus: String,
    pub other_benefits: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Skill {
    pub skill: String,
    pub years_of_experience: String,
}

impl ResumeRecord {
    /// Builds the record from parsed model output.
    ///
    /// The top level must be an object holding a `profile` object. Everything
    /// below that is best-effort: missing keys become empty values.
    pub fn normalize(value: &Value, variant: SchemaVariant) -> Result<Self, MalformedResponseError> {
        let profile = value
            .get("profile")
            .and_then(Value::as_object)
            .ok_or(MalformedResponseError::MissingProfile)?;

        let extended = variant.is_extended();

        Ok(ResumeRecord {
            profile: Profile {
                location: Location {
                    current: text_at(profile, &["location", "current"]),
                    relocation: text_at(profile, &["location", "relocation"]),
                },
                certifications: extended.then(|| Certifications {
                    select: text_at(profile, &["certifications", "select"]),
                    upload_or_url: text_at(profile, &["certifications", "uploadOrUrl"]),
                }),
                education: Education {
                    college: text_at(profile, &["education", "college"]),
                    degree: text_at(profile, &["education", "degree"]),
                    stream: text_at(profile, &["education", "stream"]),
                },
                professional_experience: objects(profile.get("professionalExperience"))
                    .map(|entry| Experience::normalize(entry, extended))
                    .collect(),
                skills: objects(profile.get("skills"))
                    .map(|entry| Skill {
                        skill: text_at(entry, &["skill"]),
                        years_of_experience: text_at(entry, &["yearsOfExperience"]),
                    })
                    .collect(),
                links: extended.then(|| string_list(profile.get("links"))),
            },
        })
    }
}

impl Experience {
    fn normalize(entry: &Map<String, Value>, extended: bool) -> Self {
        Experience {
            company: text_at(entry, &["company"]),
            from: text_at(entry, &["from"]),
            to: text_at(entry, &["to"]),
            compensation_details: extended.then(|| CompensationDetails {
                in_hand: text_at(entry, &["compensationDetails", "inHand"]),
                rsus: text_at(entry, &["compensationDetails", "rsus"]),
                bonus: text_at(entry, &["compensationDetails", "bonus"]),
                other_benefits: text_at(entry, &["compensationDetails", "otherBenefits"]),
            }),
            notice_period: extended.then(|| text_at(entry, &["noticePeriod"])),
            description: string_list(entry.get("description")),
        }
    }
}

/// Follows `path` through nested objects and renders the leaf as text.
fn text_at(obj: &Map<String, Value>, path: &[&str]) -> String {
    let Some((first, rest)) = path.split_first() else {
        return String::new();
    };
    let mut current = obj.get(*first);
    for key in rest {
        current = current.and_then(|v| v.get(*key));
    }
    current.map(scalar_text).unwrap_or_default()
}

/// Strings pass through; numbers and booleans use their JSON text; anything
/// else has no textual value.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// A list of non-empty strings. A lone string counts as a one-item list.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// The object entries of a JSON array; other entries are skipped.
fn objects(value: Option<&Value>) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}
