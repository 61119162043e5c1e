//! Record types shared by the facts and semantic stores
//!
//! Records come out of an LLM extraction step, so field types are not
//! reliable: numbers arrive as strings ("40,000 INR"), lists as single
//! strings, and anything may be `null`. Decoding is lenient throughout.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"[\d.]+").unwrap();
}

/// First numeric run in `text` after dropping thousands separators
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned = text.replace(',', "");
    NUMBER_RE
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// One internship/placement role posting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleRecord {
    #[serde(deserialize_with = "lenient::text")]
    pub primary_key: String,
    #[serde(deserialize_with = "lenient::text")]
    pub company_name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub role_title: String,
    #[serde(deserialize_with = "lenient::text")]
    pub role_name: String,
    #[serde(deserialize_with = "lenient::stipend")]
    pub stipend_salary: Option<Stipend>,
    #[serde(deserialize_with = "lenient::text")]
    pub duration: String,
    #[serde(deserialize_with = "lenient::text_list")]
    pub location: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub work_mode: String,
    #[serde(deserialize_with = "lenient::eligibility")]
    pub eligibility: Option<Eligibility>,
    #[serde(deserialize_with = "lenient::rounds")]
    pub selection_process: Vec<SelectionRound>,
    #[serde(deserialize_with = "lenient::text")]
    pub apply_before: String,
    #[serde(deserialize_with = "lenient::text")]
    pub employment_type: String,
    #[serde(deserialize_with = "lenient::text")]
    pub batch_year: String,
}

impl RoleRecord {
    /// Display role: title, else name, else "N/A"
    pub fn role(&self) -> &str {
        [&self.role_title, &self.role_name]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .map(String::as_str)
            .unwrap_or("N/A")
    }

    pub fn stipend_amount(&self) -> Option<f64> {
        self.stipend_salary
            .as_ref()
            .and_then(|s| s.amount.as_deref())
            .and_then(parse_number)
    }

    /// Minimum CGPA as written, preferring the postgraduate requirement
    pub fn cgpa_requirement(&self) -> Option<&str> {
        let elig = self.eligibility.as_ref()?;
        elig.cgpa_pg
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| elig.cgpa_ug.as_deref().filter(|s| !s.trim().is_empty()))
    }

    pub fn cgpa_pg(&self) -> Option<f64> {
        self.eligibility
            .as_ref()
            .and_then(|e| e.cgpa_pg.as_deref())
            .and_then(parse_number)
    }

    pub fn branches(&self) -> &[String] {
        self.eligibility
            .as_ref()
            .map(|e| e.branches.as_slice())
            .unwrap_or(&[])
    }

    pub fn locations_joined(&self) -> String {
        self.location.join(", ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stipend {
    #[serde(deserialize_with = "lenient::opt_text")]
    pub amount: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub currency: String,
    #[serde(deserialize_with = "lenient::text")]
    pub period: String,
}

impl fmt::Display for Stipend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let amount = self.amount.as_deref().unwrap_or("N/A");
        let symbol = match self.currency.trim().to_uppercase().as_str() {
            "" | "INR" | "RS" | "₹" => "₹".to_string(),
            other => format!("{} ", other),
        };
        if self.period.trim().is_empty() {
            write!(f, "{}{}", symbol, amount)
        } else {
            write!(f, "{}{} {}", symbol, amount, self.period.trim())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Eligibility {
    #[serde(deserialize_with = "lenient::opt_text")]
    pub cgpa_ug: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub cgpa_pg: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub cgpa_10th: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub cgpa_12th: Option<String>,
    #[serde(deserialize_with = "lenient::text_list")]
    pub degrees: Vec<String>,
    #[serde(deserialize_with = "lenient::text_list")]
    pub branches: Vec<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub backlogs: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionRound {
    #[serde(deserialize_with = "lenient::opt_text")]
    pub round: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub details: String,
}

/// Stipend line from `get_all_stipends`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StipendEntry {
    pub company: String,
    pub role: String,
    pub primary_key: String,
    pub stipend: Option<String>,
}

/// One role's value for a requested attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub company: String,
    pub role: String,
    pub primary_key: String,
    pub value: Value,
}

/// Category a semantic chunk was extracted under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    AboutCompany,
    RolesResponsibilities,
    SkillsRequired,
    SkillsOptional,
    InterviewProcess,
    EligibilityCriteria,
    CompensationBenefits,
    #[serde(other)]
    AdditionalInfo,
}

impl ChunkType {
    pub const ALL: [ChunkType; 8] = [
        ChunkType::AboutCompany,
        ChunkType::RolesResponsibilities,
        ChunkType::SkillsRequired,
        ChunkType::SkillsOptional,
        ChunkType::InterviewProcess,
        ChunkType::EligibilityCriteria,
        ChunkType::CompensationBenefits,
        ChunkType::AdditionalInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::AboutCompany => "about_company",
            ChunkType::RolesResponsibilities => "roles_responsibilities",
            ChunkType::SkillsRequired => "skills_required",
            ChunkType::SkillsOptional => "skills_optional",
            ChunkType::InterviewProcess => "interview_process",
            ChunkType::EligibilityCriteria => "eligibility_criteria",
            ChunkType::CompensationBenefits => "compensation_benefits",
            ChunkType::AdditionalInfo => "additional_info",
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        ChunkType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown chunk type: {}", s))
    }
}

/// Text chunk as stored in the semantic index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticChunk {
    #[serde(default)]
    pub chunk_id: String,
    #[serde(default)]
    pub primary_key: String,
    pub company: String,
    #[serde(default)]
    pub role: String,
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,
    pub text: String,
    #[serde(default)]
    pub source: String,
}

/// Scored semantic search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticHit {
    pub company: String,
    pub role: String,
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,
    pub text: String,
    pub source: String,
    pub score: f32,
}

impl SemanticHit {
    pub fn from_chunk(chunk: &SemanticChunk, score: f32) -> Self {
        Self {
            company: chunk.company.clone(),
            role: chunk.role.clone(),
            chunk_type: chunk.chunk_type,
            text: chunk.text.clone(),
            source: chunk.source.clone(),
            score,
        }
    }
}

mod lenient {
    use super::{Eligibility, SelectionRound, Stipend};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(scalar(&Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(scalar(&Value::deserialize(d)?).filter(|s| !s.is_empty()))
    }

    pub fn text_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items
                .iter()
                .filter_map(scalar)
                .filter(|s| !s.is_empty())
                .collect(),
            other => scalar(&other)
                .filter(|s| !s.is_empty())
                .map(|s| vec![s])
                .unwrap_or_default(),
        })
    }

    pub fn stipend<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Stipend>, D::Error> {
        Ok(match Value::deserialize(d)? {
            obj @ Value::Object(_) => serde_json::from_value(obj).ok(),
            other => scalar(&other).filter(|s| !s.is_empty()).map(|amount| Stipend {
                amount: Some(amount),
                currency: "INR".to_string(),
                period: String::new(),
            }),
        })
    }

    pub fn eligibility<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Eligibility>, D::Error> {
        Ok(match Value::deserialize(d)? {
            obj @ Value::Object(_) => serde_json::from_value(obj).ok(),
            _ => None,
        })
    }

    pub fn rounds<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<SelectionRound>, D::Error> {
        let Value::Array(items) = Value::deserialize(d)? else {
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| match item {
                obj @ Value::Object(_) => serde_json::from_value(obj).ok(),
                other => scalar(&other).map(|name| SelectionRound {
                    round: Some((i + 1).to_string()),
                    name,
                    details: String::new(),
                }),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("40,000 INR"), Some(40000.0));
        assert_eq!(parse_number("₹ 45000/month"), Some(45000.0));
        assert_eq!(parse_number("7.5 CGPA"), Some(7.5));
        assert_eq!(parse_number("not disclosed"), None);
    }

    #[test]
    fn test_lenient_record_decoding() {
        let json = r#"{
            "primary_key": "acme_sde",
            "company_name": "Acme",
            "role_title": null,
            "role_name": "SDE Intern",
            "stipend_salary": {"amount": 45000, "currency": "INR", "period": "per month"},
            "location": "Pune",
            "eligibility": {"cgpa_pg": 7, "branches": ["CSE", "ECE"], "backlogs": null},
            "selection_process": ["Online test", {"round": 2, "name": "Interview", "details": "DSA"}],
            "batch_year": 2025
        }"#;
        let record: RoleRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.role(), "SDE Intern");
        assert_eq!(record.stipend_amount(), Some(45000.0));
        assert_eq!(record.location, vec!["Pune".to_string()]);
        assert_eq!(record.cgpa_requirement(), Some("7"));
        assert_eq!(record.branches().len(), 2);
        assert_eq!(record.selection_process.len(), 2);
        assert_eq!(record.selection_process[0].round.as_deref(), Some("1"));
        assert_eq!(record.selection_process[1].name, "Interview");
        assert_eq!(record.batch_year, "2025");
    }

    #[test]
    fn test_stipend_as_plain_text() {
        let record: RoleRecord =
            serde_json::from_str(r#"{"company_name": "X", "stipend_salary": "30,000"}"#).unwrap();
        assert_eq!(record.stipend_amount(), Some(30000.0));
        assert_eq!(record.role(), "N/A");
    }

    #[test]
    fn test_stipend_display() {
        let stipend = Stipend {
            amount: Some("45000".into()),
            currency: "INR".into(),
            period: "per month".into(),
        };
        assert_eq!(stipend.to_string(), "₹45000 per month");
    }

    #[test]
    fn test_chunk_type_parsing() {
        assert_eq!(
            "interview_process".parse::<ChunkType>().unwrap(),
            ChunkType::InterviewProcess
        );
        assert!("general".parse::<ChunkType>().is_err());
        let chunk: SemanticChunk = serde_json::from_str(
            r#"{"company": "Dell", "type": "something_new", "text": "t"}"#,
        )
        .unwrap();
        assert_eq!(chunk.chunk_type, ChunkType::AdditionalInfo);
    }
}
