//! Fixtures shared by unit tests

use crate::error::Result;
use crate::store::{
    ChunkType, Eligibility, FactsIndex, FactsStore, RoleRecord, SelectionRound, SemanticChunk,
    SemanticHit, SemanticQuery, SemanticStore, Stipend,
};
use async_trait::async_trait;
use std::sync::Arc;

pub fn role(company: &str, stipend: Option<&str>, cgpa: Option<&str>, city: &str) -> RoleRecord {
    RoleRecord {
        primary_key: format!("{}_intern", company.to_lowercase().replace(' ', "_")),
        company_name: company.to_string(),
        role_title: "Software Intern".to_string(),
        stipend_salary: stipend.map(|a| Stipend {
            amount: Some(a.to_string()),
            currency: "INR".to_string(),
            period: "per month".to_string(),
        }),
        duration: "6 months".to_string(),
        location: vec![city.to_string()],
        eligibility: Some(Eligibility {
            cgpa_pg: cgpa.map(str::to_string),
            branches: vec!["CSE".to_string(), "ECE".to_string()],
            ..Default::default()
        }),
        selection_process: vec![
            SelectionRound {
                round: Some("1".into()),
                name: "Online test".into(),
                details: String::new(),
            },
            SelectionRound {
                round: Some("2".into()),
                name: "Technical interview".into(),
                details: String::new(),
            },
        ],
        ..Default::default()
    }
}

pub fn facts() -> Arc<dyn FactsStore> {
    Arc::new(FactsIndex::from_records(vec![
        role("Dell", Some("45000"), Some("8.0"), "Bangalore"),
        role("Intel", Some("30,000"), Some("7.5"), "Hyderabad"),
        role("Bosch", Some("50000"), Some("6.5"), "Pune"),
    ]))
}

pub fn chunk(company: &str, chunk_type: ChunkType, text: &str) -> SemanticChunk {
    SemanticChunk {
        chunk_id: format!("{}_{}", company.to_lowercase(), chunk_type),
        primary_key: format!("{}_intern", company.to_lowercase()),
        company: company.to_string(),
        role: "Software Intern".to_string(),
        chunk_type,
        text: text.to_string(),
        source: format!("{}.pdf", company.to_lowercase()),
    }
}

/// Semantic store scoring chunks by shared lowercase words with the query
pub struct WordOverlapStore {
    pub chunks: Vec<SemanticChunk>,
}

impl WordOverlapStore {
    fn score(query: &str, text: &str) -> f32 {
        let text = text.to_lowercase();
        let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if words.is_empty() {
            return 0.0;
        }
        let hits = words.iter().filter(|w| text.contains(w.as_str())).count();
        hits as f32 / words.len() as f32
    }
}

#[async_trait]
impl SemanticStore for WordOverlapStore {
    async fn search(&self, query: &SemanticQuery) -> Result<Vec<SemanticHit>> {
        let company = query.company.as_ref().map(|c| c.to_lowercase());
        let mut hits: Vec<SemanticHit> = self
            .chunks
            .iter()
            .filter(|c| {
                company
                    .as_ref()
                    .map_or(true, |f| c.company.to_lowercase().contains(f))
            })
            .filter(|c| query.chunk_type.map_or(true, |t| c.chunk_type == t))
            .map(|c| {
                let haystack = format!("{} {}", c.company, c.text);
                SemanticHit::from_chunk(c, Self::score(&query.query, &haystack))
            })
            .filter(|h| h.score >= query.threshold)
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(query.top_k);
        Ok(hits)
    }

    fn get_all_by_company(&self, company: &str) -> Vec<SemanticChunk> {
        let needle = company.to_lowercase();
        self.chunks
            .iter()
            .filter(|c| c.company.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}

pub fn semantic() -> Arc<dyn SemanticStore> {
    Arc::new(WordOverlapStore {
        chunks: vec![
            chunk(
                "Dell",
                ChunkType::SkillsRequired,
                "Python, Linux and networking skills programming technical",
            ),
            chunk(
                "Dell",
                ChunkType::InterviewProcess,
                "Online test followed by two technical interview rounds",
            ),
            chunk(
                "Dell",
                ChunkType::AboutCompany,
                "Dell builds laptops and servers; company culture is collaborative",
            ),
            chunk(
                "Intel",
                ChunkType::SkillsRequired,
                "C++ and computer architecture skills programming",
            ),
            chunk(
                "Intel",
                ChunkType::RolesResponsibilities,
                "Validate silicon designs; job responsibilities include duties on test benches",
            ),
        ],
    })
}
