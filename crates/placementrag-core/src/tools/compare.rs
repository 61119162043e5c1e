//! Side-by-side comparison of two or more companies

use super::{CompareParams, CompareType, ToolData, ToolId, ToolResult};
use crate::store::{parse_number, ChunkType, FactsStore, RoleRecord, SemanticStore};
use crate::text::{humanize, truncate_chars};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_ATTRIBUTES: [&str; 6] = [
    "stipend",
    "cgpa",
    "location",
    "duration",
    "num_rounds",
    "work_mode",
];

/// Characters kept per semantic section in a detailed profile
const PROFILE_TEXT_CHARS: usize = 500;

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub company: String,
    pub role: String,
    /// One cell per entry of `ComparisonTable::attributes`
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub companies: Vec<String>,
    pub attributes: Vec<String>,
    pub rows: Vec<ComparisonRow>,
    /// ASCII rendering of `rows`
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub company: String,
    pub role: Option<String>,
    pub stipend: Option<String>,
    pub locations: Vec<String>,
    pub cgpa: Option<String>,
    pub rounds: Vec<String>,
    pub about: String,
    pub skills_required: String,
    pub interview_process: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub rank: usize,
    pub company: String,
    pub role: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub ranked_by: String,
    pub descending: bool,
    pub entries: Vec<RankEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyScore {
    pub company: String,
    pub score: f64,
    pub details: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestFor {
    pub criteria: Vec<String>,
    pub best: Option<String>,
    /// Highest score first
    pub scores: Vec<CompanyScore>,
}

pub struct CompareCompaniesTool {
    facts: Arc<dyn FactsStore>,
    semantic: Arc<dyn SemanticStore>,
}

impl CompareCompaniesTool {
    pub fn new(facts: Arc<dyn FactsStore>, semantic: Arc<dyn SemanticStore>) -> Self {
        Self { facts, semantic }
    }

    pub fn run(&self, params: &CompareParams) -> ToolResult {
        let companies: Vec<String> = params
            .companies
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        if companies.len() < 2 {
            return ToolResult::failure(
                ToolId::CompareCompanies,
                format!("{:?}", companies),
                "At least 2 companies required for comparison",
            );
        }
        debug!(?companies, kind = ?params.comparison_type, "comparing companies");

        match params.comparison_type {
            CompareType::Table => self.table(&companies, params.attributes.as_deref()),
            CompareType::Detailed => self.detailed(&companies),
            CompareType::Ranking => {
                self.ranking(&companies, params.rank_by.as_deref().unwrap_or("stipend"))
            }
            CompareType::BestFor => self.best_for(&companies, params.attributes.as_deref()),
        }
    }

    /// First role on record for a company
    fn first_role(&self, company: &str) -> Option<RoleRecord> {
        self.facts.get_by_company(company).into_iter().next()
    }

    fn table(&self, companies: &[String], attributes: Option<&[String]>) -> ToolResult {
        let attributes: Vec<String> = match attributes {
            Some(attrs) if !attrs.is_empty() => attrs.to_vec(),
            _ => DEFAULT_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
        };

        let rows: Vec<ComparisonRow> = companies
            .iter()
            .filter_map(|company| {
                let record = self.first_role(company)?;
                Some(ComparisonRow {
                    company: company.clone(),
                    role: record.role().to_string(),
                    values: attributes.iter().map(|a| cell(&record, a)).collect(),
                })
            })
            .collect();

        let found: Vec<String> = rows.iter().map(|r| r.company.clone()).collect();
        let message = format!(
            "Compared {} companies on {} attributes",
            found.len(),
            attributes.len()
        );
        let table = render_table(&rows, &attributes);

        ToolResult::success(
            ToolId::CompareCompanies,
            format!("compare:{}", companies.join(",")),
            ToolData::ComparisonTable(ComparisonTable {
                companies: found,
                attributes,
                rows,
                table,
            }),
            message,
        )
    }

    fn detailed(&self, companies: &[String]) -> ToolResult {
        let mut profiles = Vec::new();

        for company in companies {
            let record = self.first_role(company);
            let chunks = self.semantic.get_all_by_company(company);
            if record.is_none() && chunks.is_empty() {
                continue;
            }

            let section = |kind: ChunkType| {
                chunks
                    .iter()
                    .find(|c| c.chunk_type == kind)
                    .map(|c| truncate_chars(&c.text, PROFILE_TEXT_CHARS).to_string())
                    .unwrap_or_default()
            };

            profiles.push(CompanyProfile {
                company: company.clone(),
                role: record.as_ref().map(|r| r.role().to_string()),
                stipend: record
                    .as_ref()
                    .and_then(|r| r.stipend_salary.as_ref())
                    .map(ToString::to_string),
                locations: record.as_ref().map(|r| r.location.clone()).unwrap_or_default(),
                cgpa: record
                    .as_ref()
                    .and_then(|r| r.cgpa_requirement())
                    .map(str::to_string),
                rounds: record
                    .as_ref()
                    .map(|r| r.selection_process.iter().map(|s| s.name.clone()).collect())
                    .unwrap_or_default(),
                about: section(ChunkType::AboutCompany),
                skills_required: section(ChunkType::SkillsRequired),
                interview_process: section(ChunkType::InterviewProcess),
            });
        }

        let message = format!(
            "Generated detailed comparison for {} companies",
            profiles.len()
        );
        ToolResult::success(
            ToolId::CompareCompanies,
            format!("detailed:{}", companies.join(",")),
            ToolData::ComparisonDetail { profiles },
            message,
        )
    }

    fn ranking(&self, companies: &[String], rank_by: &str) -> ToolResult {
        let rank_by = rank_by.trim().to_lowercase();
        let mut entries: Vec<RankEntry> = companies
            .iter()
            .filter_map(|company| {
                let record = self.first_role(company)?;
                let value = match rank_by.as_str() {
                    "stipend" => record.stipend_amount(),
                    "cgpa" => record.cgpa_requirement().and_then(parse_number),
                    "rounds" | "num_rounds" => Some(record.selection_process.len() as f64),
                    _ => None,
                }?;
                Some(RankEntry {
                    rank: 0,
                    company: company.clone(),
                    role: record.role().to_string(),
                    value,
                })
            })
            .collect();

        // Higher stipend ranks first; lower CGPA bar and fewer rounds rank first
        let descending = rank_by == "stipend";
        entries.sort_by(|a, b| {
            if descending {
                b.value.total_cmp(&a.value)
            } else {
                a.value.total_cmp(&b.value)
            }
        });
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = i + 1;
        }

        let message = format!("Ranked {} companies by {}", entries.len(), rank_by);
        ToolResult::success(
            ToolId::CompareCompanies,
            format!("rank:{}", rank_by),
            ToolData::Ranking(Ranking {
                ranked_by: rank_by,
                descending,
                entries,
            }),
            message,
        )
    }

    fn best_for(&self, companies: &[String], criteria: Option<&[String]>) -> ToolResult {
        let criteria: Vec<String> = match criteria {
            Some(c) if !c.is_empty() => c.to_vec(),
            _ => vec!["stipend".to_string()],
        };

        let mut scores: Vec<CompanyScore> = companies
            .iter()
            .filter_map(|company| {
                let record = self.first_role(company)?;
                let mut score = 0.0;
                let mut details = BTreeMap::new();

                for criterion in &criteria {
                    match criterion.as_str() {
                        "stipend" => {
                            if let Some(amount) = record.stipend_amount().filter(|v| *v > 0.0) {
                                score += amount / 10000.0;
                                details.insert("stipend".to_string(), amount);
                            }
                        }
                        "low_cgpa" => {
                            let cgpa = record.cgpa_requirement().and_then(parse_number);
                            if let Some(cgpa) = cgpa.filter(|v| *v > 0.0) {
                                score += 10.0 - cgpa;
                                details.insert("cgpa".to_string(), cgpa);
                            }
                        }
                        "few_rounds" => {
                            let rounds = record.selection_process.len();
                            if rounds > 0 {
                                score += 10.0 - rounds as f64;
                                details.insert("rounds".to_string(), rounds as f64);
                            }
                        }
                        _ => {}
                    }
                }

                Some(CompanyScore {
                    company: company.clone(),
                    score,
                    details,
                })
            })
            .collect();

        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        let best = scores.first().map(|s| s.company.clone());
        let message = format!(
            "Best company: {} based on {}",
            best.as_deref().unwrap_or(NOT_AVAILABLE),
            criteria.join(", ")
        );

        ToolResult::success(
            ToolId::CompareCompanies,
            format!("best_for:{}", criteria.join(",")),
            ToolData::BestFor(BestFor {
                criteria,
                best,
                scores,
            }),
            message,
        )
    }
}

fn or_na(value: &str) -> String {
    if value.trim().is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        value.trim().to_string()
    }
}

fn cell(record: &RoleRecord, attribute: &str) -> String {
    match attribute {
        "stipend" => or_na(
            record
                .stipend_salary
                .as_ref()
                .and_then(|s| s.amount.as_deref())
                .unwrap_or_default(),
        ),
        "cgpa" => or_na(record.cgpa_requirement().unwrap_or_default()),
        "location" => or_na(&record.locations_joined()),
        "num_rounds" => record.selection_process.len().to_string(),
        "duration" => or_na(&record.duration),
        "work_mode" => or_na(&record.work_mode),
        other => match serde_json::to_value(record)
            .ok()
            .and_then(|v| v.get(other).cloned())
        {
            Some(Value::String(s)) => or_na(&s),
            Some(Value::Null) | None => NOT_AVAILABLE.to_string(),
            Some(v) => v.to_string(),
        },
    }
}

/// Attributes as rows, companies as columns
fn render_table(rows: &[ComparisonRow], attributes: &[String]) -> String {
    if rows.is_empty() {
        return "No data to compare".to_string();
    }

    let mut grid: Vec<Vec<String>> = Vec::with_capacity(attributes.len() + 2);
    grid.push(
        std::iter::once("Attribute".to_string())
            .chain(rows.iter().map(|r| r.company.clone()))
            .collect(),
    );
    grid.push(
        std::iter::once("Role".to_string())
            .chain(rows.iter().map(|r| r.role.clone()))
            .collect(),
    );
    for (i, attr) in attributes.iter().enumerate() {
        grid.push(
            std::iter::once(humanize(attr))
                .chain(rows.iter().map(|r| r.values[i].clone()))
                .collect(),
        );
    }

    let widths: Vec<usize> = (0..grid[0].len())
        .map(|col| {
            grid.iter()
                .map(|row| row[col].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let separator = format!(
        "+{}+",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );
    let render_row = |row: &[String]| {
        format!(
            "|{}|",
            row.iter()
                .zip(&widths)
                .map(|(cell, w)| format!(" {:<width$} ", cell, width = *w))
                .collect::<Vec<_>>()
                .join("|")
        )
    };

    let mut lines = vec![separator.clone(), render_row(&grid[0]), separator.clone()];
    lines.extend(grid[1..].iter().map(|row| render_row(row)));
    lines.push(separator);
    lines.join("\n")
}
