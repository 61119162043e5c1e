//! In-memory facts index over the extracted role records

use super::records::{AttributeValue, RoleRecord, StipendEntry};
use super::FactsStore;
use crate::error::{PlacementError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Role records plus a lowercase company index
pub struct FactsIndex {
    records: Vec<RoleRecord>,
    by_company: BTreeMap<String, Vec<usize>>,
}

impl FactsIndex {
    /// Load the JSON array of role records written by the extractor
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PlacementError::DataNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let records: Vec<RoleRecord> = serde_json::from_str(&content)
            .map_err(|e| PlacementError::malformed(path, e))?;

        tracing::info!("Loaded {} facts from {}", records.len(), path.display());
        Ok(Self::from_records(records))
    }

    pub fn from_records(records: Vec<RoleRecord>) -> Self {
        let mut by_company: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, record) in records.iter().enumerate() {
            let company = record.company_name.trim().to_lowercase();
            if !company.is_empty() {
                by_company.entry(company).or_default().push(idx);
            }
        }
        tracing::debug!("Indexed {} companies", by_company.len());
        Self {
            records,
            by_company,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> FactsStats {
        let amounts: Vec<f64> = self
            .records
            .iter()
            .filter_map(RoleRecord::stipend_amount)
            .collect();

        let mut locations: BTreeMap<String, usize> = BTreeMap::new();
        for record in &self.records {
            for location in &record.location {
                *locations.entry(location.clone()).or_default() += 1;
            }
        }

        FactsStats {
            total_entries: self.records.len(),
            total_companies: self.by_company.len(),
            avg_stipend: (!amounts.is_empty())
                .then(|| amounts.iter().sum::<f64>() / amounts.len() as f64),
            max_stipend: amounts.iter().copied().reduce(f64::max),
            min_stipend: amounts.iter().copied().reduce(f64::min),
            locations,
        }
    }

    fn matching<F>(&self, predicate: F) -> Vec<RoleRecord>
    where
        F: Fn(&RoleRecord) -> bool,
    {
        self.records
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    fn attribute_of(record: &RoleRecord, attribute: &str) -> Value {
        match attribute {
            "stipend" => json!(record.stipend_salary),
            "location" => json!(record.location),
            "duration" => json!(record.duration),
            "cgpa" => json!(record.eligibility.as_ref().and_then(|e| e.cgpa_pg.clone())),
            "branches" => json!(record.branches()),
            "selection_process" => json!(record.selection_process),
            "work_mode" => json!(record.work_mode),
            "apply_before" => json!(record.apply_before),
            other => serde_json::to_value(record)
                .ok()
                .and_then(|v| v.get(other).cloned())
                .unwrap_or(Value::Null),
        }
    }
}

impl FactsStore for FactsIndex {
    fn get_by_company(&self, company: &str) -> Vec<RoleRecord> {
        let needle = company.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let indices: Vec<usize> = match self.by_company.get(&needle) {
            Some(exact) => exact.clone(),
            None => self
                .by_company
                .iter()
                .filter(|(name, _)| name.contains(&needle) || needle.contains(name.as_str()))
                .flat_map(|(_, idx)| idx.iter().copied())
                .collect(),
        };

        indices.into_iter().map(|i| self.records[i].clone()).collect()
    }

    fn get_all_companies(&self) -> Vec<String> {
        let mut companies: Vec<String> = self
            .by_company
            .values()
            .filter_map(|idx| idx.first())
            .map(|&i| self.records[i].company_name.trim().to_string())
            .collect();
        companies.sort();
        companies
    }

    fn get_all_stipends(&self) -> Vec<StipendEntry> {
        self.records
            .iter()
            .map(|r| StipendEntry {
                company: r.company_name.clone(),
                role: r.role().to_string(),
                primary_key: r.primary_key.clone(),
                stipend: r.stipend_salary.as_ref().and_then(|s| s.amount.clone()),
            })
            .collect()
    }

    fn filter_by_stipend(&self, min: Option<f64>, max: Option<f64>) -> Vec<RoleRecord> {
        if min.is_none() && max.is_none() {
            return self.records.clone();
        }
        self.matching(|r| match r.stipend_amount() {
            Some(amount) => {
                min.map_or(true, |m| amount >= m) && max.map_or(true, |m| amount <= m)
            }
            None => false,
        })
    }

    fn filter_by_cgpa(&self, max: f64) -> Vec<RoleRecord> {
        self.matching(|r| r.cgpa_pg().map_or(true, |cgpa| cgpa <= max))
    }

    fn filter_by_location(&self, location: &str) -> Vec<RoleRecord> {
        let needle = location.trim().to_lowercase();
        self.matching(|r| r.locations_joined().to_lowercase().contains(&needle))
    }

    fn filter_by_branch(&self, branch: &str) -> Vec<RoleRecord> {
        let needle = branch.trim().to_lowercase();
        self.matching(|r| r.branches().join(", ").to_lowercase().contains(&needle))
    }

    fn search_attribute(
        &self,
        attribute: &str,
        companies: Option<&[String]>,
    ) -> Vec<AttributeValue> {
        let wanted: Option<Vec<String>> =
            companies.map(|cs| cs.iter().map(|c| c.trim().to_lowercase()).collect());
        let attribute = attribute.trim().to_lowercase();

        self.records
            .iter()
            .filter(|r| match &wanted {
                Some(list) => list.contains(&r.company_name.trim().to_lowercase()),
                None => true,
            })
            .map(|r| AttributeValue {
                company: r.company_name.clone(),
                role: r.role().to_string(),
                primary_key: r.primary_key.clone(),
                value: Self::attribute_of(r, &attribute),
            })
            .collect()
    }

    fn all_records(&self) -> Vec<RoleRecord> {
        self.records.clone()
    }
}

/// Summary numbers for `status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactsStats {
    pub total_entries: usize,
    pub total_companies: usize,
    pub avg_stipend: Option<f64>,
    pub max_stipend: Option<f64>,
    pub min_stipend: Option<f64>,
    pub locations: BTreeMap<String, usize>,
}
