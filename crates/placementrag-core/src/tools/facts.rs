//! Structured lookups over the facts store

use super::{FactsAction, MatchCriterion, ToolData, ToolId, ToolResult};
use crate::store::FactsStore;
use std::sync::Arc;
use tracing::debug;

pub struct FactsLookupTool {
    store: Arc<dyn FactsStore>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl FactsLookupTool {
    pub fn new(store: Arc<dyn FactsStore>) -> Self {
        Self { store }
    }

    pub fn run(&self, action: &FactsAction) -> ToolResult {
        debug!(action = action.name(), "facts lookup");
        let tool = ToolId::FactsLookup;

        match action {
            FactsAction::GetAllCompanies => {
                let companies = self.store.get_all_companies();
                let message = format!("Found {} companies", companies.len());
                ToolResult::success(
                    tool,
                    "get_all_companies",
                    ToolData::Companies { companies },
                    message,
                )
            }

            FactsAction::GetCompanyDetails { company } => {
                let Some(company) = present(company) else {
                    return ToolResult::failure(tool, "get_company_details", "Company name required");
                };
                let key = format!("get_company_details:{}", company);
                let roles = self.store.get_by_company(company);
                if roles.is_empty() {
                    return ToolResult::failure(
                        tool,
                        key,
                        format!("No data found for company: {}", company),
                    );
                }
                let message = format!("Found {} roles for {}", roles.len(), company);
                ToolResult::success(
                    tool,
                    key,
                    ToolData::Roles {
                        company: company.to_string(),
                        roles,
                    },
                    message,
                )
            }

            FactsAction::GetAllStipends => {
                let stipends = self.store.get_all_stipends();
                let message = format!("Retrieved stipend info for {} roles", stipends.len());
                ToolResult::success(tool, "get_all_stipends", ToolData::Stipends { stipends }, message)
            }

            FactsAction::FilterByStipend {
                min_value,
                max_value,
            } => {
                let mut bounds = Vec::new();
                if let Some(min) = min_value {
                    bounds.push(format!(">={}", min));
                }
                if let Some(max) = max_value {
                    bounds.push(format!("<={}", max));
                }
                let results = self.store.filter_by_stipend(*min_value, *max_value);
                let message = format!(
                    "Found {} roles with stipend {}",
                    results.len(),
                    bounds.join(", ")
                );
                ToolResult::success(
                    tool,
                    format!("filter_by_stipend:{}", bounds.join(",")),
                    ToolData::Matches {
                        criterion: MatchCriterion::Stipend {
                            min: *min_value,
                            max: *max_value,
                        },
                        results,
                    },
                    message,
                )
            }

            FactsAction::FilterByCgpa { max_value } => {
                let results = self.store.filter_by_cgpa(*max_value);
                let message = format!(
                    "Found {} roles with CGPA requirement <= {}",
                    results.len(),
                    max_value
                );
                ToolResult::success(
                    tool,
                    format!("filter_by_cgpa:<={}", max_value),
                    ToolData::Matches {
                        criterion: MatchCriterion::Cgpa { max: *max_value },
                        results,
                    },
                    message,
                )
            }

            FactsAction::FilterByLocation { location } => {
                let location = location.trim();
                if location.is_empty() {
                    return ToolResult::failure(tool, "filter_by_location", "Location required");
                }
                let results = self.store.filter_by_location(location);
                let message = format!("Found {} roles in {}", results.len(), location);
                ToolResult::success(
                    tool,
                    format!("filter_by_location:{}", location),
                    ToolData::Matches {
                        criterion: MatchCriterion::Location {
                            location: location.to_string(),
                        },
                        results,
                    },
                    message,
                )
            }

            FactsAction::FilterByBranch { branch } => {
                let branch = branch.trim();
                if branch.is_empty() {
                    return ToolResult::failure(tool, "filter_by_branch", "Branch required");
                }
                let results = self.store.filter_by_branch(branch);
                let message = format!("Found {} roles for {} students", results.len(), branch);
                ToolResult::success(
                    tool,
                    format!("filter_by_branch:{}", branch),
                    ToolData::Matches {
                        criterion: MatchCriterion::Branch {
                            branch: branch.to_string(),
                        },
                        results,
                    },
                    message,
                )
            }

            FactsAction::GetAttribute { attribute, company } => {
                let attribute = attribute.trim();
                if attribute.is_empty() {
                    return ToolResult::failure(tool, "get_attribute", "Attribute name required");
                }
                let companies = present(company).map(|c| vec![c.to_string()]);
                let values = self.store.search_attribute(attribute, companies.as_deref());
                let message = format!("Retrieved '{}' for {} roles", attribute, values.len());
                ToolResult::success(
                    tool,
                    format!("get_attribute:{}", attribute),
                    ToolData::Attribute {
                        attribute: attribute.to_string(),
                        values,
                    },
                    message,
                )
            }

            FactsAction::GetEligibility { company } => {
                let company = present(company);
                let results = match company {
                    Some(c) => self.store.get_by_company(c),
                    None => self.store.all_records(),
                };
                let message = format!("Retrieved eligibility for {} roles", results.len());
                ToolResult::success(
                    tool,
                    format!("get_eligibility:{}", company.unwrap_or("all")),
                    ToolData::Matches {
                        criterion: MatchCriterion::Eligibility {
                            company: company.map(str::to_string),
                        },
                        results,
                    },
                    message,
                )
            }

            FactsAction::GetSelectionProcess { company } => {
                let company = present(company);
                let results = match company {
                    Some(c) => self.store.get_by_company(c),
                    None => self.store.all_records(),
                };
                let message = format!("Retrieved selection process for {} roles", results.len());
                ToolResult::success(
                    tool,
                    format!("get_selection_process:{}", company.unwrap_or("all")),
                    ToolData::Matches {
                        criterion: MatchCriterion::SelectionProcess {
                            company: company.map(str::to_string),
                        },
                        results,
                    },
                    message,
                )
            }
        }
    }
}
