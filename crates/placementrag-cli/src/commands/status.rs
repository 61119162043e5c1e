//! Status command

use crate::app::OutputFormat;
use crate::output;
use anyhow::Result;
use placementrag_core::{ClientEncoder, Config, FactsIndex, SemanticIndex};
use std::sync::Arc;

pub async fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let facts = FactsIndex::load(&config.data.facts_file)?;
    let encoder = Arc::new(ClientEncoder::from_service(config.llm_service.clone())?);
    let semantic = SemanticIndex::load(&config.data.semantic_index_file, encoder)?;

    print!(
        "{}",
        output::format_status(&facts.stats(), &semantic.stats(), format)?
    );
    Ok(())
}
