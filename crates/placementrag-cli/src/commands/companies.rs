//! Companies command

use crate::app::OutputFormat;
use crate::output;
use anyhow::Result;
use placementrag_core::{Config, FactsIndex, FactsStore};

pub async fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let facts = FactsIndex::load(&config.data.facts_file)?;
    print!("{}", output::format_companies(&facts.get_all_companies(), format));
    Ok(())
}
