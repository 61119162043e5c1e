//! Ask command

use super::Session;
use crate::app::{AskArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use placementrag_core::Config;

pub async fn run(args: AskArgs, config: &Config, format: OutputFormat, verbose: bool) -> Result<()> {
    let query = args.query.join(" ");
    let session = Session::open(config, args.no_llm)?;

    let response = session.agent.query(&query).await;
    let metrics = session.llm_in_use().then(|| session.client.metrics());

    output::print_response(&response, metrics.as_ref(), format, verbose)
}
