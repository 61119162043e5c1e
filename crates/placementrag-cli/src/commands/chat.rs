//! Interactive chat loop

use super::Session;
use crate::app::{ChatArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use placementrag_core::Config;
use std::io::{BufRead, Write};

const PROMPT: &str = "placementrag> ";

pub async fn run(args: ChatArgs, config: &Config, format: OutputFormat, verbose: bool) -> Result<()> {
    let session = Session::open(config, args.no_llm)?;

    if format == OutputFormat::Cli {
        println!(
            "Ask about companies, stipends, eligibility or selection processes. \
             Type 'companies' to list companies, 'quit' to leave."
        );
    }

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        if format == OutputFormat::Cli {
            print!("{}", PROMPT);
            std::io::stdout().flush()?;
        }

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let input = line.trim();

        match input.to_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" => break,
            "companies" => {
                print!("{}", output::format_companies(&session.agent.get_companies(), format));
                continue;
            }
            _ => {}
        }

        let response = session.agent.query(input).await;
        let metrics = session.llm_in_use().then(|| session.client.metrics());
        output::print_response(&response, metrics.as_ref(), format, verbose)?;
    }

    Ok(())
}
