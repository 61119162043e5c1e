//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "placementrag")]
#[command(
    author,
    version,
    about = "Ask questions about internship and placement postings"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Show the plan, critic verdict and LLM metrics
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer a single question
    Ask(AskArgs),

    /// Interactive question loop
    Chat(ChatArgs),

    /// List known companies
    Companies,

    /// Show store statistics
    Status,
}

#[derive(Args)]
pub struct AskArgs {
    /// Question text
    pub query: Vec<String>,

    /// Use the rule-based planner, critic and synthesizer only
    #[arg(long)]
    pub no_llm: bool,
}

#[derive(Args)]
pub struct ChatArgs {
    /// Use the rule-based planner, critic and synthesizer only
    #[arg(long)]
    pub no_llm: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
    Md,
}
