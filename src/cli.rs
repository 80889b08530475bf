use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::model::Environment;

#[derive(Parser)]
#[command(name = "scenario-engine")]
#[command(about = "Resolve chat bot replies from authored scenario content", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the reply for one inbound event.
    Resolve(ResolveArgs),
    /// Switch disaster mode on or off.
    DisasterMode(DisasterModeArgs),
}

#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Store directory (settings, scenario/, congestion/, sessions).
    #[arg(long)]
    pub store: PathBuf,
    /// Engine config file (YAML or JSON).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Overrides the configured and SCENARIO_ENVIRONMENT environment.
    #[arg(long, value_enum)]
    pub env: Option<Environment>,
    /// Fail on unreadable or duplicate store entries instead of warning.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["text", "postback", "event"])))]
pub struct ResolveArgs {
    #[command(flatten)]
    pub store: StoreArgs,
    /// Free-text message from the user.
    #[arg(long)]
    pub text: Option<String>,
    /// Postback data from a button.
    #[arg(long)]
    pub postback: Option<String>,
    /// Webhook JSON file (single event or `{"events": [...]}`).
    #[arg(long)]
    pub event: Option<PathBuf>,
    /// Sending user id.
    #[arg(long)]
    pub user: Option<String>,
    /// Event time in epoch milliseconds; defaults to now.
    #[arg(long)]
    pub timestamp: Option<i64>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("mode").required(true).args(["activate", "deactivate"])))]
pub struct DisasterModeArgs {
    #[command(flatten)]
    pub store: StoreArgs,
    #[arg(long)]
    pub activate: bool,
    #[arg(long)]
    pub deactivate: bool,
}
