pub mod assemble;
pub mod chat_mode;
pub mod cli;
pub mod commands;
pub mod config;
pub mod congestion;
pub mod diagnostics;
pub mod disaster;
pub mod engine;
pub mod error;
pub mod event;
pub mod fallback;
pub mod locale;
pub mod message;
pub mod model;
pub mod pipeline;
pub mod publicity;
pub mod scan;
pub mod store;
pub mod template;

use anyhow::Result;
use cli::{Cli, Commands};

pub use engine::{ApiDelegation, Collaborators, Engine, Reply, Resolution};
pub use error::{EngineError, EngineResult};
pub use event::{Event, EventKind};

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Resolve(args) => commands::resolve(&args),
        Commands::DisasterMode(args) => commands::disaster_mode(&args),
    }
}
