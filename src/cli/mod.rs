//! Command-line surface: argument definitions and exit code mapping.

pub mod orchestration;

use std::io::{Read, Write};

use crate::clock::Clock;
use crate::config::{self, Config};
use crate::error::{GdpError, Result};
use crate::git::RepositoryGateway;
use crate::ui::Terminal;

pub use orchestration::{
    ReleaseWorkflow, Subcommand, WorkflowArgs, WorkflowContext, WorkflowState,
};

/// Process exit status on success.
pub const EXIT_SUCCESS: u8 = 0;

/// Process exit status on any abort.
pub const EXIT_ERROR: u8 = 1;

#[derive(clap::Parser, Debug, Clone, Default)]
#[command(
    name = "gdp",
    about = "Tag a repository for deployment and publish release notes from merge commits",
    override_usage = "gdp deploy|publish [options]",
    disable_version_flag = true
)]
pub struct Args {
    #[arg(value_name = "COMMAND", help = "deploy or publish")]
    pub command: Option<String>,

    #[arg(short, long, help = "Tag to deploy or publish instead of the computed one")]
    pub tag: Option<String>,

    #[arg(short, long, help = "Show the release note without changing anything")]
    pub dry_run: bool,

    #[arg(short, long, help = "Skip branch and tag validation")]
    pub force: bool,

    #[arg(short, long, help = "Custom configuration file path")]
    pub config: Option<String>,

    #[arg(long, help = "Print debug logs")]
    pub debug: bool,

    #[arg(short, long, help = "Print version information")]
    pub version: bool,
}

impl Args {
    /// Resolves the subcommand and flags into workflow arguments.
    pub fn workflow_args(&self) -> Result<WorkflowArgs> {
        let subcommand = self
            .command
            .as_deref()
            .ok_or_else(|| GdpError::usage("Too few argument."))?
            .parse::<Subcommand>()?;

        Ok(WorkflowArgs {
            subcommand,
            tag: self.tag.clone().filter(|tag| !tag.is_empty()),
            dry_run: self.dry_run,
            force: self.force,
        })
    }
}

/// Runs one invocation and returns the process exit status.
///
/// `open_gateway` is only called once the arguments and configuration are
/// valid, so `--version` and usage errors work outside a repository.
pub fn run<R, O, E, G, F>(
    args: &Args,
    terminal: &mut Terminal<R, O, E>,
    clock: &dyn Clock,
    open_gateway: F,
) -> u8
where
    R: Read,
    O: Write,
    E: Write,
    G: RepositoryGateway,
    F: FnOnce(&Config) -> Result<G>,
{
    if args.version {
        let shown = terminal.display(&format!("gdp version v{}", env!("CARGO_PKG_VERSION")));
        return if shown.is_ok() { EXIT_SUCCESS } else { EXIT_ERROR };
    }

    match execute(args, terminal, clock, open_gateway) {
        Ok(context) => {
            log::debug!("released {} ({})", context.tag, context.subcommand);
            EXIT_SUCCESS
        }
        Err(e) => {
            if let Err(io) = terminal.display_failure(&e) {
                log::error!("cannot report failure '{}': {}", e, io);
            }
            EXIT_ERROR
        }
    }
}

fn execute<R, O, E, G, F>(
    args: &Args,
    terminal: &mut Terminal<R, O, E>,
    clock: &dyn Clock,
    open_gateway: F,
) -> Result<WorkflowContext>
where
    R: Read,
    O: Write,
    E: Write,
    G: RepositoryGateway,
    F: FnOnce(&Config) -> Result<G>,
{
    let workflow_args = args.workflow_args()?;
    let config = config::load_config(args.config.as_deref())?;
    let gateway = open_gateway(&config)?;

    let mut workflow = ReleaseWorkflow::new(&gateway, clock, config.safety_window);
    workflow.run(workflow_args, terminal)
}
