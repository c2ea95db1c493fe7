use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use gdp::cli::{self, Args};
use gdp::clock::SystemClock;
use gdp::git::Git2Gateway;
use gdp::ui::Terminal;

fn initialize_logger(debug: bool) -> Result<()> {
    let filter = if debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Warn
    };

    let config = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("gdp")
        .build();

    simplelog::TermLogger::init(
        filter,
        config,
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = initialize_logger(args.debug) {
        eprintln!("Error initializing logger: {}", e);
        return ExitCode::from(cli::EXIT_ERROR);
    }

    let mut terminal = Terminal::stdio();
    let status = cli::run(&args, &mut terminal, &SystemClock, |config| -> gdp::Result<Git2Gateway> {
        Ok(Git2Gateway::open(".", config)?)
    });

    ExitCode::from(status)
}
