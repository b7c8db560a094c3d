use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use smoke_cli::cli::Cli;
use smoke_cli::error::EXIT_USAGE;
use smoke_cli::{commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.global.verbose);

	match run(cli).await {
		Ok(code) => std::process::exit(code),
		Err(err) => {
			eprintln!("{} {err:#}", "error:".red().bold());
			std::process::exit(EXIT_USAGE);
		}
	}
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
	let cwd = std::env::current_dir().context("reading working directory")?;
	Ok(commands::dispatch(cli, &cwd).await?)
}
