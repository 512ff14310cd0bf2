//! mamake binary.
//!
//! Reads a mamfile and brings its targets up to date, or with `-r` runs a
//! sub-build in every leaf directory matching a pattern.

mod cli;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use mamake_engine::{MakeError, working_directory};
use tracing::debug;

fn main() -> ExitCode {
	let cli = Cli::parse();

	setup_tracing(cli.debug.unwrap_or(0));

	match run(&cli) {
		Ok(0) => ExitCode::SUCCESS,
		Ok(_) => ExitCode::FAILURE,
		Err(error) => {
			if !matches!(error.downcast_ref::<MakeError>(), Some(MakeError::Stopped)) {
				eprintln!("mamake: {error:#}");
			}
			ExitCode::FAILURE
		}
	}
}

/// Runs the evaluation and returns the number of errors reported.
fn run(cli: &Cli) -> anyhow::Result<usize> {
	if let Some(dir) = &cli.directory {
		std::env::set_current_dir(dir)
			.with_context(|| format!("{dir}: cannot change working directory"))?;
	}
	let pwd = working_directory(std::env::var("PWD").ok().as_deref())?;
	let program = std::env::args_os()
		.next()
		.map_or_else(|| "mamake".to_string(), |arg| arg.to_string_lossy().into_owned());
	debug!(%pwd, %program, "starting");

	let Some(mut ev) = cli.evaluator(&program, std::env::vars_os(), &pwd)? else {
		return Ok(1);
	};
	ev.run()?;
	debug!(errors = ev.errors(), warnings = ev.warnings(), "finished");
	Ok(ev.errors())
}

fn setup_tracing(debug: u8) {
	let level = match debug {
		0 => tracing::Level::WARN,
		1 | 2 => tracing::Level::DEBUG,
		_ => tracing::Level::TRACE,
	};
	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_max_level(level)
		.with_target(false)
		.init();
}
