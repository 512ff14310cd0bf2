//! Command-line schema and assembly of an evaluator from it.

use std::ffi::OsStr;

use clap::Parser;
use mamake_engine::{Evaluator, MAMFILE, Options, Variables};

#[derive(Parser, Debug)]
#[command(name = "mamake")]
#[command(about = "Make abstract machine make")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Explain why each action is triggered
	#[arg(short = 'e')]
	pub explain: bool,

	/// Report failing actions but keep their targets
	#[arg(short = 'i')]
	pub ignore_errors: bool,

	/// Continue with other targets after an error
	#[arg(short = 'k')]
	pub keep_going: bool,

	/// List actions instead of executing them
	#[arg(short = 'n')]
	pub dry_run: bool,

	/// Like -n, and do not run recursive builds either
	#[arg(short = 'N')]
	pub never: bool,

	/// Consider every target out of date
	#[arg(short = 'F')]
	pub force: bool,

	/// Accepted for compatibility, ignored
	#[arg(short = 'K', hide = true)]
	pub compatibility: bool,

	/// Mamfile to read
	#[arg(short = 'f', value_name = "FILE")]
	pub file: Option<String>,

	/// Build the leaf directories matching PATTERN
	#[arg(short = 'r', value_name = "PATTERN")]
	pub recurse: Option<String>,

	/// Change to DIR before doing anything
	#[arg(short = 'C', value_name = "DIR")]
	pub directory: Option<String>,

	/// Debug trace level
	#[arg(short = 'D', value_name = "LEVEL")]
	pub debug: Option<u8>,

	/// Set the -debug-symbols variable
	#[arg(
		short = 'G',
		long = "debug-symbols",
		value_name = "VALUE",
		num_args = 0..=1,
		require_equals = true,
		default_missing_value = "1"
	)]
	pub debug_symbols: Option<String>,

	/// Set the -strip-symbols variable
	#[arg(
		short = 'S',
		long = "strip-symbols",
		value_name = "VALUE",
		num_args = 0..=1,
		require_equals = true,
		default_missing_value = "1"
	)]
	pub strip_symbols: Option<String>,

	/// Targets to make and NAME=VALUE assignments
	#[arg(value_name = "ARG")]
	pub args: Vec<String>,
}

/// What a positional argument means.
#[derive(Debug, PartialEq, Eq)]
pub enum Positional<'a> {
	/// `name=value`, or `name+=value` treated the same.
	Assignment { name: &'a str, value: &'a str },
	/// A target to make.
	Target(&'a str),
	/// An nmake compatibility target with no effect.
	Ignored,
	/// The nmake version check; mamake exits with status 1.
	VersionCheck,
}

impl<'a> Positional<'a> {
	pub fn classify(arg: &'a str) -> Self {
		if let Some((name, value)) = arg.split_once('=') {
			let name = name.strip_suffix('+').filter(|n| !n.is_empty()).unwrap_or(name);
			return Self::Assignment { name, value };
		}
		if arg.starts_with("error 0 $(MAKEVERSION:") {
			Self::VersionCheck
		} else if arg == "recurse" || arg.starts_with("cc-") {
			Self::Ignored
		} else {
			Self::Target(arg)
		}
	}
}

impl Cli {
	/// Evaluation options, with the option string that sub-builds inherit.
	pub fn options(&self) -> Options {
		let mut arguments = String::new();
		let mut flag = |on: bool, text: &str| {
			if on {
				arguments.push_str(text);
			}
		};
		flag(self.explain, " -e");
		flag(self.ignore_errors, " -i");
		flag(self.keep_going, " -k");
		flag(self.dry_run || self.never, " -n");
		flag(self.force, " -F");
		flag(self.debug_symbols.is_some(), " -G");
		flag(self.strip_symbols.is_some(), " -S");
		if let Some(level) = self.debug {
			arguments.push_str(&format!(" -D{level}"));
		}
		if let Some(file) = &self.file {
			arguments.push_str(" -f ");
			arguments.push_str(file);
		}
		Options {
			explain: self.explain,
			ignore_errors: self.ignore_errors,
			keep_going: self.keep_going,
			exec: !(self.dry_run || self.never),
			never: self.never,
			force: self.force,
			debug: self.debug.unwrap_or(0),
			directory: self.directory.clone(),
			file: self.file.clone().unwrap_or_else(|| MAMFILE.to_string()),
			recurse: self.recurse.clone(),
			arguments,
		}
	}

	/// Sets up an evaluator in `pwd`.
	///
	/// Variables are written in precedence order: `MAMAKE` and the option
	/// variables, then `env`, then command-line assignments. Returns `None`
	/// for the nmake version check, which fails without building.
	pub fn evaluator<I, K, V>(
		&self,
		program: &str,
		env: I,
		pwd: &str,
	) -> mamake_engine::Result<Option<Evaluator>>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<OsStr>,
		V: AsRef<OsStr>,
	{
		let mut options = self.options();
		let mut vars = Variables::new();
		vars.set("MAMAKE", program);
		if let Some(value) = &self.debug_symbols {
			vars.set("-debug-symbols", value.as_str());
		}
		if let Some(value) = &self.strip_symbols {
			vars.set("-strip-symbols", value.as_str());
		}
		vars.import(env);

		let mut targets = Vec::new();
		for arg in &self.args {
			match Positional::classify(arg) {
				Positional::Assignment { name, value } => vars.assign(name, value),
				Positional::VersionCheck => return Ok(None),
				Positional::Ignored => continue,
				Positional::Target(target) => {
					targets.push(target);
					if self.recurse.is_some() {
						continue;
					}
				}
			}
			options.arguments.push_str(&format!(" '{arg}'"));
		}
		vars.set("PWD", pwd);

		let mut ev = Evaluator::new(options, vars, pwd)?;
		for target in targets {
			ev.activate(target);
		}
		Ok(Some(ev))
	}
}
