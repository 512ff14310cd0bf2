//! Evaluation options.

/// Default mamfile name.
pub const MAMFILE: &str = "Mamfile";

/// Switches that shape one evaluation, set from the command line.
#[derive(Debug, Clone)]
pub struct Options {
	/// Explain why each action is triggered (`-e`).
	pub explain: bool,
	/// Report failing actions but do not flag their targets (`-i`).
	pub ignore_errors: bool,
	/// Keep going with siblings after a target fails (`-k`).
	pub keep_going: bool,
	/// Execute actions; off under `-n`/`-N`, which print them instead.
	pub exec: bool,
	/// Also suppress recursion actions (`-N`).
	pub never: bool,
	/// Treat every target as out of date (`-F`).
	pub force: bool,
	/// Debug trace level (`-D`).
	pub debug: u8,
	/// Directory named by `-C`, used to identify diagnostics.
	pub directory: Option<String>,
	/// Mamfile to read (`-f`).
	pub file: String,
	/// Leaf directory pattern for recursive builds (`-r`).
	pub recurse: Option<String>,
	/// Options and assignments to hand to sub-builds, each item prefixed
	/// with a space. Becomes `MAMAKEARGS` without the leading space.
	pub arguments: String,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			explain: false,
			ignore_errors: false,
			keep_going: false,
			exec: true,
			never: false,
			force: false,
			debug: 0,
			directory: None,
			file: MAMFILE.to_string(),
			recurse: None,
			arguments: String::new(),
		}
	}
}
