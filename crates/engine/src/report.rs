//! User-facing diagnostics.
//!
//! Messages go to stderr as `mamake [dir]: file: line: text`. Debug traces do
//! not come through here; they are `tracing` events.

/// Where in the input a diagnostic was raised.
#[derive(Debug, Clone, Copy)]
pub struct Location<'a> {
	pub file: &'a str,
	pub line: u64,
}

/// Formats diagnostics and counts errors for the exit status.
#[derive(Debug)]
pub struct Reporter {
	id: &'static str,
	directory: Option<String>,
	errors: usize,
	warnings: usize,
}

impl Reporter {
	pub fn new(directory: Option<String>) -> Self {
		Self {
			id: "mamake",
			directory,
			errors: 0,
			warnings: 0,
		}
	}

	/// Number of error-class conditions so far.
	pub fn errors(&self) -> usize {
		self.errors
	}

	pub fn warnings(&self) -> usize {
		self.warnings
	}

	fn identify(&self) -> String {
		match &self.directory {
			Some(dir) => format!("{} [{}]: ", self.id, dir),
			None => format!("{}: ", self.id),
		}
	}

	fn format(&self, at: Option<Location<'_>>, severity: &str, item: &str, text: &str) -> String {
		let mut msg = self.identify();
		if let Some(at) = at
			&& at.line > 0
		{
			msg.push_str(&format!("{}: {}: ", at.file, at.line));
		}
		msg.push_str(severity);
		if !item.is_empty() {
			msg.push_str(item);
			msg.push_str(": ");
		}
		msg.push_str(text);
		msg
	}

	/// Reports a problem that does not affect the exit status.
	pub fn warning(&mut self, at: Option<Location<'_>>, item: &str, text: &str) {
		self.warnings += 1;
		eprintln!("{}", self.format(at, "warning: ", item, text));
	}

	/// Reports a target that could not be made and counts it.
	pub fn dont_know(&mut self, target: &str) {
		self.errors += 1;
		eprintln!("{}don't know how to make {}", self.identify(), target);
	}

	/// Reports a failed action. Counted unless `ignored`.
	pub fn exit_code(&mut self, code: i32, target: &str, ignored: bool) {
		if !ignored {
			self.errors += 1;
		}
		eprintln!(
			"{}*** exit code {} making {}{}",
			self.identify(),
			code,
			target,
			if ignored { " ignored" } else { "" }
		);
	}

	/// Explain-mode note for a triggered action.
	pub fn explain(&self, target: &str, time: u64, prereqs: u64) {
		if time == 0 {
			eprintln!("{target} [not found]");
		} else {
			eprintln!("{target} [{time}] older than prerequisites [{prereqs}]");
		}
	}
}
