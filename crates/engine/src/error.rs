//! Error types for mamfile evaluation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort an evaluation.
///
/// Target failures that keep-going tolerates are not errors; they are counted
/// by the [`Reporter`](crate::report::Reporter) and flagged on the rule.
#[derive(Debug, Error)]
pub enum MakeError {
	/// Error reading or opening a file.
	#[error("I/O error on {path}: {error}")]
	Io {
		/// Path of the file that failed.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// More input streams were pushed than the stack holds.
	#[error("input stream stack overflow")]
	StackOverflow,

	/// A pop was attempted on an empty input stack.
	#[error("input stack underflow")]
	StackUnderflow,

	/// A line was requested with no input stream open.
	#[error("no input file stream")]
	NoInput,

	/// A variable the tool cannot work without is unset.
	#[error("{0}: variable must be defined")]
	MissingVariable(&'static str),

	/// A must-exist input file could not be resolved.
	#[error("{0}: not found")]
	NotFound(String),

	/// The current directory could not be determined.
	#[error("cannot determine PWD")]
	NoWorkingDirectory,

	/// A `VPATH` root could not be examined.
	#[error("{path}: cannot stat top view")]
	TopView {
		/// The unreadable viewpath root.
		path: String,
	},

	/// The working directory does not sit under the top `VPATH` root.
	#[error("{0}: . not under VPATH")]
	NotUnderView(String),

	/// No ancestor of the working directory matches the top `VPATH` root.
	#[error("{0}: cannot determine viewpath offset")]
	ViewOffset(String),

	/// An executable was not found on `PATH`.
	#[error("{0}: command not found")]
	CommandNotFound(String),

	/// The probe helper failed or produced nothing readable.
	#[error("{path}: {reason}")]
	Probe {
		/// The probe information file.
		path: String,
		/// What went wrong.
		reason: &'static str,
	},

	/// A subprocess could not be started.
	#[error("cannot execute {command}: {error}")]
	Spawn {
		/// The interpreter or command being started.
		command: String,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A target failed and keep-going is off. The diagnostic is already printed.
	#[error("stopped")]
	Stopped,
}

impl MakeError {
	pub(crate) fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
		Self::Io {
			path: path.into(),
			error,
		}
	}
}

/// Result type for evaluation operations.
pub type Result<T> = std::result::Result<T, MakeError>;
