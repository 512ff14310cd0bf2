//! Input stream stack.
//!
//! Mamfiles, probe output and the recursion candidate pipe are read through a
//! small fixed-depth stack. Lines are handed out left-trimmed with the line
//! counter of their frame advanced.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, StdinLock};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::trace;

use crate::error::{MakeError, Result};
use crate::report::Location;

/// Maximum number of open input streams.
pub const DEPTH: usize = 4;

bitflags::bitflags! {
	/// How a stream frame is opened and closed.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
	pub struct StreamFlags: u8 {
		/// Leave the handle open on pop.
		const KEEP = 1 << 0;
		/// Failing to resolve the name is fatal.
		const MUST = 1 << 1;
		/// Reaped as a child process on pop.
		const PIPE = 1 << 2;
	}
}

/// An open input handle.
#[derive(Debug)]
pub enum Source {
	Stdin(StdinLock<'static>),
	File(BufReader<File>),
	Pipe {
		reader: BufReader<ChildStdout>,
		child: Child,
	},
	Text(Cursor<String>),
}

impl Source {
	pub fn stdin() -> Self {
		Self::Stdin(io::stdin().lock())
	}

	pub fn file(path: &Path) -> Result<Self> {
		let file = File::open(path).map_err(|e| MakeError::io(path, e))?;
		Ok(Self::File(BufReader::new(file)))
	}

	/// Spawns `command` and reads its standard output.
	pub fn pipe(command: &mut Command) -> Result<Self> {
		let program = command.get_program().to_string_lossy().into_owned();
		let mut child = command
			.stdout(Stdio::piped())
			.spawn()
			.map_err(|error| MakeError::Spawn {
				command: program.clone(),
				error,
			})?;
		let stdout = child.stdout.take().ok_or_else(|| MakeError::Spawn {
			command: program,
			error: io::Error::other("no pipe"),
		})?;
		Ok(Self::Pipe {
			reader: BufReader::new(stdout),
			child,
		})
	}

	/// In-memory input.
	pub fn text(text: impl Into<String>) -> Self {
		Self::Text(Cursor::new(text.into()))
	}

	fn reader(&mut self) -> &mut dyn BufRead {
		match self {
			Self::Stdin(r) => r,
			Self::File(r) => r,
			Self::Pipe { reader, .. } => reader,
			Self::Text(r) => r,
		}
	}

	/// Closes the handle. Pipes are waited for; their exit status is logged only.
	fn close(self) {
		if let Self::Pipe { reader, mut child } = self {
			drop(reader);
			match child.wait() {
				Ok(status) => trace!(%status, "pipe closed"),
				Err(error) => trace!(%error, "pipe wait failed"),
			}
		}
	}
}

#[derive(Debug)]
struct Frame {
	name: String,
	source: Source,
	flags: StreamFlags,
	line: u64,
}

/// Stack of open inputs; the top frame feeds [`next_line`](Self::next_line).
#[derive(Debug, Default)]
pub struct InputStack {
	frames: Vec<Frame>,
	/// Bytes of the current line as read; lines need not be UTF-8.
	raw: Vec<u8>,
	line: String,
	replay: bool,
	/// The current line was handed out before.
	repeated: bool,
}

impl InputStack {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn depth(&self) -> usize {
		self.frames.len()
	}

	pub fn is_full(&self) -> bool {
		self.frames.len() >= DEPTH
	}

	/// Opens a new top frame.
	pub fn push(&mut self, name: impl Into<String>, source: Source, flags: StreamFlags) -> Result<()> {
		if self.is_full() {
			return Err(MakeError::StackOverflow);
		}
		let name = name.into();
		trace!(%name, depth = self.frames.len() + 1, "push");
		self.frames.push(Frame {
			name,
			source,
			flags,
			line: 0,
		});
		Ok(())
	}

	/// Closes the top frame according to its flags.
	pub fn pop(&mut self) -> Result<()> {
		let frame = self.frames.pop().ok_or(MakeError::StackUnderflow)?;
		trace!(name = %frame.name, "pop");
		if !frame.flags.contains(StreamFlags::KEEP) {
			frame.source.close();
		}
		Ok(())
	}

	/// Reads the next line of the top frame with the newline stripped and
	/// leading whitespace skipped. `None` at end of stream.
	pub fn next_line(&mut self) -> Result<Option<&str>> {
		let frame = self.frames.last_mut().ok_or(MakeError::NoInput)?;
		self.repeated = self.replay;
		if self.replay {
			self.replay = false;
		} else {
			self.raw.clear();
			let n = frame
				.source
				.reader()
				.read_until(b'\n', &mut self.raw)
				.map_err(|e| MakeError::io(&frame.name, e))?;
			if n == 0 {
				return Ok(None);
			}
			if self.raw.last() == Some(&b'\n') {
				self.raw.pop();
			}
			self.line = String::from_utf8_lossy(&self.raw).into_owned();
		}
		frame.line += 1;
		Ok(Some(self.line.trim_start()))
	}

	/// Makes the next [`next_line`](Self::next_line) return the current line again.
	pub fn replay(&mut self) {
		self.replay = true;
		if let Some(frame) = self.frames.last_mut() {
			frame.line = frame.line.saturating_sub(1);
		}
	}

	/// Returns `true` if the current line came from [`replay`](Self::replay).
	pub fn repeated(&self) -> bool {
		self.repeated
	}

	/// Name and line of the top frame, for diagnostics.
	pub fn location(&self) -> Option<Location<'_>> {
		self.frames.last().map(|frame| Location {
			file: &frame.name,
			line: frame.line,
		})
	}
}

#[cfg(test)]
mod tests;
