//! Action execution.

use std::io::Write;
use std::process::{Command, ExitStatus};

use tracing::trace;

use crate::buffer::Buffer;
use crate::error::{MakeError, Result};
use crate::eval::Evaluator;
use crate::rule::{RuleFlags, RuleId};
use crate::view::{mtime, now};

/// Interpreter used when `SHELL` is unset.
const SH: &str = "/bin/sh";

/// Prepended to executed actions.
const PREAMBLE: &str = "trap - 1 2 3 15\nPATH=.:$PATH\nset -x\n";

/// Sub-build command that runs even when actions are only listed.
const RECURSION: &str = "mamake -r ";

/// Characters that separate the words of an action for viewpath rewriting.
fn delimiter(c: u8) -> bool {
	matches!(c, b' ' | b'\t' | b'\n' | b';' | b'(' | b')' | b'`' | b'|' | b'&' | b'=')
}

/// Exit code as a small integer, unpacking a raw wait status.
#[cfg(unix)]
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
	use std::os::unix::process::ExitStatusExt;
	let raw = status.into_raw();
	if raw > 255 { raw >> 8 } else { raw }
}

#[cfg(not(unix))]
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
	status.code().unwrap_or(1)
}

impl Evaluator {
	/// Runs `action` to update `r` and returns the rule's new time.
	///
	/// Executed actions get a preamble and their target is re-stated
	/// afterwards; a target that still does not exist is stamped with the
	/// current time. Listed actions mark the target as existing.
	pub(crate) fn action(&mut self, r: RuleId, action: &str) -> Result<u64> {
		if self.rules[r].flags.contains(RuleFlags::ERROR) {
			return Ok(self.rules[r].time);
		}
		let exec = if action.starts_with(RECURSION) {
			self.verified = true;
			!self.options.never
		} else {
			self.options.exec
		};
		let mut script = self.pool.acquire();
		if exec {
			script.append(PREAMBLE);
		}
		self.rewrite(&mut script, action);
		if exec {
			let code = self.execute(script.as_str())?;
			if code != 0 {
				self.dont(r, code, self.options.keep_going)?;
			}
			let status = self.resolver.status(&self.rules[r].name);
			let rule = &mut self.rules[r];
			match status {
				Some((_, meta)) => {
					rule.time = mtime(&meta);
					rule.flags |= RuleFlags::EXISTS;
				}
				None => rule.time = now(),
			}
		} else {
			writeln!(self.out, "{}", script.as_str()).map_err(|e| MakeError::io("<stdout>", e))?;
			self.out.flush().map_err(|e| MakeError::io("<stdout>", e))?;
			let rule = &mut self.rules[r];
			rule.time = now();
			rule.flags |= RuleFlags::EXISTS;
		}
		Ok(self.rules[r].time)
	}

	/// Hands `script` to the shell and returns its exit code.
	pub(crate) fn execute(&mut self, script: &str) -> Result<i32> {
		if self.shell.is_none() {
			let shell = self.vars.get("SHELL").filter(|s| !s.is_empty()).unwrap_or(SH);
			self.shell = Some(shell.to_string());
		}
		let shell = self.shell.as_deref().unwrap_or(SH);
		trace!(%shell, %script, "exec");
		let status = Command::new(shell)
			.arg("-c")
			.arg(script)
			.current_dir(self.resolver.pwd())
			.status()
			.map_err(|error| MakeError::Spawn {
				command: shell.to_string(),
				error,
			})?;
		Ok(exit_code(status))
	}

	/// Copies `action` to `out`. With a viewpath, words naming bound source
	/// rules become their paths and relative `-I` directories are repeated
	/// for every lower view level.
	fn rewrite(&mut self, out: &mut Buffer, action: &str) {
		let Some(view) = self.resolver.view() else {
			out.append(action);
			return;
		};
		let levels: Vec<String> = view
			.levels()
			.iter()
			.skip(1)
			.map(|level| level.dir().to_string())
			.collect();
		let b = action.as_bytes();
		let mut i = 0;
		loop {
			let start = i;
			while i < b.len() && delimiter(b[i]) {
				i += 1;
			}
			out.append(&action[start..i]);
			let t = i;
			while i < b.len() && !delimiter(b[i]) {
				i += 1;
			}
			let word = &action[t..i];
			if b.get(i) == Some(&b'=') {
				out.append(word);
				continue;
			}
			let bound = self.rules.lookup(word).and_then(|q| {
				let rule = &self.rules[q];
				rule.path
					.as_deref()
					.filter(|_| !rule.flags.contains(RuleFlags::GENERATED))
			});
			if let Some(path) = bound {
				out.append(path);
			} else {
				out.append(word);
				if word.starts_with("-I") && (word.len() > 2 || i < b.len()) {
					let (prefix, dir) = if word.len() > 2 {
						(&action[t..t + 2], &action[t + 2..i])
					} else {
						let mut j = i + 1;
						while j < b.len() && matches!(b[j], b' ' | b'\t') {
							j += 1;
						}
						let mut e = j;
						while e < b.len() && !matches!(b[e], b' ' | b'\t' | b'\n') {
							e += 1;
						}
						out.append(&action[i..e]);
						let span = (&action[t..j], &action[j..e]);
						i = e;
						span
					};
					if !dir.is_empty() && !dir.starts_with('/') {
						for level in &levels {
							out.push(' ');
							out.append(prefix);
							out.append(level);
							if dir != "." {
								out.push('/');
								out.append(dir);
							}
						}
					}
				}
			}
			if i >= b.len() {
				break;
			}
		}
	}
}

#[cfg(test)]
mod tests;
