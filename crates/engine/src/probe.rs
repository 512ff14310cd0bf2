//! Compiler probing.
//!
//! The first `setv CC` reads compiler-specific variable definitions from
//! `${INSTALLROOT}/lib/probe/C/mam/<key>`, regenerating that file with
//! `mamprobe` when it is missing or older than the helper or the compiler.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MakeError, Result};
use crate::eval::Evaluator;
use crate::stream::StreamFlags;
use crate::view::mtime;

/// Probe helper command.
const HELPER: &str = "mamprobe";

/// Names the probe file for the compiler at `cc`.
pub fn probe_key(cc: &str) -> String {
	const LETTERS: &[u8; 16] = b"ABCDEFGHIJKLMNOP";
	let mut h = cc.bytes().fold(0u32, |h, c| {
		h.wrapping_mul(0x63c6_3cd9)
			.wrapping_add(u32::from(c))
			.wrapping_add(0x9c39_c33d)
	});
	let mut key = String::new();
	while h != 0 {
		key.push(char::from(LETTERS[(h & 0xf) as usize]));
		h >>= 4;
	}
	key
}

fn modified(path: &Path) -> u64 {
	fs::metadata(path).map_or(0, |meta| mtime(&meta))
}

impl Evaluator {
	/// Finds the executable `name` on `PATH` from the variable table.
	pub(crate) fn command(&mut self, name: &str) -> Result<PathBuf> {
		let path = self.vars.get("PATH").ok_or(MakeError::MissingVariable("PATH"))?;
		which::which_in(name, Some(path), self.resolver.pwd())
			.map_err(|_| MakeError::CommandNotFound(name.to_string()))
	}

	/// Loads the probe information for `${CC}`, generating it if stale.
	pub(crate) fn probe(&mut self) -> Result<()> {
		let cc = self.vars.get("CC").unwrap_or("cc").to_string();
		let helper = self.command(HELPER)?;
		let compiler = self.command(cc.split([' ', '\t']).next().unwrap_or_default())?;
		let compiler = compiler.to_string_lossy().into_owned();
		let root = self
			.vars
			.get("INSTALLROOT")
			.ok_or(MakeError::MissingVariable("INSTALLROOT"))?;
		let file = format!("{root}/lib/probe/C/mam/{}", probe_key(&compiler));
		let stale = modified(&self.resolver.absolute(&file))
			< modified(&helper).max(modified(Path::new(&compiler)));
		debug!(%file, %compiler, stale, "probe");
		if stale || !self.push(Some(&file), StreamFlags::empty())? {
			let command = format!("{} {} {}", helper.display(), file, compiler);
			if self.execute(&command)? != 0 {
				return Err(MakeError::Probe {
					path: file,
					reason: "cannot generate probe info",
				});
			}
			if !self.push(Some(&file), StreamFlags::empty())? {
				return Err(MakeError::Probe {
					path: file,
					reason: "cannot read probe info",
				});
			}
		}
		let root = self.rules.root();
		self.make(root)?;
		self.input.pop()
	}
}

#[cfg(test)]
mod tests;
