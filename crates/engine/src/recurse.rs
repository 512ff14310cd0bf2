//! Recursive builds over leaf directories (`-r pattern`).
//!
//! Leaf directories are those matching the pattern that hold a mamfile. Their
//! mamfiles are scanned for hints of which other leaves they link against,
//! and the leaves are then built in prerequisite order, each by a sub-build
//! `${MAMAKE} -C dir ${MAMAKEARGS}`.

use std::process::Command;

use crate::config::MAMFILE;
use crate::error::Result;
use crate::eval::Evaluator;
use crate::rule::{RuleFlags, RuleId};
use crate::stream::{Source, StreamFlags};
use crate::symtab::SymbolTable;

fn basename(path: &str) -> &str {
	path.rsplit('/').next().unwrap_or(path)
}

/// Directories whose base name starts with this are built first, unscanned.
fn initializer(name: &str) -> bool {
	basename(name).starts_with("INIT")
}

/// Words of a mamfile line that may name another leaf: `-lfoo` and `lib*`
/// words, lower-cased `:FOO:` assertion names, and the libraries listed after
/// `:PACKAGE:`.
pub(crate) fn library_hints(line: &str) -> Vec<String> {
	let b = line.as_bytes();
	let mut hints = Vec::new();
	let mut s = 0;
	let mut previous = 0u8;
	let mut package = 0u8;
	while s < b.len() {
		let mut keep = true;
		while s < b.len() && matches!(b[s], b' ' | b'\t' | b'"' | b'\'') {
			s += 1;
		}
		let mut t = s;
		let mut cut = None;
		while s < b.len() && !matches!(b[s], b' ' | b'\t' | b'"' | b'\'' | b'\\' | b':') {
			if b[s] == b'/' {
				t = s + 1;
				cut = None;
			} else if b[s] == b'.'
				&& cut.is_none()
				&& !matches!(b.get(s + 1), Some(b'c' | b'C' | b'h' | b'H'))
				&& b[t..].starts_with(b"lib")
			{
				cut = Some(s);
			}
			s += 1;
		}
		let stop = b.get(s).copied().unwrap_or(0);
		let mut word = line[t..cut.unwrap_or(s)].to_string();
		if s < b.len() {
			s += 1;
		}
		if word.is_empty() {
			keep = false;
		} else if let Some(name) = word
			.strip_prefix("-l")
			.or_else(|| word.strip_prefix("+l"))
			.filter(|name| !name.is_empty())
		{
			word = format!("lib{name}");
		} else if package > 0 {
			if word == "+" {
				package = 2;
			} else if package == 1 {
				if stop != b':' || !line[s..].starts_with("command") {
					word = format!("lib{word}");
				}
				if stop == b':' {
					while s < b.len() && matches!(b[s], b' ' | b'\t') {
						s += 1;
					}
				}
			}
		} else if stop == b':' {
			if previous != b':' || !word.as_bytes()[0].is_ascii_uppercase() {
				keep = false;
			} else if word == "PACKAGE" {
				package = 1;
				keep = false;
			} else if word.bytes().all(|c| c.is_ascii_alphanumeric()) {
				word.make_ascii_lowercase();
			} else {
				keep = false;
			}
		} else if !word.starts_with("lib") || !word[3..].bytes().all(|c| c.is_ascii_alphanumeric()) {
			keep = false;
		}
		if keep {
			hints.push(word);
		}
		previous = stop;
	}
	hints
}

impl Evaluator {
	/// Builds every leaf directory matching `pattern`.
	pub fn recurse(&mut self, pattern: &str) -> Result<()> {
		self.options.exec = !self.options.never;
		self.leaves = SymbolTable::new();
		let mut ls = Command::new("/bin/sh");
		ls.arg("-c")
			.arg(format!("ls -d {pattern}"))
			.current_dir(self.resolver.pwd());
		self.input.push("recurse", Source::pipe(&mut ls)?, StreamFlags::PIPE)?;
		while let Some(line) = self.input.next_line()? {
			let dir = line.to_string();
			if self.resolver.find(&format!("{dir}/{MAMFILE}")).is_none() {
				continue;
			}
			let r = self.rules.rule(&dir);
			let base = basename(&dir);
			let leaf = self.rules.rule(base);
			self.rules[r].leaf = Some(leaf);
			self.leaves.insert(base, r);
		}
		self.input.pop()?;

		if self.active == 0 {
			self.active = 1;
			for r in self.rules.ordered() {
				if !self.rules[r].flags.contains(RuleFlags::ACTIVE) {
					continue;
				}
				let name = self.rules[r].name.clone();
				if self.rules[r].leaf.is_some() || self.leaves.search(&name).is_some() {
					self.active = 0;
				} else {
					self.options.arguments.push(' ');
					self.options.arguments.push_str(&name);
				}
			}
		}
		let arguments = self.options.arguments.get(1..).unwrap_or_default().to_string();
		self.vars.set("MAMAKEARGS", arguments);

		for r in self.rules.ordered() {
			self.scan(r)?;
		}
		self.resolver.clear_view();
		for r in self.rules.ordered() {
			self.descend(r)?;
		}
		Ok(())
	}

	/// Records the leaves that leaf `r` depends on.
	fn scan(&mut self, r: RuleId) -> Result<()> {
		if self.rules[r].leaf.is_none() {
			return Ok(());
		}
		let name = self.rules[r].name.clone();
		if initializer(&name) {
			if !self.rules[r].flags.contains(RuleFlags::MADE) {
				self.update(r)?;
			}
			return Ok(());
		}
		if !self.push(Some(&format!("{name}/{MAMFILE}")), StreamFlags::empty())? {
			return Ok(());
		}
		while let Some(line) = self.input.next_line()? {
			for hint in library_hints(line) {
				let q = match self.leaves.search(&hint).copied() {
					Some(q) if q != r => Some(q),
					_ => match hint.strip_prefix("lib").filter(|rest| !rest.is_empty()) {
						Some(rest) => self.leaves.search(rest).copied().filter(|&q| q != r),
						None => None,
					},
				};
				if let Some(q) = q {
					let mine = basename(&self.rules[r].name);
					let mine = mine.strip_prefix("lib").unwrap_or(mine);
					if mine != basename(&self.rules[q].name) {
						self.rules.add_prerequisite(r, q);
					}
				}
			}
		}
		self.input.pop()?;

		let Some(slash) = name.rfind('/') else {
			return Ok(());
		};
		let base = &name[slash + 1..];
		if slash > 3 && name[..slash].ends_with("lib") && name.as_bytes()[slash - 4] != b'/' {
			// foolib/x depends on foo and libfoo
			let stem = &name[..slash - 3];
			self.link_leaf(r, stem);
			self.link_leaf(r, &format!("lib{}", basename(stem)));
		} else if &name[..slash] != "lib" && !base.starts_with("lib") {
			// dir/foobar depends on lib/libfooba, lib/libfoob, ...
			for end in (1..base.len()).rev().filter(|&end| base.is_char_boundary(end)) {
				self.link_leaf(r, &format!("lib/lib{}", &base[..end]));
			}
		}
		Ok(())
	}

	fn link_leaf(&mut self, r: RuleId, name: &str) {
		if let Some(q) = self.leaves.search(name).copied()
			&& q != r
		{
			self.rules.add_prerequisite(r, q);
		}
	}

	/// Updates `r` if it is a leaf still to be built. Once targets are named,
	/// only the named leaves are descended.
	fn descend(&mut self, mut r: RuleId) -> Result<()> {
		if self.active == 0 {
			if !self.rules[r].flags.contains(RuleFlags::ACTIVE) {
				return Ok(());
			}
			let name = self.rules[r].name.clone();
			match self.leaves.search(&name).copied() {
				Some(leaf) => r = leaf,
				None => return Ok(()),
			}
		}
		if self.rules[r].leaf.is_some() && !self.rules[r].flags.contains(RuleFlags::MADE) {
			self.update(r)?;
		}
		Ok(())
	}

	/// Builds leaf `r` after its leaf prerequisites.
	fn update(&mut self, r: RuleId) -> Result<()> {
		self.rules[r].flags |= RuleFlags::MADE;
		if let Some(leaf) = self.rules[r].leaf {
			self.rules[leaf].flags |= RuleFlags::MADE;
		}
		let prereqs = self.rules[r].prereqs.clone();
		for q in prereqs {
			if self.rules[q].leaf.is_some() && !self.rules[q].flags.contains(RuleFlags::MADE) {
				self.update(q)?;
			}
		}
		let mut command = self.vars.expand("${MAMAKE} -C ");
		command.push_str(&self.rules[r].name);
		command.push_str(&self.vars.expand(" ${MAMAKEARGS}"));
		self.action(r, &command)?;
		Ok(())
	}
}
