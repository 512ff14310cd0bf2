//! `${...}` variable expansion.
//!
//! Recognized forms, where `word` is itself expanded:
//!
//! | form                    | result                                              |
//! |-------------------------|-----------------------------------------------------|
//! | `${V}`                  | value, or nothing when unset                        |
//! | `${V-word}`             | `word` if unset, else value                         |
//! | `${V:-word}`            | `word` if unset or empty, else value                |
//! | `${V+word}`             | `word` if set, else nothing                         |
//! | `${V:+word}`            | `word` if set and non-empty, else nothing           |
//! | `${V=word}`             | value if set, else the reference unexpanded         |
//! | `${V:=word}`            | value if set and non-empty, else unexpanded         |
//! | `${V?pat?yes:no}`       | `yes` if the value starts with `pat` (`*` matches any set value, an empty pattern matches unset), else `no` |
//!
//! Plain `$V` is copied verbatim. Unterminated references and names with
//! characters other than alphanumerics and `_` are copied verbatim. Names
//! starting with `-` may contain `-` (`${-debug-symbols}`).
//!
//! Variable values are expanded in turn. A reference to a variable whose value
//! is already being expanded is copied verbatim, as is everything past a
//! fixed nesting depth or reference count. Within one expansion, once `${AR}`
//! has been seen, `${mam_lib*}` references yield only the first word of their
//! value so archive commands get a single library name.

use crate::buffer::Buffer;
use crate::vars::Variables;

/// Nesting limit for recursive expansion; deeper references are left verbatim.
const MAX_DEPTH: usize = 64;

/// References expanded per call before the rest are left verbatim.
const MAX_STEPS: usize = 1 << 16;

/// Bookkeeping for one top-level expansion.
#[derive(Debug, Default)]
struct Trail {
	/// Variables whose values are being expanded, outermost first.
	names: Vec<String>,
	steps: usize,
}

impl Trail {
	fn admits(&self, name: &str, depth: usize) -> bool {
		depth < MAX_DEPTH && self.steps < MAX_STEPS && !self.names.iter().any(|n| n == name)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
	Value,
	Default { colon: bool },
	Alternate { colon: bool },
	Required { colon: bool },
	Match,
}

#[derive(Debug)]
struct Reference<'a> {
	name: &'a str,
	op: Op,
	word: &'a str,
	/// The whole `${...}` text.
	literal: &'a str,
}

#[derive(Debug)]
enum Scan<'a> {
	Reference(Reference<'a>),
	/// Copy verbatim up to this offset.
	Verbatim(usize),
}

impl Variables {
	/// Expands every `${...}` reference in `text`.
	pub fn expand(&mut self, text: &str) -> String {
		let mut out = Buffer::new();
		self.expand_into(&mut out, text);
		out.freeze()
	}

	/// Expands `text` onto the end of `out`.
	pub fn expand_into(&mut self, out: &mut Buffer, text: &str) {
		self.substitute(out, text, 0, &mut Trail::default());
	}

	fn substitute(&mut self, out: &mut Buffer, text: &str, depth: usize, trail: &mut Trail) {
		let mut archive = false;
		let mut i = 0;
		while i < text.len() {
			let Some(offset) = text[i..].find("${") else {
				out.append(&text[i..]);
				return;
			};
			let start = i + offset;
			out.append(&text[i..start]);
			match scan(text, start) {
				Scan::Reference(r) => {
					i = start + r.literal.len();
					if trail.admits(r.name, depth) {
						trail.steps += 1;
						self.apply(out, &r, depth, &mut archive, trail);
					} else {
						out.append(r.literal);
					}
				}
				Scan::Verbatim(end) => {
					out.append(&text[start..end]);
					i = end;
				}
			}
		}
	}

	fn apply(
		&mut self,
		out: &mut Buffer,
		r: &Reference<'_>,
		depth: usize,
		archive: &mut bool,
		trail: &mut Trail,
	) {
		if r.name == "AR" {
			*archive = true;
		}
		let value = self.get(r.name).map(str::to_owned);
		let usable = |colon: bool| value.as_deref().is_some_and(|v| !colon || !v.is_empty());
		match r.op {
			Op::Value => {
				if let Some(v) = &value {
					self.value(out, r.name, v, depth, *archive, trail);
				}
			}
			Op::Default { colon } => {
				if usable(colon) {
					let v = value.as_deref().unwrap_or_default();
					self.value(out, r.name, v, depth, *archive, trail);
				} else {
					self.substitute(out, r.word, depth + 1, trail);
				}
			}
			Op::Alternate { colon } => {
				if usable(colon) {
					self.substitute(out, r.word, depth + 1, trail);
				}
			}
			Op::Required { colon } => {
				if usable(colon) {
					let v = value.as_deref().unwrap_or_default();
					self.value(out, r.name, v, depth, *archive, trail);
				} else {
					out.append(r.literal);
				}
			}
			Op::Match => self.branch(out, r.word, value.as_deref(), depth, trail),
		}
	}

	fn value(
		&mut self,
		out: &mut Buffer,
		name: &str,
		value: &str,
		depth: usize,
		archive: bool,
		trail: &mut Trail,
	) {
		let value = if archive && name.starts_with("mam_lib") {
			value.trim_start_matches(' ').split(' ').next().unwrap_or_default()
		} else {
			value
		};
		trail.names.push(name.to_string());
		self.substitute(out, value, depth + 1, trail);
		trail.names.pop();
	}

	fn branch(
		&mut self,
		out: &mut Buffer,
		word: &str,
		value: Option<&str>,
		depth: usize,
		trail: &mut Trail,
	) {
		let (pattern, rest) = split_top(word, |c| c == b'?');
		let (yes, no) = match rest {
			Some(rest) => split_top(rest, |c| c == b'?' || c == b':'),
			None => ("", None),
		};
		let matched = match value {
			Some(v) => pattern == "*" || v.starts_with(pattern),
			None => pattern.is_empty(),
		};
		let chosen = if matched { yes } else { no.unwrap_or_default() };
		self.substitute(out, chosen, depth + 1, trail);
	}
}

/// Parses the reference starting at `text[start..]`, which begins with `${`.
fn scan(text: &str, start: usize) -> Scan<'_> {
	let bytes = text.as_bytes();
	let name_start = start + 2;
	let dashes = bytes.get(name_start) == Some(&b'-');
	let mut j = name_start;
	while let Some(&c) = bytes.get(j) {
		match c {
			b'?' | b'+' | b':' | b'=' | b'[' | b'}' => break,
			b'-' if !dashes => break,
			_ => j += 1,
		}
	}
	let Some(&c) = bytes.get(j) else {
		return Scan::Verbatim(text.len());
	};
	let name = &text[name_start..j];
	let (op, word_start) = match c {
		b'[' => return Scan::Verbatim(j),
		b'}' => (Some(Op::Value), j),
		b'-' => (Some(Op::Default { colon: false }), j + 1),
		b'+' => (Some(Op::Alternate { colon: false }), j + 1),
		b'=' => (Some(Op::Required { colon: false }), j + 1),
		b'?' => (Some(Op::Match), j + 1),
		_ => match bytes.get(j + 1) {
			Some(b'-') => (Some(Op::Default { colon: true }), j + 2),
			Some(b'+') => (Some(Op::Alternate { colon: true }), j + 2),
			Some(b'=') => (Some(Op::Required { colon: true }), j + 2),
			_ => (None, j + 1),
		},
	};
	let close = if c == b'}' {
		j
	} else {
		match closing_brace(bytes, word_start) {
			Some(close) => close,
			None => return Scan::Verbatim(text.len()),
		}
	};
	let end = close + 1;
	match op {
		Some(op) if valid_name(name) => Scan::Reference(Reference {
			name,
			op,
			word: &text[word_start.min(close)..close],
			literal: &text[start..end],
		}),
		_ => Scan::Verbatim(end),
	}
}

/// Offset of the `}` closing a reference body that starts at `from`.
fn closing_brace(bytes: &[u8], from: usize) -> Option<usize> {
	let mut depth = 1usize;
	for (k, &c) in bytes.iter().enumerate().skip(from) {
		match c {
			b'{' => depth += 1,
			b'}' => {
				depth -= 1;
				if depth == 0 {
					return Some(k);
				}
			}
			_ => {}
		}
	}
	None
}

/// Splits `s` at the first brace-depth-0 byte accepted by `stop`.
fn split_top(s: &str, stop: impl Fn(u8) -> bool) -> (&str, Option<&str>) {
	let mut depth = 0usize;
	for (k, c) in s.bytes().enumerate() {
		match c {
			b'{' => depth += 1,
			b'}' => depth = depth.saturating_sub(1),
			c if depth == 0 && stop(c) => return (&s[..k], Some(&s[k + 1..])),
			_ => {}
		}
	}
	(s, None)
}

fn valid_name(name: &str) -> bool {
	let word = |c: char| c.is_ascii_alphanumeric() || c == '_';
	match name.strip_prefix('-') {
		Some(rest) => !rest.is_empty() && rest.chars().all(|c| word(c) || c == '-'),
		None => !name.is_empty() && name.chars().all(word),
	}
}
