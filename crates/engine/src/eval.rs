//! The make evaluator.
//!
//! [`Evaluator::make`] reads directives from the current input until the
//! `done` line of the rule it was called for, recursing on nested `make`
//! directives. It returns the rule's time: the maximum of its own bound time
//! and the times of everything that affects it.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::buffer::{BufferPool, PooledBuffer};
use crate::config::Options;
use crate::error::{MakeError, Result};
use crate::report::Reporter;
use crate::rule::{RuleFlags, RuleGraph, RuleId};
use crate::stream::{InputStack, Source, StreamFlags};
use crate::symtab::SymbolTable;
use crate::vars::Variables;
use crate::view::{Resolver, ViewPath, mtime};

/// Directive keyword, dispatched on its first four bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
	Bind,
	Done,
	Exec,
	Make,
	Prev,
	Setv,
	Other,
}

/// One mamfile line split into keyword, target and the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Directive<'a> {
	pub keyword: Keyword,
	pub target: &'a str,
	pub value: &'a str,
}

impl<'a> Directive<'a> {
	/// Splits `line` on spaces, skipping an optional leading sequence number.
	pub fn parse(line: &'a str) -> Self {
		let s = line
			.trim_start_matches(' ')
			.trim_start_matches(|c: char| c.is_ascii_digit())
			.trim_start_matches(' ');
		let (word, rest) = s.split_once(' ').unwrap_or((s, ""));
		let rest = rest.trim_start_matches(' ');
		let (target, value) = rest.split_once(' ').unwrap_or((rest, ""));
		let keyword = match word.as_bytes().get(..4) {
			Some(b"bind") => Keyword::Bind,
			Some(b"done") => Keyword::Done,
			Some(b"exec") => Keyword::Exec,
			Some(b"make") => Keyword::Make,
			Some(b"prev") => Keyword::Prev,
			Some(b"setv") => Keyword::Setv,
			_ => Keyword::Other,
		};
		Self {
			keyword,
			target,
			value: value.trim_start_matches(' '),
		}
	}
}

/// State of one mamake run.
pub struct Evaluator {
	pub(crate) options: Options,
	pub(crate) vars: Variables,
	pub(crate) rules: RuleGraph,
	pub(crate) input: InputStack,
	pub(crate) resolver: Resolver,
	pub(crate) pool: Rc<BufferPool>,
	pub(crate) reporter: Reporter,
	/// Sink for actions listed instead of executed.
	pub(crate) out: Box<dyn Write>,
	/// Count of active rules being made; starts at 1 when no targets are named.
	pub(crate) active: u32,
	pub(crate) probed: bool,
	pub(crate) verified: bool,
	/// Whether probing prefers shared libraries (`mam_cc_L`), read once.
	pub(crate) dynamic: Option<bool>,
	pub(crate) shell: Option<String>,
	/// Recursion leaves by base name.
	pub(crate) leaves: SymbolTable<RuleId>,
	depth: usize,
}

impl Evaluator {
	/// Creates an evaluator working in `pwd`. The viewpath comes from the
	/// `VPATH` variable.
	pub fn new(options: Options, mut vars: Variables, pwd: impl Into<PathBuf>) -> Result<Self> {
		let pwd = pwd.into();
		let vpath = vars.get("VPATH").unwrap_or_default().to_string();
		let view = ViewPath::new(&vpath, &pwd.to_string_lossy())?;
		let reporter = Reporter::new(options.directory.clone());
		Ok(Self {
			options,
			vars,
			rules: RuleGraph::new(),
			input: InputStack::new(),
			resolver: Resolver::new(pwd, view),
			pool: BufferPool::new(),
			reporter,
			out: Box::new(io::stdout()),
			active: 1,
			probed: false,
			verified: false,
			dynamic: None,
			shell: None,
			leaves: SymbolTable::new(),
			depth: 0,
		})
	}

	/// Redirects the listing of actions that are not executed.
	pub fn with_output(mut self, out: impl Write + 'static) -> Self {
		self.out = Box::new(out);
		self
	}

	/// Marks `target` as named on the command line. Once any target is named,
	/// actions run only for active rules and their prerequisites.
	pub fn activate(&mut self, target: &str) {
		let r = self.rules.rule(target);
		self.rules[r].flags |= RuleFlags::ACTIVE;
		self.active = 0;
	}

	pub fn variables(&mut self) -> &mut Variables {
		&mut self.vars
	}

	/// Number of errors reported so far.
	pub fn errors(&self) -> usize {
		self.reporter.errors()
	}

	/// Number of warnings reported so far.
	pub fn warnings(&self) -> usize {
		self.reporter.warnings()
	}

	/// Evaluates the mamfile, or recurses into leaf directories with `-r`.
	pub fn run(&mut self) -> Result<()> {
		if let Some(pattern) = self.options.recurse.clone() {
			return self.recurse(&pattern);
		}
		let arguments = self.options.arguments.get(1..).unwrap_or_default().to_string();
		self.vars.set("MAMAKEARGS", arguments);
		let file = self.options.file.clone();
		self.push(Some(&file), StreamFlags::MUST)?;
		let root = self.rules.root();
		self.make(root)?;
		self.input.pop()?;
		if self.active == 0 && !self.verified {
			self.verify()?;
		}
		Ok(())
	}

	/// Opens `name` as the new input. `None`, `-` and `/dev/stdin` read
	/// standard input. Returns `false` if `name` is not found and not required.
	pub(crate) fn push(&mut self, name: Option<&str>, flags: StreamFlags) -> Result<bool> {
		if self.input.is_full() {
			return Err(MakeError::StackOverflow);
		}
		match name {
			None | Some("-" | "/dev/stdin") => {
				self.input
					.push("/dev/stdin", Source::stdin(), flags | StreamFlags::KEEP)?;
			}
			Some(name) => {
				let Some((path, _)) = self.resolver.find(name) else {
					if flags.contains(StreamFlags::MUST) {
						return Err(MakeError::NotFound(name.to_string()));
					}
					return Ok(false);
				};
				let source = Source::file(&self.resolver.absolute(&path))?;
				self.input.push(path, source, flags)?;
			}
		}
		Ok(true)
	}

	/// Binds `r` to a file through the viewpath and returns its time.
	pub(crate) fn bind(&mut self, r: RuleId) -> u64 {
		let rule = &mut self.rules[r];
		if let Some((path, meta)) = self.resolver.find(&rule.name) {
			if path != rule.name {
				rule.path = Some(path);
			}
			rule.time = mtime(&meta);
			rule.flags |= RuleFlags::EXISTS;
		}
		rule.time
	}

	fn target(&mut self, name: &str) -> RuleId {
		let name = self.vars.expand(name);
		self.rules.rule(&name)
	}

	/// Evaluates directives until the `done` of `r` and returns its time.
	pub fn make(&mut self, r: RuleId) -> Result<u64> {
		self.rules[r].making += 1;
		let active = self.rules[r].flags.contains(RuleFlags::ACTIVE);
		if active {
			self.active += 1;
		}
		let named = !self.rules[r].name.is_empty();
		let mut z = 0;
		if named {
			z = self.bind(r);
			self.depth += 1;
			debug!(rule = %self.rules[r].name, time = z, depth = self.depth, "make");
		}
		let mut cmd: Option<PooledBuffer> = None;
		while let Some(line) = self.input.next_line()? {
			let line = line.to_string();
			let d = Directive::parse(&line);
			match d.keyword {
				Keyword::Bind => self.bind_library(r, &d, &mut z)?,
				Keyword::Done => {
					self.done(r, &d, cmd.as_deref().map(|c| c.as_str()), &mut z)?;
					break;
				}
				Keyword::Exec => {
					let rule = &mut self.rules[r];
					rule.flags |= RuleFlags::GENERATED;
					if rule.path.take().is_some() {
						rule.time = 0;
					}
					if self.active > 0 {
						if let Some(buf) = cmd.as_mut() {
							buf.push('\n');
						} else {
							cmd = Some(self.pool.acquire());
						}
						if let Some(buf) = cmd.as_mut() {
							buf.append(d.value);
						}
					}
				}
				Keyword::Make => {
					let q = self.target(d.target);
					if self.rules[q].making == 0 {
						self.rules[q].flags |= RuleFlags::from_attributes(d.value);
						let x = self.make(q)?;
						self.fold(r, q, x, &mut z);
					}
				}
				Keyword::Prev => {
					let q = self.target(d.target);
					if self.rules[q].making == 0 {
						let x = self.rules[q].time;
						self.fold(r, q, x, &mut z);
						debug!(rule = %self.rules[q].name, time = x, depth = self.depth + 1, "prev");
					}
				}
				Keyword::Setv => self.setv(&d)?,
				Keyword::Other => {}
			}
		}
		if named {
			debug!(rule = %self.rules[r].name, time = z, depth = self.depth, "done");
			self.depth -= 1;
		}
		if active {
			self.active -= 1;
		}
		let rule = &mut self.rules[r];
		rule.making -= 1;
		rule.time = z;
		Ok(z)
	}

	/// Folds prerequisite `q` with time `x` into `r`.
	fn fold(&mut self, r: RuleId, q: RuleId, x: u64, z: &mut u64) {
		let flags = self.rules[q].flags;
		if !flags.contains(RuleFlags::IGNORE) {
			*z = (*z).max(x);
		}
		if flags.contains(RuleFlags::ERROR) {
			self.rules[r].flags |= RuleFlags::ERROR;
		}
	}

	fn bind_library(&mut self, r: RuleId, d: &Directive<'_>, z: &mut u64) -> Result<()> {
		let t = d.target.as_bytes();
		if t.len() < 2 || !matches!(t[0], b'-' | b'+') || t[1] != b'l' {
			return Ok(());
		}
		let libs = self.require(d.target, d.value == "dontcare")?;
		let name = &self.rules[r].name;
		if name.starts_with("FEATURE/") || name == "configure.h" {
			return Ok(());
		}
		for lib in libs.split(' ').filter(|lib| !lib.is_empty()) {
			let q = self.target(lib);
			self.rules[q].flags |= RuleFlags::from_attributes(d.value);
			let x = self.bind(q);
			*z = (*z).max(x);
			if self.rules[q].flags.contains(RuleFlags::ERROR) {
				self.rules[r].flags |= RuleFlags::ERROR;
			}
		}
		Ok(())
	}

	fn done(&mut self, r: RuleId, d: &Directive<'_>, cmd: Option<&str>, z: &mut u64) -> Result<()> {
		let q = self.target(d.target);
		// A `done` for an enclosing rule closes this one too and is read again
		// by the level it belongs to.
		let enclosing = q != r && self.rules[q].making > 0 && !self.rules[q].name.is_empty();
		// a replayed line was already reported by the level that first read it
		if q != r && !self.input.repeated() {
			self.reporter
				.warning(self.input.location(), d.target, "improper done statement");
		}
		if !enclosing {
			self.rules[r].flags |= RuleFlags::from_attributes(d.value);
		}
		let time = self.rules[r].time;
		if let Some(cmd) = cmd
			&& self.active > 0
			&& (self.options.force || time < *z || (time == 0 && *z == 0))
		{
			if self.options.explain && !self.options.force {
				self.reporter.explain(&self.rules[r].name, time, *z);
			}
			let action = self.vars.expand(cmd);
			let x = self.action(r, &action)?;
			*z = (*z).max(x);
		}
		self.rules[r].flags |= RuleFlags::MADE;
		if !self.rules[r].flags.intersects(RuleFlags::ACCOUNTED) {
			self.dont(r, 0, self.options.keep_going)?;
		}
		if enclosing {
			self.input.replay();
		}
		Ok(())
	}

	fn setv(&mut self, d: &Directive<'_>) -> Result<()> {
		if !self.vars.is_set(d.target) {
			let value = d
				.value
				.strip_prefix('"')
				.and_then(|v| v.strip_suffix('"'))
				.unwrap_or(d.value);
			let value = self.vars.expand(value);
			self.vars.set(d.target, value);
		}
		if !self.probed && d.target == "CC" {
			self.probed = true;
			self.probe()?;
		}
		Ok(())
	}

	/// Reports that `r` could not be made. `code` 0 means there was no way to
	/// make it; otherwise it is the failing action's exit code and the target
	/// file is removed.
	pub(crate) fn dont(&mut self, r: RuleId, code: i32, keep_going: bool) -> Result<()> {
		let name = self.rules[r].name.clone();
		if code == 0 {
			self.reporter.dont_know(&name);
		} else {
			self.reporter
				.exit_code(code, &name, self.options.ignore_errors);
			if let Err(error) = fs::remove_file(self.resolver.absolute(&name)) {
				trace!(rule = %name, %error, "not removed");
			}
			if self.options.ignore_errors {
				return Ok(());
			}
		}
		if !keep_going {
			return Err(MakeError::Stopped);
		}
		self.rules[r].flags |= RuleFlags::ERROR;
		Ok(())
	}

	/// Reports active targets that were never made.
	fn verify(&mut self) -> Result<()> {
		let mask = RuleFlags::ACTIVE | RuleFlags::ERROR | RuleFlags::MADE;
		for r in self.rules.ordered() {
			if self.rules[r].flags & mask == RuleFlags::ACTIVE {
				self.dont(r, 0, true)?;
			}
		}
		Ok(())
	}
}
