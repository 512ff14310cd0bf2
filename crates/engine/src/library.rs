//! Library references: `bind -lNAME`.
//!
//! A reference resolves to a local archive, an installed shared library
//! (kept as `-lNAME`), an installed archive, or plain `-lNAME`, in that
//! order. A `.req` file lists further libraries the reference drags in.
//! Results are memoized as variables named after the reference and as
//! `mam_libNAME`.

use std::fs;

use tracing::debug;

use crate::error::Result;
use crate::eval::Evaluator;

/// Installed library directory.
const LIBDIR: &str = "${INSTALLROOT}/lib/";

/// Value of a leading decimal number, 0 when there is none.
fn leading_number(s: &str) -> i64 {
	let s = s.trim_start();
	let end = s
		.char_indices()
		.find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && matches!(c, '-' | '+'))))
		.map_or(s.len(), |(i, _)| i);
	s[..end].parse().unwrap_or(0)
}

impl Evaluator {
	fn exists(&self, path: &str) -> bool {
		fs::metadata(self.resolver.absolute(path)).is_ok()
	}

	fn var(&mut self, name: &str) -> String {
		self.vars.get(name).unwrap_or_default().to_string()
	}

	/// Resolves the library reference `lib` (`-lNAME` or `+lNAME`) to the
	/// words to link with. With `dontcare`, a reference with no `.req` file
	/// is checked by linking a trivial program and dropped if that fails.
	pub(crate) fn require(&mut self, lib: &str, dontcare: bool) -> Result<String> {
		let dynamic = match self.dynamic {
			Some(dynamic) => dynamic,
			None => {
				let dynamic = self.vars.get("mam_cc_L").is_some_and(|s| leading_number(s) != 0);
				self.dynamic = Some(dynamic);
				dynamic
			}
		};
		if let Some(known) = self.vars.get(lib) {
			return Ok(known.to_string());
		}
		let name = lib.get(2..).unwrap_or_default();
		let archive = format!(
			"{}{}{}",
			self.var("mam_cc_PREFIX_ARCHIVE"),
			name,
			self.var("mam_cc_SUFFIX_ARCHIVE")
		);
		let local = self.vars.expand(&archive);
		let resolved = if self.exists(&local) {
			local
		} else {
			let shared = format!(
				"{LIBDIR}{}{}{}",
				self.var("mam_cc_PREFIX_SHARED"),
				name,
				self.var("mam_cc_SUFFIX_SHARED")
			);
			let shared = self.vars.expand(&shared);
			if dynamic && self.exists(&shared) {
				lib.to_string()
			} else {
				let installed = self.vars.expand(&format!("{LIBDIR}{archive}"));
				if self.exists(&installed) { installed } else { lib.to_string() }
			}
		};
		self.vars.set(lib, resolved.as_str());

		let installed_req = self.vars.expand(&format!("{LIBDIR}lib/{name}"));
		let req = fs::read_to_string(self.resolver.absolute(&format!("{name}.req")))
			.or_else(|_| fs::read_to_string(self.resolver.absolute(&installed_req)))
			.ok();
		let value = if let Some(req) = req {
			let mut value = String::new();
			for word in req.split([' ', '\t', '\n']).filter(|w| !w.is_empty() && *w != "-") {
				value.push(' ');
				value.push_str(&self.require(word, false)?);
			}
			value
		} else if dontcare && !self.links(&resolved)? {
			String::new()
		} else {
			resolved
		};
		debug!(%lib, %value, "require");
		self.vars.set(lib, value.as_str());
		self.vars.set(&format!("mam_lib{name}"), value.as_str());
		Ok(value)
	}

	/// Whether a trivial program links against `libs`.
	fn links(&mut self, libs: &str) -> Result<bool> {
		let script = format!(
			"set -\n\
			 cd \"${{TMPDIR:-/tmp}}\"\n\
			 echo 'int main(){{return 0;}}' > x.${{!-$$}}.c\n\
			 ${{CC}} ${{CCFLAGS}} -o x.${{!-$$}}.x x.${{!-$$}}.c {libs} >/dev/null 2>&1\n\
			 c=$?\n\
			 rm -f x.${{!-$$}}.[cox]\n\
			 exit $c\n"
		);
		let script = self.vars.expand(&script);
		Ok(self.execute(&script)? == 0)
	}
}
