//! Variable table.
//!
//! Precedence falls out of write order: the environment is imported first,
//! command-line assignments overwrite it, and mamfile `setv` only fills names
//! that are still unset.

use std::ffi::OsStr;

use crate::symtab::SymbolTable;

/// Name to value map consulted by [`expand`](Variables::expand).
#[derive(Debug, Default)]
pub struct Variables {
	table: SymbolTable<String>,
}

impl Variables {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the value of `name`.
	pub fn get(&mut self, name: &str) -> Option<&str> {
		self.table.search(name).map(String::as_str)
	}

	/// Returns `true` if `name` has a value, empty or not.
	pub fn is_set(&mut self, name: &str) -> bool {
		self.table.search(name).is_some()
	}

	/// Sets `name`, replacing any previous value.
	pub fn set(&mut self, name: &str, value: impl Into<String>) {
		self.table.insert(name, value.into());
	}

	/// Records a command-line `name=value` assignment along with the
	/// `name.FORCE` shadow carrying the unmodified right-hand side.
	pub fn assign(&mut self, name: &str, value: &str) {
		self.set(name, value);
		self.set(&format!("{name}.FORCE"), value);
	}

	/// Imports `name=value` pairs, overwriting existing values. Bytes that
	/// are not UTF-8 are replaced rather than rejected.
	pub fn import<I, K, V>(&mut self, pairs: I)
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<OsStr>,
		V: AsRef<OsStr>,
	{
		for (name, value) in pairs {
			let name = name.as_ref().to_string_lossy();
			self.set(&name, value.as_ref().to_string_lossy());
		}
	}
}

#[cfg(test)]
mod tests;
