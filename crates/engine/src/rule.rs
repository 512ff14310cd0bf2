//! Build targets and their prerequisite graph.

use std::ops::{Index, IndexMut};

use smallvec::SmallVec;

use crate::symtab::SymbolTable;

bitflags::bitflags! {
	/// Per-rule state bits.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct RuleFlags: u16 {
		/// Named on the command line or pulled in by one that was.
		const ACTIVE = 1 << 0;
		/// Not an error if the file is missing.
		const DONTCARE = 1 << 1;
		/// Not found or not generated.
		const ERROR = 1 << 2;
		/// The target file exists.
		const EXISTS = 1 << 3;
		/// Produced by an action.
		const GENERATED = 1 << 4;
		/// Its time does not propagate to dependents.
		const IGNORE = 1 << 5;
		/// Implicit prerequisite.
		const IMPLICIT = 1 << 6;
		/// Already made in this run.
		const MADE = 1 << 7;
		/// Not a file.
		const VIRTUAL = 1 << 8;
	}
}

impl RuleFlags {
	/// Any of these means the evaluator knows how the target came to be.
	pub const ACCOUNTED: Self = Self::DONTCARE
		.union(Self::ERROR)
		.union(Self::EXISTS)
		.union(Self::GENERATED)
		.union(Self::IMPLICIT)
		.union(Self::VIRTUAL);

	/// Parses an attribute list (`dontcare generated ignore implicit virtual`).
	/// Unknown words are ignored.
	pub fn from_attributes(attrs: &str) -> Self {
		attrs
			.split_whitespace()
			.fold(Self::empty(), |flags, word| {
				flags
					| match word {
						"dontcare" => Self::DONTCARE,
						"generated" => Self::GENERATED,
						"ignore" => Self::IGNORE,
						"implicit" => Self::IMPLICIT,
						"virtual" => Self::VIRTUAL,
						_ => Self::empty(),
					}
			})
	}
}

/// Handle to a rule in a [`RuleGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(u32);

/// One build target.
#[derive(Debug, Default)]
pub struct Rule {
	/// Unbound name as written in the mamfile.
	pub name: String,
	/// Bound path when viewpath resolution found the file elsewhere.
	pub path: Option<String>,
	/// Prerequisites in discovery order, without duplicates.
	pub prereqs: SmallVec<[RuleId; 4]>,
	/// Recursion leaf alias for directory rules.
	pub leaf: Option<RuleId>,
	pub flags: RuleFlags,
	/// Nesting count of in-progress evaluations of this rule.
	pub making: u32,
	/// Modification time in seconds, 0 when unknown.
	pub time: u64,
}

/// All rules of an evaluation, keyed by name.
///
/// Rules are created on first reference and never removed, so a [`RuleId`]
/// stays valid for the life of the graph.
#[derive(Debug, Default)]
pub struct RuleGraph {
	rules: Vec<Rule>,
	names: SymbolTable<RuleId>,
}

impl RuleGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the rule for `name`, creating it if needed.
	pub fn rule(&mut self, name: &str) -> RuleId {
		if let Some(&id) = self.names.search(name) {
			return id;
		}
		let id = RuleId(self.rules.len() as u32);
		let name = self.names.insert(name, id).to_string();
		self.rules.push(Rule {
			name,
			..Rule::default()
		});
		id
	}

	/// The root rule: empty name, the aggregate of everything in a mamfile.
	pub fn root(&mut self) -> RuleId {
		self.rule("")
	}

	/// Returns the rule for `name` only if it already exists.
	pub fn lookup(&mut self, name: &str) -> Option<RuleId> {
		self.names.search(name).copied()
	}

	/// Appends `prereq` to the prerequisites of `rule` unless already present.
	pub fn add_prerequisite(&mut self, rule: RuleId, prereq: RuleId) {
		let prereqs = &mut self[rule].prereqs;
		if !prereqs.contains(&prereq) {
			prereqs.push(prereq);
		}
	}

	/// Rule ids in name order.
	pub fn ordered(&self) -> Vec<RuleId> {
		self.names.iter().map(|(_, &id)| id).collect()
	}

	pub fn len(&self) -> usize {
		self.rules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}
}

impl Index<RuleId> for RuleGraph {
	type Output = Rule;

	fn index(&self, id: RuleId) -> &Rule {
		&self.rules[id.0 as usize]
	}
}

impl IndexMut<RuleId> for RuleGraph {
	fn index_mut(&mut self, id: RuleId) -> &mut Rule {
		&mut self.rules[id.0 as usize]
	}
}

#[cfg(test)]
mod tests;
