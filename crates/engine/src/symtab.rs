//! String-keyed ordered symbol table.
//!
//! A top-down splay tree (Sleator and Tarjan) over an index arena. Every
//! lookup or insert splays the accessed key, or its nearest neighbor, to the
//! root, so lookups take `&mut self`. Entries are never removed; inserting an
//! existing key replaces the value and keeps the stored key.

use std::cmp::Ordering;
use std::ops::ControlFlow;

#[derive(Debug)]
struct Node<V> {
	key: Box<str>,
	value: V,
	left: Option<usize>,
	right: Option<usize>,
}

/// Ordered map from names to values.
#[derive(Debug)]
pub struct SymbolTable<V> {
	nodes: Vec<Node<V>>,
	root: Option<usize>,
}

impl<V> Default for SymbolTable<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V> SymbolTable<V> {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self {
			nodes: Vec::new(),
			root: None,
		}
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Returns `true` if the table has no entries.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Looks up `key`, splaying it (or its nearest neighbor) to the root.
	pub fn search(&mut self, key: &str) -> Option<&V> {
		let found = self.splay(key, None)?;
		Some(&self.nodes[found].value)
	}

	/// Inserts or replaces the value for `key` and returns the table-owned key.
	pub fn insert(&mut self, key: &str, value: V) -> &str {
		// splaying with a value always leaves the entry at the root
		self.splay(key, Some(value));
		self.root.map_or("", |r| &*self.nodes[r].key)
	}

	/// Visits every entry in key order until `visit` breaks.
	pub fn walk<F>(&self, mut visit: F) -> ControlFlow<()>
	where
		F: FnMut(&str, &V) -> ControlFlow<()>,
	{
		for (key, value) in self.iter() {
			if visit(key, value).is_break() {
				return ControlFlow::Break(());
			}
		}
		ControlFlow::Continue(())
	}

	/// In-order iterator over the entries. Does not restructure the tree.
	pub fn iter(&self) -> Iter<'_, V> {
		let mut iter = Iter {
			table: self,
			stack: Vec::new(),
		};
		iter.descend(self.root);
		iter
	}

	/// Top-down splay for `key`. With `value`, the entry is created or updated.
	/// Returns the index of the entry for `key`, now at the root.
	fn splay(&mut self, key: &str, value: Option<V>) -> Option<usize> {
		let mut root = self.root;
		// `left` is the maximum of the assembled left tree, `right` the minimum of
		// the right tree; `lroot`/`rroot` are their roots.
		let mut left: Option<usize> = None;
		let mut right: Option<usize> = None;
		let mut lroot: Option<usize> = None;
		let mut rroot: Option<usize> = None;

		while let Some(mut t) = root {
			match key.cmp(&*self.nodes[t].key) {
				Ordering::Equal => break,
				Ordering::Less => {
					if let Some(l) = self.nodes[t].left {
						let cmp = key.cmp(&*self.nodes[l].key);
						if cmp != Ordering::Greater {
							self.nodes[t].left = self.nodes[l].right;
							self.nodes[l].right = Some(t);
							t = l;
							if cmp == Ordering::Equal {
								root = Some(t);
								break;
							}
						}
					}
					match right {
						Some(r) => self.nodes[r].left = Some(t),
						None => rroot = Some(t),
					}
					right = Some(t);
					root = self.nodes[t].left;
					self.nodes[t].left = None;
				}
				Ordering::Greater => {
					if let Some(r) = self.nodes[t].right {
						let cmp = key.cmp(&*self.nodes[r].key);
						if cmp != Ordering::Less {
							self.nodes[t].right = self.nodes[r].left;
							self.nodes[r].left = Some(t);
							t = r;
							if cmp == Ordering::Equal {
								root = Some(t);
								break;
							}
						}
					}
					match left {
						Some(l) => self.nodes[l].right = Some(t),
						None => lroot = Some(t),
					}
					left = Some(t);
					root = self.nodes[t].right;
					self.nodes[t].right = None;
				}
			}
		}

		let found = match root {
			Some(t) => {
				match right {
					Some(r) => self.nodes[r].left = self.nodes[t].right,
					None => rroot = self.nodes[t].right,
				}
				match left {
					Some(l) => self.nodes[l].right = self.nodes[t].left,
					None => lroot = self.nodes[t].left,
				}
				if let Some(value) = value {
					self.nodes[t].value = value;
				}
				Some(t)
			}
			None => value.map(|value| {
				self.nodes.push(Node {
					key: key.into(),
					value,
					left: None,
					right: None,
				});
				self.nodes.len() - 1
			}),
		};

		if let Some(t) = found {
			self.nodes[t].left = lroot;
			self.nodes[t].right = rroot;
			self.root = Some(t);
			return Some(t);
		}

		// Miss without insert: join the two halves back together.
		if let Some(l) = left {
			self.nodes[l].right = rroot;
			self.root = lroot;
		} else if let Some(r) = right {
			self.nodes[r].left = lroot;
			self.root = rroot;
		}
		None
	}

	#[cfg(test)]
	fn root_key(&self) -> Option<&str> {
		self.root.map(|r| &*self.nodes[r].key)
	}
}

/// In-order iterator returned by [`SymbolTable::iter`].
pub struct Iter<'a, V> {
	table: &'a SymbolTable<V>,
	stack: Vec<usize>,
}

impl<V> Iter<'_, V> {
	fn descend(&mut self, mut node: Option<usize>) {
		while let Some(n) = node {
			self.stack.push(n);
			node = self.table.nodes[n].left;
		}
	}
}

impl<'a, V> Iterator for Iter<'a, V> {
	type Item = (&'a str, &'a V);

	fn next(&mut self) -> Option<Self::Item> {
		let n = self.stack.pop()?;
		let table = self.table;
		self.descend(table.nodes[n].right);
		let node = &table.nodes[n];
		Some((&*node.key, &node.value))
	}
}
