use super::*;

#[test]
fn rule_identity_is_stable() {
	let mut graph = RuleGraph::new();
	let a = graph.rule("lib/libfoo.a");
	let b = graph.rule("foo.o");
	assert_ne!(a, b);
	assert_eq!(graph.rule("lib/libfoo.a"), a);
	assert_eq!(graph.lookup("foo.o"), Some(b));
	assert_eq!(graph.len(), 2);
	assert_eq!(graph[a].name, "lib/libfoo.a");
}

#[test]
fn new_rules_are_zeroed() {
	let mut graph = RuleGraph::new();
	let r = graph.rule("x");
	let rule = &graph[r];
	assert!(rule.flags.is_empty());
	assert!(rule.prereqs.is_empty());
	assert!(rule.path.is_none());
	assert_eq!(rule.time, 0);
	assert_eq!(rule.making, 0);
}

#[test]
fn lookup_does_not_create() {
	let mut graph = RuleGraph::new();
	assert!(graph.lookup("ghost").is_none());
	assert!(graph.is_empty());
}

#[test]
fn root_has_empty_name() {
	let mut graph = RuleGraph::new();
	let root = graph.root();
	assert_eq!(graph[root].name, "");
	assert_eq!(graph.root(), root);
}

#[test]
fn prerequisites_keep_discovery_order_without_duplicates() {
	let mut graph = RuleGraph::new();
	let top = graph.rule("top");
	let x = graph.rule("x");
	let y = graph.rule("y");
	graph.add_prerequisite(top, y);
	graph.add_prerequisite(top, x);
	graph.add_prerequisite(top, y);
	assert_eq!(graph[top].prereqs.as_slice(), &[y, x]);
}

#[test]
fn ordered_follows_names() {
	let mut graph = RuleGraph::new();
	let c = graph.rule("c");
	let a = graph.rule("a");
	let b = graph.rule("b");
	assert_eq!(graph.ordered(), vec![a, b, c]);
}

#[test]
fn attributes_parse_known_words() {
	let flags = RuleFlags::from_attributes("dontcare  virtual bogus implicit");
	assert_eq!(
		flags,
		RuleFlags::DONTCARE | RuleFlags::VIRTUAL | RuleFlags::IMPLICIT
	);
	assert_eq!(RuleFlags::from_attributes(""), RuleFlags::empty());
	assert_eq!(
		RuleFlags::from_attributes("generated ignore"),
		RuleFlags::GENERATED | RuleFlags::IGNORE
	);
}

#[test]
fn accounted_excludes_bookkeeping_bits() {
	assert!(!RuleFlags::ACCOUNTED.contains(RuleFlags::ACTIVE));
	assert!(!RuleFlags::ACCOUNTED.contains(RuleFlags::MADE));
	assert!(!RuleFlags::ACCOUNTED.contains(RuleFlags::IGNORE));
	assert!(RuleFlags::ACCOUNTED.contains(RuleFlags::EXISTS));
}
