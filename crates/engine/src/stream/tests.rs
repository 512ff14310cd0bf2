use super::*;

fn stack(text: &str) -> InputStack {
	let mut input = InputStack::new();
	input.push("Mamfile", Source::text(text), StreamFlags::empty()).unwrap();
	input
}

fn owned(input: &mut InputStack) -> Option<String> {
	input.next_line().unwrap().map(str::to_string)
}

#[test]
fn lines_are_trimmed_and_counted() {
	let mut input = stack("make a\n\t  exec - echo hi  \nlast");
	assert_eq!(owned(&mut input).as_deref(), Some("make a"));
	assert_eq!(owned(&mut input).as_deref(), Some("exec - echo hi  "));
	assert_eq!(input.location().unwrap().line, 2);
	assert_eq!(owned(&mut input).as_deref(), Some("last"));
	assert_eq!(owned(&mut input), None);
	assert_eq!(input.location().unwrap().file, "Mamfile");
}

#[test]
fn replay_returns_the_same_line() {
	let mut input = stack("done a\ndone b\n");
	assert_eq!(owned(&mut input).as_deref(), Some("done a"));
	assert!(!input.repeated());
	input.replay();
	assert_eq!(owned(&mut input).as_deref(), Some("done a"));
	assert!(input.repeated());
	assert_eq!(input.location().unwrap().line, 1);
	assert_eq!(owned(&mut input).as_deref(), Some("done b"));
	assert!(!input.repeated());
}

#[test]
fn nested_frames_resume_parent() {
	let mut input = stack("outer 1\nouter 2\n");
	assert_eq!(owned(&mut input).as_deref(), Some("outer 1"));
	input.push("inner", Source::text("inner 1\n"), StreamFlags::empty()).unwrap();
	assert_eq!(owned(&mut input).as_deref(), Some("inner 1"));
	assert_eq!(owned(&mut input), None);
	input.pop().unwrap();
	assert_eq!(owned(&mut input).as_deref(), Some("outer 2"));
	assert_eq!(input.location().unwrap().line, 2);
}

#[test]
fn depth_is_bounded() {
	let mut input = InputStack::new();
	for i in 0..DEPTH {
		input.push(format!("f{i}"), Source::text(""), StreamFlags::empty()).unwrap();
	}
	assert!(input.is_full());
	let err = input.push("overflow", Source::text(""), StreamFlags::empty()).unwrap_err();
	assert!(matches!(err, MakeError::StackOverflow));
	assert_eq!(input.depth(), DEPTH);
}

#[test]
fn empty_stack_errors() {
	let mut input = InputStack::new();
	assert!(matches!(input.pop().unwrap_err(), MakeError::StackUnderflow));
	assert!(matches!(input.next_line().unwrap_err(), MakeError::NoInput));
	assert!(input.location().is_none());
}

#[test]
fn pipe_reads_child_output() {
	let mut command = Command::new("/bin/sh");
	command.args(["-c", "echo one; echo '  two'"]);
	let mut input = InputStack::new();
	input
		.push("recurse", Source::pipe(&mut command).unwrap(), StreamFlags::PIPE)
		.unwrap();
	assert_eq!(owned(&mut input).as_deref(), Some("one"));
	assert_eq!(owned(&mut input).as_deref(), Some("two"));
	assert_eq!(owned(&mut input), None);
	input.pop().unwrap();
	assert_eq!(input.depth(), 0);
}

#[test]
fn file_source() {
	let tmp = tempfile::tempdir().unwrap();
	let path = tmp.path().join("Mamfile");
	std::fs::write(&path, "setv A 1\n").unwrap();
	let mut input = InputStack::new();
	input
		.push("Mamfile", Source::file(&path).unwrap(), StreamFlags::MUST)
		.unwrap();
	assert_eq!(owned(&mut input).as_deref(), Some("setv A 1"));
	assert!(matches!(
		Source::file(&tmp.path().join("missing")).unwrap_err(),
		MakeError::Io { .. }
	));
}

#[test]
fn invalid_utf8_is_replaced_not_fatal() {
	let tmp = tempfile::tempdir().unwrap();
	let path = tmp.path().join("Mamfile");
	std::fs::write(&path, b"exec - echo caf\xe9 > out\ndone out\n").unwrap();
	let mut input = InputStack::new();
	input
		.push("Mamfile", Source::file(&path).unwrap(), StreamFlags::MUST)
		.unwrap();
	assert_eq!(owned(&mut input).as_deref(), Some("exec - echo caf\u{fffd} > out"));
	assert_eq!(owned(&mut input).as_deref(), Some("done out"));
	assert_eq!(owned(&mut input), None);
}
