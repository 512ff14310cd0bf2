use std::fs;
use std::path::Path;

use crate::config::Options;
use crate::vars::Variables;

use super::*;

fn evaluator(dir: &Path, options: Options) -> Evaluator {
	Evaluator::new(options, Variables::new(), dir).unwrap()
}

#[test]
fn wait_status_convention() {
	let status = Command::new("/bin/sh").args(["-c", "exit 3"]).status().unwrap();
	assert_eq!(exit_code(status), 3);
	let status = Command::new("/bin/sh").args(["-c", "true"]).status().unwrap();
	assert_eq!(exit_code(status), 0);
	let status = Command::new("/bin/sh").args(["-c", "kill -9 $$"]).status().unwrap();
	assert_eq!(exit_code(status), 9);
}

#[test]
fn action_runs_in_working_directory() {
	let tmp = tempfile::tempdir().unwrap();
	let mut ev = evaluator(tmp.path(), Options::default());
	let r = ev.rules.rule("out.txt");
	let time = ev.action(r, "echo hi > out.txt").unwrap();
	assert_eq!(fs::read_to_string(tmp.path().join("out.txt")).unwrap(), "hi\n");
	assert!(time > 0);
	assert!(ev.rules[r].flags.contains(RuleFlags::EXISTS));
	assert_eq!(ev.errors(), 0);
}

#[test]
fn action_without_output_is_stamped_now() {
	let tmp = tempfile::tempdir().unwrap();
	let mut ev = evaluator(tmp.path(), Options::default());
	let r = ev.rules.rule("phony");
	let before = now();
	assert!(ev.action(r, "true").unwrap() >= before);
	assert!(!ev.rules[r].flags.contains(RuleFlags::EXISTS));
}

#[test]
fn failed_action_removes_target() {
	let tmp = tempfile::tempdir().unwrap();
	fs::write(tmp.path().join("half"), "partial").unwrap();
	let options = Options {
		keep_going: true,
		..Options::default()
	};
	let mut ev = evaluator(tmp.path(), options);
	let r = ev.rules.rule("half");
	ev.action(r, "exit 2").unwrap();
	assert!(!tmp.path().join("half").exists());
	assert!(ev.rules[r].flags.contains(RuleFlags::ERROR));
	assert_eq!(ev.errors(), 1);

	let before = ev.rules[r].time;
	assert_eq!(ev.action(r, "touch half").unwrap(), before, "errored rules do not run");
	assert!(!tmp.path().join("half").exists());
}

#[test]
fn failed_action_stops_without_keep_going() {
	let tmp = tempfile::tempdir().unwrap();
	let mut ev = evaluator(tmp.path(), Options::default());
	let r = ev.rules.rule("x");
	assert!(matches!(ev.action(r, "exit 1").unwrap_err(), MakeError::Stopped));
}

#[test]
fn ignored_failure_leaves_rule_clean() {
	let tmp = tempfile::tempdir().unwrap();
	let options = Options {
		ignore_errors: true,
		..Options::default()
	};
	let mut ev = evaluator(tmp.path(), options);
	let r = ev.rules.rule("x");
	ev.action(r, "exit 4").unwrap();
	assert!(!ev.rules[r].flags.contains(RuleFlags::ERROR));
	assert_eq!(ev.errors(), 0);
}

#[test]
fn shell_comes_from_variable() {
	let tmp = tempfile::tempdir().unwrap();
	let mut vars = Variables::new();
	vars.set("SHELL", "/nonexistent/shell");
	let mut ev = Evaluator::new(Options::default(), vars, tmp.path()).unwrap();
	let err = ev.execute("true").unwrap_err();
	assert!(matches!(err, MakeError::Spawn { command, .. } if command == "/nonexistent/shell"));
}

#[test]
fn preamble_searches_working_directory_first() {
	let tmp = tempfile::tempdir().unwrap();
	let mut ev = evaluator(tmp.path(), Options::default());
	let r = ev.rules.rule("seen");
	ev.action(r, "echo \"$PATH\" > seen").unwrap();
	let path = fs::read_to_string(tmp.path().join("seen")).unwrap();
	assert!(path.starts_with(".:"), "{path}");
}

struct View {
	_tmp: tempfile::TempDir,
	src: String,
	ev: Evaluator,
}

fn view() -> View {
	let tmp = tempfile::tempdir().unwrap();
	let root = tmp.path().canonicalize().unwrap().to_str().unwrap().to_string();
	fs::create_dir_all(format!("{root}/build/sub")).unwrap();
	fs::create_dir_all(format!("{root}/src/sub")).unwrap();
	fs::write(format!("{root}/src/sub/foo.c"), "").unwrap();
	let mut vars = Variables::new();
	vars.set("VPATH", format!("{root}/build:{root}/src"));
	let ev = Evaluator::new(Options::default(), vars, format!("{root}/build/sub")).unwrap();
	View {
		_tmp: tmp,
		src: format!("{root}/src/sub"),
		ev,
	}
}

fn rewritten(ev: &mut Evaluator, action: &str) -> String {
	let mut out = Buffer::new();
	ev.rewrite(&mut out, action);
	out.freeze()
}

#[test]
fn rewrite_binds_source_words() {
	let View { _tmp, src, mut ev } = view();
	let r = ev.rules.rule("foo.c");
	ev.bind(r);
	assert_eq!(
		rewritten(&mut ev, "cc -c foo.c;X=foo.c"),
		format!("cc -c {src}/foo.c;X={src}/foo.c")
	);
	ev.rules[r].flags |= RuleFlags::GENERATED;
	assert_eq!(rewritten(&mut ev, "cc -c foo.c"), "cc -c foo.c");
}

#[test]
fn rewrite_repeats_include_directories() {
	let View { _tmp, src, mut ev } = view();
	assert_eq!(
		rewritten(&mut ev, "cc -I. -Iinc -I/abs -I inc2 -I\t/abs2"),
		format!("cc -I. -I{src} -Iinc -I{src}/inc -I/abs -I inc2 -I {src}/inc2 -I\t/abs2")
	);
	assert_eq!(rewritten(&mut ev, "cc -I"), "cc -I");
}

#[derive(Clone, Default)]
struct Sink(std::rc::Rc<std::cell::RefCell<Vec<u8>>>);

impl Write for Sink {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		self.0.borrow_mut().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}

#[test]
fn listed_actions_are_rewritten_without_preamble() {
	let View { _tmp, src, ev } = view();
	let sink = Sink::default();
	let mut ev = ev.with_output(sink.clone());
	ev.options.exec = false;
	let source = ev.rules.rule("foo.c");
	ev.bind(source);
	let r = ev.rules.rule("foo.o");
	ev.action(r, "cc -c foo.c").unwrap();
	assert_eq!(
		String::from_utf8(sink.0.borrow().clone()).unwrap(),
		format!("cc -c {src}/foo.c\n")
	);
	assert!(ev.rules[r].flags.contains(RuleFlags::EXISTS));
	assert!(ev.rules[r].time > 0);
}

#[test]
fn recursion_runs_when_listing() {
	let tmp = tempfile::tempdir().unwrap();
	let options = Options {
		exec: false,
		..Options::default()
	};
	let mut ev = evaluator(tmp.path(), options);
	let r = ev.rules.rule("sub");
	ev.action(r, "mamake -r '*' 2>/dev/null; true").unwrap();
	assert!(ev.verified);
}
