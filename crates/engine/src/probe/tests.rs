use std::os::unix::fs::PermissionsExt;

use crate::config::Options;
use crate::vars::Variables;

use super::*;

fn script(path: &Path, body: &str) {
	fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
	fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

struct Toolchain {
	tmp: tempfile::TempDir,
	vars: Variables,
}

/// A `PATH` holding a fake compiler and a `mamprobe` that writes `setv`
/// lines, counting its runs in `runs`.
fn toolchain() -> Toolchain {
	let tmp = tempfile::tempdir().unwrap();
	let bin = tmp.path().join("bin");
	fs::create_dir(&bin).unwrap();
	script(&bin.join("cc"), "exit 0");
	script(
		&bin.join("mamprobe"),
		"mkdir -p \"$(dirname \"$1\")\"\n\
		 echo run >> \"$(dirname \"$0\")/../runs\"\n\
		 printf 'setv PROBED %s\\nsetv mam_cc_L 1\\n' \"$2\" > \"$1\"",
	);
	let mut vars = Variables::new();
	vars.set("PATH", bin.to_str().unwrap());
	vars.set("INSTALLROOT", tmp.path().join("install").to_str().unwrap());
	Toolchain { tmp, vars }
}

fn runs(dir: &Path) -> usize {
	fs::read_to_string(dir.join("runs")).map_or(0, |s| s.lines().count())
}

#[test]
fn key_is_hash_in_letters() {
	assert_eq!(probe_key("a"), "OJDMJDMJ");
	assert_eq!(probe_key(""), "");
	assert!(probe_key("/usr/bin/cc").bytes().all(|c| (b'A'..=b'P').contains(&c)));
}

#[test]
fn first_cc_assignment_probes_once() {
	let Toolchain { tmp, vars } = toolchain();
	fs::write(
		tmp.path().join("Mamfile"),
		"setv CC cc\nsetv SEEN ${PROBED}\nsetv CC other\n",
	)
	.unwrap();
	let mut ev = Evaluator::new(Options::default(), vars, tmp.path()).unwrap();
	ev.run().unwrap();
	let cc = tmp.path().join("bin/cc");
	let cc = cc.to_str().unwrap();
	assert_eq!(ev.vars.get("PROBED"), Some(cc));
	assert_eq!(ev.vars.get("SEEN"), Some(cc));
	assert_eq!(ev.vars.get("mam_cc_L"), Some("1"));
	assert_eq!(runs(tmp.path()), 1);
	let file = tmp
		.path()
		.join("install/lib/probe/C/mam")
		.join(probe_key(cc));
	assert!(file.is_file());
}

#[test]
fn fresh_probe_file_is_reused() {
	let Toolchain { tmp, vars } = toolchain();
	let cc = tmp.path().join("bin/cc");
	let dir = tmp.path().join("install/lib/probe/C/mam");
	fs::create_dir_all(&dir).unwrap();
	fs::write(dir.join(probe_key(cc.to_str().unwrap())), "setv PROBED cached\n").unwrap();
	fs::write(tmp.path().join("Mamfile"), "setv CC cc\n").unwrap();
	let mut ev = Evaluator::new(Options::default(), vars, tmp.path()).unwrap();
	ev.run().unwrap();
	assert_eq!(ev.vars.get("PROBED"), Some("cached"));
	assert_eq!(runs(tmp.path()), 0);
}

#[test]
fn stale_probe_file_is_regenerated() {
	let Toolchain { tmp, vars } = toolchain();
	let cc = tmp.path().join("bin/cc");
	let dir = tmp.path().join("install/lib/probe/C/mam");
	fs::create_dir_all(&dir).unwrap();
	let file = dir.join(probe_key(cc.to_str().unwrap()));
	fs::write(&file, "setv PROBED stale\n").unwrap();
	let old = std::time::UNIX_EPOCH + std::time::Duration::from_secs(1_000);
	fs::File::options()
		.write(true)
		.open(&file)
		.unwrap()
		.set_modified(old)
		.unwrap();
	fs::write(tmp.path().join("Mamfile"), "setv CC cc\n").unwrap();
	let mut ev = Evaluator::new(Options::default(), vars, tmp.path()).unwrap();
	ev.run().unwrap();
	assert_eq!(ev.vars.get("PROBED"), Some(cc.to_str().unwrap()));
	assert_eq!(runs(tmp.path()), 1);
}

#[test]
fn install_root_is_required() {
	let Toolchain { tmp, mut vars } = toolchain();
	let mut only_path = Variables::new();
	only_path.set("PATH", vars.get("PATH").unwrap());
	fs::write(tmp.path().join("Mamfile"), "setv CC cc\n").unwrap();
	let mut ev = Evaluator::new(Options::default(), only_path, tmp.path()).unwrap();
	assert!(matches!(
		ev.run().unwrap_err(),
		MakeError::MissingVariable("INSTALLROOT")
	));
}

#[test]
fn helper_must_be_on_path() {
	let tmp = tempfile::tempdir().unwrap();
	let mut vars = Variables::new();
	vars.set("PATH", tmp.path().to_str().unwrap());
	vars.set("INSTALLROOT", tmp.path().to_str().unwrap());
	let mut ev = Evaluator::new(Options::default(), vars, tmp.path()).unwrap();
	assert!(matches!(ev.probe().unwrap_err(), MakeError::CommandNotFound(name) if name == "mamprobe"));

	let mut ev = Evaluator::new(Options::default(), Variables::new(), tmp.path()).unwrap();
	assert!(matches!(ev.probe().unwrap_err(), MakeError::MissingVariable("PATH")));
}

#[test]
fn failing_helper_is_fatal() {
	let Toolchain { tmp, vars } = toolchain();
	script(&tmp.path().join("bin/mamprobe"), "exit 1");
	let mut ev = Evaluator::new(Options::default(), vars, tmp.path()).unwrap();
	let err = ev.probe().unwrap_err();
	assert!(matches!(err, MakeError::Probe { reason: "cannot generate probe info", .. }), "{err}");
}
