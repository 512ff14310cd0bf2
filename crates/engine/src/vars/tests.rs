use super::*;

#[test]
fn empty_value_counts_as_set() {
	let mut vars = Variables::new();
	assert!(!vars.is_set("CCFLAGS"));
	vars.set("CCFLAGS", "");
	assert!(vars.is_set("CCFLAGS"));
	assert_eq!(vars.get("CCFLAGS"), Some(""));
}

#[test]
fn command_line_assignment_records_force_shadow() {
	let mut vars = Variables::new();
	vars.set("CC", "cc");
	vars.assign("CC", "clang -m64");
	assert_eq!(vars.get("CC"), Some("clang -m64"));
	assert_eq!(vars.get("CC.FORCE"), Some("clang -m64"));
}

#[test]
fn import_overwrites() {
	let mut vars = Variables::new();
	vars.set("HOME", "/old");
	vars.import([("HOME", "/home/u"), ("SHELL", "/bin/sh")]);
	assert_eq!(vars.get("HOME"), Some("/home/u"));
	assert_eq!(vars.get("SHELL"), Some("/bin/sh"));
}

#[cfg(unix)]
#[test]
fn import_replaces_invalid_utf8() {
	use std::ffi::OsString;
	use std::os::unix::ffi::OsStringExt;

	let mut vars = Variables::new();
	vars.import([
		(OsString::from("LATIN"), OsString::from_vec(b"caf\xe9".to_vec())),
		(OsString::from_vec(b"BAD\xff".to_vec()), OsString::from("x")),
	]);
	assert_eq!(vars.get("LATIN"), Some("caf\u{fffd}"));
	assert_eq!(vars.get("BAD\u{fffd}"), Some("x"));
}
