//! Viewpath file resolution.
//!
//! `VPATH` lists alternate roots, the first being the top of the tree the
//! working directory lives in. The working directory's offset below that top
//! is applied under every root, so `foo.c` missing from `/build/sub` can be
//! found as `/src/sub/foo.c` when `VPATH=/build:/src`.

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::trace;

use crate::error::{MakeError, Result};

/// Identity of a file for "is this the same directory" checks.
#[cfg(unix)]
#[derive(Debug, PartialEq, Eq)]
struct FileId(u64, u64);

#[cfg(not(unix))]
#[derive(Debug, PartialEq, Eq)]
struct FileId(PathBuf);

#[cfg(unix)]
fn file_id(path: &Path) -> io::Result<FileId> {
	use std::os::unix::fs::MetadataExt;
	let meta = fs::metadata(path)?;
	Ok(FileId(meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn file_id(path: &Path) -> io::Result<FileId> {
	path.canonicalize().map(FileId)
}

/// Determines the working directory, preferring `pwd` (the cached `PWD`
/// variable) when it names the same directory as `.`.
pub fn working_directory(pwd: Option<&str>) -> Result<String> {
	let dot = file_id(Path::new(".")).map_err(|e| MakeError::io(".", e))?;
	if let Some(pwd) = pwd
		&& file_id(Path::new(pwd)).is_ok_and(|id| id == dot)
	{
		return Ok(pwd.to_string());
	}
	let cwd = std::env::current_dir().map_err(|_| MakeError::NoWorkingDirectory)?;
	cwd.into_os_string().into_string().map_err(|_| MakeError::NoWorkingDirectory)
}

/// Modification time in whole seconds.
pub fn mtime(meta: &Metadata) -> u64 {
	meta.modified()
		.ok()
		.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
		.map_or(0, |d| d.as_secs())
}

/// Current time in whole seconds.
pub fn now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map_or(0, |d| d.as_secs())
}

/// One alternate root with the working directory offset applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLevel {
	dir: String,
	node: usize,
}

impl ViewLevel {
	/// The re-rooted working directory, `root/offset`.
	pub fn dir(&self) -> &str {
		&self.dir
	}

	/// The root itself, with a trailing `/`.
	pub fn root(&self) -> &str {
		&self.dir[..self.node]
	}
}

/// Ordered viewpath levels, built once from `VPATH`.
#[derive(Debug, Clone)]
pub struct ViewPath {
	levels: Vec<ViewLevel>,
}

impl ViewPath {
	/// Builds the levels for `vpath` as seen from the working directory `pwd`.
	/// Returns `None` for an empty `vpath`.
	pub fn new(vpath: &str, pwd: &str) -> Result<Option<Self>> {
		if vpath.is_empty() {
			return Ok(None);
		}
		let top = vpath.split(':').next().unwrap_or_default();
		let offset = offset(top, pwd)?;
		let levels = vpath
			.split(':')
			.map(|root| {
				let level = ViewLevel {
					dir: format!("{root}/{offset}"),
					node: root.len() + 1,
				};
				trace!(dir = %level.dir, "view");
				level
			})
			.collect();
		Ok(Some(Self { levels }))
	}

	pub fn levels(&self) -> &[ViewLevel] {
		&self.levels
	}
}

/// How deep `pwd` sits below `top`, as a relative path (`.` for `top` itself).
fn offset<'a>(top: &str, pwd: &'a str) -> Result<&'a str> {
	let top_id = file_id(Path::new(top)).map_err(|_| MakeError::TopView {
		path: top.to_string(),
	})?;
	let here = file_id(Path::new(pwd)).map_err(|e| MakeError::io(pwd, e))?;
	if here == top_id {
		return Ok(".");
	}
	for (pos, _) in pwd.rmatch_indices('/') {
		if pos == 0 {
			return Err(MakeError::NotUnderView(top.to_string()));
		}
		let parent = &pwd[..pos];
		let id = file_id(Path::new(parent)).map_err(|e| MakeError::io(parent, e))?;
		if id == top_id {
			return Ok(&pwd[pos + 1..]);
		}
	}
	Err(MakeError::ViewOffset(top.to_string()))
}

/// Binds logical file names to files, relative to a working directory and
/// through an optional viewpath.
#[derive(Debug, Clone)]
pub struct Resolver {
	pwd: PathBuf,
	view: Option<ViewPath>,
}

impl Resolver {
	pub fn new(pwd: impl Into<PathBuf>, view: Option<ViewPath>) -> Self {
		Self {
			pwd: pwd.into(),
			view,
		}
	}

	pub fn pwd(&self) -> &Path {
		&self.pwd
	}

	pub fn view(&self) -> Option<&ViewPath> {
		self.view.as_ref()
	}

	/// Stops viewpath lookups; later resolution only sees the working tree.
	pub fn clear_view(&mut self) {
		self.view = None;
	}

	/// `path` anchored at the working directory.
	pub fn absolute(&self, path: &str) -> PathBuf {
		self.pwd.join(path)
	}

	/// Stats `path`, falling back to the platform executable suffix. Returns
	/// the name that matched.
	pub fn status(&self, path: &str) -> Option<(String, Metadata)> {
		if let Ok(meta) = fs::metadata(self.absolute(path)) {
			return Some((path.to_string(), meta));
		}
		let suffix = std::env::consts::EXE_SUFFIX;
		if suffix.is_empty() {
			return None;
		}
		let exe = format!("{path}{suffix}");
		let meta = fs::metadata(self.absolute(&exe)).ok()?;
		Some((exe, meta))
	}

	/// Resolves `file` as given, then under each viewpath level.
	pub fn find(&self, file: &str) -> Option<(String, Metadata)> {
		if let Some(found) = self.status(file) {
			trace!(path = %found.0, "find");
			return Some(found);
		}
		let levels = self.view.as_ref()?.levels();
		let candidates: Box<dyn Iterator<Item = String> + '_> = if file.starts_with('/') {
			let start = levels
				.iter()
				.position(|level| file.starts_with(level.root()))?;
			let rest = &file[levels[start].node..];
			Box::new(
				levels[start..]
					.iter()
					.map(move |level| format!("{}{}", level.root(), rest)),
			)
		} else {
			Box::new(
				levels
					.iter()
					.skip(1)
					.map(move |level| format!("{}/{}", level.dir, file)),
			)
		};
		for candidate in candidates {
			if let Some(found) = self.status(&candidate) {
				trace!(path = %found.0, "find");
				return Some(found);
			}
		}
		None
	}
}
