//! Make abstract machine (MAM) evaluator.
//!
//! A mamfile is a line-oriented description of a build:
//!
//! ```text
//! setv CC cc
//! make prog
//! make prog.o
//! make prog.c
//! done prog.c
//! exec - ${CC} -c prog.c
//! done prog.o generated
//! exec - ${CC} -o prog prog.o
//! done prog generated
//! ```
//!
//! [`Evaluator`] reads it, binds each target to a file (optionally through a
//! `VPATH` viewpath), and runs the `exec` actions of targets older than their
//! prerequisites through the shell.

pub mod buffer;
pub mod config;
pub mod error;
mod eval;
mod exec;
mod library;
mod probe;
mod recurse;
pub mod report;
pub mod rule;
pub mod stream;
mod subst;
pub mod symtab;
pub mod vars;
pub mod view;

pub use config::{MAMFILE, Options};
pub use error::{MakeError, Result};
pub use eval::Evaluator;
pub use probe::probe_key;
pub use rule::{Rule, RuleFlags, RuleGraph, RuleId};
pub use vars::Variables;
pub use view::working_directory;
