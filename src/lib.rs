//! Links grammar and lexicon modules into one composite grammar.
//!
//! Modules import rules and tokens from each other with `%import`/`%export`
//! directives. [`load`] walks the import graph from an entry module, checks
//! every binding, renames each module's identifiers under a per-module
//! prefix and merges the result into a single [`CompositeGrammar`].

pub mod config;
pub mod error;
pub mod grammar;
pub mod io;
pub mod link;
pub mod loader;
pub mod module;

pub use crate::config::{FsLoaderConfig, LoadOptions, DEFAULT_PRIORITY};
pub use crate::error::{DependencyError, LinkError};
pub use crate::grammar::{CompositeGrammar, Grammar, Lexicon};
pub use crate::link::{load, LinkMeta, LinkOutput};
pub use crate::loader::{FsLoader, MemoryLoader, ModuleSource, SourceLoader};
pub use crate::module::Module;
