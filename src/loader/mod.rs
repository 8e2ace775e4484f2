//! Module retrieval: the [`SourceLoader`] capability, two implementations of
//! it and the breadth-first traversal that drives them.

pub mod fs;
pub mod graph;
pub mod memory;

use crate::grammar::document::{Grammar, Lexicon};
use anyhow::{Context, Result};
use std::future::Future;

pub use crate::loader::fs::FsLoader;
pub use crate::loader::graph::{load_module_graph, ModuleGraph};
pub use crate::loader::memory::MemoryLoader;

/// The already-parsed documents making up one module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleSource {
    pub grammar: Grammar,
    /// External lexicon, if the module ships one beside its grammar.
    pub lexicon: Option<Lexicon>,
}

impl ModuleSource {
    pub fn new(grammar: Grammar) -> Self {
        ModuleSource {
            grammar,
            lexicon: None,
        }
    }

    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = Some(lexicon);
        self
    }

    /// Decodes the JSON forms of a grammar and an optional lexicon.
    pub fn from_json(grammar: &str, lexicon: Option<&str>) -> Result<Self> {
        let grammar: Grammar =
            serde_json::from_str(grammar).context("Failed to decode grammar document")?;
        let lexicon = lexicon
            .map(|text| serde_json::from_str::<Lexicon>(text))
            .transpose()
            .context("Failed to decode lexicon document")?;
        Ok(ModuleSource { grammar, lexicon })
    }
}

/// Locates modules and hands back their parsed documents.
pub trait SourceLoader: Send + Sync + 'static {
    /// Canonical path of `path` as imported from the module at `base`.
    /// `base` is `None` for the entry module.
    fn resolve_path(&self, base: Option<&str>, path: &str) -> String;

    /// Loads the module at a canonical path. `Ok(None)` means no module
    /// lives there; `Err` means one may, but reading it failed.
    fn load(&self, path: &str) -> impl Future<Output = Result<Option<ModuleSource>>> + Send;
}
