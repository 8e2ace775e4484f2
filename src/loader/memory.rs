use crate::loader::{ModuleSource, SourceLoader};
use anyhow::Result;
use fxhash::FxHashMap;

/// Serves prepared modules from a map keyed by canonical name.
///
/// Paths are names: `resolve_path` returns the imported path untouched.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    modules: FxHashMap<String, ModuleSource>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, source: ModuleSource) -> &mut Self {
        self.modules.insert(name.into(), source);
        self
    }

    pub fn with_module(mut self, name: impl Into<String>, source: ModuleSource) -> Self {
        self.insert(name, source);
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl SourceLoader for MemoryLoader {
    fn resolve_path(&self, _base: Option<&str>, path: &str) -> String {
        path.to_string()
    }

    async fn load(&self, path: &str) -> Result<Option<ModuleSource>> {
        Ok(self.modules.get(path).cloned())
    }
}
