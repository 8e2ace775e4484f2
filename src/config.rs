use crate::module::Module;
use std::fmt;
use std::path::PathBuf;

pub use crate::module::DEFAULT_PRIORITY;

/// Name the shared lexer-action helper is defined under in the composite lexicon.
pub const DEFAULT_ACTION_HELPER: &str = "gramlink_prefix";

/// Hook run over the whole loaded module list before validation.
pub type Preprocess = Box<dyn Fn(&mut [Module]) + Send + Sync>;

/// Options for one call to [`crate::load`].
pub struct LoadOptions {
    /// Priority for modules without a `%priority` declaration.
    /// Falls back to [`DEFAULT_PRIORITY`].
    pub default_priority: Option<i64>,
    pub preprocess: Option<Preprocess>,
    /// Identifier the lexer-action helper is bound to.
    pub action_helper: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            default_priority: None,
            preprocess: None,
            action_helper: DEFAULT_ACTION_HELPER.to_string(),
        }
    }
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("default_priority", &self.default_priority)
            .field("preprocess", &self.preprocess.as_ref().map(|_| "<fn>"))
            .field("action_helper", &self.action_helper)
            .finish()
    }
}

impl LoadOptions {
    pub fn with_default_priority(mut self, priority: i64) -> Self {
        self.default_priority = Some(priority);
        self
    }

    pub fn with_preprocess<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut [Module]) + Send + Sync + 'static,
    {
        self.preprocess = Some(Box::new(hook));
        self
    }

    pub fn with_action_helper(mut self, name: impl Into<String>) -> Self {
        self.action_helper = name.into();
        self
    }

    /// The priority actually applied to undeclared modules.
    pub fn effective_default_priority(&self) -> i64 {
        self.default_priority.unwrap_or(DEFAULT_PRIORITY)
    }
}

/// Where and how [`crate::loader::FsLoader`] finds module files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsLoaderConfig {
    /// Root for bare (non-relative) module paths. Without one, bare paths
    /// are read relative to the current directory.
    pub base_directory: Option<PathBuf>,
    /// Appended as `<path>.<ext>` to find the grammar document.
    pub grammar_extension: String,
    /// Appended as `<path>.<ext>` to find an optional external lexicon.
    pub lexicon_extension: String,
}

impl Default for FsLoaderConfig {
    fn default() -> Self {
        FsLoaderConfig {
            base_directory: None,
            grammar_extension: "y.json".to_string(),
            lexicon_extension: "l.json".to_string(),
        }
    }
}

impl FsLoaderConfig {
    pub fn with_base_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_directory = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_options_defaults() {
        let options = LoadOptions::default();
        assert_eq!(options.effective_default_priority(), 50);
        assert_eq!(options.action_helper, "gramlink_prefix");
        assert!(options.preprocess.is_none());
    }

    #[test]
    fn test_load_options_builder() {
        let options = LoadOptions::default()
            .with_default_priority(7)
            .with_preprocess(|modules| modules.reverse());
        assert_eq!(options.effective_default_priority(), 7);
        assert!(options.preprocess.is_some());
        assert!(format!("{:?}", options).contains("<fn>"));
    }

    #[test]
    fn test_fs_loader_config_defaults() {
        let config = FsLoaderConfig::default();
        assert_eq!(config.grammar_extension, "y.json");
        assert_eq!(config.lexicon_extension, "l.json");
        assert!(config.base_directory.is_none());
    }
}
