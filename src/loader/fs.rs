use crate::config::FsLoaderConfig;
use crate::loader::{ModuleSource, SourceLoader};
use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Loads modules stored as JSON documents on disk.
///
/// A module at path `p` is the grammar file `p.<grammar_extension>` plus, if
/// present, the lexicon file `p.<lexicon_extension>`. Imports starting with
/// `./` or `../` resolve against the importing module's directory. Absolute
/// imports are taken as they are. Anything else names a module relative to
/// the base directory, or to the importer's directory when none is
/// configured.
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    config: FsLoaderConfig,
}

impl FsLoader {
    pub fn new(config: FsLoaderConfig) -> Self {
        FsLoader { config }
    }

    pub fn config(&self) -> &FsLoaderConfig {
        &self.config
    }

    /// On-disk location of one of a module's documents.
    pub fn file_path(&self, module: &str, extension: &str) -> PathBuf {
        let file = PathBuf::from(format!("{}.{}", module, extension));
        match &self.config.base_directory {
            Some(base) if file.is_relative() => base.join(file),
            _ => file,
        }
    }
}

impl SourceLoader for FsLoader {
    fn resolve_path(&self, base: Option<&str>, path: &str) -> String {
        if is_explicitly_relative(path) {
            let dir = base.map(parent_dir).unwrap_or("");
            normalize(&join(dir, path))
        } else if path.starts_with('/') {
            normalize(path)
        } else if self.config.base_directory.is_some() {
            path.to_string()
        } else {
            // Without a base directory bare names sit next to the importer.
            let dir = base.map(parent_dir).unwrap_or("");
            normalize(&join(dir, path))
        }
    }

    async fn load(&self, path: &str) -> Result<Option<ModuleSource>> {
        let grammar_file = self.file_path(path, &self.config.grammar_extension);
        let Some(grammar) = read_optional(&grammar_file).await? else {
            log::debug!("No grammar at {}", grammar_file.display());
            return Ok(None);
        };

        let lexicon_file = self.file_path(path, &self.config.lexicon_extension);
        let lexicon = read_optional(&lexicon_file).await?;

        let source = ModuleSource::from_json(&grammar, lexicon.as_deref())
            .with_context(|| format!("Failed to parse module files for {}", path))?;
        Ok(Some(source))
    }
}

/// Reads a file, treating a missing file as `None`.
async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("Failed to read file: {}", path.display())),
    }
}

fn is_explicitly_relative(path: &str) -> bool {
    path == "." || path == ".." || path.starts_with("./") || path.starts_with("../")
}

fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn join(dir: &str, path: &str) -> String {
    if dir.is_empty() {
        path.to_string()
    } else if dir.ends_with('/') {
        format!("{}{}", dir, path)
    } else {
        format!("{}/{}", dir, path)
    }
}

/// Collapses `.` and `..` segments without touching the filesystem.
fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                // Nothing above the root.
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
