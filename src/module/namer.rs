use fxhash::FxHashMap;
use std::sync::{Mutex, PoisonError};

/// Stands in for every character of a path that cannot appear in an identifier.
pub const ESCAPE_CHAR: char = '$';

/// Ends every prefix, keeping prefixed names apart from unprefixed ones.
pub const PREFIX_SUFFIX: &str = "__";

/// Maps canonical module paths to identifier prefixes.
///
/// One `Namer` lives for exactly one link. Results are memoized, so asking
/// twice for the same path gives the same prefix. Two paths that escape to
/// the same text (`a/b` and `a-b`) are told apart by appending `$<n>` to the
/// path registered second.
#[derive(Debug, Default)]
pub struct Namer {
    state: Mutex<NamerState>,
}

#[derive(Debug, Default)]
struct NamerState {
    by_path: FxHashMap<String, String>,
    owners: FxHashMap<String, String>,
}

impl Namer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The prefix for `path`, assigning one on first use.
    pub fn prefix(&self, path: &str) -> String {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(prefix) = state.by_path.get(path) {
            return prefix.clone();
        }

        let stem = escape_path(path);
        let mut prefix = format!("{}{}", stem, PREFIX_SUFFIX);
        let mut n = 1;
        while state.owners.contains_key(&prefix) {
            prefix = format!("{}{}{}{}", stem, ESCAPE_CHAR, n, PREFIX_SUFFIX);
            n += 1;
        }

        log::debug!("Assigned prefix {} to module {}", prefix, path);
        state.owners.insert(prefix.clone(), path.to_string());
        state.by_path.insert(path.to_string(), prefix.clone());
        prefix
    }

    /// Assigns prefixes in the given order. Doing this before any parallel
    /// work keeps collision suffixes independent of thread scheduling.
    pub fn register_all<'a>(&self, paths: impl IntoIterator<Item = &'a str>) {
        for path in paths {
            self.prefix(path);
        }
    }
}

/// Replaces every non-identifier character with [`ESCAPE_CHAR`].
pub fn escape_path(path: &str) -> String {
    path.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                ESCAPE_CHAR
            }
        })
        .collect()
}
