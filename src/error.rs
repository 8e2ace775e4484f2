use thiserror::Error;

/// Everything that can stop a link from producing a composite grammar.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The loader had nothing to offer for this path.
    #[error("Unknown module: {path}")]
    UnknownModule { path: String },

    /// The loader failed while reading or decoding a module.
    #[error("Failed to load module {path}: {source}")]
    Retrieval {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Invalid declaration `{directive}` in module {module}: {message}")]
    DeclarationSyntax {
        module: String,
        directive: String,
        message: String,
    },

    #[error("Multiple priority declarations in module {module}")]
    MultiplePriorities { module: String },

    #[error("Invalid priority `{value}` in module {module}")]
    InvalidPriority { module: String, value: String },

    #[error("Module {module} declares operators directly; use %precedence[<assoc>, <priority>] rather than %left, %right or %nonassoc")]
    LegacyOperators { module: String },

    #[error("Module {module} has both an embedded and external lexicon")]
    DuplicateLexicon { module: String },

    /// Every unresolved import or export found across the whole module set.
    #[error("{}", join_lines(.0))]
    Unresolved(Vec<DependencyError>),

    /// Two modules' namespaced names came out identical, e.g. rule `b__c`
    /// of module `a` and rule `c` of module `a__b`.
    #[error("{kind} {name} is defined by both module {first} and module {second}")]
    IdentifierCollision {
        kind: &'static str,
        name: String,
        first: String,
        second: String,
    },

    #[error("Module {module} has no rules to start from")]
    MissingStartRule { module: String },

    /// A pipeline invariant did not hold. Not caused by user input.
    #[error("Internal linker error: {0}")]
    Internal(String),
}

/// One unresolved import or export, reported as part of [`LinkError::Unresolved`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    #[error("Module {exporter} has no default export (attempted import from {importer})")]
    MissingDefaultExport { exporter: String, importer: String },

    #[error("Module {exporter} has no exported rule named \"{name}\" (attempted import from {importer})")]
    MissingRuleExport {
        exporter: String,
        importer: String,
        name: String,
    },

    #[error("Module {exporter} has no exported lexical token named \"{name}\" (attempted import from {importer})")]
    MissingTokenExport {
        exporter: String,
        importer: String,
        name: String,
    },

    #[error("Module {module} has no rule \"{rule}\" to export")]
    MissingExportedRule { module: String, rule: String },
}

fn join_lines(errors: &[DependencyError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl LinkError {
    pub(crate) fn retrieval(path: impl Into<String>, err: anyhow::Error) -> Self {
        LinkError::Retrieval {
            path: path.into(),
            source: err.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        LinkError::Internal(message.into())
    }
}
