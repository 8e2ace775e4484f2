use crate::error::LinkError;
use crate::grammar::document::{Grammar, Lexicon};
use crate::loader::{ModuleSource, SourceLoader};
use crate::module::declaration::{
    parse_declaration, parse_priority, partition, BindingSpec, Declaration, DirectiveKind,
    PrecedenceDeclaration,
};
use serde::{Deserialize, Serialize};

/// Priority given to modules that do not declare one.
pub const DEFAULT_PRIORITY: i64 = 50;

/// Export name that stands for a module's unnamed export.
pub const DEFAULT_EXPORT: &str = "default";

/// A reference from one module to a rule or token exported by another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBinding {
    /// Target module. As written until [`ImportBinding::canonicalize`] runs.
    pub from_module: String,
    /// Exported name being asked for, or `default`.
    pub source_name: String,
    /// Name the importing module uses. Empty for side-effect-only imports.
    pub local_name: String,
    pub lexical: bool,
}

impl ImportBinding {
    /// Side-effect-only import: loads the module, binds nothing.
    pub fn is_bindingless(&self) -> bool {
        self.local_name.is_empty()
    }

    /// Resolves the target path against the importing module's path.
    pub fn canonicalize<L: SourceLoader + ?Sized>(&mut self, loader: &L, base_path: &str) {
        self.from_module = loader.resolve_path(Some(base_path), &self.from_module);
    }
}

/// A rule or token a module makes visible to others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBinding {
    /// Local rule or token being exposed.
    pub source_name: String,
    /// Name importers refer to it by.
    pub public_name: String,
    pub lexical: bool,
}

/// One grammar+lexicon fragment participating in a link.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Canonical path; the module's identity.
    pub name: String,
    pub grammar: Grammar,
    pub lexicon: Option<Lexicon>,
    pub priority: i64,
    pub imports: Vec<ImportBinding>,
    pub exports: Vec<ExportBinding>,
    pub precedence: Vec<PrecedenceDeclaration>,
    /// Grammar-side declarations the linker does not interpret.
    pub grammar_decls: Vec<String>,
    /// Lexicon-side declarations the linker does not interpret.
    pub lexicon_decls: Vec<String>,
}

/// Which file a declaration came from. Lexicon-side imports and exports
/// always refer to tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Grammar,
    Lexicon,
}

impl Module {
    /// An empty module with no declarations, at the default priority.
    pub fn new(name: impl Into<String>, grammar: Grammar) -> Self {
        Module {
            name: name.into(),
            grammar,
            lexicon: None,
            priority: DEFAULT_PRIORITY,
            imports: Vec::new(),
            exports: Vec::new(),
            precedence: Vec::new(),
            grammar_decls: Vec::new(),
            lexicon_decls: Vec::new(),
        }
    }

    /// Builds a module from loaded source, extracting its directives.
    pub fn from_source(
        name: impl Into<String>,
        source: ModuleSource,
        default_priority: i64,
    ) -> Result<Self, LinkError> {
        let name = name.into();
        let ModuleSource {
            mut grammar,
            lexicon: external_lexicon,
        } = source;

        if grammar.has_legacy_operators() {
            return Err(LinkError::LegacyOperators { module: name });
        }

        let lexicon = match (grammar.lex.take(), external_lexicon) {
            (Some(_), Some(_)) => return Err(LinkError::DuplicateLexicon { module: name }),
            (embedded, external) => embedded.or(external),
        };

        let grammar_raw = std::mem::take(&mut grammar.unknown_decls);
        let lexicon_raw = lexicon
            .as_ref()
            .map(|lex| lex.unknown_decls.clone())
            .unwrap_or_default();

        let mut module = Module {
            grammar,
            lexicon,
            ..Module::new(name, Grammar::default())
        };

        let grammar_parts = partition(&grammar_raw, &DirectiveKind::ALL);
        let lexicon_parts = partition(&lexicon_raw, &DirectiveKind::ALL);

        let priorities: Vec<&str> = grammar_parts
            .group(DirectiveKind::Priority)
            .chain(lexicon_parts.group(DirectiveKind::Priority))
            .collect();
        module.priority = match priorities.as_slice() {
            [] => default_priority,
            [decl] => parse_priority(decl).map_err(|_| LinkError::InvalidPriority {
                module: module.name.clone(),
                value: decl.trim().trim_start_matches("%priority").trim().to_string(),
            })?,
            _ => {
                return Err(LinkError::MultiplePriorities {
                    module: module.name.clone(),
                })
            }
        };

        for (side, parts) in [(Side::Grammar, &grammar_parts), (Side::Lexicon, &lexicon_parts)] {
            for &(kind, text) in &parts.recognized {
                if kind == DirectiveKind::Priority {
                    continue;
                }
                let decl = parse_declaration(kind, text).map_err(|err| module.syntax_error(text, err))?;
                module.add_declaration(side, text, decl)?;
            }
        }

        module.grammar_decls = grammar_parts.unknown.iter().map(|s| s.to_string()).collect();
        module.lexicon_decls = lexicon_parts.unknown.iter().map(|s| s.to_string()).collect();

        if module.grammar.rules.is_empty() && module.lexicon.is_none() {
            log::warn!("Module {} defines neither rules nor a lexicon", module.name);
        }

        Ok(module)
    }

    fn add_declaration(&mut self, side: Side, text: &str, decl: Declaration) -> Result<(), LinkError> {
        match decl {
            Declaration::Import(import) => {
                if import.bindings.is_empty() {
                    self.imports.push(ImportBinding {
                        from_module: import.module.clone(),
                        source_name: String::new(),
                        local_name: String::new(),
                        lexical: side == Side::Lexicon,
                    });
                }
                for binding in import.bindings {
                    let lexical = self.binding_lexical(side, text, &binding, &binding.source)?;
                    self.imports.push(ImportBinding {
                        from_module: import.module.clone(),
                        source_name: binding.source,
                        local_name: binding.binding,
                        lexical,
                    });
                }
            }
            Declaration::Export(export) => {
                for binding in export.bindings {
                    let lexical = self.binding_lexical(side, text, &binding, &binding.binding)?;
                    self.exports.push(ExportBinding {
                        source_name: binding.source,
                        public_name: binding.binding,
                        lexical,
                    });
                }
            }
            Declaration::Precedence(prec) => self.precedence.push(prec),
            Declaration::Priority(_) => {}
        }
        Ok(())
    }

    /// Lexicon-side bindings are lexical regardless of the `lex` qualifier,
    /// which rules out default bindings there.
    fn binding_lexical(
        &self,
        side: Side,
        text: &str,
        binding: &BindingSpec,
        default_marker: &str,
    ) -> Result<bool, LinkError> {
        match side {
            Side::Grammar => Ok(binding.lexical),
            Side::Lexicon if default_marker == DEFAULT_EXPORT => Err(LinkError::DeclarationSyntax {
                module: self.name.clone(),
                directive: text.trim().to_string(),
                message: "default bindings cannot be lexical".to_string(),
            }),
            Side::Lexicon => Ok(true),
        }
    }

    fn syntax_error(&self, text: &str, err: impl std::fmt::Display) -> LinkError {
        LinkError::DeclarationSyntax {
            module: self.name.clone(),
            directive: text.trim().to_string(),
            message: err.to_string(),
        }
    }

    /// Import bindings that actually bind a name.
    pub fn bound_imports(&self) -> impl Iterator<Item = &ImportBinding> {
        self.imports.iter().filter(|imp| !imp.is_bindingless())
    }
}
