use crate::error::LinkError;
use crate::grammar::document::{Alternative, Grammar, Lexicon, RuleTable};
use crate::link::prefix_action::ActionPrefixer;
use crate::link::validate::{resolve_import, ExportMap};
use crate::module::declaration::PrecedenceDeclaration;
use crate::module::{Module, Namer};
use fxhash::FxHashMap;
use log::debug;
use regex::{Captures, Regex};

/// Start conditions every lexer has; never namespaced.
pub const BUILTIN_START_CONDITIONS: [&str; 2] = ["INITIAL", "*"];

/// Shared, read-only state for rewriting the modules of one link.
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    pub exports: &'a ExportMap,
    pub namer: &'a Namer,
    pub prefixer: &'a ActionPrefixer,
}

/// Renames one module's identifiers into the shared namespace.
///
/// Locally defined names get the module's prefix. Imported names are
/// replaced by the exporting module's prefixed name. Must only run after
/// [`crate::link::validate::validate_dependencies`] accepted the module set;
/// an import that does not resolve here is reported as an internal error.
pub fn rewrite_module(module: &mut Module, ctx: &RewriteContext<'_>) -> Result<(), LinkError> {
    let prefix = ctx.namer.prefix(&module.name);
    let renamer = Renamer {
        prefix: &prefix,
        imports: build_import_mapping(module, ctx)?,
    };

    if let Some(lexicon) = module.lexicon.as_mut() {
        namespace_lexicon(lexicon, &prefix, ctx.prefixer)?;
    }
    namespace_precedence(&mut module.precedence, &renamer);
    namespace_grammar(&mut module.grammar, &renamer);

    debug!(
        "Rewrote module {} under prefix {} ({} rules, {} imported names)",
        module.name,
        prefix,
        module.grammar.rules.len(),
        renamer.imports.len()
    );
    Ok(())
}

struct Renamer<'a> {
    prefix: &'a str,
    /// Local binding name to resolved global name.
    imports: FxHashMap<String, String>,
}

impl Renamer<'_> {
    fn rename(&self, identifier: &str) -> String {
        match self.imports.get(identifier) {
            Some(global) => global.clone(),
            None => format!("{}{}", self.prefix, identifier),
        }
    }

    /// Rule definitions are always local, even when a binding shadows them.
    fn rename_local(&self, identifier: &str) -> String {
        format!("{}{}", self.prefix, identifier)
    }

    /// Renames each space-separated symbol of a production. Empty segments
    /// (from doubled spaces, or an empty production) stay empty.
    fn rename_sequence(&self, sequence: &str) -> String {
        sequence
            .split(' ')
            .map(|symbol| {
                if symbol.is_empty() {
                    String::new()
                } else {
                    self.rename(symbol)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn build_import_mapping(
    module: &Module,
    ctx: &RewriteContext<'_>,
) -> Result<FxHashMap<String, String>, LinkError> {
    module
        .bound_imports()
        .map(|import| {
            let export = resolve_import(ctx.exports, import).ok_or_else(|| {
                LinkError::internal(format!(
                    "import of {} from {} in module {} was not validated",
                    import.source_name, import.from_module, module.name
                ))
            })?;
            let global = format!("{}{}", ctx.namer.prefix(&import.from_module), export.source_name);
            Ok((import.local_name.clone(), global))
        })
        .collect()
}

fn namespace_lexicon(
    lexicon: &mut Lexicon,
    prefix: &str,
    prefixer: &ActionPrefixer,
) -> Result<(), LinkError> {
    let macros = MacroRewriter::new(lexicon, prefix)?;

    for rule in &mut lexicon.rules {
        if let Some(conditions) = rule.conditions.as_mut() {
            for condition in conditions.iter_mut() {
                if !BUILTIN_START_CONDITIONS.contains(&condition.as_str()) {
                    *condition = format!("{}{}", prefix, condition);
                }
            }
        }
        rule.pattern = macros.rewrite(&rule.pattern);
        rule.action = prefixer.wrap(prefix, &rule.action);
    }

    lexicon.macros = std::mem::take(&mut lexicon.macros)
        .into_iter()
        .map(|(name, pattern)| (format!("{}{}", prefix, name), macros.rewrite(&pattern)))
        .collect();

    lexicon.start_conditions = std::mem::take(&mut lexicon.start_conditions)
        .into_iter()
        .map(|(name, exclusive)| (format!("{}{}", prefix, name), exclusive))
        .collect();

    Ok(())
}

/// Rewrites `{name}` references to the lexicon's own macros. References to
/// names the lexicon does not define are left alone.
struct MacroRewriter<'a> {
    pattern: Option<Regex>,
    prefix: &'a str,
}

impl<'a> MacroRewriter<'a> {
    fn new(lexicon: &Lexicon, prefix: &'a str) -> Result<Self, LinkError> {
        if lexicon.macros.is_empty() {
            return Ok(MacroRewriter { pattern: None, prefix });
        }

        let names: Vec<String> = lexicon.macros.keys().map(|name| regex::escape(name)).collect();
        let pattern = Regex::new(&format!(r"\{{({})\}}", names.join("|")))
            .map_err(|err| LinkError::internal(format!("macro reference pattern: {}", err)))?;

        Ok(MacroRewriter {
            pattern: Some(pattern),
            prefix,
        })
    }

    fn rewrite(&self, text: &str) -> String {
        match &self.pattern {
            // A closure replacement keeps `$` in the prefix literal.
            Some(pattern) => pattern
                .replace_all(text, |caps: &Captures<'_>| format!("{{{}{}}}", self.prefix, &caps[1]))
                .into_owned(),
            None => text.to_string(),
        }
    }
}

fn namespace_precedence(precedence: &mut [PrecedenceDeclaration], renamer: &Renamer<'_>) {
    for decl in precedence {
        for token in &mut decl.tokens {
            *token = renamer.rename(token);
        }
    }
}

fn namespace_grammar(grammar: &mut Grammar, renamer: &Renamer<'_>) {
    let rules: RuleTable = std::mem::take(&mut grammar.rules)
        .into_iter()
        .map(|(name, alternatives)| {
            let alternatives = alternatives
                .into_iter()
                .map(|alt| namespace_alternative(alt, renamer))
                .collect();
            (renamer.rename_local(&name), alternatives)
        })
        .collect();
    grammar.rules = rules;

    if let Some(start) = grammar.start.as_mut() {
        *start = renamer.rename(start);
    }
}

fn namespace_alternative(mut alt: Alternative, renamer: &Renamer<'_>) -> Alternative {
    alt.symbols = renamer.rename_sequence(&alt.symbols);
    if let Some(prec) = alt.prec.as_mut() {
        *prec = renamer.rename(prec);
    }
    alt
}
