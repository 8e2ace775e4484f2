use crate::config::LoadOptions;
use crate::error::LinkError;
use crate::grammar::composite::CompositeGrammar;
use crate::link::compose::compose_grammar;
use crate::link::prefix_action::ActionPrefixer;
use crate::link::rewrite::{rewrite_module, RewriteContext};
use crate::link::validate::validate_dependencies;
use crate::loader::{load_module_graph, ModuleGraph, SourceLoader};
use crate::module::{ExportBinding, Module, Namer};
use indexmap::IndexMap;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything one link produces.
#[derive(Debug, Clone)]
pub struct LinkOutput {
    pub grammar: CompositeGrammar,
    pub meta: LinkMeta,
    /// Import structure of the linked modules.
    pub graph: ModuleGraph,
}

/// Per-module facts that do not survive into the composite grammar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkMeta {
    /// Keyed by module name, in discovery order.
    pub modules: IndexMap<String, ModuleMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleMeta {
    pub prefix: String,
    pub exports: Vec<ExportBinding>,
    pub grammar_decls: Vec<String>,
    pub lexicon_decls: Vec<String>,
}

impl LinkMeta {
    fn from_modules(modules: &[Module], namer: &Namer) -> Self {
        let modules = modules
            .iter()
            .map(|module| {
                let meta = ModuleMeta {
                    prefix: namer.prefix(&module.name),
                    exports: module.exports.clone(),
                    grammar_decls: module.grammar_decls.clone(),
                    lexicon_decls: module.lexicon_decls.clone(),
                };
                (module.name.clone(), meta)
            })
            .collect();
        LinkMeta { modules }
    }
}

/// Links the module graph rooted at `entry` into one composite grammar.
///
/// Retrieval runs on the async runtime; validation, rewriting and
/// composition run on a blocking thread, rewriting in parallel on rayon.
/// Any failure fails the whole link.
pub async fn load<L: SourceLoader>(
    entry: &str,
    loader: Arc<L>,
    options: LoadOptions,
) -> Result<LinkOutput, LinkError> {
    let entry_path = loader.resolve_path(None, entry);
    let modules = load_module_graph(entry, loader, &options).await?;
    let prefixer = ActionPrefixer::new(options.action_helper);

    tokio::task::spawn_blocking(move || link_modules(&entry_path, modules, &prefixer))
        .await
        .map_err(|err| LinkError::internal(format!("Link task failed: {}", err)))?
}

/// Validates, rewrites and composes an already loaded module set.
pub fn link_modules(
    entry: &str,
    mut modules: Vec<Module>,
    prefixer: &ActionPrefixer,
) -> Result<LinkOutput, LinkError> {
    let graph = ModuleGraph::from_modules(&modules);
    let exports = validate_dependencies(&modules)?;

    // Assigned up front so collision suffixes follow discovery order.
    let namer = Namer::new();
    namer.register_all(modules.iter().map(|module| module.name.as_str()));

    let ctx = RewriteContext {
        exports: &exports,
        namer: &namer,
        prefixer,
    };
    modules
        .par_iter_mut()
        .try_for_each(|module| rewrite_module(module, &ctx))?;

    let meta = LinkMeta::from_modules(&modules, &namer);
    let grammar = compose_grammar(entry, &modules, prefixer)?;

    info!(
        "Linked {} module(s): {} rules, {} lexer rules, {} precedence groups",
        modules.len(),
        grammar.rules.len(),
        grammar.lexicon.rules.len(),
        grammar.precedence.len()
    );

    Ok(LinkOutput {
        grammar,
        meta,
        graph,
    })
}
