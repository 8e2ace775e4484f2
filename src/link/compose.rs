use crate::error::LinkError;
use crate::grammar::composite::{CompositeGrammar, CompositeLexicon, PrecedenceGroup};
use crate::grammar::document::RuleTable;
use crate::link::prefix_action::ActionPrefixer;
use crate::module::declaration::PrecedenceDeclaration;
use crate::module::Module;
use fxhash::FxHashMap;
use indexmap::IndexMap;

/// Merges rewritten modules into one grammar.
///
/// Modules are taken in ascending priority, ties kept in the order given.
/// That order decides where each module's lexer rules, action include and
/// module include land. The start rule comes from the module named `entry`.
pub fn compose_grammar(
    entry: &str,
    modules: &[Module],
    prefixer: &ActionPrefixer,
) -> Result<CompositeGrammar, LinkError> {
    let mut ordered: Vec<&Module> = modules.iter().collect();
    ordered.sort_by_key(|module| module.priority);

    let mut rules = RuleTable::new();
    let mut owners = FxHashMap::default();
    for module in &ordered {
        merge_unique("Rule", &mut rules, &mut owners, &module.name, &module.grammar.rules)?;
    }

    let module_include = join_present(ordered.iter().map(|m| m.grammar.module_include.as_deref()));

    let precedence = merge_precedence(ordered.iter().flat_map(|m| m.precedence.iter()));

    let start = find_start_rule(entry, modules)?;

    Ok(CompositeGrammar {
        rules,
        start,
        precedence,
        module_include,
        lexicon: build_lexicon(&ordered, prefixer)?,
    })
}

fn build_lexicon(ordered: &[&Module], prefixer: &ActionPrefixer) -> Result<CompositeLexicon, LinkError> {
    let mut lexicon = CompositeLexicon::default();
    let mut includes = vec![prefixer.definition()];
    let mut macro_owners = FxHashMap::default();
    let mut condition_owners = FxHashMap::default();

    for module in ordered {
        let Some(lex) = module.lexicon.as_ref() else {
            continue;
        };
        lexicon.rules.extend(lex.rules.iter().cloned());
        merge_unique(
            "Lexer macro",
            &mut lexicon.macros,
            &mut macro_owners,
            &module.name,
            &lex.macros,
        )?;
        merge_unique(
            "Start condition",
            &mut lexicon.start_conditions,
            &mut condition_owners,
            &module.name,
            &lex.start_conditions,
        )?;
        if let Some(include) = lex.action_include.as_deref().filter(|s| !s.is_empty()) {
            includes.push(include.to_string());
        }
    }

    lexicon.action_include = includes.join("\n");
    Ok(lexicon)
}

/// Copies `entries` into `target`, refusing a name another module already
/// put there. `owners` remembers which module contributed each name.
fn merge_unique<'a, V: Clone>(
    kind: &'static str,
    target: &mut IndexMap<String, V>,
    owners: &mut FxHashMap<&'a str, &'a str>,
    module: &'a str,
    entries: &'a IndexMap<String, V>,
) -> Result<(), LinkError> {
    for (name, value) in entries {
        if let Some(first) = owners.insert(name.as_str(), module) {
            return Err(LinkError::IdentifierCollision {
                kind,
                name: name.clone(),
                first: first.to_string(),
                second: module.to_string(),
            });
        }
        target.insert(name.clone(), value.clone());
    }
    Ok(())
}

/// Flattens precedence declarations into groups, lowest priority first.
///
/// Declarations are stably sorted by priority, then associativity. Runs of
/// equal priority merge into one group that takes the associativity of its
/// first member.
pub fn merge_precedence<'a>(
    decls: impl IntoIterator<Item = &'a PrecedenceDeclaration>,
) -> Vec<PrecedenceGroup> {
    let mut sorted: Vec<&PrecedenceDeclaration> = decls.into_iter().collect();
    sorted.sort_by_key(|decl| (decl.priority, decl.associativity));

    let mut groups: Vec<(i64, PrecedenceGroup)> = Vec::new();
    for decl in sorted {
        match groups.last_mut() {
            Some((priority, group)) if *priority == decl.priority => {
                group.tokens.extend(decl.tokens.iter().cloned());
            }
            _ => groups.push((
                decl.priority,
                PrecedenceGroup {
                    associativity: decl.associativity,
                    tokens: decl.tokens.clone(),
                },
            )),
        }
    }

    groups.into_iter().map(|(_, group)| group).collect()
}

fn find_start_rule(entry: &str, modules: &[Module]) -> Result<String, LinkError> {
    let module = modules
        .iter()
        .find(|module| module.name == entry)
        .ok_or_else(|| LinkError::internal(format!("entry module {} is not loaded", entry)))?;

    module
        .grammar
        .start
        .clone()
        .or_else(|| module.grammar.rules.keys().next().cloned())
        .ok_or_else(|| LinkError::MissingStartRule {
            module: module.name.clone(),
        })
}

fn join_present<'a>(parts: impl Iterator<Item = Option<&'a str>>) -> String {
    parts
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
