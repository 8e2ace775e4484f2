// End-to-end link tests over the in-memory loader

use gramlink::grammar::document::Alternative;
use gramlink::link::ModuleMeta;
use gramlink::{load, LinkError, LinkOutput, LoadOptions, MemoryLoader, ModuleSource};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

fn module(grammar: Value) -> ModuleSource {
    ModuleSource::new(serde_json::from_value(grammar).unwrap())
}

fn module_with_lexicon(grammar: Value, lexicon: Value) -> ModuleSource {
    module(grammar).with_lexicon(serde_json::from_value(lexicon).unwrap())
}

async fn link(loader: MemoryLoader, options: LoadOptions) -> Result<LinkOutput, LinkError> {
    load("entry", Arc::new(loader), options).await
}

fn plain_meta(prefix: &str, grammar_decls: &[&str], lexicon_decls: &[&str]) -> ModuleMeta {
    ModuleMeta {
        prefix: prefix.to_string(),
        exports: Vec::new(),
        grammar_decls: grammar_decls.iter().map(|s| s.to_string()).collect(),
        lexicon_decls: lexicon_decls.iter().map(|s| s.to_string()).collect(),
    }
}

/// Every symbol of every production, split on spaces.
fn all_symbols(output: &LinkOutput) -> Vec<String> {
    output
        .grammar
        .rules
        .values()
        .flatten()
        .flat_map(|alt| alt.symbols.split(' ').map(str::to_string).collect::<Vec<_>>())
        .filter(|s| !s.is_empty())
        .collect()
}

#[tokio::test]
async fn test_grammars_without_imports_pass_through() {
    let loader = MemoryLoader::new().with_module(
        "entry",
        module_with_lexicon(
            json!({
                "bnf": {
                    "start": ["items EOF"],
                    "items": ["item items", ""],
                    "item": ["FOO", "BAR"]
                },
                "unknownDecls": ["%buzz"]
            }),
            json!({
                "rules": [
                    ["foo", "return 'FOO';"],
                    ["bar", "return 'BAR';"],
                    ["\\s+", "/* skip */"],
                    ["$", "return 'EOF';"]
                ],
                "unknownDecls": ["%fizzle"]
            }),
        ),
    );

    let output = link(loader, LoadOptions::default()).await.unwrap();

    assert_eq!(output.meta.modules.len(), 1);
    assert_eq!(output.meta.modules["entry"], plain_meta("entry__", &["%buzz"], &["%fizzle"]));

    assert_eq!(output.grammar.start, "entry__start");
    assert_eq!(
        output.grammar.rules["entry__items"],
        vec![Alternative::new("entry__item entry__items"), Alternative::new("")]
    );
    for symbol in all_symbols(&output) {
        assert!(symbol.starts_with("entry__"), "unprefixed symbol {}", symbol);
    }

    let lex = &output.grammar.lexicon;
    assert_eq!(lex.rules.len(), 4);
    assert!(lex.rules[0]
        .action
        .starts_with("return gramlink_prefix(this, \"entry__\", function() {"));
    assert_eq!(lex.action_include.matches("var gramlink_prefix =").count(), 1);
}

#[tokio::test]
async fn test_bindingless_imports_load_the_module() {
    let loader = MemoryLoader::new()
        .with_module(
            "entry",
            module_with_lexicon(
                json!({
                    "bnf": { "start": ["WORD EOF"] },
                    "unknownDecls": ["%import \"skipWhitespace\""]
                }),
                json!({ "rules": [["\\w+", "return 'WORD';"], ["$", "return 'EOF';"]] }),
            ),
        )
        .with_module(
            "skipWhitespace",
            module_with_lexicon(
                json!({ "bnf": {} }),
                json!({ "rules": [["\\s+", "/* skip */"]], "unknownDecls": ["%priority 10"] }),
            ),
        );

    let output = link(loader, LoadOptions::default()).await.unwrap();

    assert_eq!(
        output.meta.modules.keys().collect::<Vec<_>>(),
        vec!["entry", "skipWhitespace"]
    );
    assert_eq!(output.meta.modules["entry"], plain_meta("entry__", &[], &[]));
    assert_eq!(
        output.meta.modules["skipWhitespace"],
        plain_meta("skipWhitespace__", &[], &[])
    );

    // The whitespace rule comes first thanks to its lower priority.
    assert_eq!(output.grammar.lexicon.rules[0].pattern, "\\s+");
    assert_eq!(output.grammar.rules["entry__start"], vec![Alternative::new("entry__WORD entry__EOF")]);
}

#[tokio::test]
async fn test_lexicon_rules_follow_priority() {
    let lexicon = |token: &str, priority: Option<i64>| {
        let decls: Vec<String> = priority.map(|p| format!("%priority {}", p)).into_iter().collect();
        json!({
            "rules": [[format!("{}\\b", token.to_lowercase()), format!("return '{}';", token)]],
            "unknownDecls": decls
        })
    };

    let loader = MemoryLoader::new()
        .with_module(
            "entry",
            module_with_lexicon(
                json!({
                    "bnf": { "start": ["a b c d"] },
                    "unknownDecls": [
                        "%import lex { FOO1 as a } from \"one\"",
                        "%import lex { FOO2 as b } from \"two\"",
                        "%import lex { FOO3 as c } from \"three\"",
                        "%import lex { FOO4 as d } from \"four\""
                    ]
                }),
                lexicon("ENTRY", None),
            ),
        )
        .with_module(
            "one",
            module_with_lexicon(json!({ "bnf": {}, "unknownDecls": ["%export lex { FOO1 }"] }), lexicon("FOO1", Some(40))),
        )
        .with_module(
            "two",
            module_with_lexicon(json!({ "bnf": {}, "unknownDecls": ["%export lex { FOO2 }"] }), lexicon("FOO2", Some(10))),
        )
        .with_module(
            "three",
            module_with_lexicon(json!({ "bnf": {}, "unknownDecls": ["%export lex { FOO3 }"] }), lexicon("FOO3", Some(20))),
        )
        .with_module(
            "four",
            module_with_lexicon(json!({ "bnf": {}, "unknownDecls": ["%export lex { FOO4 }"] }), lexicon("FOO4", Some(20))),
        );

    let output = link(loader, LoadOptions::default()).await.unwrap();

    let patterns: Vec<&str> = output
        .grammar
        .lexicon
        .rules
        .iter()
        .map(|rule| rule.pattern.as_str())
        .collect();
    assert_eq!(patterns, vec!["foo2\\b", "foo3\\b", "foo4\\b", "foo1\\b", "entry\\b"]);

    assert_eq!(
        output.grammar.rules["entry__start"],
        vec![Alternative::new("one__FOO1 two__FOO2 three__FOO3 four__FOO4")]
    );
}

#[tokio::test]
async fn test_preprocess_hook_can_rewrite_rules() {
    let loader = MemoryLoader::new().with_module("entry", module(json!({ "bnf": { "start": [""] } })));

    let options = LoadOptions::default().with_preprocess(|modules| {
        assert_eq!(modules.len(), 1);
        let rules = &mut modules[0].grammar.rules;
        assert_eq!(rules["start"], vec![Alternative::new("")]);

        rules.insert("start".to_string(), vec![Alternative::new("items")]);
        rules.insert(
            "items".to_string(),
            vec![Alternative::new("item items"), Alternative::new("")],
        );
        rules.insert("item".to_string(), vec![Alternative::new("FOO"), Alternative::new("BAR")]);
    });

    let output = link(loader, options).await.unwrap();
    assert_eq!(output.grammar.rules.len(), 3);
    assert_eq!(output.grammar.rules["entry__item"], vec![
        Alternative::new("entry__FOO"),
        Alternative::new("entry__BAR"),
    ]);
}

#[tokio::test]
async fn test_diamond_imports_link_shared_module_once() {
    let loader = MemoryLoader::new()
        .with_module(
            "entry",
            module(json!({
                "bnf": { "start": ["mid leaf"] },
                "unknownDecls": ["%import mid from \"mid\"", "%import leaf from \"leaf\""]
            })),
        )
        .with_module(
            "mid",
            module(json!({
                "bnf": { "m": ["leaf"] },
                "unknownDecls": ["%import leaf from \"leaf\"", "%export default m"]
            })),
        )
        .with_module(
            "leaf",
            module(json!({ "bnf": { "l": ["LEAF"] }, "unknownDecls": ["%export default l"] })),
        );

    let output = link(loader, LoadOptions::default()).await.unwrap();

    assert_eq!(output.meta.modules.keys().collect::<Vec<_>>(), vec!["entry", "mid", "leaf"]);
    assert_eq!(output.grammar.rules.keys().filter(|k| k.starts_with("leaf__")).count(), 1);
    assert_eq!(output.grammar.rules["entry__start"], vec![Alternative::new("mid__m leaf__l")]);
    assert_eq!(output.grammar.rules["mid__m"], vec![Alternative::new("leaf__l")]);
    assert_eq!(output.graph.importers_of("leaf").len(), 2);
}

#[tokio::test]
async fn test_unresolved_imports_are_reported_together() {
    let loader = MemoryLoader::new()
        .with_module(
            "entry",
            module(json!({
                "bnf": { "start": ["x y"] },
                "unknownDecls": [
                    "%import x from \"lib\"",
                    "%import { y } from \"lib\"",
                    "%export { ghost }"
                ]
            })),
        )
        .with_module(
            "lib",
            module(json!({ "bnf": { "y": ["Y"] }, "unknownDecls": ["%export lex { y }"] })),
        );

    let err = link(loader, LoadOptions::default()).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Module lib has no default export (attempted import from entry)\n\
         Module lib has no exported rule named \"y\" (attempted import from entry)\n\
         Module entry has no rule \"ghost\" to export"
    );
}

#[tokio::test]
async fn test_precedence_groups_merge_across_modules() {
    let loader = MemoryLoader::new()
        .with_module(
            "entry",
            module(json!({
                "bnf": { "start": ["e"] },
                "unknownDecls": [
                    "%import e from \"a\"",
                    "%import \"b\"",
                    "%import \"c\"",
                    "%priority 30"
                ]
            })),
        )
        .with_module(
            "a",
            module(json!({
                "bnf": { "e": ["E"] },
                "unknownDecls": ["%export default e", "%priority 20", "%precedence[left, 3] a b"]
            })),
        )
        .with_module(
            "b",
            module(json!({ "bnf": {}, "unknownDecls": ["%priority 10", "%precedence[left, 3] c"] })),
        )
        .with_module(
            "c",
            module(json!({ "bnf": {}, "unknownDecls": ["%precedence[right, 1] d"] })),
        );

    let output = link(loader, LoadOptions::default()).await.unwrap();
    let table = serde_json::to_value(&output.grammar.precedence).unwrap();
    assert_eq!(
        table,
        json!([["right", "c__d"], ["left", "b__c", "a__a", "a__b"]])
    );
}

#[tokio::test]
async fn test_start_rule_selection() {
    let implicit = MemoryLoader::new().with_module(
        "entry",
        module(json!({ "bnf": { "first": ["A"], "second": ["B"] } })),
    );
    let output = link(implicit, LoadOptions::default()).await.unwrap();
    assert_eq!(output.grammar.start, "entry__first");

    let explicit = MemoryLoader::new().with_module(
        "entry",
        module(json!({ "bnf": { "first": ["A"], "second": ["B"] }, "start": "second" })),
    );
    let output = link(explicit, LoadOptions::default()).await.unwrap();
    assert_eq!(output.grammar.start, "entry__second");

    let empty = MemoryLoader::new().with_module("entry", module(json!({ "bnf": {} })));
    let err = link(empty, LoadOptions::default()).await.unwrap_err();
    assert!(matches!(err, LinkError::MissingStartRule { .. }));
}

#[tokio::test]
async fn test_prefixes_are_distinct_for_colliding_paths() {
    let loader = MemoryLoader::new()
        .with_module(
            "entry",
            module(json!({
                "bnf": { "start": ["x y"] },
                "unknownDecls": ["%import x from \"a/b\"", "%import y from \"a-b\""]
            })),
        )
        .with_module("a/b", module(json!({ "bnf": { "r": ["R"] }, "unknownDecls": ["%export default r"] })))
        .with_module("a-b", module(json!({ "bnf": { "r": ["R"] }, "unknownDecls": ["%export default r"] })));

    let output = link(loader, LoadOptions::default()).await.unwrap();

    let prefixes: HashSet<&str> = output
        .meta
        .modules
        .values()
        .map(|meta| meta.prefix.as_str())
        .collect();
    assert_eq!(prefixes.len(), 3);
    assert_eq!(output.grammar.rules.len(), 3);
    assert_eq!(output.grammar.rules["entry__start"], vec![Alternative::new("a$b__r a$b$1__r")]);
}

#[tokio::test]
async fn test_overlapping_prefixes_fail_instead_of_dropping_rules() {
    let loader = MemoryLoader::new()
        .with_module(
            "entry",
            module(json!({
                "bnf": { "top": ["b__c"], "b__c": ["X"] },
                "unknownDecls": ["%import \"entry__b\""]
            })),
        )
        .with_module("entry__b", module(json!({ "bnf": { "c": ["Y"] } })));

    let err = link(loader, LoadOptions::default()).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Rule entry__b__c is defined by both module entry and module entry__b"
    );
}

#[tokio::test]
async fn test_unknown_entry_module() {
    let err = link(MemoryLoader::new(), LoadOptions::default()).await.unwrap_err();
    assert_eq!(err.to_string(), "Unknown module: entry");
}

#[tokio::test]
async fn test_custom_action_helper_name() {
    let loader = MemoryLoader::new().with_module(
        "entry",
        module_with_lexicon(
            json!({ "bnf": { "start": ["A"] } }),
            json!({ "rules": [["a", "return 'A';"]], "actionInclude": "var shared = 1;" }),
        ),
    );

    let options = LoadOptions::default().with_action_helper("myPrefixer");
    let output = link(loader, options).await.unwrap();
    let lex = &output.grammar.lexicon;

    assert!(lex.action_include.starts_with("var myPrefixer = function"));
    assert!(lex.action_include.ends_with("\nvar shared = 1;"));
    assert!(lex.rules[0].action.starts_with("return myPrefixer(this, \"entry__\""));
}
