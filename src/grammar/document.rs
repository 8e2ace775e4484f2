use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Rule table: rule name to its ordered alternatives. Insertion order is the
/// declaration order, so the first key is the first rule the author wrote.
pub type RuleTable = IndexMap<String, Vec<Alternative>>;

/// The structured form of one module's grammar, as handed over by the
/// grammar text parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grammar {
    #[serde(rename = "bnf", default)]
    pub rules: RuleTable,

    /// Explicit start rule, if the module names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    /// Free-form code emitted after the generated parser.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_include: Option<String>,

    /// `%`-directives the grammar parser did not recognise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_decls: Vec<String>,

    /// Raw `%left`/`%right`/`%nonassoc` table. Modules must not use it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operators: Option<Vec<Vec<String>>>,

    /// Lexicon embedded in the grammar file itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lex: Option<Lexicon>,
}

impl Grammar {
    /// True when the grammar carries a non-empty legacy operator table.
    pub fn has_legacy_operators(&self) -> bool {
        self.operators.as_ref().is_some_and(|ops| !ops.is_empty())
    }
}

/// One alternative production of a rule.
///
/// Serialized the way parser generators expect it: a bare `"a b c"` string
/// when there is nothing else to say, otherwise an array
/// `["a b c", "action", {"prec": "T"}]` with the optional parts left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AlternativeRepr", into = "AlternativeRepr")]
pub struct Alternative {
    /// Space-delimited symbol sequence. Empty for an epsilon production.
    pub symbols: String,
    pub action: Option<String>,
    /// Per-alternative precedence override (a token name).
    pub prec: Option<String>,
}

impl Alternative {
    pub fn new(symbols: impl Into<String>) -> Self {
        Alternative {
            symbols: symbols.into(),
            action: None,
            prec: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_prec(mut self, prec: impl Into<String>) -> Self {
        self.prec = Some(prec.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PrecOverride {
    prec: String,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum AlternativeRepr {
    Bare(String),
    Full(String, String, PrecOverride),
    WithAction(String, String),
    WithPrec(String, PrecOverride),
    Single((String,)),
}

impl From<AlternativeRepr> for Alternative {
    fn from(repr: AlternativeRepr) -> Self {
        match repr {
            AlternativeRepr::Bare(symbols) | AlternativeRepr::Single((symbols,)) => {
                Alternative::new(symbols)
            }
            AlternativeRepr::Full(symbols, action, prec) => {
                Alternative::new(symbols).with_action(action).with_prec(prec.prec)
            }
            AlternativeRepr::WithAction(symbols, action) => {
                Alternative::new(symbols).with_action(action)
            }
            AlternativeRepr::WithPrec(symbols, prec) => Alternative::new(symbols).with_prec(prec.prec),
        }
    }
}

impl From<Alternative> for AlternativeRepr {
    fn from(alt: Alternative) -> Self {
        match (alt.action, alt.prec) {
            (None, None) => AlternativeRepr::Bare(alt.symbols),
            (Some(action), None) => AlternativeRepr::WithAction(alt.symbols, action),
            (None, Some(prec)) => AlternativeRepr::WithPrec(alt.symbols, PrecOverride { prec }),
            (Some(action), Some(prec)) => {
                AlternativeRepr::Full(alt.symbols, action, PrecOverride { prec })
            }
        }
    }
}

/// The structured form of one module's lexer specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lexicon {
    #[serde(default)]
    pub rules: Vec<LexRule>,

    /// Macro name to pattern fragment; referenced as `{name}` in patterns.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub macros: IndexMap<String, String>,

    /// Start condition name to exclusivity flag (0 inclusive, 1 exclusive).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub start_conditions: IndexMap<String, u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_include: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_decls: Vec<String>,
}

/// A lexer rule: `[conditions?, pattern, action]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LexRuleRepr", into = "LexRuleRepr")]
pub struct LexRule {
    /// Start conditions the rule is active in. `None` when the source gave
    /// no condition list at all, which is distinct from an empty list.
    pub conditions: Option<Vec<String>>,
    pub pattern: String,
    pub action: String,
}

impl LexRule {
    pub fn new(pattern: impl Into<String>, action: impl Into<String>) -> Self {
        LexRule {
            conditions: None,
            pattern: pattern.into(),
            action: action.into(),
        }
    }

    pub fn with_conditions<I, S>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditions = Some(conditions.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LexRuleRepr {
    Conditional(Vec<String>, String, String),
    Plain(String, String),
}

impl From<LexRuleRepr> for LexRule {
    fn from(repr: LexRuleRepr) -> Self {
        match repr {
            LexRuleRepr::Conditional(conditions, pattern, action) => LexRule {
                conditions: Some(conditions),
                pattern,
                action,
            },
            LexRuleRepr::Plain(pattern, action) => LexRule::new(pattern, action),
        }
    }
}

impl From<LexRule> for LexRuleRepr {
    fn from(rule: LexRule) -> Self {
        match rule.conditions {
            Some(conditions) => LexRuleRepr::Conditional(conditions, rule.pattern, rule.action),
            None => LexRuleRepr::Plain(rule.pattern, rule.action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grammar_reads_every_alternative_shape() {
        let grammar: Grammar = serde_json::from_value(json!({
            "bnf": {
                "expr": [
                    "term",
                    ["expr PLUS term", "$$ = $1 + $3;"],
                    ["MINUS expr", "$$ = -$2;", { "prec": "UMINUS" }],
                    ["expr BANG", { "prec": "BANG" }],
                    ["NUMBER"]
                ]
            },
            "unknownDecls": ["%priority 10"]
        }))
        .unwrap();

        let alts = &grammar.rules["expr"];
        assert_eq!(alts[0], Alternative::new("term"));
        assert_eq!(alts[1], Alternative::new("expr PLUS term").with_action("$$ = $1 + $3;"));
        assert_eq!(
            alts[2],
            Alternative::new("MINUS expr").with_action("$$ = -$2;").with_prec("UMINUS")
        );
        assert_eq!(alts[3], Alternative::new("expr BANG").with_prec("BANG"));
        assert_eq!(alts[4], Alternative::new("NUMBER"));
        assert_eq!(grammar.unknown_decls, vec!["%priority 10".to_string()]);
    }

    #[test]
    fn test_alternative_writes_compact_shape() {
        let value = serde_json::to_value(vec![
            Alternative::new("a b"),
            Alternative::new("c").with_prec("T"),
        ])
        .unwrap();

        assert_eq!(value, json!(["a b", ["c", { "prec": "T" }]]));
    }

    #[test]
    fn test_lexicon_rules_keep_condition_lists() {
        let lexicon: Lexicon = serde_json::from_value(json!({
            "rules": [
                ["\\s+", "/* skip */"],
                [[], "{DIGIT}+", "return 'NUMBER';"],
                [["comment"], "\"*/\"", "this.popState();"]
            ],
            "macros": { "DIGIT": "[0-9]" },
            "startConditions": { "comment": 1 }
        }))
        .unwrap();

        assert_eq!(lexicon.rules[0].conditions, None);
        assert_eq!(lexicon.rules[1].conditions, Some(vec![]));
        assert_eq!(lexicon.rules[2].conditions, Some(vec!["comment".to_string()]));
        assert_eq!(lexicon.start_conditions["comment"], 1);

        let back = serde_json::to_value(&lexicon.rules[1]).unwrap();
        assert_eq!(back, json!([[], "{DIGIT}+", "return 'NUMBER';"]));
    }

    #[test]
    fn test_rule_order_is_declaration_order() {
        let grammar: Grammar = serde_json::from_value(json!({
            "bnf": { "zeta": ["a"], "alpha": ["b"], "mid": ["c"] }
        }))
        .unwrap();

        let names: Vec<&str> = grammar.rules.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }
}
