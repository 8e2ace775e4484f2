use crate::grammar::document::{LexRule, RuleTable};
use crate::module::declaration::Associativity;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The single grammar produced by linking every module together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeGrammar {
    #[serde(rename = "bnf")]
    pub rules: RuleTable,
    pub start: String,
    /// Precedence groups, lowest priority first.
    #[serde(rename = "operators")]
    pub precedence: Vec<PrecedenceGroup>,
    /// Every module's trailing code block, in module priority order.
    pub module_include: String,
    #[serde(rename = "lex")]
    pub lexicon: CompositeLexicon,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeLexicon {
    pub rules: Vec<LexRule>,
    pub macros: IndexMap<String, String>,
    pub start_conditions: IndexMap<String, u8>,
    /// Shared prefix helper definition followed by every module's action include.
    pub action_include: String,
}

/// One row of the precedence table, written as `[assoc, token, token, ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct PrecedenceGroup {
    pub associativity: Associativity,
    pub tokens: Vec<String>,
}

impl From<PrecedenceGroup> for Vec<String> {
    fn from(group: PrecedenceGroup) -> Self {
        let mut row = Vec::with_capacity(group.tokens.len() + 1);
        row.push(group.associativity.as_str().to_string());
        row.extend(group.tokens);
        row
    }
}

impl TryFrom<Vec<String>> for PrecedenceGroup {
    type Error = String;

    fn try_from(row: Vec<String>) -> Result<Self, Self::Error> {
        let mut row = row.into_iter();
        let associativity = row
            .next()
            .ok_or_else(|| "empty precedence row".to_string())?
            .parse::<Associativity>()?;

        Ok(PrecedenceGroup {
            associativity,
            tokens: row.collect(),
        })
    }
}
