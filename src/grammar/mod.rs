pub mod composite;
pub mod document;

// Export core types for anyone importing the grammar module
pub use crate::grammar::composite::{CompositeGrammar, CompositeLexicon, PrecedenceGroup};
pub use crate::grammar::document::{Alternative, Grammar, LexRule, Lexicon, RuleTable};
