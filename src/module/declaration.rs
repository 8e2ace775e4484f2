//! Typed parsing of the module directives carried in a grammar's or
//! lexicon's unknown-declaration list:
//!
//! ```text
//! %priority 10
//! %import expr, { term as operand } from "./arith"
//! %import lex { NUMBER } from "./tokens"
//! %import "./whitespace"
//! %export default expr
//! %export lex { NUMBER, IDENT as NAME }
//! %precedence[left, 3] PLUS MINUS
//! ```

use lazy_static::lazy_static;
use logos::Logos;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Why a directive could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DirectiveError(pub String);

impl DirectiveError {
    fn new(message: impl Into<String>) -> Self {
        DirectiveError(message.into())
    }
}

/// The directive keywords the linker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Priority,
    Import,
    Export,
    Precedence,
}

impl DirectiveKind {
    pub const ALL: [DirectiveKind; 4] = [
        DirectiveKind::Priority,
        DirectiveKind::Import,
        DirectiveKind::Export,
        DirectiveKind::Precedence,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            DirectiveKind::Priority => "priority",
            DirectiveKind::Import => "import",
            DirectiveKind::Export => "export",
            DirectiveKind::Precedence => "precedence",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        DirectiveKind::ALL.into_iter().find(|kind| kind.keyword() == word)
    }
}

/// Operator associativity. Ordered alphabetically, which is the order
/// precedence declarations of equal priority are sorted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Associativity {
    Left,
    Nonassoc,
    Right,
}

impl Associativity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Associativity::Left => "left",
            Associativity::Nonassoc => "nonassoc",
            Associativity::Right => "right",
        }
    }
}

impl FromStr for Associativity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Associativity::Left),
            "right" => Ok(Associativity::Right),
            "nonassoc" => Ok(Associativity::Nonassoc),
            other => Err(format!(
                "unknown associativity `{}` (expected left, right or nonassoc)",
                other
            )),
        }
    }
}

impl fmt::Display for Associativity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named binding inside an import or export directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSpec {
    /// For imports the exported name asked for (`default` for the default
    /// export); for exports the local rule or token being exposed.
    pub source: String,
    /// For imports the local name; for exports the public name.
    pub binding: String,
    pub lexical: bool,
}

impl BindingSpec {
    fn new(source: impl Into<String>, binding: impl Into<String>, lexical: bool) -> Self {
        BindingSpec {
            source: source.into(),
            binding: binding.into(),
            lexical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDeclaration {
    /// Module path exactly as written.
    pub module: String,
    /// Empty for a side-effect-only import.
    pub bindings: Vec<BindingSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDeclaration {
    pub bindings: Vec<BindingSpec>,
}

/// `%precedence[<assoc>, <priority>] token...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecedenceDeclaration {
    /// Ordering among precedence declarations; unrelated to module priority.
    pub priority: i64,
    pub associativity: Associativity,
    pub tokens: Vec<String>,
}

/// A parsed directive, one variant per keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Priority(i64),
    Import(ImportDeclaration),
    Export(ExportDeclaration),
    Precedence(PrecedenceDeclaration),
}

/// Raw declarations split by directive keyword.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Partitioned<'a> {
    /// Recognised directives in source order.
    pub recognized: Vec<(DirectiveKind, &'a str)>,
    /// Everything else, passed through untouched.
    pub unknown: Vec<&'a str>,
}

impl<'a> Partitioned<'a> {
    pub fn group(&self, kind: DirectiveKind) -> impl Iterator<Item = &'a str> + '_ {
        self.recognized
            .iter()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, text)| *text)
    }
}

/// Returns the keyword following the leading `%`, if any.
pub fn directive_keyword(decl: &str) -> Option<&str> {
    let rest = decl.trim_start().strip_prefix('%')?;
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

/// Sorts raw declarations into the groups named in `interest`, leaving the
/// rest in the unknown bucket.
pub fn partition<'a>(decls: &'a [String], interest: &[DirectiveKind]) -> Partitioned<'a> {
    let mut out = Partitioned::default();

    for decl in decls {
        let kind = directive_keyword(decl)
            .and_then(DirectiveKind::from_keyword)
            .filter(|kind| interest.contains(kind));

        match kind {
            Some(kind) => out.recognized.push((kind, decl.as_str())),
            None => out.unknown.push(decl.as_str()),
        }
    }

    out
}

pub fn parse_declaration(kind: DirectiveKind, text: &str) -> Result<Declaration, DirectiveError> {
    match kind {
        DirectiveKind::Priority => parse_priority(text).map(Declaration::Priority),
        DirectiveKind::Import => parse_import(text).map(Declaration::Import),
        DirectiveKind::Export => parse_export(text).map(Declaration::Export),
        DirectiveKind::Precedence => parse_precedence(text).map(Declaration::Precedence),
    }
}

pub fn parse_priority(text: &str) -> Result<i64, DirectiveError> {
    let value = strip_keyword(text, DirectiveKind::Priority)?.trim();
    value
        .parse::<i64>()
        .map_err(|_| DirectiveError::new(format!("invalid priority `{}`", value)))
}

pub fn parse_import(text: &str) -> Result<ImportDeclaration, DirectiveError> {
    let mut p = Cursor::new(strip_keyword(text, DirectiveKind::Import)?)?;

    if let Some(Token::Str(_)) = p.peek() {
        let module = p.expect_str("module path")?;
        p.expect_end()?;
        return Ok(ImportDeclaration {
            module,
            bindings: Vec::new(),
        });
    }

    let mut bindings = Vec::new();
    let mut lexical = p.eat_word("lex");

    match p.peek() {
        Some(Token::LBrace) => {}
        Some(Token::Word(word)) if word != "from" => {
            if lexical {
                return Err(DirectiveError::new("default imports cannot be lexical"));
            }
            let name = p.expect_ident("default binding name")?;
            bindings.push(BindingSpec::new("default", name, false));

            p.eat(&Token::Comma);
            lexical = p.eat_word("lex");
        }
        _ => return Err(p.unexpected("bindings or a module path")),
    }

    if let Some(Token::LBrace) = p.peek() {
        let group = p.binding_group()?;
        lexical |= p.eat_word("lex");
        bindings.extend(
            group
                .into_iter()
                .map(|(source, binding)| BindingSpec::new(source, binding, lexical)),
        );
    } else if lexical {
        return Err(p.unexpected("`{` after `lex`"));
    }

    p.expect_word("from")?;
    let module = p.expect_str("module path")?;
    p.expect_end()?;

    Ok(ImportDeclaration { module, bindings })
}

pub fn parse_export(text: &str) -> Result<ExportDeclaration, DirectiveError> {
    let mut p = Cursor::new(strip_keyword(text, DirectiveKind::Export)?)?;

    if p.eat_word("default") {
        if p.peek_word("lex") {
            return Err(DirectiveError::new("default exports cannot be lexical"));
        }
        let name = p.expect_ident("exported rule name")?;
        p.expect_end()?;
        return Ok(ExportDeclaration {
            bindings: vec![BindingSpec::new(name, "default", false)],
        });
    }

    let mut lexical = p.eat_word("lex");
    if p.peek_word("default") {
        return Err(DirectiveError::new("default exports cannot be lexical"));
    }

    let group = p.binding_group()?;
    lexical |= p.eat_word("lex");
    p.expect_end()?;

    Ok(ExportDeclaration {
        bindings: group
            .into_iter()
            .map(|(source, binding)| BindingSpec::new(source, binding, lexical))
            .collect(),
    })
}

lazy_static! {
    static ref PRECEDENCE_HEADER: Regex =
        Regex::new(r"(?s)^\s*%precedence\s*\[([^\]]*)\](.*)$").unwrap();
}

pub fn parse_precedence(text: &str) -> Result<PrecedenceDeclaration, DirectiveError> {
    let caps = PRECEDENCE_HEADER.captures(text).ok_or_else(|| {
        DirectiveError::new("expected %precedence[<assoc>, <priority>] followed by tokens")
    })?;

    let mut params = caps[1].split(',').map(str::trim);
    let associativity = params
        .next()
        .unwrap_or_default()
        .parse::<Associativity>()
        .map_err(DirectiveError::new)?;

    let priority = match params.next() {
        Some(raw) if !raw.is_empty() => raw
            .parse::<i64>()
            .map_err(|_| DirectiveError::new(format!("invalid precedence priority `{}`", raw)))?,
        _ => return Err(DirectiveError::new("precedence declaration is missing a priority")),
    };

    if params.next().is_some() {
        return Err(DirectiveError::new(
            "precedence declaration takes exactly an associativity and a priority",
        ));
    }

    let tokens = split_words(&caps[2])?;
    if tokens.is_empty() {
        return Err(DirectiveError::new("precedence declaration names no tokens"));
    }

    Ok(PrecedenceDeclaration {
        priority,
        associativity,
        tokens,
    })
}

fn strip_keyword(text: &str, kind: DirectiveKind) -> Result<&str, DirectiveError> {
    text.trim_start()
        .strip_prefix('%')
        .and_then(|rest| rest.strip_prefix(kind.keyword()))
        .ok_or_else(|| DirectiveError::new(format!("expected a %{} directive", kind.keyword())))
}

// === Tokens === //

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"\s+")]
enum Token {
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unquote(lex.slice()))]
    Str(String),

    #[regex(r#"[^\s{},"']+"#, |lex| lex.slice().to_string())]
    Word(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(word) => write!(f, "`{}`", word),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::LBrace => f.write_str("`{`"),
            Token::RBrace => f.write_str("`}`"),
            Token::Comma => f.write_str("`,`"),
        }
    }
}

/// Precedence token lists are plain whitespace-separated words, so braces
/// and commas are ordinary token text there.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"\s+")]
enum PrecedenceToken {
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unquote(lex.slice()))]
    Quoted(String),

    #[regex(r#"[^\s"']+"#, |lex| lex.slice().to_string())]
    Bare(String),
}

/// Drops the surrounding quotes and resolves backslash escapes.
fn unquote(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => value.extend(chars.next()),
            c => value.push(c),
        }
    }
    value
}

fn lex_error(rest: &str) -> DirectiveError {
    match rest.chars().next() {
        Some('"' | '\'') => DirectiveError::new("unterminated string literal"),
        Some(c) => DirectiveError::new(format!("unexpected character `{}`", c)),
        None => DirectiveError::new("unexpected end of declaration"),
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, DirectiveError> {
    Token::lexer(text)
        .spanned()
        .map(|(token, span)| token.map_err(|_| lex_error(&text[span.start..])))
        .collect()
}

/// Whitespace-separated words, with quoted words kept whole.
fn split_words(text: &str) -> Result<Vec<String>, DirectiveError> {
    PrecedenceToken::lexer(text)
        .spanned()
        .map(|(token, span)| match token {
            Ok(PrecedenceToken::Quoted(word) | PrecedenceToken::Bare(word)) => Ok(word),
            Err(_) => Err(lex_error(&text[span.start..])),
        })
        .collect()
}

struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl Cursor {
    fn new(text: &str) -> Result<Self, DirectiveError> {
        Ok(Cursor {
            tokens: tokenize(text)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_word(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w == word)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.peek_word(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> DirectiveError {
        match self.peek() {
            Some(token) => DirectiveError::new(format!("expected {}, found {}", expected, token)),
            None => DirectiveError::new(format!("expected {}, found end of declaration", expected)),
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), DirectiveError> {
        if self.eat_word(word) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{}`", word)))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, DirectiveError> {
        match self.peek() {
            Some(Token::Word(word)) => {
                let word = word.clone();
                self.pos += 1;
                Ok(word)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn expect_str(&mut self, what: &str) -> Result<String, DirectiveError> {
        match self.peek() {
            Some(Token::Str(s)) => {
                let s = s.clone();
                self.pos += 1;
                Ok(s)
            }
            _ => Err(self.unexpected(&format!("quoted {}", what))),
        }
    }

    fn expect_end(&self) -> Result<(), DirectiveError> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.unexpected("end of declaration")),
        }
    }

    /// `{ name [as alias], ... }`, yielding `(name, alias-or-name)` pairs.
    fn binding_group(&mut self) -> Result<Vec<(String, String)>, DirectiveError> {
        if !self.eat(&Token::LBrace) {
            return Err(self.unexpected("`{`"));
        }

        let mut group = Vec::new();
        while !self.eat(&Token::RBrace) {
            let name = self.expect_ident("binding name")?;
            let alias = if self.eat_word("as") {
                self.expect_ident("alias after `as`")?
            } else {
                name.clone()
            };
            group.push((name, alias));

            if !self.eat(&Token::Comma) {
                if !self.eat(&Token::RBrace) {
                    return Err(self.unexpected("`,` or `}`"));
                }
                break;
            }
        }

        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(source: &str, binding: &str, lexical: bool) -> BindingSpec {
        BindingSpec::new(source, binding, lexical)
    }

    #[test]
    fn test_partition_by_keyword() {
        let decls = vec![
            "%priority 10".to_string(),
            "%buzz".to_string(),
            "%import foo from \"bar\"".to_string(),
            "%precedence[left, 1] PLUS".to_string(),
            "%importer x".to_string(),
        ];

        let parts = partition(&decls, &DirectiveKind::ALL);
        assert_eq!(parts.group(DirectiveKind::Priority).collect::<Vec<_>>(), vec!["%priority 10"]);
        assert_eq!(parts.group(DirectiveKind::Import).count(), 1);
        assert_eq!(parts.group(DirectiveKind::Precedence).count(), 1);
        assert_eq!(parts.unknown, vec!["%buzz", "%importer x"]);

        // Only the requested keywords are pulled out.
        let parts = partition(&decls, &[DirectiveKind::Priority]);
        assert_eq!(parts.recognized.len(), 1);
        assert_eq!(parts.unknown.len(), 4);
    }

    #[test]
    fn test_priority() {
        assert_eq!(parse_priority("%priority 10").unwrap(), 10);
        assert_eq!(parse_priority("%priority   -3 ").unwrap(), -3);
        assert!(parse_priority("%priority xx").is_err());
        assert!(parse_priority("%priority").is_err());
    }

    #[test]
    fn test_default_export() {
        let decl = parse_export("%export default foo").unwrap();
        assert_eq!(decl.bindings, vec![named("foo", "default", false)]);
    }

    #[test]
    fn test_named_exports() {
        let decl = parse_export("%export { foo as bar, baz }").unwrap();
        assert_eq!(
            decl.bindings,
            vec![named("foo", "bar", false), named("baz", "baz", false)]
        );
    }

    #[test]
    fn test_lexical_exports() {
        let decl = parse_export("%export lex { x, y as z }").unwrap();
        assert_eq!(decl.bindings, vec![named("x", "x", true), named("y", "z", true)]);

        let trailing = parse_export("%export { x } lex").unwrap();
        assert_eq!(trailing.bindings, vec![named("x", "x", true)]);
    }

    #[test]
    fn test_lexical_default_export_rejected() {
        assert!(parse_export("%export default lex foo").is_err());
        assert!(parse_export("%export lex default foo").is_err());
    }

    #[test]
    fn test_default_import() {
        let decl = parse_import("%import foo from \"bar/baz\"").unwrap();
        assert_eq!(decl.module, "bar/baz");
        assert_eq!(decl.bindings, vec![named("default", "foo", false)]);
    }

    #[test]
    fn test_named_imports() {
        let decl = parse_import("%import { foo, bar as baz } from \"fizzbuzz\"").unwrap();
        assert_eq!(decl.module, "fizzbuzz");
        assert_eq!(
            decl.bindings,
            vec![named("foo", "foo", false), named("bar", "baz", false)]
        );
    }

    #[test]
    fn test_combined_imports() {
        let decl = parse_import("%import foo, { bar } from \"baz/qux\"").unwrap();
        assert_eq!(
            decl.bindings,
            vec![named("default", "foo", false), named("bar", "bar", false)]
        );

        let no_comma = parse_import("%import foo { bar } from 'baz/qux'").unwrap();
        assert_eq!(no_comma.bindings, decl.bindings);
    }

    #[test]
    fn test_lexical_imports() {
        let decl = parse_import("%import lex { x, y as z } from \"supercool\"").unwrap();
        assert_eq!(decl.bindings, vec![named("x", "x", true), named("y", "z", true)]);

        let trailing = parse_import("%import { x } lex from \"supercool\"").unwrap();
        assert_eq!(trailing.bindings, vec![named("x", "x", true)]);

        // Only the group is lexical; the default binding stays a rule.
        let mixed = parse_import("%import expr, lex { NUM } from \"arith\"").unwrap();
        assert_eq!(
            mixed.bindings,
            vec![named("default", "expr", false), named("NUM", "NUM", true)]
        );
    }

    #[test]
    fn test_lexical_default_import_rejected() {
        assert!(parse_import("%import lex foo from \"bar\"").is_err());
    }

    #[test]
    fn test_bindingless_import() {
        let decl = parse_import("%import \"./skipWhitespace\"").unwrap();
        assert_eq!(decl.module, "./skipWhitespace");
        assert!(decl.bindings.is_empty());
    }

    #[test]
    fn test_quoted_paths_resolve_escapes() {
        let decl = parse_import(r#"%import { a } from "odd\"dir/mod""#).unwrap();
        assert_eq!(decl.module, "odd\"dir/mod");

        let err = parse_import("%import { a } from \"never/closed").unwrap_err();
        assert_eq!(err.to_string(), "unterminated string literal");
    }

    #[test]
    fn test_malformed_imports() {
        assert!(parse_import("%import { foo } \"bar\"").is_err());
        assert!(parse_import("%import { foo from \"bar\"").is_err());
        assert!(parse_import("%import foo from bar").is_err());
        assert!(parse_import("%import from \"bar\"").is_err());
        assert!(parse_import("%import \"bar\" extra").is_err());
    }

    #[test]
    fn test_precedence_associativities() {
        assert_eq!(
            parse_precedence("%precedence[left, 5] foo bar").unwrap(),
            PrecedenceDeclaration {
                priority: 5,
                associativity: Associativity::Left,
                tokens: vec!["foo".to_string(), "bar".to_string()],
            }
        );

        let right = parse_precedence("%precedence[right, 100] some other tokens").unwrap();
        assert_eq!(right.associativity, Associativity::Right);
        assert_eq!(right.priority, 100);
        assert_eq!(right.tokens.len(), 3);

        let none = parse_precedence("%precedence[nonassoc, 0] x").unwrap();
        assert_eq!(none.associativity, Associativity::Nonassoc);
        assert_eq!(none.tokens, vec!["x".to_string()]);
    }

    #[test]
    fn test_precedence_quoted_tokens() {
        let decl = parse_precedence("%precedence[right, 4] \"bar baz\" qux").unwrap();
        assert_eq!(decl.tokens, vec!["bar baz".to_string(), "qux".to_string()]);

        let punctuation = parse_precedence("%precedence[left, 2] '{' , }").unwrap();
        assert_eq!(punctuation.tokens, vec!["{", ",", "}"]);
    }

    #[test]
    fn test_precedence_rejects_bad_headers() {
        assert!(parse_precedence("%precedence[fizzle, 1] foo").is_err());
        assert!(parse_precedence("%precedence[left] foo").is_err());
        assert!(parse_precedence("%precedence[left, high] foo").is_err());
        assert!(parse_precedence("%precedence left 1 foo").is_err());
        assert!(parse_precedence("%precedence[left, 1]").is_err());
    }

    #[test]
    fn test_parse_declaration_dispatch() {
        assert_eq!(
            parse_declaration(DirectiveKind::Priority, "%priority 7").unwrap(),
            Declaration::Priority(7)
        );
        assert!(matches!(
            parse_declaration(DirectiveKind::Export, "%export default start").unwrap(),
            Declaration::Export(_)
        ));
    }
}
