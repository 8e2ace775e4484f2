//! Runtime prefixing of lexer state changes and returned tokens.
//!
//! A lexer action may call `this.begin(state)` with a state computed at run
//! time and returns token names as plain strings, so neither can be rewritten
//! in place. Instead every action is wrapped in a call to one helper shared by
//! the whole composite lexer, which swaps in a prefixing `begin` for the
//! duration of the action and prefixes whatever token the action returns.

use crate::link::rewrite::BUILTIN_START_CONDITIONS;

/// Emits the helper definition and the per-action calls into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPrefixer {
    function_name: String,
}

impl ActionPrefixer {
    pub fn new(function_name: impl Into<String>) -> Self {
        ActionPrefixer {
            function_name: function_name.into(),
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Wraps one lexer action so it runs under `prefix`.
    pub fn wrap(&self, prefix: &str, action: &str) -> String {
        format!(
            "return {}(this, \"{}\", function() {{\n{}\n}});",
            self.function_name,
            escape_js_string(prefix),
            action
        )
    }

    /// The helper itself, emitted once at the top of the composite lexer's
    /// action include. `begin` is restored even when the action throws.
    /// Built-in states such as `INITIAL` pass through unprefixed, matching
    /// the static rewrite of rule conditions.
    pub fn definition(&self) -> String {
        let builtins = BUILTIN_START_CONDITIONS
            .iter()
            .map(|state| format!("\"{}\"", escape_js_string(state)))
            .collect::<Vec<_>>()
            .join(", ");

        [
            format!("var {} = function (lexer, prefix, action) {{", self.function_name),
            format!("  var builtin = [{}];", builtins),
            "  var begin = lexer.begin;".to_string(),
            "  lexer.begin = function (state) {".to_string(),
            "    return begin.call(this, builtin.indexOf(state) >= 0 ? state : prefix + state);".to_string(),
            "  };".to_string(),
            "  try {".to_string(),
            "    var token = action.call(lexer);".to_string(),
            "    return token && (prefix + token);".to_string(),
            "  } finally {".to_string(),
            "    lexer.begin = begin;".to_string(),
            "  }".to_string(),
            "};".to_string(),
        ]
        .join("\n")
    }
}

fn escape_js_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
