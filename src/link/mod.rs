//! The link proper: validation, namespacing and composition of loaded modules.

pub mod compose;
pub mod pipeline;
pub mod prefix_action;
pub mod rewrite;
pub mod validate;

pub use crate::link::compose::{compose_grammar, merge_precedence};
pub use crate::link::pipeline::{link_modules, load, LinkMeta, LinkOutput, ModuleMeta};
pub use crate::link::prefix_action::ActionPrefixer;
pub use crate::link::rewrite::{rewrite_module, RewriteContext};
pub use crate::link::validate::{validate_dependencies, ExportMap};
