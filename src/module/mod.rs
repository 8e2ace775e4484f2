pub mod declaration;
pub mod model;
pub mod namer;

pub use crate::module::model::{ExportBinding, ImportBinding, Module, DEFAULT_EXPORT, DEFAULT_PRIORITY};
pub use crate::module::namer::Namer;
