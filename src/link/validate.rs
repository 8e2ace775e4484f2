use crate::error::{DependencyError, LinkError};
use crate::module::{ExportBinding, ImportBinding, Module, DEFAULT_EXPORT};
use fxhash::FxHashMap;

/// Module name to public binding name to the export behind it.
pub type ExportMap = FxHashMap<String, FxHashMap<String, ExportBinding>>;

pub fn build_export_map(modules: &[Module]) -> ExportMap {
    modules
        .iter()
        .map(|module| {
            let exports = module
                .exports
                .iter()
                .map(|exp| (exp.public_name.clone(), exp.clone()))
                .collect();
            (module.name.clone(), exports)
        })
        .collect()
}

/// Looks up the export an import binds to, if it exists and is of the same
/// kind (rule or token).
pub fn resolve_import<'a>(exports: &'a ExportMap, import: &ImportBinding) -> Option<&'a ExportBinding> {
    exports
        .get(&import.from_module)
        .and_then(|by_name| by_name.get(&import.source_name))
        .filter(|exp| exp.lexical == import.lexical)
}

/// Checks every import and export across the module set.
///
/// All problems are collected before failing, so the error lists each one.
/// Side-effect-only imports bind nothing and are not checked.
pub fn validate_dependencies(modules: &[Module]) -> Result<ExportMap, LinkError> {
    let exports = build_export_map(modules);
    let export_map = &exports;

    let errors: Vec<DependencyError> = modules
        .iter()
        .flat_map(move |module| validate_imports(module, export_map).chain(validate_exports(module)))
        .collect();

    if !errors.is_empty() {
        log::debug!("Dependency validation found {} problem(s)", errors.len());
        return Err(LinkError::Unresolved(errors));
    }

    Ok(exports)
}

fn validate_imports<'a>(
    module: &'a Module,
    exports: &'a ExportMap,
) -> impl Iterator<Item = DependencyError> + 'a {
    module
        .bound_imports()
        .filter(move |imp| resolve_import(exports, imp).is_none())
        .map(move |imp| {
            let exporter = imp.from_module.clone();
            let importer = module.name.clone();
            let name = imp.source_name.clone();
            if imp.source_name == DEFAULT_EXPORT {
                DependencyError::MissingDefaultExport { exporter, importer }
            } else if imp.lexical {
                DependencyError::MissingTokenExport { exporter, importer, name }
            } else {
                DependencyError::MissingRuleExport { exporter, importer, name }
            }
        })
}

fn validate_exports(module: &Module) -> impl Iterator<Item = DependencyError> + '_ {
    // Tokens have no entry in the rule table.
    module
        .exports
        .iter()
        .filter(move |exp| !exp.lexical && !module.grammar.rules.contains_key(&exp.source_name))
        .map(move |exp| DependencyError::MissingExportedRule {
            module: module.name.clone(),
            rule: exp.source_name.clone(),
        })
}
