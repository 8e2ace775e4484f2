use crate::config::LoadOptions;
use crate::error::LinkError;
use crate::loader::SourceLoader;
use crate::module::Module;
use fxhash::{FxHashMap, FxHashSet};
use log::{debug, info};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Loads every module reachable from `entry` through imports.
///
/// Traversal is breadth first, one level at a time: all modules of a level
/// are fetched concurrently, then their imports form the next level. A
/// path is requested at most once. The first failed retrieval aborts the
/// fetches still in flight. Modules come back in discovery order, entry
/// first, after the preprocess hook (if any) has run over them.
pub async fn load_module_graph<L: SourceLoader>(
    entry: &str,
    loader: Arc<L>,
    options: &LoadOptions,
) -> Result<Vec<Module>, LinkError> {
    let default_priority = options.effective_default_priority();
    let entry = loader.resolve_path(None, entry);

    let mut seen = FxHashSet::default();
    seen.insert(entry.clone());
    let mut frontier = vec![entry.clone()];
    let mut modules: Vec<Module> = Vec::new();
    let mut round = 0usize;

    while !frontier.is_empty() {
        round += 1;
        debug!("Retrieval round {}: {} module(s)", round, frontier.len());

        let level = std::mem::take(&mut frontier);
        let mut loaded: Vec<Option<Module>> = Vec::with_capacity(level.len());
        loaded.resize_with(level.len(), || None);

        // Dropping the set on an early return aborts the remaining fetches.
        let mut tasks = JoinSet::new();
        for (slot, path) in level.into_iter().enumerate() {
            let loader = Arc::clone(&loader);
            tasks.spawn(async move {
                let result = loader.load(&path).await;
                (slot, path, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (slot, path, result) = joined
                .map_err(|err| LinkError::internal(format!("Module retrieval task failed: {}", err)))?;

            let source = result
                .map_err(|err| LinkError::retrieval(path.as_str(), err))?
                .ok_or_else(|| LinkError::UnknownModule { path: path.clone() })?;

            let mut module = Module::from_source(path, source, default_priority)?;
            for import in &mut module.imports {
                import.canonicalize(loader.as_ref(), &module.name);
            }
            loaded[slot] = Some(module);
        }

        for module in loaded.into_iter().flatten() {
            for import in &module.imports {
                if seen.insert(import.from_module.clone()) {
                    frontier.push(import.from_module.clone());
                }
            }
            modules.push(module);
        }
    }

    info!("Loaded {} module(s) reachable from {}", modules.len(), entry);

    if let Some(preprocess) = &options.preprocess {
        debug!("Running preprocess hook");
        preprocess(&mut modules);
    }

    Ok(modules)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNode {
    pub name: String,
    pub priority: i64,
}

/// All bindings one module imports from another. Empty for a
/// side-effect-only import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportEdge {
    pub bindings: Vec<String>,
}

/// The import structure of a loaded module set. Edges run from importer to
/// imported module.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    pub graph: DiGraph<ModuleNode, ImportEdge>,
    pub module_to_node: FxHashMap<String, NodeIndex>,
}

impl ModuleGraph {
    pub fn from_modules(modules: &[Module]) -> Self {
        let mut graph = DiGraph::new();
        let mut module_to_node = FxHashMap::default();

        for module in modules {
            let node = graph.add_node(ModuleNode {
                name: module.name.clone(),
                priority: module.priority,
            });
            module_to_node.insert(module.name.clone(), node);
        }

        for module in modules {
            let from = module_to_node[&module.name];
            for import in &module.imports {
                // Imports the preprocess hook pointed elsewhere have no node.
                let Some(&to) = module_to_node.get(&import.from_module) else {
                    continue;
                };
                let edge = match graph.find_edge(from, to) {
                    Some(edge) => edge,
                    None => graph.add_edge(from, to, ImportEdge::default()),
                };
                if !import.is_bindingless() {
                    graph[edge].bindings.push(import.local_name.clone());
                }
            }
        }

        debug!(
            "Module graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        ModuleGraph {
            graph,
            module_to_node,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Names of the modules that import `name`, in no particular order.
    pub fn importers_of(&self, name: &str) -> Vec<&str> {
        match self.module_to_node.get(name) {
            Some(&node) => self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .map(|n| self.graph[n].name.as_str())
                .collect(),
            None => Vec::new(),
        }
    }
}
