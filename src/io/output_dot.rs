use crate::loader::graph::ModuleGraph;
use anyhow::{Context, Result};
use petgraph::visit::EdgeRef;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the module import graph as Graphviz DOT.
pub fn write_module_graph_dot(graph: &ModuleGraph, output_path: &Path) -> Result<()> {
    log::info!("Writing module graph to DOT: {}", output_path.display());

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create DOT output file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);
    render_module_graph(graph, &mut writer)?;
    writer.flush().context("Failed to flush DOT output")?;
    Ok(())
}

/// Renders the graph. Nodes are labelled with module name and priority;
/// edges with the names they bind, dashed when they bind nothing.
pub fn render_module_graph<W: Write>(graph: &ModuleGraph, writer: &mut W) -> Result<()> {
    writeln!(writer, "digraph Modules {{").context("Failed to write DOT header")?;
    writeln!(writer, "  rankdir=LR;").context("Failed to write DOT rankdir")?;
    writeln!(writer, "  node [shape=box, style=filled, fillcolor=lightgrey];")
        .context("Failed to write DOT node style")?;

    for node in graph.graph.node_indices() {
        let module = &graph.graph[node];
        writeln!(
            writer,
            "  m{} [label=\"{}\\npriority {}\"];",
            node.index(),
            escape_label(&module.name),
            module.priority
        )
        .with_context(|| format!("Failed to write DOT node for module {}", module.name))?;
    }

    for edge in graph.graph.edge_references() {
        let bindings = &edge.weight().bindings;
        let attrs = if bindings.is_empty() {
            "style=dashed".to_string()
        } else {
            format!("label=\"{}\"", escape_label(&bindings.join(", ")))
        };
        writeln!(
            writer,
            "  m{} -> m{} [{}];",
            edge.source().index(),
            edge.target().index(),
            attrs
        )
        .context("Failed to write DOT edge")?;
    }

    writeln!(writer, "}}").context("Failed to write DOT footer")?;
    Ok(())
}

fn escape_label(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
