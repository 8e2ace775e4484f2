use anyhow::{Context, Result};
use clap::Parser;
use gramlink::io::output_dot::write_module_graph_dot;
use gramlink::io::output_json::{write_grammar_json, write_meta_json};
use gramlink::{load, FsLoader, FsLoaderConfig, LinkOutput, LoadOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// gramlink: links grammar and lexicon modules into one parser-generator grammar.
///
/// Starting from an entry module, gramlink loads every module reachable through
/// `%import` directives, checks that each import names a matching export,
/// namespaces every rule, token, macro and start condition, and writes a single
/// composite grammar in JSON form.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct GramlinkArgs {
    /// Entry module path, without extension.
    ///
    /// The grammar is read from `<entry>.<grammar-ext>` and, if present, the
    /// lexicon from `<entry>.<lexicon-ext>`.
    #[clap(short, long, value_parser, required = true)]
    input: String,

    /// Output JSON file for the composite grammar.
    ///
    /// Written to stdout when omitted.
    #[clap(short, long, value_parser)]
    output: Option<PathBuf>,

    /// Write per-module metadata (prefixes, exports, pass-through declarations) as JSON.
    #[clap(long, value_parser)]
    meta: Option<PathBuf>,

    /// Generate a .dot file of the module import graph.
    ///
    /// Example usage: dot -Tpng modules.dot -o modules.png
    #[clap(long, value_parser)]
    visualize: Option<PathBuf>,

    /// Directory bare module paths are resolved against.
    #[clap(long, value_parser)]
    base_dir: Option<PathBuf>,

    /// Extension of grammar documents.
    #[clap(long, value_parser, default_value = "y.json")]
    grammar_ext: String,

    /// Extension of external lexicon documents.
    #[clap(long, value_parser, default_value = "l.json")]
    lexicon_ext: String,

    /// Priority for modules that do not declare one.
    #[clap(long, value_parser, allow_hyphen_values = true)]
    default_priority: Option<i64>,

    /// Number of threads used for rewriting modules.
    #[clap(long, value_parser, default_value_t = num_cpus::get())]
    threads: usize,

    /// Log debug output.
    #[clap(short, long, action = clap::ArgAction::SetTrue)]
    verbose: bool,
}

impl GramlinkArgs {
    /// Status lines go to stderr while stdout carries the grammar.
    fn status(&self, message: impl AsRef<str>) {
        if self.output.is_some() {
            println!("{}", message.as_ref());
        } else {
            eprintln!("{}", message.as_ref());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = GramlinkArgs::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads.max(1))
        .build_global()
        .context("Failed to configure thread pool")?;

    args.status(format!("gramlink: Linking from entry module {}", args.input));
    let start = Instant::now();

    let loader = FsLoader::new(FsLoaderConfig {
        base_directory: args.base_dir.clone(),
        grammar_extension: args.grammar_ext.clone(),
        lexicon_extension: args.lexicon_ext.clone(),
    });

    let mut options = LoadOptions::default();
    if let Some(priority) = args.default_priority {
        options = options.with_default_priority(priority);
    }

    let output = load(&args.input, Arc::new(loader), options)
        .await
        .with_context(|| format!("Failed to link grammar from {}", args.input))?;

    args.status(format!(
        "Linked {} module(s) into {} rules in {:?}",
        output.meta.modules.len(),
        output.grammar.rules.len(),
        start.elapsed()
    ));

    generate_outputs(&output, &args)?;
    Ok(())
}

/// Writes every requested output.
fn generate_outputs(output: &LinkOutput, args: &GramlinkArgs) -> Result<()> {
    match &args.output {
        Some(path) => {
            write_grammar_json(path, &output.grammar)?;
            args.status(format!("Wrote composite grammar to {}", path.display()));
        }
        None => {
            let json = serde_json::to_string_pretty(&output.grammar)
                .context("Failed to serialize composite grammar")?;
            println!("{}", json);
        }
    }

    if let Some(path) = &args.meta {
        write_meta_json(path, &output.meta)?;
        args.status(format!("Wrote module metadata to {}", path.display()));
    }

    if let Some(path) = &args.visualize {
        write_module_graph_dot(&output.graph, path)?;
        args.status(format!("Wrote module graph to {}", path.display()));
    }

    Ok(())
}
