use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gramlink::io::output_json::{read_grammar_json, read_meta_json};
use gramlink::{CompositeGrammar, LinkMeta};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(name = "gramlink-utils", version = "0.1.0", about = "Utility tools for gramlink output")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Shows how much each module contributed to a composite grammar.
    Summarize {
        /// Composite grammar JSON written by gramlink.
        #[clap(short, long, value_parser)]
        grammar: PathBuf,

        /// Metadata JSON written by gramlink --meta.
        #[clap(short, long, value_parser)]
        meta: PathBuf,

        /// Print the summary as JSON instead of a table.
        #[clap(long, action = clap::ArgAction::SetTrue)]
        json: bool,
    },
}

/// One module's share of the composite grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct ModuleSummary {
    module: String,
    prefix: String,
    rules: usize,
    macros: usize,
    start_conditions: usize,
}

/// The module whose prefix starts `name`. When one prefix starts another
/// (`a__` and `a__b__`), the longer one wins.
fn owner_of<'a>(name: &str, prefixes: &[&'a str]) -> Option<&'a str> {
    prefixes
        .iter()
        .copied()
        .filter(|prefix| name.starts_with(prefix))
        .max_by_key(|prefix| prefix.len())
}

fn count_owned<'a>(names: impl Iterator<Item = &'a String>, prefixes: &[&str], prefix: &str) -> usize {
    names
        .filter(|name| owner_of(name, prefixes) == Some(prefix))
        .count()
}

fn summarize(grammar: &CompositeGrammar, meta: &LinkMeta) -> Vec<ModuleSummary> {
    let prefixes: Vec<&str> = meta.modules.values().map(|m| m.prefix.as_str()).collect();

    meta.modules
        .iter()
        .map(|(module, info)| ModuleSummary {
            module: module.clone(),
            prefix: info.prefix.clone(),
            rules: count_owned(grammar.rules.keys(), &prefixes, &info.prefix),
            macros: count_owned(grammar.lexicon.macros.keys(), &prefixes, &info.prefix),
            start_conditions: count_owned(grammar.lexicon.start_conditions.keys(), &prefixes, &info.prefix),
        })
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Summarize { grammar, meta, json } => {
            let composite = read_grammar_json(&grammar)
                .with_context(|| format!("Failed to read composite grammar: {}", grammar.display()))?;
            let link_meta = read_meta_json(&meta)
                .with_context(|| format!("Failed to read link metadata: {}", meta.display()))?;

            let summary = summarize(&composite, &link_meta);

            if json {
                let text = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
                println!("{}", text);
            } else {
                println!("Start rule: {}", composite.start);
                println!("{:<40} {:<30} {:>6} {:>7} {:>11}", "module", "prefix", "rules", "macros", "conditions");
                for row in &summary {
                    println!(
                        "{:<40} {:<30} {:>6} {:>7} {:>11}",
                        row.module, row.prefix, row.rules, row.macros, row.start_conditions
                    );
                }
                println!("Total rules: {}", composite.rules.len());
            }
        }
    }

    Ok(())
}
