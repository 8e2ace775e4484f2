use crate::grammar::composite::CompositeGrammar;
use crate::link::pipeline::LinkMeta;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Writes the composite grammar in the parser generator's JSON form.
pub fn write_grammar_json(path: &Path, grammar: &CompositeGrammar) -> Result<()> {
    log::info!("Writing composite grammar to JSON: {}", path.display());
    write_json(path, grammar).context("Failed to write composite grammar")
}

/// Writes per-module metadata (prefixes, exports, pass-through declarations).
pub fn write_meta_json(path: &Path, meta: &LinkMeta) -> Result<()> {
    log::info!("Writing link metadata to JSON: {}", path.display());
    write_json(path, meta).context("Failed to write link metadata")
}

pub fn read_grammar_json(path: &Path) -> Result<CompositeGrammar> {
    read_json(path)
}

pub fn read_meta_json(path: &Path) -> Result<LinkMeta> {
    read_json(path)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)
        .context(format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, value)
        .context(format!("Failed to serialize JSON to {}", path.display()))?;
    writeln!(writer).context("Failed to write to file")?;
    writer.flush().context("Failed to flush file")?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .context(format!("Failed to open file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .context(format!("Failed to parse JSON from {}", path.display()))
}
