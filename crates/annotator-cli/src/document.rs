//! Metadata tree documents: the JSON form of a file's groups, variables,
//! attributes and dimension sizes exchanged with the file reader and writer.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result, bail};

use annotator_model::MetadataTree;

/// Path argument that selects standard input or output.
pub const STDIO_PATH: &str = "-";

/// Reads a tree document from a file, or from stdin for `-`.
pub fn read_tree(path: &Path) -> Result<MetadataTree> {
    let text = if path.as_os_str() == STDIO_PATH {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("read tree document from stdin")?;
        buffer
    } else {
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
    };
    parse_tree(&text).with_context(|| format!("parse tree document {}", path.display()))
}

pub fn parse_tree(json: &str) -> Result<MetadataTree> {
    let tree: MetadataTree = serde_json::from_str(json)?;
    tree.validate()?;
    if tree.root().is_none() {
        bail!("tree document has no root group");
    }
    Ok(tree)
}

pub fn render_tree(tree: &MetadataTree) -> Result<String> {
    let mut json = serde_json::to_string_pretty(tree).context("serialize tree document")?;
    json.push('\n');
    Ok(json)
}

/// Writes a tree document to `output`, or to stdout when no path is given.
pub fn write_tree(tree: &MetadataTree, output: Option<&Path>) -> Result<()> {
    let json = render_tree(tree)?;
    match output {
        Some(path) if path.as_os_str() != STDIO_PATH => {
            fs::write(path, json).with_context(|| format!("write {}", path.display()))
        }
        _ => {
            print!("{json}");
            Ok(())
        }
    }
}
