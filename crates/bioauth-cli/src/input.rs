//! Reading descriptors produced by an external face-embedding tool.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::io::Read;

/// Accepted shapes: a bare number array, or any object with a `descriptor` array
/// (such as an exported identity record).
#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorInput {
    Bare(Vec<f64>),
    Wrapped { descriptor: Vec<f64> },
}

/// Read a descriptor from `source`, a file path or `-` for stdin.
pub fn read_descriptor(source: &str) -> Result<Vec<f64>> {
    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading descriptor from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("reading {source}"))?
    };
    parse_descriptor(&text).with_context(|| format!("parsing descriptor from {source}"))
}

pub fn parse_descriptor(text: &str) -> Result<Vec<f64>> {
    let values = match serde_json::from_str::<DescriptorInput>(text)? {
        DescriptorInput::Bare(values) => values,
        DescriptorInput::Wrapped { descriptor } => descriptor,
    };
    if values.is_empty() {
        bail!("descriptor is empty");
    }
    Ok(values)
}
