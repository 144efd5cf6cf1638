//! Protocols command implementation.

use std::path::PathBuf;

use anyhow::{Result, bail};

use insight_types::ProtocolCatalog;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_json, format_protocol_text, format_protocols_text};
use crate::util::write_output;

pub fn cmd_protocols(
    name: Option<&str>,
    format: OutputFormat,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    let catalog = ProtocolCatalog::default();

    let content = match name {
        Some(name) => {
            let Some(info) = catalog.get(name) else {
                bail!(
                    "Unknown protocol '{}'. Known protocols: {}",
                    name,
                    catalog.names().join(", ")
                );
            };
            match format {
                OutputFormat::Json => format_json(info, opts)?,
                OutputFormat::Text => format_protocol_text(info, opts),
            }
        }
        None => match format {
            OutputFormat::Json => format_json(&catalog, opts)?,
            OutputFormat::Text => format_protocols_text(&catalog, opts),
        },
    };
    write_output(output, &content)
}
