//! Export the OpenAPI document to JSON
//!
//! Usage:
//!   cargo run --bin export_openapi > openapi.json
//!   cargo run --bin export_openapi -- --output docs/openapi.json

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use forex_engine::gateway::openapi::ApiDoc;
use utoipa::OpenApi;

#[derive(Debug, Parser)]
struct Args {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let json = ApiDoc::openapi()
        .to_pretty_json()
        .context("serializing OpenAPI document")?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &json)
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("OpenAPI document exported to: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
