use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// Convert the morph target meshes in a qq3d mesh archive to version 6.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// The source mesh archive
    #[arg(short, long)]
    input: PathBuf,

    /// The converted mesh archive
    #[arg(short, long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    tracing::info!("Converting {:?} -> {:?}", cli.input, cli.output);
    let start = std::time::Instant::now();

    let index = qq3d_lib::convert_file(&cli.input, &cli.output)
        .with_context(|| format!("failed to convert {:?}", cli.input))?;

    tracing::info!("Converted {} meshes in {:?}", index.len(), start.elapsed());
    Ok(())
}
