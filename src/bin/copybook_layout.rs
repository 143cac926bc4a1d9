//! Print the resolved record layout of a copybook.
//!
//! Usage:
//!   copybook_layout [OPTIONS] [FILE.cpy]
//!   copybook_layout < file.cpy
//!
//! Prints one row per field (name, level, type, position, length), or the layout as JSON
//! with `--json`. Every builder error is printed to stderr and the exit status is 1.

use clap::Parser;
use copybook_layout::{
    dump, layout_from_source, Error, LayoutOptions, ParseOptions, ResolveOptions, SourceFormat,
};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "copybook_layout", about = "Resolve a COBOL copybook into a fixed-format record layout")]
struct Cli {
    /// Copybook source file; stdin when omitted.
    file: Option<PathBuf>,

    /// Free-format source (no sequence or indicator columns).
    #[arg(long)]
    free: bool,

    /// Position of the first byte of the record.
    #[arg(long, default_value_t = copybook_layout::resolve::DEFAULT_ORIGIN)]
    origin: u32,

    /// Print the layout as JSON.
    #[arg(long)]
    json: bool,

    /// Enable debug logging (RUST_LOG overrides).
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let (display_path, src) = match &cli.file {
        Some(path) => (path.display().to_string(), std::fs::read_to_string(path)?),
        None => {
            let mut src = String::new();
            io::stdin().read_to_string(&mut src)?;
            ("<stdin>".to_string(), src)
        }
    };

    let options = LayoutOptions {
        parse: ParseOptions {
            format: if cli.free {
                SourceFormat::Free
            } else {
                SourceFormat::Fixed
            },
        },
        resolve: ResolveOptions { origin: cli.origin },
    };

    let layout = match layout_from_source(&src, &options) {
        Ok(l) => l,
        Err(Error::Layout(diagnostics)) => {
            for m in diagnostics.messages() {
                eprintln!("{}: {}", display_path, m);
            }
            eprintln!("layout: {} error(s)", diagnostics.len());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{}: {}", display_path, e);
            std::process::exit(1);
        }
    };
    debug!("{}", dump::summary_line(&layout));

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&layout)?);
    } else {
        println!("{}", dump::render_table(&layout));
    }
    Ok(())
}
