//! Command-line entry point: validate, normalize, and inspect interchange documents.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use plotboard_core::{InterchangeDocument, Session, SessionConfig, connection};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "plotboard", version, about = "Work with plotboard diagram documents")]
struct Cli {
    /// Session configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that a document would import cleanly
    Validate { file: PathBuf },
    /// Re-glue every connection and re-derive line geometry
    Normalize {
        file: PathBuf,
        /// Output file (stdout if not provided)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// List nodes in paint order and their connections
    Inspect { file: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("ERROR: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => SessionConfig::load_from_file(path)?,
        None => SessionConfig::default(),
    };

    match cli.command {
        Command::Validate { file } => validate(&file, config),
        Command::Normalize { file, output } => normalize(&file, output.as_deref(), config),
        Command::Inspect { file } => inspect(&file, config),
    }
}

fn read_document(path: &Path) -> Result<InterchangeDocument> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let document = InterchangeDocument::from_json(&json)
        .with_context(|| format!("{} is not a valid document", path.display()))?;
    Ok(document)
}

fn load_session(path: &Path, config: SessionConfig) -> Result<Session> {
    let document = read_document(path)?;
    let mut session = Session::new(config);
    session.import_document(document);
    Ok(session)
}

fn validate(path: &Path, config: SessionConfig) -> Result<()> {
    let document = read_document(path)?;
    let declared_connections = document.connections.len();
    let version = document.version.clone();

    let mut session = Session::new(config);
    session.import_document(document);
    let store = session.store();

    println!(
        "OK: {} nodes, {} connections (version {version})",
        store.len(),
        store.connections().len()
    );
    let dropped = declared_connections - store.connections().len();
    if dropped > 0 {
        println!("note: {dropped} connection(s) are dangling or superseded and would be dropped");
    }
    Ok(())
}

fn normalize(path: &Path, output: Option<&Path>, config: SessionConfig) -> Result<()> {
    let mut session = load_session(path, config)?;
    let lines = connection::normalize_all_lines(session.store_mut());
    let refreshed = connection::refresh_all(session.store_mut());
    log::info!("Normalized {lines} lines, refreshed {refreshed} connections");

    let json = session.export_json()?;
    match output {
        Some(out) => {
            std::fs::write(out, json)
                .with_context(|| format!("failed to write {}", out.display()))?;
            eprintln!("Wrote {}", out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn inspect(path: &Path, config: SessionConfig) -> Result<()> {
    let session = load_session(path, config)?;
    let store = session.store();

    println!("{} nodes (bottom to top):", store.len());
    for (i, node) in store.nodes().iter().enumerate() {
        let size = node.size();
        let parent = node
            .parent_id
            .as_deref()
            .map(|p| format!(" in {p}"))
            .unwrap_or_default();
        println!(
            "  {i:>3}  {:<16} {:<36} at ({:.1}, {:.1}) size {:.1}x{:.1}{parent}",
            node.kind.as_str(),
            node.id,
            node.position.x,
            node.position.y,
            size.width,
            size.height,
        );
    }

    println!("{} connections:", store.connections().len());
    for conn in store.connections() {
        println!(
            "  {}[{}] -> {}.{}",
            conn.line_id,
            conn.point_index,
            conn.shape_id,
            conn.position.as_str()
        );
    }

    if let Some(bounds) = store.bounds() {
        println!(
            "bounds: ({:.1}, {:.1}) - ({:.1}, {:.1})",
            bounds.x0, bounds.y0, bounds.x1, bounds.y1
        );
    }
    Ok(())
}
