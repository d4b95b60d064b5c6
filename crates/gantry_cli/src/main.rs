//! GANTRY CLI
//!
//! Checks and compiles resource declaration files.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, bail};
use gantry_lang::{TRACE_TARGET, parse};
use gantry_plan::{CompileOptions, Compiled, GraphCompiler, MemoryWorld, ResourceRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gantry")]
#[command(about = "GANTRY - resource graph compiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and report syntax diagnostics
    Check {
        /// Path to resource file
        file: PathBuf,
    },
    /// Compile a file into a resource graph
    Compile {
        /// Path to resource file
        file: PathBuf,
        /// Host the graph is compiled for
        #[arg(long)]
        hostname: Option<String>,
        /// Compute exported resources without publishing them
        #[arg(long)]
        noop: bool,
        /// JSON file with compile options
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Log parser trace events
        #[arg(long)]
        trace: bool,
        /// Print the graph as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { file } => {
            init_tracing(false)?;
            check(&file)
        }
        Commands::Compile {
            file,
            hostname,
            noop,
            config,
            trace,
            json,
        } => {
            let options = load_options(config.as_deref(), hostname, noop, trace)?;
            init_tracing(options.trace)?;
            debug!(?options, "compile options");
            compile(&file, options, json)
        }
    }
}

fn check(file: &Path) -> Result<()> {
    let source = std::fs::read_to_string(file)
        .wrap_err_with(|| format!("could not read {}", file.display()))?;
    let output = parse(&source);
    for diagnostic in &output.diagnostics {
        println!("{}{}", file.display(), diagnostic);
    }
    if !output.is_clean() {
        bail!("{} syntax error(s)", output.diagnostics.len());
    }
    println!(
        "{}: ok ({} top-level blocks)",
        file.display(),
        output.root.resources.len()
    );
    Ok(())
}

fn load_options(
    config: Option<&Path>,
    hostname: Option<String>,
    noop: bool,
    trace: bool,
) -> Result<CompileOptions> {
    let mut options = match config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("could not read {}", path.display()))?;
            serde_json::from_str::<CompileOptions>(&text)
                .wrap_err_with(|| format!("invalid options in {}", path.display()))?
        }
        None => CompileOptions::default(),
    };
    if let Some(hostname) = hostname {
        options.hostname = hostname;
    }
    options.noop |= noop;
    options.trace |= trace;
    Ok(options)
}

/// `RUST_LOG`, or `gantry=info` when unset. Parser tracing adds a
/// `gantry::parser=trace` directive.
fn log_filter(trace_parser: bool) -> Result<EnvFilter> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gantry=info"));
    if trace_parser {
        return Ok(filter.add_directive(format!("{}=trace", TRACE_TARGET).parse()?));
    }
    Ok(filter)
}

fn init_tracing(trace_parser: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(trace_parser)?)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn compile(file: &Path, options: CompileOptions, json: bool) -> Result<()> {
    let world = Arc::new(MemoryWorld::new());
    let compiler = GraphCompiler::new(Arc::new(ResourceRegistry::builtin()), world.clone())
        .with_options(options);
    let compiled = compiler
        .compile_file(file, None)
        .wrap_err_with(|| format!("could not compile {}", file.display()))?;
    for diagnostic in &compiled.diagnostics {
        warn!("{}{}", file.display(), diagnostic);
    }
    println!("{}", render(&compiled, &world, json)?);
    Ok(())
}

fn render(compiled: &Compiled, world: &MemoryWorld, json: bool) -> Result<String> {
    let exported: Vec<_> = world.exported().iter().map(|r| r.to_json()).collect();
    if json {
        let mut out = compiled.graph.to_json();
        out["exported"] = serde_json::Value::Array(exported);
        return Ok(serde_json::to_string_pretty(&out)?);
    }

    let graph = &compiled.graph;
    let mut lines = vec![format!(
        "graph {}: {} vertices, {} edges, {} exported",
        graph.name(),
        graph.vertex_count(),
        graph.edge_count(),
        exported.len()
    )];
    for vertex in graph.vertices() {
        lines.push(format!(
            "  {} {}",
            vertex.key(),
            vertex.content_hash().short()
        ));
    }
    for edge in graph.edges() {
        let arrow = if edge.notify { "~>" } else { "->" };
        lines.push(format!("  {} {} {} ({})", edge.from, arrow, edge.to, edge.name));
    }
    if graph.has_cycle() {
        lines.push("  warning: graph has a cycle".to_string());
    }
    Ok(lines.join("\n"))
}
