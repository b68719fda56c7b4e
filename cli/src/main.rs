//! cwfgraph: import the NIST CSF and NICE CWF workbooks into a graph store

use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use cwfgraph::graph::MemoryGraph;
use cwfgraph::{
    GraphStore, ImportConfig, Pipeline, RemoteStore, RunSummary, SourceCache, Workbooks,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cwfgraph",
    version,
    about = "NICE Cybersecurity Workforce Framework graph importer"
)]
struct Cli {
    /// YAML configuration file; defaults plus NEO4J_* environment variables when omitted
    #[arg(long, global = true, env = "CWFGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every import phase
    Import {
        /// Directory holding one sub-directory of CSV sheet exports per workbook
        /// (defaults to the cache directory)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Load into an in-memory graph instead of the configured store
        #[arg(long)]
        dry_run: bool,

        /// Records per store round-trip
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Download the source workbooks into the cache directory
    Download {
        /// Download again even if a file is already cached
        #[arg(long)]
        refresh: bool,
    },
    /// Create the KSAT full-text index only
    Index,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => ImportConfig::load(path)?,
        None => ImportConfig::from_env()?,
    };

    match cli.command {
        Commands::Import {
            data_dir,
            dry_run,
            batch_size,
        } => {
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
                config.validate()?;
            }
            let data_dir = data_dir
                .or_else(|| config.cache_dir.clone())
                .context("no --data-dir given and no cache_dir configured")?;
            run_import(&config, &data_dir, dry_run, &cli.format)
        }
        Commands::Download { refresh } => run_download(&config, refresh),
        Commands::Index => {
            let mut pipeline = Pipeline::with_config(RemoteStore::new(&config.store)?, &config);
            pipeline.create_index()?;
            Ok(())
        }
    }
}

fn run_import(
    config: &ImportConfig,
    data_dir: &Path,
    dry_run: bool,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let workbooks = Workbooks::from_csv_root(data_dir, &config.data_sources)
        .with_context(|| format!("reading workbooks from {}", data_dir.display()))?;

    if dry_run {
        info!("Dry run: loading into an in-memory graph");
        let (summary, graph) = import_into(MemoryGraph::new(), config, &workbooks)?;
        print_summary(&summary, format)?;
        if let OutputFormat::Table = format {
            print_graph_statistics(&graph);
        }
    } else {
        let store = RemoteStore::new(&config.store)?;
        info!("Importing into {}", store.endpoint());
        let (summary, _) = import_into(store, config, &workbooks)?;
        print_summary(&summary, format)?;
    }
    Ok(())
}

fn import_into<S: GraphStore>(
    store: S,
    config: &ImportConfig,
    workbooks: &Workbooks,
) -> anyhow::Result<(RunSummary, S)> {
    let mut pipeline = Pipeline::with_config(store, config);
    let summary = pipeline.run(workbooks)?;
    Ok((summary, pipeline.into_store()))
}

fn run_download(config: &ImportConfig, refresh: bool) -> anyhow::Result<()> {
    let dir = config
        .cache_dir
        .as_deref()
        .context("download needs a cache_dir in the configuration")?;
    let cache = SourceCache::new(dir)?;
    for path in cache.fetch_all(&config.data_sources, refresh)? {
        println!("{}", path.display());
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec![
                "Phase",
                "Rows",
                "Nodes created",
                "Nodes updated",
                "Edges created",
                "Edges existing",
                "Unresolved",
            ]);
            for phase in &summary.phases {
                let r = &phase.report;
                table.add_row(vec![
                    phase.phase.to_string(),
                    phase.rows.to_string(),
                    r.nodes_created.to_string(),
                    r.nodes_updated.to_string(),
                    r.edges_created.to_string(),
                    r.edges_existing.to_string(),
                    r.edges_unresolved.to_string(),
                ]);
            }
            let total = summary.total();
            table.add_row(vec![
                "Total".to_string(),
                summary.rows().to_string(),
                total.nodes_created.to_string(),
                total.nodes_updated.to_string(),
                total.edges_created.to_string(),
                total.edges_existing.to_string(),
                total.edges_unresolved.to_string(),
            ]);
            println!("{}", table);
        }
    }
    Ok(())
}

fn print_graph_statistics(graph: &MemoryGraph) {
    let stats = graph.statistics();
    let mut table = Table::new();
    table.set_header(vec!["Label / type", "Count"]);
    for (label, count) in &stats.label_counts {
        table.add_row(vec![format!(":{}", label), count.to_string()]);
    }
    for (edge_type, count) in &stats.edge_type_counts {
        table.add_row(vec![format!("[:{}]", edge_type), count.to_string()]);
    }
    println!("{}", table);
    println!("{} node(s), {} edge(s)", stats.node_count, stats.edge_count);
}
