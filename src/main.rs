use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};

use std::path::PathBuf;

use asmgraph::{
    contiguity::nodes_by_contiguity, loader::load_gfa, AssemblyGraph,
    ColourAssigner, ContiguitySearch, ContiguityStatus, NodeId,
    PathReconstructor, SearchOutcome, Settings,
};

#[derive(Parser)]
#[command(name = "asmgraph")]
#[command(
    about = "Query assembly graphs: contiguity and paths",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// JSON settings file (requires the serde1 feature)
    #[arg(short = 's', long = "settings", value_name = "FILE", global = true)]
    settings: Option<PathBuf>,

    /// Treat both strands of each contig as separate nodes.
    #[arg(short = 'd', long = "double", global = true)]
    double: bool,

    /// Match node names partially instead of exactly.
    #[arg(short = 'p', long = "partial", global = true)]
    partial: bool,

    /// Log more: -v for info, -vv for debug.
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true
    )]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a summary of the graph
    Info {
        #[arg(value_name = "GRAPH.GFA")]
        gfa: PathBuf,
    },

    /// Classify nodes by contiguity with the given seed nodes
    Contiguity {
        #[arg(value_name = "GRAPH.GFA")]
        gfa: PathBuf,

        /// Seed node names, e.g. 5+
        #[arg(value_name = "NODE", required = true)]
        seeds: Vec<String>,

        /// Maximum number of nodes followed from a seed
        #[arg(long, value_name = "N")]
        steps: Option<usize>,

        /// Also print each node's colour in the contiguity scheme
        #[arg(long)]
        colours: bool,
    },

    /// Reconstruct the path through a set of nodes
    Path {
        #[arg(value_name = "GRAPH.GFA")]
        gfa: PathBuf,

        #[arg(value_name = "NODE", required = true)]
        nodes: Vec<String>,

        /// Print the path sequence as FASTA with this name
        #[arg(long, value_name = "NAME")]
        fasta: Option<String>,
    },
}

#[cfg(feature = "serde1")]
fn load_settings(path: &PathBuf) -> Result<Settings> {
    Settings::load_json(path).with_context(|| {
        format!("Failed to read settings from {}", path.display())
    })
}

#[cfg(not(feature = "serde1"))]
fn load_settings(path: &PathBuf) -> Result<Settings> {
    bail!(
        "Can't read {}: settings files need the serde1 feature",
        path.display()
    )
}

fn load_graph(path: &PathBuf) -> Result<AssemblyGraph> {
    load_gfa(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Looks up node names, either exactly or by partial match. In
/// single-strand mode a contig matched on both strands stands for its
/// positive node.
fn find_nodes(
    graph: &AssemblyGraph,
    names: &[String],
    exact: bool,
    single_strand: bool,
) -> Result<Vec<NodeId>> {
    let (mut nodes, not_found) =
        graph.find_nodes_by_names(&names.join(","), exact);
    if !not_found.is_empty() {
        bail!("Nodes not in the graph: {}", not_found.join(", "));
    }
    if single_strand {
        let found = nodes.clone();
        nodes.retain(|&id| {
            graph.node(id).is_positive()
                || found.binary_search(&graph.twin(id)).is_err()
        });
    }
    debug!("Matched {} nodes", nodes.len());
    Ok(nodes)
}

fn print_info(graph: &AssemblyGraph) -> Result<()> {
    let total_length: usize = graph
        .nodes()
        .filter(|(_, n)| n.is_positive())
        .map(|(_, n)| n.length())
        .sum();
    println!("nodes\t{}", graph.node_count());
    println!("edges\t{}", graph.edge_count());
    println!("total length\t{}", total_length);
    println!("mean depth\t{:.2}", graph.mean_drawn_read_depth());
    graph.check_strand_symmetry()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    let mut settings = match &args.settings {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };
    if args.double {
        settings.double_mode = true;
    }
    let single_strand = !settings.double_mode;
    let exact = !args.partial;
    debug!("Single-strand mode: {}", single_strand);

    match args.command {
        Commands::Info { gfa } => {
            let graph = load_graph(&gfa)?;
            print_info(&graph)?;
        }
        Commands::Contiguity {
            gfa,
            seeds,
            steps,
            colours,
        } => {
            if let Some(steps) = steps {
                settings.contiguity_search_steps = steps;
            }
            let mut graph = load_graph(&gfa)?;
            let seeds = find_nodes(&graph, &seeds, exact, single_strand)?;

            let outcome = ContiguitySearch::new(&mut graph)
                .steps(settings.contiguity_search_steps)
                .run(&seeds);
            if outcome == SearchOutcome::Cancelled {
                bail!("Contiguity search was cancelled");
            }

            settings.colour_scheme = asmgraph::NodeColourScheme::Contiguity;
            let assigner = ColourAssigner::new(&graph, &settings);

            for &status in [
                ContiguityStatus::ContiguousStrandSpecific,
                ContiguityStatus::ContiguousEitherStrand,
                ContiguityStatus::MaybeContiguous,
            ]
            .iter()
            {
                let nodes = nodes_by_contiguity(&graph, status, single_strand)
                    .unwrap_or_default();
                for id in nodes {
                    let status_here = asmgraph::contiguity::display_status(
                        &graph,
                        id,
                        single_strand,
                    );
                    // the either-strand query also matches
                    // strand-specific nodes
                    if status_here != status {
                        continue;
                    }
                    let name = graph.node(id).name();
                    if colours {
                        let colour = assigner.node_colour(id);
                        println!("{}\t{}\t{}", name, status, colour);
                    } else {
                        println!("{}\t{}", name, status);
                    }
                }
            }
        }
        Commands::Path { gfa, nodes, fasta } => {
            let graph = load_graph(&gfa)?;
            let nodes = find_nodes(&graph, &nodes, exact, single_strand)?;

            let path = PathReconstructor::new(&graph)
                .single_strand(single_strand)
                .reconstruct(&nodes);
            if path.is_empty() {
                bail!("The nodes don't form a single unambiguous path");
            }

            info!(
                "{} path over {} nodes, {} bp",
                if path.is_circular() { "Circular" } else { "Linear" },
                path.nodes().len(),
                path.len()
            );
            match fasta {
                Some(name) => print!("{}", path.fasta(&name)),
                None => println!("{}", path),
            }
        }
    }

    Ok(())
}
