//! ResMerge: merge of clustering collections in the CNL format.
//!
//! Usage: resmerge [OPTIONS] <INPUTS>...

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use resmerge::cnl::CnlError;
use resmerge::commands::{ExtractBaseCommand, MergeCommand};
use resmerge::config::{Membership, SizeFilter};
use resmerge::files::{create_output, default_output_path, open_inputs, Collection, NamedFile};

#[derive(Parser)]
#[command(name = "resmerge")]
#[command(version)]
#[command(
    about = "Merge clustering collections in the CNL format, dropping duplicate clusters",
    long_about = None
)]
struct Cli {
    /// Input collections: files or directories of files (not recursive)
    #[arg(required = true, value_name = "INPUTS")]
    inputs: Vec<PathBuf>,

    /// Output file [default: <dir>.cnl for a single input directory, merged.cnl otherwise]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite the output file if it exists
    #[arg(short, long)]
    rewrite: bool,

    /// Bottom margin of the cluster size to process, inclusive
    #[arg(short, long = "btm-size", default_value = "0")]
    btm_size: usize,

    /// Top margin of the cluster size to process, inclusive (0 means unbounded)
    #[arg(short, long = "top-size", default_value = "0")]
    top_size: usize,

    /// Average expected membership of the nodes, used to size the internal tables
    #[arg(short, long, default_value = "1")]
    membership: f32,

    /// Node base to synchronize the cluster members with
    #[arg(short, long = "sync-base", conflicts_with = "extract_base")]
    sync_base: Option<PathBuf>,

    /// Extract the node base of the inputs instead of merging them
    /// [default output: <dir>_base.cnl or nodebase.cnl]
    #[arg(short, long = "extract-base")]
    extract_base: bool,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Report errors only
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Log to stderr, `RESMERGE_LOG` or `RUST_LOG` override the verbosity flags.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_env("RESMERGE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), CnlError> {
    let membership = Membership::new(cli.membership)?;
    let filter = SizeFilter::new(cli.btm_size, cli.top_size)?;
    let output_path = cli
        .output
        .unwrap_or_else(|| default_output_path(&cli.inputs, cli.extract_base));

    let mut inputs = open_inputs(&cli.inputs, Some(&output_path))?;
    let mut sync_base = match &cli.sync_base {
        Some(path) => Some(NamedFile::open(path).map_err(|e| {
            CnlError::InputUnavailable(format!(
                "the node base '{}' can't be opened: {}",
                path.display(),
                e
            ))
        })?),
        None => None,
    };
    let mut output = create_output(&output_path, cli.rewrite)?;

    if cli.extract_base {
        let stats = ExtractBaseCommand::new()
            .with_filter(filter)
            .with_membership(membership)
            .run(&mut output, &mut inputs)?;
        println!(
            "The node base of {} nodes is extracted from {} CNL files into {}",
            stats.nodes,
            stats.inputs_processed,
            output_path.display()
        );
    } else {
        let stats = MergeCommand::new()
            .with_filter(filter)
            .with_membership(membership)
            .run(
                &mut output,
                &mut inputs,
                sync_base.as_mut().map(|base| base as &mut dyn Collection),
            )?;
        println!(
            "{} CNL files merged into {}",
            stats.inputs_processed,
            output_path.display()
        );
    }

    Ok(())
}
