use clap::{Parser, Subcommand};
use log::info;
use scythe_core::{format, liveness, merge, yaml};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "scythe")]
#[command(about = "Cross-module dead-function elimination over module summaries", long_about = None)]
struct Cli {
    /// Print verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge module summaries, mark liveness, and write the combined index
    Merge {
        /// Input summary files
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Output path for the combined summary
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Print the liveness chain for live functions with this debug name
        #[arg(long = "lto-print-live-trace", value_name = "SYMBOL")]
        print_live_trace: Option<String>,

        /// Embed function names in the output for debugging
        #[arg(long)]
        embed_debug_names: bool,
    },

    /// Convert a summary between the binary and textual representations
    Convert {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Dump the binary summary as YAML
        #[arg(long)]
        to_yaml: bool,

        /// Parse YAML back into the binary summary format
        #[arg(long, conflicts_with = "to_yaml")]
        from_yaml: bool,

        /// Embed function names when writing the binary format
        #[arg(long)]
        embed_debug_names: bool,
    },
}

#[derive(Debug, Error)]
enum DriverError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("summary error: {0}")]
    SummaryError(#[from] scythe_core::SummaryError),

    #[error("{0}")]
    UsageError(String),
}

fn main() -> Result<(), DriverError> {
    let cli = Cli::parse();
    let mut builder = env_logger::Builder::from_default_env();
    if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    match cli.command {
        Commands::Merge {
            inputs,
            output,
            print_live_trace,
            embed_debug_names,
        } => merge_summaries(inputs, output, print_live_trace, embed_debug_names),
        Commands::Convert {
            input,
            output,
            to_yaml,
            from_yaml,
            embed_debug_names,
        } => convert_summary(input, output, to_yaml, from_yaml, embed_debug_names),
    }
}

fn merge_summaries(
    inputs: Vec<PathBuf>,
    output: PathBuf,
    print_live_trace: Option<String>,
    embed_debug_names: bool,
) -> Result<(), DriverError> {
    info!("merging {} module summaries", inputs.len());
    let mut combined = merge::load_combined_index(&inputs, "combined")?;

    match print_live_trace {
        Some(symbol) => {
            let chains = liveness::mark_live_traced(&mut combined, &symbol);
            if chains.is_empty() {
                eprintln!("no live function named '{}'", symbol);
            }
            for chain in chains {
                print!("{}", chain);
            }
        }
        None => liveness::mark_live(&mut combined),
    }

    format::write_module_summary_to_path(&combined, embed_debug_names, &output)?;
    info!("wrote combined summary to {}", output.display());
    Ok(())
}

fn convert_summary(
    input: PathBuf,
    output: PathBuf,
    to_yaml: bool,
    from_yaml: bool,
    embed_debug_names: bool,
) -> Result<(), DriverError> {
    if to_yaml == from_yaml {
        return Err(DriverError::UsageError(
            "exactly one of --to-yaml or --from-yaml is required".to_string(),
        ));
    }

    if to_yaml {
        let bytes = fs::read(&input)?;
        let mut index = scythe_core::ModuleSummaryIndex::default();
        format::read_module_summary(&bytes, &mut index)?;
        fs::write(&output, yaml::to_yaml(&index)?)?;
        info!("wrote YAML summary to {}", output.display());
    } else {
        let text = fs::read_to_string(&input)?;
        let index = yaml::from_yaml(&text)?;
        format::write_module_summary_to_path(&index, embed_debug_names, &output)?;
        info!("wrote binary summary to {}", output.display());
    }
    Ok(())
}
