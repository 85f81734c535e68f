//! Command-line interface for the kiss compiler.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kiss_cli::{EmitKind, utils};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kissc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log lowering details (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default kiss.toml in the current directory
    Init,

    /// Lower a program and validate the module without writing output
    #[command(visible_alias = "c")]
    Check {
        /// JSON AST file, or `-` for stdin
        input: PathBuf,
    },

    /// Compile a program
    #[command(visible_alias = "b")]
    Build {
        /// JSON AST file, or `-` for stdin
        input: PathBuf,

        /// Output file, or `-` for stdout (defaults to <out_dir>/<input stem>.<format>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: wasm, wat or ir
        #[arg(long)]
        emit: Option<EmitKind>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logging(cli.verbose);

    match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Check { input } => commands::check::execute(&input),
        Commands::Build {
            input,
            output,
            emit,
        } => commands::build::execute(&input, output.as_deref(), emit),
    }
}
