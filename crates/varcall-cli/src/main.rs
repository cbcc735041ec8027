//! varcall command-line tool
//!
//! Inspects the dispatch ABI of the current build (register assignments,
//! descriptor layouts), encodes and decodes hidden-argument words, and runs
//! a multi-threaded self-test that dispatches real libc calls through both
//! trampoline variants.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "varcall")]
#[command(about = "Vararg and indirect native call dispatch toolkit", long_about = None)]
#[command(version)]
struct Cli {
    /// Log slow-path activity at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// When to use colors: auto, always, never
    #[arg(long, global = true, value_name = "WHEN")]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the register assignments and descriptor layouts of this build
    Layout {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encode or decode hidden-argument words
    Codec {
        #[command(subcommand)]
        action: CodecAction,
    },

    /// Dispatch libc calls through both trampolines from several threads
    Selftest {
        /// Number of threads racing the first call
        #[arg(short, long, default_value_t = 4)]
        threads: usize,
        /// Calls issued per thread and site
        #[arg(short, long, default_value_t = 1000)]
        iterations: usize,
        /// Dispatch configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CodecAction {
    /// Encode a target address as a hidden word
    Encode {
        /// Native function address (decimal or 0x-prefixed hex)
        #[arg(long, conflicts_with = "method", required_unless_present = "method")]
        native: Option<String>,
        /// Method descriptor address (decimal or 0x-prefixed hex)
        #[arg(long)]
        method: Option<String>,
    },
    /// Decode a hidden word
    Decode {
        /// Hidden word (decimal or 0x-prefixed hex)
        word: String,
        /// Decode as a vararg site would (never tagged)
        #[arg(long)]
        vararg: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let no_color = std::env::var_os("NO_COLOR").is_some();
    let choice = output::color_choice(cli.color.as_deref(), no_color);
    let mut out = output::StyledOutput::new(choice);

    match cli.command {
        Commands::Layout { json } => commands::layout::execute(json, &mut out),
        Commands::Codec { action } => match action {
            CodecAction::Encode { native, method } => {
                commands::codec::execute_encode(native.as_deref(), method.as_deref(), &mut out)
            }
            CodecAction::Decode { word, vararg } => {
                commands::codec::execute_decode(&word, vararg, &mut out)
            }
        },
        Commands::Selftest {
            threads,
            iterations,
            config,
        } => commands::selftest::execute(threads, iterations, config, &mut out),
    }
}
