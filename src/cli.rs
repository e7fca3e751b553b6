// Command-line front end for warcar.
//
// One subcommand, `convert <input> <output>`. The direction comes from the
// file extensions. Failures print `Error: ...` to stderr, remove the
// partial output file and exit with status 1.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand, ValueHint};
use log::info;

use crate::io::{self, ConvertError};
use crate::transcode::TranscodeOptions;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Convert between WARC and CAR archives.
#[derive(Parser, Debug)]
#[command(
    name = "warcar",
    version,
    about = "Convert between WARC and CAR",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Convert a .warc file to .car, or a .car file to .warc.
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Path to a WARC or CAR input.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Path to the output; must be the other kind.
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

// ---------------------------------------------------------------------------
// Convert command
// ---------------------------------------------------------------------------

fn cmd_convert(args: &ConvertArgs) -> i32 {
    let input = absolutise(&args.input);
    let output = absolutise(&args.output);

    match io::convert_file(&input, &output, &TranscodeOptions::default()) {
        Ok(stats) => {
            info!(
                "{} -> {}: {} ({} -> {} bytes, sha256 {})",
                stats.input_kind.name(),
                stats.output_kind.name(),
                stats.transcode,
                stats.input_size,
                stats.output_size,
                io::hex(&stats.output_sha256)
            );
            0
        }
        Err(e) => {
            if !matches!(
                e,
                ConvertError::UnknownKind(_) | ConvertError::SameKind(_) | ConvertError::Input { .. }
            ) {
                let _ = std::fs::remove_file(&output);
            }
            eprintln!("Error: {e}");
            1
        }
    }
}

fn absolutise(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();
    let exit_code = match &cli.command {
        Cmd::Convert(args) => cmd_convert(args),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
