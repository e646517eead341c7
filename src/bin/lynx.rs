//! lynx - parse a Lynx configuration file and print the result
//!
//! # Usage
//!
//! ```bash
//! # Print the whole evaluated tree
//! lynx config.lynx
//!
//! # Print a single entry by dotted path
//! lynx config.lynx server.port
//!
//! # Raise the log level
//! lynx -vv config.lynx
//! ```
//!
//! Exits 0 on success and non-zero on any parse or lookup failure.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::Parser;
use colored::Colorize;

/// Parse a Lynx configuration file and print the result
#[derive(Parser, Debug)]
#[command(name = "lynx")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file to parse
    file: PathBuf,

    /// Dotted path to print instead of the whole tree
    path: Option<String>,

    /// Raise the log level (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    if simple_logger::SimpleLogger::new().with_level(level).init().is_err() {
        eprintln!("{} failed to initialise logging", "[lynx]".yellow());
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", "[lynx]".red());
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let parser = lynxconf::Parser::new();
    let root = parser.parse_file(&args.file)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match &args.path {
        Some(path) => {
            let compound = root
                .as_compound()
                .ok_or_else(|| anyhow!("root is not a compound"))?;
            let entry = compound
                .get_by_path(path)
                .ok_or_else(|| anyhow!("failed to find entry '{path}'"))?;
            entry.print(&mut out, 0).context("failed to print entry")?;
        }
        None => root.print(&mut out, 0).context("failed to print tree")?,
    }
    out.flush().context("failed to flush output")?;
    Ok(())
}
