mod cli_utils;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{cmd_generate, cmd_inspect, cmd_resolve};

#[derive(Parser)]
#[command(name = "ipatlas")]
#[command(
    about = "Resolve IP addresses to countries and build the datasets behind it",
    long_about = "ipatlas - IP-to-country resolution\n\n\
    Resolve IPv4 and IPv6 addresses against a snapshot of sorted country \n\
    ranges, and generate those snapshots from raw allocation data \n\
    (CSV or JSON, optionally gzipped).\n\n\
    Examples:\n\
      ipatlas generate --ipv4 geoip.csv --ipv6 geoip6.csv -o country.atlas\n\
      ipatlas resolve 8.8.8.8 --data country.atlas\n\
      ipatlas resolve 2001:db8::1 --data country.atlas --name\n\
      ipatlas inspect country.atlas --json"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an IP address to its country
    Resolve {
        /// Address to resolve (IPv4 or IPv6)
        #[arg(value_name = "ADDRESS")]
        address: String,

        /// Path to the dataset snapshot (.atlas file)
        #[arg(short, long, value_name = "SNAPSHOT")]
        data: PathBuf,

        /// Require the address to be IPv4
        #[arg(short = '4', long = "only-v4", conflicts_with = "only_v6")]
        only_v4: bool,

        /// Require the address to be IPv6
        #[arg(short = '6', long = "only-v6")]
        only_v6: bool,

        /// Print the English country name after the code
        #[arg(short, long)]
        name: bool,

        /// Quiet mode - no output, only exit code (0 = found, 1 = not found)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Generate a dataset snapshot from raw allocation files
    Generate {
        /// IPv4 source files (start,end,country; can specify multiple)
        #[arg(long = "ipv4", value_name = "FILE")]
        ipv4: Vec<PathBuf>,

        /// IPv6 source files (start,end,country; can specify multiple)
        #[arg(long = "ipv6", value_name = "FILE")]
        ipv6: Vec<PathBuf>,

        /// Output snapshot file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Source file format: csv or json (default: by file extension)
        #[arg(short, long, value_name = "FORMAT")]
        format: Option<String>,

        /// How to resolve overlapping records: first-wins, reject, or most-specific
        #[arg(short, long, default_value = "first-wins")]
        policy: String,

        /// Report per-file record counts to stderr
        #[arg(short, long)]
        verbose: bool,
    },

    /// Inspect a dataset snapshot
    Inspect {
        /// Path to the dataset snapshot (.atlas file)
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,

        /// Output the report as JSON
        #[arg(short, long)]
        json: bool,

        /// How many countries to list in the coverage ranking
        #[arg(long, default_value = "10")]
        top: usize,

        /// List the ranges of one country (alpha-2 code or English name)
        #[arg(short, long, value_name = "COUNTRY")]
        country: Option<String>,

        /// Cap the number of ranges listed with --country
        #[arg(short, long, value_name = "N")]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            address,
            data,
            only_v4,
            only_v6,
            name,
            quiet,
        } => cmd_resolve(address, data, only_v4, only_v6, name, quiet),
        Commands::Generate {
            ipv4,
            ipv6,
            output,
            format,
            policy,
            verbose,
        } => cmd_generate(ipv4, ipv6, output, format, policy, verbose),
        Commands::Inspect {
            snapshot,
            json,
            top,
            country,
            limit,
        } => cmd_inspect(snapshot, json, top, country, limit),
    }
}
