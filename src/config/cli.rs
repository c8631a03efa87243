use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "shipping-gateway")]
#[command(about = "Courier rates and shipment tracking through a cache, store and provider cascade")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, short = 'c', default_value = "gateway.toml")]
    pub config: PathBuf,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    /// Trace id stamped on every log line; generated when absent
    #[arg(long)]
    pub trace_id: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Quote courier rates for a JSON rate request
    Rates {
        /// Path to the request JSON, or `-` for stdin
        #[arg(long)]
        request: String,
    },
    /// Track a shipment by waybill and courier
    Track { waybill: String, courier: String },
}
