//! Vitals Bridge command line
//!
//! Reads sensor records from a serial port (or stdin) and forwards each one
//! to the configured collector.
//!
//! Usage:
//!   vitals-bridge run [--port PORT] [--baud RATE] [--stdin]
//!   vitals-bridge send "36.6,72,98,Normal,1500,120,80"
//!   vitals-bridge parse "36.6,72,98,Normal,1500,120,80"
//!   vitals-bridge ports
//!   vitals-bridge init-config --identity ward-3 --endpoint http://host:3000/data

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::io::{self, BufReader};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use vitals_bridge_core::prelude::*;
use vitals_bridge_core::serial::{list_ports, open_port};

#[derive(Parser)]
#[command(name = "vitals-bridge", version, about = "Forward serial sensor readings to an HTTP collector")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log detail (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bridge records from the serial port until it closes
    Run {
        /// Serial port (overrides the configuration)
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate (overrides the configuration)
        #[arg(short, long)]
        baud: Option<u32>,

        /// Read records from standard input instead of a serial port
        #[arg(long, conflicts_with_all = ["port", "baud"])]
        stdin: bool,
    },

    /// Parse and transmit a single record
    Send {
        /// Record line, e.g. "36.6,72,98,Normal,1500,120,80"
        line: String,
    },

    /// Parse a record and print the JSON payload without sending it
    Parse {
        /// Record line
        line: String,

        /// Reject non-numeric values instead of reading them as zero
        #[arg(long)]
        strict: bool,
    },

    /// List available serial ports
    Ports,

    /// Write a configuration template
    InitConfig {
        /// Destination (defaults to the user config directory)
        path: Option<PathBuf>,

        /// Network identity
        #[arg(long)]
        identity: String,

        /// Collector URL
        #[arg(long)]
        endpoint: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run { port, baud, stdin } => run(cli.config, port, baud, stdin),
        Command::Send { line } => send(cli.config, &line),
        Command::Parse { line, strict } => parse(&line, strict),
        Command::Ports => {
            ports();
            Ok(())
        }
        Command::InitConfig {
            path,
            identity,
            endpoint,
            force,
        } => init_config(path, identity, endpoint, force),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,vitals_bridge={level},vitals_bridge_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<BridgeConfig> {
    let path = match path {
        Some(p) => p,
        None => BridgeConfig::default_path()?,
    };
    BridgeConfig::load(&path).with_context(|| format!("loading {}", path.display()))
}

fn run(config: Option<PathBuf>, port: Option<String>, baud: Option<u32>, stdin: bool) -> Result<()> {
    let config = load_config(config)?;
    let endpoint = config.endpoint()?;
    tracing::info!(
        "Network identity '{}', collector {}",
        config.network.identity,
        endpoint
    );

    let link = config.connection_status()?;
    wait_until_connected(&*link, config.poll_interval(), config.startup_wait())
        .context("network link did not come up")?;

    let bridge = Bridge::new(
        LineParser::new(config.numeric_policy),
        Transmitter::new(endpoint, config.request_timeout()),
        link,
    );

    if stdin {
        tracing::info!("Reading records from stdin");
        bridge.run(io::stdin().lock())?;
        return Ok(());
    }

    let port_name = port
        .or_else(|| config.serial.port.clone())
        .or_else(|| list_ports().into_iter().next().map(|p| p.name))
        .context("no serial port configured or detected")?;
    let baud = baud.unwrap_or(config.serial.baud_rate);

    let serial = open_port(&port_name, Some(baud), config.read_timeout())?;
    tracing::info!("Listening on {port_name} at {baud} baud");
    bridge
        .run(BufReader::new(serial))
        .with_context(|| format!("reading from {port_name}"))
}

fn send(config: Option<PathBuf>, line: &str) -> Result<()> {
    let config = load_config(config)?;
    let link = config.connection_status()?;
    let bridge = Bridge::new(
        LineParser::new(config.numeric_policy),
        Transmitter::new(config.endpoint()?, config.request_timeout()),
        link,
    );

    match bridge.handle_line(line)? {
        Some(status) => println!("{status}"),
        None => bail!("empty record"),
    }
    Ok(())
}

fn parse(line: &str, strict: bool) -> Result<()> {
    let policy = if strict {
        NumericPolicy::Strict
    } else {
        NumericPolicy::CoerceToZero
    };
    let reading = LineParser::new(policy).parse(line.trim())?;
    println!("{}", serde_json::to_string_pretty(&reading)?);
    Ok(())
}

fn ports() {
    let ports = list_ports();
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => println!(
                "{}  [{:04x}:{:04x}] {}",
                port.name,
                vid,
                pid,
                port.product.as_deref().unwrap_or("")
            ),
            _ => println!("{}", port.name),
        }
    }
}

fn init_config(path: Option<PathBuf>, identity: String, endpoint: String, force: bool) -> Result<()> {
    let path = match path {
        Some(p) => p,
        None => BridgeConfig::default_path()?,
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let config = BridgeConfig::new(identity, endpoint);
    config.validate()?;
    config.save(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
