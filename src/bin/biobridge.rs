//! Biobridge CLI - Command-line interface for the biosensor bridge
//!
//! Commands:
//! - run: Listen for wearable datagrams and emit status records
//! - decode: Run the decoder chain over captured payloads (offline)
//! - config: Print the effective configuration

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use biobridge::decoder::{ChannelValue, DecodeStrategy};
use biobridge::{Bridge, BridgeConfig, BridgeError, DecoderChain, BRIDGE_VERSION};

/// Biobridge - wearable biosensor UDP bridge
#[derive(Parser)]
#[command(name = "biobridge")]
#[command(author = "Synheart AI Inc")]
#[command(version = BRIDGE_VERSION)]
#[command(about = "Decode wearable biosensor datagrams into rolling vitals", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set (e.g. "info", "biobridge=debug")
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for datagrams and periodically print status records
    Run {
        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Seconds between status records on stdout (0 disables them)
        #[arg(long, default_value = "2")]
        emit_every: f64,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<f64>,

        /// Status record format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Decode captured payloads without opening a socket
    Decode {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Treat the whole input as one datagram instead of one per line
        #[arg(long)]
        whole: bool,

        /// Report format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        overrides: ConfigOverrides,
    },
}

#[derive(Args)]
struct ConfigOverrides {
    /// JSON configuration file; flags below take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind the UDP listener to
    #[arg(long)]
    bind: Option<IpAddr>,

    /// UDP port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Seconds between metric recomputes
    #[arg(long)]
    interval: Option<f64>,

    /// Samples retained per channel
    #[arg(long)]
    capacity: Option<usize>,

    /// Seconds of silence before the wearable is reported disconnected
    #[arg(long)]
    stale_timeout: Option<f64>,
}

impl ConfigOverrides {
    fn resolve(&self) -> Result<BridgeConfig, BridgeCliError> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::from_file(path)?,
            None => BridgeConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(interval) = self.interval {
            config.recompute_interval_secs = interval;
        }
        if let Some(capacity) = self.capacity {
            config.buffer_capacity = capacity;
        }
        if let Some(stale_timeout) = self.stale_timeout {
            config.stale_timeout_secs = stale_timeout;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), BridgeCliError> {
    match cli.command {
        Commands::Run {
            overrides,
            emit_every,
            duration,
            output_format,
        } => cmd_run(overrides.resolve()?, emit_every, duration, output_format),

        Commands::Decode {
            input,
            whole,
            output_format,
        } => cmd_decode(&input, whole, output_format),

        Commands::Config { overrides } => {
            println!("{}", overrides.resolve()?.to_json_pretty()?);
            Ok(())
        }
    }
}

fn cmd_run(
    config: BridgeConfig,
    emit_every: f64,
    duration: Option<f64>,
    output_format: OutputFormat,
) -> Result<(), BridgeCliError> {
    let emit_every = interval_flag("emit-every", emit_every)?;
    let duration = duration
        .map(|secs| interval_flag("duration", secs))
        .transpose()?
        .flatten();
    let tick = emit_every.unwrap_or(Duration::from_millis(250));

    let handle = Bridge::bind(config)?.spawn()?;
    let started = Instant::now();
    let mut stdout = io::stdout();

    loop {
        thread::sleep(tick);

        if emit_every.is_some() {
            let status = handle.status();
            let record = match output_format {
                OutputFormat::Ndjson => status.to_json()?,
                OutputFormat::JsonPretty => status.to_json_pretty()?,
            };
            writeln!(stdout, "{}", record)?;
            stdout.flush()?;
        }

        if duration.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }
    }

    handle.shutdown();
    Ok(())
}

/// Parse a seconds flag where 0 means "off"
fn interval_flag(flag: &str, secs: f64) -> Result<Option<Duration>, BridgeCliError> {
    if secs == 0.0 {
        return Ok(None);
    }
    match Duration::try_from_secs_f64(secs) {
        Ok(interval) if !interval.is_zero() => Ok(Some(interval)),
        _ => Err(BridgeError::InvalidConfig(format!(
            "--{} must be 0 or a positive number of seconds, got {}",
            flag, secs
        ))
        .into()),
    }
}

fn cmd_decode(input: &Path, whole: bool, output_format: OutputFormat) -> Result<(), BridgeCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        buffer
    } else {
        fs::read(input)?
    };
    let text = String::from_utf8_lossy(&input_data);

    let datagrams: Vec<&str> = if whole {
        vec![&*text]
    } else {
        text.lines().filter(|l| !l.trim().is_empty()).collect()
    };

    let chain = DecoderChain::standard();
    let reports: Vec<DecodeReport> = datagrams
        .iter()
        .enumerate()
        .map(|(index, payload)| match chain.decode(payload) {
            Some(decoded) => DecodeReport {
                index,
                matched: true,
                strategy: Some(decoded.strategy),
                summary: Some(decoded.summary),
                writes: decoded.writes,
            },
            None => DecodeReport {
                index,
                matched: false,
                strategy: None,
                summary: None,
                writes: Vec::new(),
            },
        })
        .collect();

    let mut stdout = io::stdout();
    match output_format {
        OutputFormat::Ndjson => {
            for report in &reports {
                writeln!(stdout, "{}", serde_json::to_string(report)?)?;
            }
        }
        OutputFormat::JsonPretty => {
            writeln!(stdout, "{}", serde_json::to_string_pretty(&reports)?)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

// Report types

#[derive(serde::Serialize)]
struct DecodeReport {
    index: usize,
    matched: bool,
    strategy: Option<DecodeStrategy>,
    summary: Option<String>,
    writes: Vec<ChannelValue>,
}

// Error types

#[derive(Debug)]
enum BridgeCliError {
    Io(io::Error),
    Bridge(BridgeError),
    Json(serde_json::Error),
}

impl From<io::Error> for BridgeCliError {
    fn from(e: io::Error) -> Self {
        BridgeCliError::Io(e)
    }
}

impl From<BridgeError> for BridgeCliError {
    fn from(e: BridgeError) -> Self {
        BridgeCliError::Bridge(e)
    }
}

impl From<serde_json::Error> for BridgeCliError {
    fn from(e: serde_json::Error) -> Self {
        BridgeCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BridgeCliError> for CliError {
    fn from(e: BridgeCliError) -> Self {
        match e {
            BridgeCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            BridgeCliError::Bridge(e @ BridgeError::Bind { .. }) => CliError {
                code: "BIND_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Is another bridge already listening on this port?".to_string()),
            },
            BridgeCliError::Bridge(e @ BridgeError::InvalidConfig(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'biobridge config' to inspect the effective settings".to_string()),
            },
            BridgeCliError::Bridge(e) => CliError {
                code: "BRIDGE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            BridgeCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
        }
    }
}
