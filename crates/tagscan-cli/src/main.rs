//! tagscan - RFID basket scanner diagnostics
//!
//! # Usage
//!
//! ```bash
//! # Decode EPCs read off a label printer or a reader log
//! tagscan decode 3074257BF7194E4000001A85 "30 74 25 7B F7 19 4E 40 00 00 1A 86"
//!
//! # Same, as JSON
//! tagscan decode --json 3074257BF7194E4000001A85
//!
//! # Drive a full session against the simulated reader
//! tagscan simulate --tags 25
//!
//! # Start from a reader without a region and a custom profile
//! tagscan simulate --config reader.json --unconfigured-region
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tagscan_epc::{EpcDecodeResult, decode};
use tagscan_reader::devices::AnyReaderDriver;
use tagscan_reader::mock::MockDriver;
use tagscan_reader::{ReaderConfig, ReaderSession, Region, TagReadEvent};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Company prefix and item reference shared by every simulated read.
const SIMULATED_EPC_PREFIX: &str = "3074257BF7194E40";

#[derive(Parser, Debug)]
#[command(name = "tagscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "RFID basket scanner diagnostics")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Show debug logs from the reader session
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode SGTIN-96 EPCs into GTIN-14 and serial
    Decode {
        /// EPCs as 24 hex characters (spaces allowed)
        #[arg(required = true)]
        epcs: Vec<String>,

        /// Print one JSON object per EPC
        #[arg(long)]
        json: bool,
    },

    /// Run a scan session against the simulated reader
    Simulate {
        /// Reader configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of synthetic reads to inject
        #[arg(short = 'n', long, default_value = "10")]
        tags: u32,

        /// Start with no region set, so connect has to apply one
        #[arg(long)]
        unconfigured_region: bool,

        /// Print the session summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize)]
struct DecodeLine<'a> {
    epc: &'a str,
    #[serde(flatten)]
    result: EpcDecodeResult,
}

/// What a simulated session did, end to end.
#[derive(Debug, Default, Serialize)]
struct SimulationSummary {
    device: String,
    region: Option<String>,
    warnings: Vec<String>,
    injected: u32,
    received: Vec<String>,
    dropped: u64,
    final_state: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Decode { epcs, json } => {
            for epc in &epcs {
                println!("{}", render_decode(epc, json)?);
            }
        }
        Command::Simulate {
            config,
            tags,
            unconfigured_region,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let summary = simulate(config, tags, unconfigured_region).await?;
            print_summary(&summary, json)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn render_decode(epc: &str, json: bool) -> Result<String> {
    let result = decode(epc);

    if json {
        let line = DecodeLine { epc, result };
        return serde_json::to_string(&line).context("Failed to serialize decode result");
    }

    Ok(match result {
        EpcDecodeResult::Success(sgtin) => format!(
            "{}  GTIN {}  serial {}  filter {}",
            epc, sgtin.gtin14, sgtin.serial, sgtin.filter
        ),
        EpcDecodeResult::Failure { reason } => format!("{}  not decoded: {}", epc, reason),
    })
}

fn load_config(path: Option<&Path>) -> Result<ReaderConfig> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str::<ReaderConfig>(&raw)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => ReaderConfig::default(),
    };

    config.validate()?;
    Ok(config)
}

fn synthetic_epc(index: u32) -> String {
    format!("{}{:08X}", SIMULATED_EPC_PREFIX, index)
}

async fn simulate(
    config: ReaderConfig,
    count: u32,
    unconfigured_region: bool,
) -> Result<SimulationSummary> {
    let (driver, handle) = MockDriver::with_device("Simulated Sled");
    if unconfigured_region {
        handle.set_supported_regions(vec![
            Region::new("USA", "United States"),
            Region::new("EU", "European Union"),
        ]);
        handle.require_region();
    }

    let session = ReaderSession::new(AnyReaderDriver::from(driver), config);
    let mut tags = session.subscribe_tags();

    let report = session.connect().await.context("Failed to connect")?;
    info!("Connected to {}", report.device.name);
    for warning in &report.warnings {
        warn!("{}", warning);
    }

    session
        .start_inventory()
        .await
        .context("Failed to start scanning")?;

    for index in 1..=count {
        let event = TagReadEvent::new(synthetic_epc(index)).with_rssi(-40 - (index % 30) as i16);
        handle.emit_tag(event);
    }

    let mut received = Vec::new();
    while let Some(tag) = tags.try_recv() {
        received.push(format!("{}  {}", tag.formatted_time(), tag.display_name()));
    }

    if let Err(e) = session.stop_inventory().await {
        warn!("Stop failed: {}", e);
    }
    session.disconnect().await;

    Ok(SimulationSummary {
        device: report.device.name,
        region: report.region.map(|region| region.code),
        warnings: report.warnings.iter().map(ToString::to_string).collect(),
        injected: count,
        received,
        dropped: tags.dropped(),
        final_state: session.current_state().to_string(),
    })
}

fn print_summary(summary: &SimulationSummary, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
        println!("{}", out);
        return Ok(());
    }

    println!("Reader: {}", summary.device);
    if let Some(region) = &summary.region {
        println!("Region applied: {}", region);
    }
    for warning in &summary.warnings {
        println!("Warning: {}", warning);
    }
    for line in &summary.received {
        println!("{}", line);
    }
    println!(
        "{} injected, {} received, {} dropped; reader {}",
        summary.injected,
        summary.received.len(),
        summary.dropped,
        summary.final_state
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_cli_parses_decode() {
        let cli = Cli::parse_from(["tagscan", "decode", "--json", "3074257BF7194E4000001A85"]);
        match cli.command {
            Command::Decode { epcs, json } => {
                assert_eq!(epcs, vec!["3074257BF7194E4000001A85".to_string()]);
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_simulate_defaults() {
        let cli = Cli::parse_from(["tagscan", "simulate"]);
        match cli.command {
            Command::Simulate {
                config,
                tags,
                unconfigured_region,
                json,
            } => {
                assert!(config.is_none());
                assert_eq!(tags, 10);
                assert!(!unconfigured_region);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_decode_requires_epc() {
        assert!(Cli::try_parse_from(["tagscan", "decode"]).is_err());
    }

    #[rstest]
    #[case("3074257BF7194E4000001A85", "GTIN 06141418123456  serial 6789")]
    #[case("3074257BF7194E40", "not decoded: invalid length")]
    #[case("E2801160600002040C2C6C5A", "not decoded: not SGTIN-96 (header: 0xE2)")]
    fn test_render_decode_text(#[case] epc: &str, #[case] expected: &str) {
        let line = render_decode(epc, false).unwrap();
        assert!(line.starts_with(epc));
        assert!(line.contains(expected), "{}", line);
    }

    #[test]
    fn test_render_decode_json() {
        let line = render_decode("3074257BF7194E4000001A85", true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["epc"], "3074257BF7194E4000001A85");
        assert_eq!(value["status"], "success");
        assert_eq!(value["gtin14"], "06141418123456");
        assert_eq!(value["serial"], "6789");
    }

    #[test]
    fn test_synthetic_epcs_decode() {
        let result = decode(&synthetic_epc(42));
        assert_eq!(result.gtin14(), Some("06141418123456"));
        assert_eq!(result.as_sgtin().map(|s| s.serial.as_str()), Some("42"));
    }

    #[test]
    fn test_load_config_defaults_without_file() {
        let config = load_config(None).unwrap();
        assert_eq!(config.tag_buffer_capacity, 100);
    }

    #[test]
    fn test_load_config_rejects_zero_capacity() {
        let path = std::env::temp_dir().join(format!("tagscan-cli-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"tag_buffer_capacity": 0}"#).unwrap();

        let result = load_config(Some(&path));
        std::fs::remove_file(&path).unwrap();

        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let error = load_config(Some(Path::new("/nonexistent/tagscan.json"))).unwrap_err();
        assert!(error.to_string().contains("Failed to read config file"));
    }

    #[tokio::test]
    async fn test_simulate_round_trip() {
        let summary = simulate(ReaderConfig::default(), 5, false).await.unwrap();

        assert_eq!(summary.device, "Simulated Sled");
        assert_eq!(summary.region, None);
        assert_eq!(summary.received.len(), 5);
        assert_eq!(summary.dropped, 0);
        assert!(summary.received[0].ends_with("GTIN 06141418123456 / 1"));
        assert_eq!(summary.final_state, "Disconnected");
    }

    #[tokio::test]
    async fn test_simulate_applies_region() {
        let summary = simulate(ReaderConfig::default(), 1, true).await.unwrap();
        assert_eq!(summary.region.as_deref(), Some("USA"));
        assert_eq!(summary.received.len(), 1);
    }

    #[tokio::test]
    async fn test_simulate_overflow_keeps_newest() {
        let config = ReaderConfig {
            tag_buffer_capacity: 4,
            ..ReaderConfig::default()
        };
        let summary = simulate(config, 10, false).await.unwrap();

        assert_eq!(summary.received.len(), 4);
        assert_eq!(summary.dropped, 6);
        assert!(summary.received[0].ends_with("/ 7"));
    }
}
