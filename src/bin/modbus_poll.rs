//! Poll every telemetry point from one inverter and print the values.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use a3ot_modbus_client::ClientConfig;
use a3ot_modbus_client::telemetry::{read_all, total_consumption};

#[derive(Parser)]
#[command(name = "modbus-poll")]
#[command(about = "Read power and battery telemetry over Modbus TCP")]
#[command(version)]
struct Cli {
    /// JSON file with host, port, unit_id and timeout_ms; flags override it
    #[arg(long, env = "MODBUS_CONFIG")]
    config: Option<PathBuf>,

    /// Device host name or IP address [default: scb.localdomain]
    #[arg(long, env = "MODBUS_HOST")]
    host: Option<String>,

    /// Device Modbus TCP port [default: 1502]
    #[arg(long, env = "MODBUS_PORT")]
    port: Option<u16>,

    /// Unit id of the device [default: 71]
    #[arg(long, env = "MODBUS_UNIT_ID")]
    unit_id: Option<u8>,

    /// Connect and read timeout in milliseconds [default: 2000]
    #[arg(long, env = "MODBUS_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Config file (or defaults) with any flag or environment value on top.
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                ClientConfig::from_json(&json)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => ClientConfig::default(),
        };
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(unit_id) = self.unit_id {
            config.unit_id = unit_id;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .init();

    let config = cli.client_config()?;
    info!("Polling {}:{} unit {}", config.host, config.port, config.unit_id);

    let mut session = config.session();
    session
        .connect(config.timeout())
        .with_context(|| format!("connecting to {}:{}", config.host, config.port))?;

    let result = (|| -> Result<()> {
        for (point, value) in read_all(&mut session)? {
            println!("{point}: {value}");
        }
        println!("Total consumption: {}", total_consumption(&mut session)?);
        Ok(())
    })();

    session.disconnect();
    result
}
