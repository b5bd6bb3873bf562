// src/main.rs
//! GPS Locator - find a serial GPS receiver and print its position

use anyhow::{bail, Context};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use gps_locate::{
    config::{DeviceEntry, LocatorConfig},
    device::{PortEnumerator, SystemPorts},
    display::TerminalDisplay,
    gps::{ChecksumPolicy, ValidatorMode},
    session::AcquisitionSession,
    transport::SerialTransport,
};
use log::{info, warn, LevelFilter};
use serde_json::json;
use simple_logger::SimpleLogger;
use std::{io, path::PathBuf};

#[derive(Parser)]
#[command(name = "gps-locate", version, about = "Locate a serial GPS receiver and acquire a position fix")]
struct Cli {
    /// Config file (defaults to the per-user config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List available serial ports
    Ports {
        #[arg(long)]
        json: bool,
    },
    /// List configured devices
    Devices,
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Acquire a position fix
    Acquire(AcquireArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    GgaOnly,
    MultiSentence,
}

impl From<ModeArg> for ValidatorMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::GgaOnly => ValidatorMode::GgaOnly,
            ModeArg::MultiSentence => ValidatorMode::MultiSentence,
        }
    }
}

#[derive(Args)]
struct AcquireArgs {
    /// Name of a configured device (all configured devices are tried otherwise)
    #[arg(short, long, conflicts_with_all = ["tag", "vid"])]
    device: Option<String>,

    /// Match a port whose description contains this text
    #[arg(long, conflicts_with = "vid")]
    tag: Option<String>,

    /// USB vendor id, e.g. 1546
    #[arg(long, requires = "pid")]
    vid: Option<String>,

    /// USB product id, e.g. 01A7
    #[arg(long, requires = "vid")]
    pid: Option<String>,

    #[arg(short, long)]
    baud: Option<u32>,

    /// Delay after opening the port before reading
    #[arg(long)]
    stabilization_ms: Option<u64>,

    /// How long to wait for a valid fix once reading starts
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Drop sentences whose checksum does not match
    #[arg(long)]
    verify_checksum: bool,

    /// Number of attempts before giving up
    #[arg(short, long)]
    attempts: Option<u32>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

impl AcquireArgs {
    fn apply_overrides(&self, entry: &mut DeviceEntry) {
        if let Some(baud) = self.baud {
            entry.baud_rate = baud;
        }
        if let Some(ms) = self.stabilization_ms {
            entry.stabilization_time_ms = ms;
        }
        if let Some(ms) = self.timeout_ms {
            entry.fetch_timeout_ms = ms;
        }
    }

    /// No device selection and no per-device overrides
    fn uses_configured_devices(&self) -> bool {
        self.device.is_none()
            && self.tag.is_none()
            && self.vid.is_none()
            && self.baud.is_none()
            && self.stabilization_ms.is_none()
            && self.timeout_ms.is_none()
    }

    /// Devices to try, in order
    fn device_entries(&self, config: &LocatorConfig) -> anyhow::Result<Vec<DeviceEntry>> {
        let mut entries = if self.tag.is_some() || self.vid.is_some() {
            vec![DeviceEntry {
                name: self.tag.clone().unwrap_or_else(|| "USB device".to_string()),
                vendor_id: self.vid.clone(),
                product_id: self.pid.clone(),
                tag: self.tag.clone(),
                baud_rate: 9600,
                stabilization_time_ms: 1_000,
                fetch_timeout_ms: 30_000,
            }]
        } else if let Some(name) = &self.device {
            match config.find_device(name) {
                Some(entry) => vec![entry.clone()],
                None => bail!("No configured device named '{}'", name),
            }
        } else {
            config.devices.clone()
        };

        for entry in &mut entries {
            self.apply_overrides(entry);
        }
        Ok(entries)
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, 2) => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new()
        .with_level(level)
        .init()
        .context("Failed to initialise logging")
}

fn load_config(cli: &Cli) -> anyhow::Result<LocatorConfig> {
    match &cli.config {
        Some(path) => LocatorConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => LocatorConfig::load().context("Failed to load config"),
    }
}

async fn acquire(config: &LocatorConfig, args: &AcquireArgs) -> anyhow::Result<bool> {
    let configs = if args.uses_configured_devices() {
        config.device_configs()
    } else {
        args.device_entries(config)?
            .iter()
            .map(DeviceEntry::to_device_config)
            .collect()
    };
    let configs = configs.context("Invalid device configuration")?;

    let mode = args.mode.map(ValidatorMode::from).unwrap_or(config.validator);
    let checksum = if args.verify_checksum {
        ChecksumPolicy::Verify
    } else {
        config.checksum_policy()
    };
    let attempts = args.attempts.unwrap_or(config.attempts).max(1);

    let mut session = AcquisitionSession::new(SystemPorts, SerialTransport)
        .with_validator(mode)
        .with_checksum(checksum);

    let token = session.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    info!("Acquiring fix ({} validator, up to {} attempt(s))", mode, attempts);
    let mut attempt = 1;
    let result = loop {
        let result = session.acquire_any(&configs).await;
        match &result {
            Err(e) if e.is_retriable() && attempt < attempts => {
                warn!("Attempt {}/{} failed: {}", attempt, attempts, e);
                attempt += 1;
            }
            _ => break result,
        }
    };

    let display = TerminalDisplay::new();
    let mut stdout = io::stdout();
    match result {
        Ok(acquisition) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&acquisition)?);
            } else {
                display.render_acquisition(&mut stdout, &acquisition)?;
            }
            Ok(true)
        }
        Err(e) => {
            if args.json {
                let failure = json!({
                    "error": e.kind(),
                    "message": e.to_string(),
                    "stats": session.stats(),
                });
                println!("{}", serde_json::to_string_pretty(&failure)?);
            } else {
                display.render_failure(&mut stdout, &e, &session.stats())?;
            }
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let display = TerminalDisplay::new();
    let mut stdout = io::stdout();

    match &cli.command {
        Command::Ports { json } => {
            let ports = SystemPorts.enumerate()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&ports)?);
            } else {
                display.render_ports(&mut stdout, &ports)?;
            }
        }
        Command::Devices => {
            let config = load_config(&cli)?;
            display.render_devices(&mut stdout, &config.devices)?;
        }
        Command::InitConfig { force } => {
            let path = match &cli.config {
                Some(path) => path.clone(),
                None => LocatorConfig::get_config_path()?,
            };
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            let config = LocatorConfig::default();
            match &cli.config {
                Some(path) => config.save_to(path)?,
                None => config.save()?,
            }
            println!("Wrote default configuration to {}", path.display());
        }
        Command::Acquire(args) => {
            let config = load_config(&cli)?;
            if !acquire(&config, args).await? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
