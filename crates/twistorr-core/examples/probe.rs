//! TwisTorr Controller Probe
//!
//! A standalone tool to test serial communication with a TwisTorr controller.
//!
//! Usage:
//!   cargo run --example probe -- --port /dev/ttyUSB0 pressure
//!   cargo run --example probe -- --config twistorr.json read 205
//!   cargo run --example probe -- list
//!
//! Set `RUST_LOG=twistorr_core=trace` to see every byte on the wire.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use twistorr_core::config::ControllerConfig;
use twistorr_core::device::commands::PressureUnit;
use twistorr_core::device::TwisTorr;
use twistorr_core::protocol::{list_ports, Addressing, Window};

#[derive(Parser)]
#[command(version, about = "Talk to a TwisTorr pump controller")]
struct Cli {
    /// JSON configuration file; command-line options override it
    #[arg(long, env = "TWISTORR_CONFIG")]
    config: Option<String>,

    /// Serial port
    #[arg(long, short, env = "TWISTORR_PORT")]
    port: Option<String>,

    /// Baud rate
    #[arg(long, short)]
    baud: Option<u32>,

    /// RS-485 device number (enables multi-drop addressing)
    #[arg(long)]
    devno: Option<u8>,

    /// Attempts per query
    #[arg(long)]
    retries: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List serial ports
    List,
    /// Start the pump
    Start,
    /// Stop the pump
    Stop,
    /// Read the gauge pressure
    Pressure,
    /// Select the pressure unit
    Unit {
        #[arg(value_enum)]
        unit: UnitArg,
    },
    /// Read a window and print its raw data
    Read { window: Window },
    /// Write data into a window
    Write { window: Window, data: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum UnitArg {
    Mbar,
    Pa,
    Torr,
}

impl From<UnitArg> for PressureUnit {
    fn from(arg: UnitArg) -> Self {
        match arg {
            UnitArg::Mbar => PressureUnit::Mbar,
            UnitArg::Pa => PressureUnit::Pa,
            UnitArg::Torr => PressureUnit::Torr,
        }
    }
}

fn load_config(cli: &Cli) -> Result<ControllerConfig> {
    let mut config = match &cli.config {
        Some(path) => ControllerConfig::from_file(path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => ControllerConfig::default(),
    };
    if let Some(port) = &cli.port {
        config.port_name = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }
    if let Some(devno) = cli.devno {
        config.addressing = Addressing::MultiDrop;
        config.devno = devno;
    }
    if let Some(retries) = cli.retries {
        config.query.retries = retries;
    }
    config.validate()?;
    if config.port_name.is_empty() {
        bail!("no serial port given (use --port or a config file)");
    }
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Command::List = cli.command {
        for port in list_ports() {
            println!(
                "{}\t{}",
                port.name,
                port.product.as_deref().unwrap_or("-")
            );
        }
        return Ok(());
    }

    let config = load_config(&cli)?;
    let mut pump = TwisTorr::open(&config)
        .with_context(|| format!("opening {}", config.port_name))?;

    match cli.command {
        Command::List => unreachable!("handled above"),
        Command::Start => {
            pump.start()?;
            println!("started");
        }
        Command::Stop => {
            pump.stop()?;
            println!("stopped");
        }
        Command::Pressure => {
            let pressure = pump.read_pressure()?;
            println!("{} ({:?})", pressure.value, pressure.raw);
        }
        Command::Unit { unit } => {
            let unit = PressureUnit::from(unit);
            pump.set_pressure_unit(unit)?;
            println!("pressure unit set to {unit}");
        }
        Command::Read { window } => {
            let data = pump.read_window(window.number())?;
            println!("{}", String::from_utf8_lossy(&data));
        }
        Command::Write { window, data } => {
            pump.write_window(window.number(), data.as_bytes())?;
            println!("ok");
        }
    }

    Ok(())
}
