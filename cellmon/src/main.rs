use std::thread;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

use orb_cellmon::{
    config::{Cli, Config},
    operator::OperatorResolver,
    parser::ResponseParser,
    profile::PROFILES,
    Monitor, MonitorSnapshot, SerialModem,
};

fn init_logging() -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    // stdout carries the snapshots
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()?;

    Ok(())
}

fn print_snapshot(snapshot: &MonitorSnapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
    } else {
        println!("{snapshot}");
    }
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging()?;

    if cli.list_profiles {
        for (index, profile) in PROFILES.iter().enumerate() {
            println!("{index:>2}  {profile}");
        }
        return Ok(());
    }

    let config = Config::from_cli(&cli).wrap_err("invalid configuration")?;

    let device = config.modem.device.to_string_lossy();
    info!("Opening modem on {}", device);
    let mut modem =
        SerialModem::open(&device, config.modem.baud, config.modem.command_timeout)?;

    let mut monitor = Monitor::new(
        ResponseParser::default(),
        OperatorResolver::new(&config.monitor.fallback_carrier),
        config.monitor.profile,
    )?;
    info!(profile = %monitor.profile(), "Using command profile");

    let identity = monitor
        .connect(&mut modem)
        .wrap_err("failed to initialize the modem")?;
    for (label, value) in identity.rows() {
        info!("{label}: {value}");
    }

    loop {
        match monitor.poll_once(&mut modem) {
            Ok(()) => {}
            Err(e) if config.monitor.run_once => {
                return Err(e).wrap_err("poll cycle failed");
            }
            Err(e) => warn!("poll cycle abandoned: {e}"),
        }

        print_snapshot(&monitor.snapshot(), config.output.json)?;

        if config.monitor.run_once {
            return Ok(());
        }
        thread::sleep(config.monitor.poll_interval);
    }
}
