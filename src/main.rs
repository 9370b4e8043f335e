use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fastmeter_rs::constants::DEFAULT_BAUDRATE;
use fastmeter_rs::logging::init_logger_with_default;
use fastmeter_rs::relay::{connect_serial, connect_telnet};
use fastmeter_rs::{
    log_info, AccessLevel, ClientSettings, CommandSet, FastMeterVariant, RelayConnection,
    RelaySession,
};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "fastmeter-cli")]
#[command(about = "CLI tool for SEL Fast Meter polling")]
struct Cli {
    /// Relay address for telnet, e.g. 192.168.1.10:23
    #[arg(long, global = true, conflicts_with = "serial")]
    tcp: Option<String>,

    /// Serial port, e.g. /dev/ttyUSB0
    #[arg(long, global = true)]
    serial: Option<String>,

    #[arg(long, global = true, default_value_t = DEFAULT_BAUDRATE)]
    baud: u32,

    /// JSON settings file
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Read timeout in milliseconds, overrides the settings file
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Auto-configure and print the relay identity
    Identify,
    /// Print the current access level
    Level,
    /// Auto-configure, then poll a fast meter
    Poll {
        #[arg(short, long, default_value_t = 1)]
        count: u32,
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
        /// Minimum access level (0-3) for the poll
        #[arg(short, long, default_value_t = 1)]
        level: u8,
        /// regular, demand or peak-demand
        #[arg(short, long, default_value = "regular")]
        variant: FastMeterVariant,
    },
    /// Drop the relay to level 0
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger_with_default(LevelFilter::Info);

    let cli = Cli::parse();
    let mut settings = match &cli.settings {
        Some(path) => ClientSettings::from_json_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => ClientSettings::default(),
    };
    if let Some(ms) = cli.timeout_ms {
        settings.read_timeout = Duration::from_millis(ms);
    }
    // The CLI decides per subcommand whether to configure.
    settings.autoconfig_on_connect = false;

    if let Some(addr) = &cli.tcp {
        let conn = connect_telnet(addr, settings.read_timeout).await?;
        run(conn, settings, cli.command).await
    } else if let Some(port) = &cli.serial {
        let config = fastmeter_rs::SerialConfig {
            baudrate: cli.baud,
            timeout: settings.read_timeout,
        };
        let conn = connect_serial(port, &config).await?;
        run(conn, settings, cli.command).await
    } else {
        bail!("one of --tcp or --serial is required")
    }
}

async fn run<C: RelayConnection>(conn: C, settings: ClientSettings, command: Commands) -> Result<()> {
    let mut session = RelaySession::connect(conn, CommandSet::default(), settings).await?;

    match command {
        Commands::Identify => {
            let fid = session.autoconfigure().await?;
            log_info(&format!("Relay FID: {fid}"));
            if let Some(identity) = session.identity() {
                println!("{}", serde_json::to_string_pretty(identity)?);
            }
        }
        Commands::Level => {
            let (level, label) = session.query_access_level().await?;
            println!("{} {label}", level.number());
        }
        Commands::Poll {
            count,
            interval_ms,
            level,
            variant,
        } => {
            let Some(minimum_level) = AccessLevel::from_number(level) else {
                bail!("access level must be 0-3, got {level}");
            };
            session.autoconfigure().await?;
            for n in 0..count {
                if n > 0 {
                    tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                }
                let reading = session.poll(variant, minimum_level).await?;
                if let Some(timestamp) = reading.timestamp {
                    println!("# {timestamp}");
                }
                for (name, value) in &reading.analogs {
                    println!("{name} = {value}");
                }
                for (name, state) in &reading.digitals {
                    println!("{name} = {}", u8::from(*state));
                }
            }
        }
        Commands::Logout => {
            session.logout().await?;
            log_info("Relay at level 0");
        }
    }

    Ok(())
}
