use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use wifi_supervisor::{
    config::{self, Config},
    connection, interface, logging,
    nmcli::{self, NmcliRadio},
    scan, Event, StationStatus, Supervisor, SystemClock,
};

#[derive(Parser)]
#[command(name = "wifi-supervisor")]
#[command(about = "Keep a WiFi interface connected to a known network, or host a fallback access point")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available WiFi interfaces
    ListInterfaces,

    /// Scan for WiFi networks
    Scan {
        /// Interface to use (defaults to auto-detected interface)
        #[arg(short, long)]
        interface: Option<String>,
    },

    /// Show connection status
    Status {
        /// Interface to check (defaults to auto-detected interface)
        #[arg(short, long)]
        interface: Option<String>,
    },

    /// Show configuration
    ShowConfig {
        /// Config file (defaults to the user config directory)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run the supervisor until interrupted
    Run {
        /// Interface to manage (overrides the config file)
        #[arg(short, long)]
        interface: Option<String>,

        /// Config file (defaults to the user config directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print events and logs as JSON lines
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let json = matches!(cli.command, Commands::Run { json: true, .. });
    logging::init(json);

    match cli.command {
        Commands::ListInterfaces => cmd_list_interfaces(),
        Commands::Scan { interface } => cmd_scan(interface.as_deref()),
        Commands::Status { interface } => cmd_status(interface.as_deref()),
        Commands::ShowConfig { config } => cmd_show_config(config.as_deref()),
        Commands::Run {
            interface,
            config,
            json,
        } => cmd_run(interface.as_deref(), config.as_deref(), json).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn cmd_list_interfaces() -> Result<()> {
    let interfaces = interface::list_wifi_interfaces()?;

    if interfaces.is_empty() {
        println!("No WiFi interfaces found.");
        return Ok(());
    }

    println!("{:<16} {:<12} {}", "INTERFACE", "STATE", "TYPE");
    println!("{}", "-".repeat(40));

    for iface in interfaces {
        let iface_type = if iface.is_usb { "USB" } else { "Built-in" };
        println!("{:<16} {:<12} {}", iface.name, iface.state, iface_type);
    }

    Ok(())
}

fn cmd_scan(interface: Option<&str>) -> Result<()> {
    let iface = interface::resolve_interface(interface)?;
    println!("Scanning on interface: {}", iface.name);
    println!();

    let cfg = Config::load().unwrap_or_default();
    let networks = nmcli::scan_networks(&iface.name)?;
    scan::display_networks(&networks, |n| cfg.find_network(&n.ssid).is_some());

    Ok(())
}

fn cmd_status(interface: Option<&str>) -> Result<()> {
    let iface = interface::resolve_interface(interface)?;
    let status = connection::status(&iface.name)?;
    connection::display_status(&status);

    Ok(())
}

fn cmd_show_config(path: Option<&Path>) -> Result<()> {
    let shown = match path {
        Some(path) => path.to_path_buf(),
        None => config::config_path()?,
    };
    println!("Config file: {}", shown.display());
    println!();

    let cfg = load_config(path)?;
    let settings = &cfg.supervisor;

    println!("Interface:          {}", cfg.interface.as_deref().unwrap_or("(auto)"));
    println!("Tick:               {} ms", cfg.tick_ms);
    println!("Connect timeout:    {} ms", settings.connect_timeout_ms);
    println!("Reconnect interval: {} ms", settings.reconnect_interval_ms);
    println!("Scan first:         {}", settings.scan);
    println!("Access point mode:  {:?}", settings.ap_mode);
    if let Some(ap) = &cfg.access_point {
        println!("Access point:       {}", ap.ssid);
    }
    println!();

    if cfg.networks.is_empty() {
        println!("No saved networks.");
    } else {
        println!("{:<32} {:<16} {}", "SSID", "ADDRESS", "PASSWORD");
        println!("{}", "-".repeat(64));
        for network in &cfg.networks {
            let address = network
                .static_ip
                .map(|ip| ip.address.to_string())
                .unwrap_or_else(|| "dhcp".to_string());
            let masked_pw = match &network.password {
                Some(pw) => "*".repeat(pw.len().min(12)),
                None => "(open)".to_string(),
            };
            println!("{:<32} {:<16} {}", network.ssid, address, masked_pw);
        }
    }

    Ok(())
}

async fn cmd_run(interface: Option<&str>, path: Option<&Path>, json: bool) -> Result<()> {
    let cfg = load_config(path)?;
    let iface = interface::resolve_interface(interface.or(cfg.interface.as_deref()))?;
    info!(interface = %iface.name, networks = cfg.networks.len(), "starting supervisor");

    let radio = NmcliRadio::new(iface.name.clone());
    let mut sup = Supervisor::new(radio, SystemClock::new(), cfg.supervisor.clone());

    sup.subscribe(move |kind, detail| {
        if json {
            match serde_json::to_string(&Event::new(kind, detail)) {
                Ok(line) => println!("{line}"),
                Err(err) => warn!(%err, "failed to encode event"),
            }
        } else if kind.is_failure() {
            warn!(event = %kind, "{detail}");
        } else {
            info!(event = %kind, "{detail}");
        }
    });

    // Applying may already publish events (HostnameError).
    cfg.apply(&mut sup)?;

    let mut ticker = tokio::time::interval(Duration::from_millis(cfg.tick_ms));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => sup.tick(),
            _ = &mut shutdown => break,
        }
    }

    let connected = sup.current_status() == StationStatus::Connected;
    info!(state = ?sup.state(), connected, "shutting down");
    Ok(())
}
